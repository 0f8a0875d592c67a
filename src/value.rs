use std::{cell::RefCell, fmt::Display, rc::Rc};

use rustc_hash::FxHashMap;

use crate::ast::Statement;
use crate::interpreter::environment::Environment;

pub type BuiltinFn = fn(Vec<Value>) -> Value;

/// A runtime value. Errors are values too: they flow through evaluation
/// and short-circuit every enclosing expression, so the evaluator never
/// needs a separate error channel.
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Str(String),
    Array(Vec<Value>),
    Hash(FxHashMap<HashKey, HashPair>),
    Function {
        parameters: Vec<String>,
        body: Box<Statement>,
        env: Rc<RefCell<Environment>>,
    },
    Builtin(BuiltinFn),
    /// Control-flow marker unwinding a block to the nearest function
    /// boundary; never observable to user code.
    Return(Box<Value>),
    Error(String),
    Null,
}

/// Derived key for hash maps. Only integers, booleans, and strings are
/// hashable; everything else is rejected at the literal or index site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    kind: &'static str,
    value: u64,
}

/// The original key rides along with the value so hashes can print
/// themselves with real keys instead of digests.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Str(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function { .. } => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Return(_) => "RETURN_VALUE",
            Value::Error(_) => "ERROR",
            Value::Null => "NULL",
        }
    }

    /// Everything is truthy except `false` and `null`; `0` counts as true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(value) => *value,
            _ => true,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Value::Integer(value) => *value as u64,
            Value::Boolean(value) => u64::from(*value),
            Value::Str(value) => fnv1a(value.as_bytes()),
            _ => return None,
        };
        Some(HashKey {
            kind: self.type_name(),
            value,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => *a as usize == *b as usize,
            (Value::Return(a), Value::Return(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Null, Value::Null) => true,
            // Functions (and mixed types) never compare equal here; the
            // language-level rules live in the evaluator.
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Str(value) => write!(f, "{}", value),
            Value::Array(elements) => {
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Value::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Value::Function {
                parameters, body, ..
            } => {
                write!(f, "fn({}) {{\n{}\n}}", parameters.join(", "), body)
            }
            Value::Builtin(_) => write!(f, "builtin function"),
            Value::Return(value) => write!(f, "{}", value),
            Value::Error(message) => write!(f, "ERROR: {}", message),
            Value::Null => write!(f, "null"),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            Value::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            Value::Str(value) => f.debug_tuple("Str").field(value).finish(),
            Value::Array(elements) => f.debug_tuple("Array").field(elements).finish(),
            Value::Hash(pairs) => f.debug_tuple("Hash").field(pairs).finish(),
            // The captured environment may point back at this function, so
            // print its address rather than walking it.
            Value::Function {
                parameters, env, ..
            } => f
                .debug_struct("Function")
                .field("parameters", parameters)
                .field("env", &env.as_ptr())
                .finish(),
            Value::Builtin(_) => f.write_str("Builtin"),
            Value::Return(value) => f.debug_tuple("Return").field(value).finish(),
            Value::Error(message) => f.debug_tuple("Error").field(message).finish(),
            Value::Null => f.write_str("Null"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_string_hash_keys() {
        let hello = Value::Str("Hello World".to_string());
        let also_hello = Value::Str("Hello World".to_string());
        let other = Value::Str("My name is johnny".to_string());

        assert_eq!(hello.hash_key(), also_hello.hash_key());
        assert_ne!(hello.hash_key(), other.hash_key());
    }

    #[test]
    fn test_scalar_hash_keys() {
        assert_eq!(Value::Integer(1).hash_key(), Value::Integer(1).hash_key());
        assert_ne!(Value::Integer(1).hash_key(), Value::Integer(2).hash_key());
        assert_eq!(
            Value::Boolean(true).hash_key(),
            Value::Boolean(true).hash_key()
        );
        // Same digest, different type tag.
        assert_ne!(Value::Integer(1).hash_key(), Value::Boolean(true).hash_key());
    }

    #[test]
    fn test_unhashable_values() {
        assert_eq!(Value::Array(vec![]).hash_key(), None);
        assert_eq!(Value::Null.hash_key(), None);
    }

    #[test]
    fn test_inspect_forms() {
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Str("hi".to_string()).to_string(), "hi");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::Array(vec![Value::Integer(1), Value::Str("x".to_string())]).to_string(),
            "[1, x]"
        );
        assert_eq!(
            Value::Error("type mismatch".to_string()).to_string(),
            "ERROR: type mismatch"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }
}
