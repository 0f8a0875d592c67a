pub mod builtins;
pub mod environment;

use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use crate::ast::{Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::value::{HashPair, Value};

use self::environment::Environment;

pub type Env = Rc<RefCell<Environment>>;

/// Evaluate a whole program. A `Return` produced by a top-level statement is
/// unwrapped on the way out; an `Error` aborts the remaining statements.
/// `None` means the final statement produced no value (a `let`).
pub fn eval(program: &Program, env: &Env) -> Option<Value> {
    let mut result = None;

    for statement in &program.0 {
        result = eval_statement(statement, env);

        match result {
            Some(Value::Return(value)) => return Some(*value),
            Some(Value::Error(message)) => return Some(Value::Error(message)),
            _ => {}
        }
    }

    result
}

fn eval_statement(statement: &Statement, env: &Env) -> Option<Value> {
    match statement {
        Statement::Expression(expression) => Some(eval_expression(expression, env)),
        Statement::Let { name, value } => {
            let value = eval_expression(value, env);
            if value.is_error() {
                return Some(value);
            }
            env.borrow_mut().set(name.clone(), value);
            None
        }
        Statement::Return(value) => {
            let value = eval_expression(value, env);
            if value.is_error() {
                return Some(value);
            }
            Some(Value::Return(Box::new(value)))
        }
        Statement::Block(statements) => eval_block(statements, env),
        Statement::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expression(condition, env);
            if condition.is_error() {
                return Some(condition);
            }

            if condition.is_truthy() {
                eval_statement(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_statement(alternative, env)
            } else {
                Some(Value::Null)
            }
        }
    }
}

// Unlike `eval`, blocks pass `Return` and `Error` through still wrapped so
// the nearest enclosing function call can see the marker and stop.
fn eval_block(statements: &[Statement], env: &Env) -> Option<Value> {
    let mut result = None;

    for statement in statements {
        result = eval_statement(statement, env);

        if matches!(&result, Some(Value::Return(_)) | Some(Value::Error(_))) {
            return result;
        }
    }

    result
}

fn eval_expression(expression: &Expression, env: &Env) -> Value {
    match expression {
        Expression::Integer(value) => Value::Integer(*value),
        Expression::Boolean(value) => Value::Boolean(*value),
        Expression::Str(value) => Value::Str(value.clone()),
        Expression::Identifier(name) => match env.borrow().get(name) {
            Some(value) => value,
            None => builtins::lookup(name)
                .unwrap_or_else(|| Value::Error(format!("identifier not found: {}", name))),
        },
        Expression::Prefix(operator, right) => {
            let right = eval_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix_expression(*operator, right)
        }
        Expression::Infix(left, operator, right) => {
            let left = eval_expression(left, env);
            if left.is_error() {
                return left;
            }
            let right = eval_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_infix_expression(left, *operator, right)
        }
        Expression::Function { parameters, body } => Value::Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: env.clone(),
        },
        Expression::Call {
            function,
            arguments,
        } => {
            let function = eval_expression(function, env);
            if function.is_error() {
                return function;
            }
            let arguments = match eval_expressions(arguments, env) {
                Ok(values) => values,
                Err(error) => return error,
            };
            apply_function(function, arguments)
        }
        Expression::Array(elements) => match eval_expressions(elements, env) {
            Ok(values) => Value::Array(values),
            Err(error) => error,
        },
        Expression::Index { left, index } => {
            let left = eval_expression(left, env);
            if left.is_error() {
                return left;
            }
            let index = eval_expression(index, env);
            if index.is_error() {
                return index;
            }
            eval_index_expression(left, index)
        }
        Expression::Hash(pairs) => eval_hash_literal(pairs, env),
    }
}

// Left-to-right, first error wins and discards everything already evaluated.
fn eval_expressions(expressions: &[Expression], env: &Env) -> Result<Vec<Value>, Value> {
    let mut values = Vec::with_capacity(expressions.len());

    for expression in expressions {
        let value = eval_expression(expression, env);
        if value.is_error() {
            return Err(value);
        }
        values.push(value);
    }

    Ok(values)
}

fn apply_function(function: Value, arguments: Vec<Value>) -> Value {
    match function {
        Value::Function {
            parameters,
            body,
            env,
        } => {
            let call_env = Environment::new_enclosed(env);
            for (parameter, argument) in parameters.into_iter().zip(arguments) {
                call_env.borrow_mut().set(parameter, argument);
            }

            match eval_statement(&body, &call_env) {
                Some(Value::Return(value)) => *value,
                Some(value) => value,
                None => Value::Null,
            }
        }
        Value::Builtin(function) => function(arguments),
        other => Value::Error(format!("not a function: {}", other.type_name())),
    }
}

fn eval_prefix_expression(operator: PrefixOperator, right: Value) -> Value {
    match operator {
        PrefixOperator::Bang => match right {
            Value::Boolean(value) => Value::Boolean(!value),
            Value::Null => Value::Boolean(true),
            _ => Value::Boolean(false),
        },
        PrefixOperator::Minus => match right {
            Value::Integer(value) => Value::Integer(-value),
            other => Value::Error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn eval_infix_expression(left: Value, operator: InfixOperator, right: Value) -> Value {
    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => {
            eval_integer_infix_expression(left, operator, right)
        }
        (Value::Str(left), Value::Str(right)) => {
            eval_string_infix_expression(left, operator, right)
        }
        (left, right) => match operator {
            InfixOperator::Eq => Value::Boolean(values_identical(&left, &right)),
            InfixOperator::NotEq => Value::Boolean(!values_identical(&left, &right)),
            _ if left.type_name() != right.type_name() => Value::Error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
            _ => Value::Error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
        },
    }
}

// The original runtime interned `true`, `false`, and `null` and let `==`
// fall back to identity comparison; with enum variants that collapses to
// exactly these cases, and every other pairing is unequal.
fn values_identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Boolean(left), Value::Boolean(right)) => left == right,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn eval_integer_infix_expression(left: i64, operator: InfixOperator, right: i64) -> Value {
    match operator {
        InfixOperator::Plus => Value::Integer(left + right),
        InfixOperator::Minus => Value::Integer(left - right),
        InfixOperator::Asterisk => Value::Integer(left * right),
        InfixOperator::Slash => Value::Integer(left / right),
        InfixOperator::Lt => Value::Boolean(left < right),
        InfixOperator::Gt => Value::Boolean(left > right),
        InfixOperator::Eq => Value::Boolean(left == right),
        InfixOperator::NotEq => Value::Boolean(left != right),
    }
}

fn eval_string_infix_expression(left: String, operator: InfixOperator, right: String) -> Value {
    match operator {
        InfixOperator::Plus => Value::Str(left + &right),
        InfixOperator::Eq => Value::Boolean(left == right),
        InfixOperator::NotEq => Value::Boolean(left != right),
        other => Value::Error(format!("unknown operator: STRING {} STRING", other)),
    }
}

fn eval_index_expression(left: Value, index: Value) -> Value {
    match (left, index) {
        (Value::Array(elements), Value::Integer(index)) => {
            if index < 0 || index as usize >= elements.len() {
                Value::Null
            } else {
                elements[index as usize].clone()
            }
        }
        (Value::Hash(pairs), index) => match index.hash_key() {
            Some(key) => pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null),
            None => Value::Error(format!("unusable as hash key: {}", index.type_name())),
        },
        (left, _) => Value::Error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}

fn eval_hash_literal(pairs: &[(Expression, Expression)], env: &Env) -> Value {
    let mut map = FxHashMap::default();

    for (key_expression, value_expression) in pairs {
        let key = eval_expression(key_expression, env);
        if key.is_error() {
            return key;
        }

        let Some(hash_key) = key.hash_key() else {
            return Value::Error(format!("unusable as hash key: {}", key.type_name()));
        };

        let value = eval_expression(value_expression, env);
        if value.is_error() {
            return value;
        }

        map.insert(hash_key, HashPair { key, value });
    }

    Value::Hash(map)
}
