use crate::value::{BuiltinFn, Value};

/// Resolve a builtin by name. Consulted after the environment chain, so a
/// `let` binding can shadow any of these.
pub fn lookup(name: &str) -> Option<Value> {
    let builtin: BuiltinFn = match name {
        "len" => len,
        "count" => count,
        "first" => first,
        "last" => last,
        "tail" => tail,
        "push" => push,
        _ => return None,
    };
    Some(Value::Builtin(builtin))
}

// Contract violations come back as Error values, never as host panics.

fn len(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Str(value) => Value::Integer(value.len() as i64),
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        other => Value::Error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

fn count(args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return Value::Error(format!(
            "wrong number of arguments. got={}, want=2",
            args.len()
        ));
    }

    let Value::Str(haystack) = &args[0] else {
        return Value::Error(format!(
            "argument 0 to `count` not supported, got {}",
            args[0].type_name()
        ));
    };
    let Value::Str(needle) = &args[1] else {
        return Value::Error(format!(
            "argument 1 to `count` not supported, got {}",
            args[1].type_name()
        ));
    };

    // Non-overlapping occurrences; the empty needle matches between every
    // pair of characters and at both ends.
    let occurrences = if needle.is_empty() {
        haystack.chars().count() + 1
    } else {
        haystack.matches(needle.as_str()).count()
    };

    Value::Integer(occurrences as i64)
}

fn first(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => elements.first().cloned().unwrap_or(Value::Null),
        other => Value::Error(format!(
            "argument to `first` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn last(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => elements.last().cloned().unwrap_or(Value::Null),
        other => Value::Error(format!(
            "argument to `last` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn tail(args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::Error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) if elements.is_empty() => Value::Null,
        Value::Array(elements) => Value::Array(elements[1..].to_vec()),
        other => Value::Error(format!(
            "argument to `tail` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn push(mut args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return Value::Error(format!(
            "wrong number of arguments. got={}, want=2",
            args.len()
        ));
    }

    let appended = args.pop().expect("length checked above");
    match args.pop().expect("length checked above") {
        Value::Array(mut elements) => {
            elements.push(appended);
            Value::Array(elements)
        }
        other => Value::Error(format!(
            "argument to `push` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}
