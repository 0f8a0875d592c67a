use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use crate::value::Value;

/// A chained name-to-value map modeling one lexical scope. Closures keep an
/// `Rc` to their defining environment, so a scope may outlive the call that
/// created it and later bindings in it stay visible to every holder.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    store: FxHashMap<String, Value>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            store: FxHashMap::default(),
            outer: Some(outer),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.store.get(name) {
            Some(value.clone())
        } else if let Some(outer) = &self.outer {
            outer.borrow().get(name)
        } else {
            None
        }
    }

    /// Bindings always land in the innermost scope; there is no assignment
    /// to outer scopes in this language.
    pub fn set(&mut self, name: String, value: Value) {
        self.store.insert(name, value);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_walks_the_chain() {
        let outer = Environment::new();
        outer
            .borrow_mut()
            .set("x".to_string(), Value::Integer(1));

        let inner = Environment::new_enclosed(outer.clone());
        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(1)));
        assert_eq!(inner.borrow().get("y"), None);
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let outer = Environment::new();
        outer
            .borrow_mut()
            .set("x".to_string(), Value::Integer(1));

        let inner = Environment::new_enclosed(outer.clone());
        inner
            .borrow_mut()
            .set("x".to_string(), Value::Integer(2));

        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_binding_added_after_enclosing_is_visible() {
        let outer = Environment::new();
        let inner = Environment::new_enclosed(outer.clone());

        outer
            .borrow_mut()
            .set("late".to_string(), Value::Integer(3));
        assert_eq!(inner.borrow().get("late"), Some(Value::Integer(3)));
    }
}
