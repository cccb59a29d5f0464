use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct Binding {
    value: Value,
    constant: bool,
}

/// A lexical scope. Child scopes chain to their parent; lookups walk the
/// chain outward. Confined to the evaluating thread.
pub struct Env {
    vars: HashMap<String, Binding>,
    parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    pub fn root() -> Rc<RefCell<Env>> {
        Rc::new(RefCell::new(Env {
            vars: HashMap::new(),
            parent: None,
        }))
    }

    pub fn child_of(parent: &Rc<RefCell<Env>>) -> Rc<RefCell<Env>> {
        Rc::new(RefCell::new(Env {
            vars: HashMap::new(),
            parent: Some(parent.clone()),
        }))
    }

    /// Bind a name in this scope. Re-declaring a `const` of the same scope
    /// is a name error; shadowing an outer binding is fine.
    pub fn define(&mut self, name: &str, value: Value, constant: bool) -> Result<(), RuntimeError> {
        if let Some(existing) = self.vars.get(name) {
            if existing.constant {
                return Err(RuntimeError::Name(format!(
                    "cannot redefine const '{name}'"
                )));
            }
        }
        self.vars.insert(
            name.to_string(),
            Binding { value, constant },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.vars.get(name) {
            return Some(binding.value.clone());
        }
        self.parent
            .as_ref()
            .and_then(|p| p.borrow().lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_chain() {
        let root = Env::root();
        root.borrow_mut()
            .define("x", Value::Num(1.0), false)
            .unwrap();
        let child = Env::child_of(&root);
        assert_eq!(child.borrow().lookup("x"), Some(Value::Num(1.0)));
        assert_eq!(child.borrow().lookup("y"), None);
    }

    #[test]
    fn child_shadows_parent() {
        let root = Env::root();
        root.borrow_mut()
            .define("x", Value::Num(1.0), true)
            .unwrap();
        let child = Env::child_of(&root);
        child
            .borrow_mut()
            .define("x", Value::Num(2.0), false)
            .unwrap();
        assert_eq!(child.borrow().lookup("x"), Some(Value::Num(2.0)));
        assert_eq!(root.borrow().lookup("x"), Some(Value::Num(1.0)));
    }

    #[test]
    fn const_cannot_be_redefined_in_scope() {
        let root = Env::root();
        root.borrow_mut()
            .define("k", Value::Num(1.0), true)
            .unwrap();
        let err = root
            .borrow_mut()
            .define("k", Value::Num(2.0), false)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Name(_)));
    }

    #[test]
    fn let_can_be_rebound() {
        let root = Env::root();
        root.borrow_mut()
            .define("x", Value::Num(1.0), false)
            .unwrap();
        root.borrow_mut()
            .define("x", Value::Num(2.0), false)
            .unwrap();
        assert_eq!(root.borrow().lookup("x"), Some(Value::Num(2.0)));
    }
}
