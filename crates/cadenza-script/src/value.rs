use crate::ast::ArrowBody;
use crate::engine::Engine;
use crate::env::Env;
use crate::error::RuntimeError;
use indexmap::IndexMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type NativeResult = Result<Value, RuntimeError>;

/// Argument-count contract checked before a native runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn admits(&self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == *k,
            Arity::AtLeast(k) => n >= *k,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Arity::Exact(k) => format!("{k} argument(s)"),
            Arity::AtLeast(k) => format!("at least {k} argument(s)"),
        }
    }
}

/// A host function callable from scripts.
pub struct NativeFnDef {
    pub name: String,
    pub arity: Arity,
    pub func: Box<dyn Fn(&mut Engine, Vec<Value>) -> NativeResult>,
}

/// An extension method registered for a native type tag.
pub struct NativeMethodDef {
    pub type_tag: &'static str,
    pub name: String,
    pub arity: Arity,
    pub func: Box<dyn Fn(&mut Engine, Value, Vec<Value>) -> NativeResult>,
}

/// An arrow function together with its captured environment.
pub struct Closure {
    pub params: Vec<String>,
    pub body: ArrowBody,
    pub env: Rc<RefCell<Env>>,
}

/// A method looked up on a native object, waiting for its call.
pub struct BoundMethod {
    pub receiver: Value,
    pub method: Rc<NativeMethodDef>,
}

/// An opaque host value. The tag is assigned at registration and is the
/// dispatch key for extension methods.
#[derive(Clone)]
pub struct NativeObject {
    pub type_tag: &'static str,
    pub handle: Rc<dyn Any>,
}

#[derive(Clone)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Closure(Rc<Closure>),
    NativeFn(Rc<NativeFnDef>),
    BoundMethod(Rc<BoundMethod>),
    NativeObject(NativeObject),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Closure(_) => "function",
            Value::NativeFn(_) => "native function",
            Value::BoundMethod(_) => "bound method",
            Value::NativeObject(o) => o.type_tag,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            Value::Object(_)
            | Value::Closure(_)
            | Value::NativeFn(_)
            | Value::BoundMethod(_)
            | Value::NativeObject(_) => true,
        }
    }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Num(n) => Ok(*n),
            other => Err(RuntimeError::Type(format!(
                "expected a number, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(RuntimeError::Type(format!(
                "expected a string, got {}",
                other.type_name()
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFn(a), Value::NativeFn(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Value::NativeObject(a), Value::NativeObject(b)) => Rc::ptr_eq(&a.handle, &b.handle),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "null"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(props) => {
                write!(f, "{{")?;
                for (i, (k, v)) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Closure(_) => write!(f, "<function>"),
            Value::NativeFn(def) => write!(f, "<native {}>", def.name),
            Value::BoundMethod(m) => write!(f, "<method {}>", m.method.name),
            Value::NativeObject(o) => write!(f, "<{}>", o.type_tag),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Num(0.0).is_truthy());
        assert!(!Value::Str("".into()).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Num(0.5).is_truthy());
        assert!(Value::Object(IndexMap::new()).is_truthy());
    }

    #[test]
    fn structural_equality_for_data() {
        assert_eq!(
            Value::Array(vec![Value::Num(1.0), Value::Str("a".into())]),
            Value::Array(vec![Value::Num(1.0), Value::Str("a".into())])
        );
        assert_ne!(Value::Num(1.0), Value::Str("1".into()));
    }

    #[test]
    fn arity_contracts() {
        assert!(Arity::Exact(2).admits(2));
        assert!(!Arity::Exact(2).admits(3));
        assert!(Arity::AtLeast(1).admits(4));
        assert!(!Arity::AtLeast(1).admits(0));
    }

    #[test]
    fn display_joins_collections() {
        let v = Value::Array(vec![Value::Num(1.0), Value::Bool(true)]);
        assert_eq!(v.to_string(), "[1, true]");
    }
}
