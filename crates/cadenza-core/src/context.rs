use crate::rng::{derive_seed, SeedMixin, SeededRng};
use std::collections::HashMap;
use std::fmt;

/// A value stored in the query context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Int(i64),
    Double(f64),
    Str(String),
}

impl ContextValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ContextValue::Int(n) => Some(*n),
            ContextValue::Double(n) => Some(*n as i64),
            ContextValue::Str(_) => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            ContextValue::Int(n) => Some(*n as f64),
            ContextValue::Double(n) => Some(*n),
            ContextValue::Str(_) => None,
        }
    }
}

/// Typed key into the context. Identity is the static name string; no
/// runtime reflection is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub name: &'static str,
}

impl ContextKey {
    pub const fn new(name: &'static str) -> Self {
        ContextKey { name }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Seed for all derived pseudo-randomness. Defaults to 0.
pub const RANDOM_SEED: ContextKey = ContextKey::new("random-seed");
/// Lower bound continuous signals map onto. Defaults to 0.
pub const RANGE_MIN: ContextKey = ContextKey::new("range-min");
/// Upper bound continuous signals map onto. Defaults to 1.
pub const RANGE_MAX: ContextKey = ContextKey::new("range-max");

/// Immutable per-query key/value bag, shared down the composition tree.
/// Updates return a fresh context; a query never mutates the one it holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryContext {
    entries: HashMap<ContextKey, ContextValue>,
}

impl QueryContext {
    pub fn new() -> Self {
        QueryContext::default()
    }

    pub fn with_seed(seed: i64) -> Self {
        QueryContext::new().update(|b| {
            b.set(RANDOM_SEED, ContextValue::Int(seed));
        })
    }

    pub fn get_or_null(&self, key: ContextKey) -> Option<&ContextValue> {
        self.entries.get(&key)
    }

    pub fn get_or_default(&self, key: ContextKey, default: ContextValue) -> ContextValue {
        self.entries.get(&key).cloned().unwrap_or(default)
    }

    pub fn random_seed(&self) -> i64 {
        self.get_or_null(RANDOM_SEED)
            .and_then(|v| v.as_int())
            .unwrap_or(0)
    }

    pub fn range_min(&self) -> f64 {
        self.get_or_null(RANGE_MIN)
            .and_then(|v| v.as_double())
            .unwrap_or(0.0)
    }

    pub fn range_max(&self) -> f64 {
        self.get_or_null(RANGE_MAX)
            .and_then(|v| v.as_double())
            .unwrap_or(1.0)
    }

    /// Build a new context with changes applied; `self` is untouched.
    pub fn update(&self, build: impl FnOnce(&mut ContextBuilder)) -> QueryContext {
        let mut builder = ContextBuilder {
            entries: self.entries.clone(),
        };
        build(&mut builder);
        QueryContext {
            entries: builder.entries,
        }
    }

    /// A fresh generator derived from the context seed and the caller's
    /// mixins. Stateless with respect to the pattern graph.
    pub fn seeded_random(&self, mixins: &[SeedMixin]) -> SeededRng {
        SeededRng::from_seed(derive_seed(self.random_seed(), mixins))
    }
}

pub struct ContextBuilder {
    entries: HashMap<ContextKey, ContextValue>,
}

impl ContextBuilder {
    pub fn set(&mut self, key: ContextKey, value: ContextValue) -> &mut Self {
        self.entries.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: ContextKey) -> &mut Self {
        self.entries.remove(&key);
        self
    }
}
