use crate::ast::ImportSpec;
use crate::env::Env;
use crate::error::{RuntimeError, ScriptError};
use crate::interpreter;
use crate::parser;
use crate::value::{Arity, NativeFnDef, NativeMethodDef, NativeResult, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A loadable library: a name, optional script source, native registration
/// callbacks, and the global names it exports.
pub struct Library {
    name: String,
    source: Option<String>,
    registrations: Vec<Rc<dyn Fn(&mut Engine)>>,
    native_exports: Vec<String>,
}

impl Library {
    pub fn builder(name: impl Into<String>) -> LibraryBuilder {
        LibraryBuilder {
            lib: Library {
                name: name.into(),
                source: None,
                registrations: Vec::new(),
                native_exports: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct LibraryBuilder {
    lib: Library,
}

impl LibraryBuilder {
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.lib.source = Some(source.into());
        self
    }

    /// Add a native-registration callback, run once per engine on first
    /// import. Callbacks must be idempotent in aggregate.
    pub fn register(mut self, f: impl Fn(&mut Engine) + 'static) -> Self {
        self.lib.registrations.push(Rc::new(f));
        self
    }

    /// Name globals (installed by the registrations) that this library
    /// exports to importers.
    pub fn exports(mut self, names: &[&str]) -> Self {
        self.lib
            .native_exports
            .extend(names.iter().map(|s| s.to_string()));
        self
    }

    pub fn build(self) -> Library {
        self.lib
    }
}

type Output = Rc<RefCell<Box<dyn FnMut(&str)>>>;

/// The script runtime: library loader, native registries, and the output
/// handler. All registries live on the engine instance; nothing is global
/// to the process.
pub struct Engine {
    libraries: HashMap<String, Library>,
    applied: HashSet<String>,
    loading: HashSet<String>,
    exports_cache: HashMap<String, IndexMap<String, Value>>,
    globals: HashMap<String, Value>,
    methods: HashMap<(&'static str, String), Rc<NativeMethodDef>>,
    output: Output,
}

impl Engine {
    /// An engine with no libraries. Most callers want [`Engine::with_defaults`].
    pub fn new() -> Self {
        Engine {
            libraries: HashMap::new(),
            applied: HashSet::new(),
            loading: HashSet::new(),
            exports_cache: HashMap::new(),
            globals: HashMap::new(),
            methods: HashMap::new(),
            output: Rc::new(RefCell::new(Box::new(|line: &str| println!("{line}")))),
        }
    }

    /// An engine with the standard library and the pattern bindings
    /// installed.
    pub fn with_defaults() -> Self {
        let mut engine = Engine::new();
        engine.add_library(crate::stdlib::stdlib());
        engine.add_library(crate::bindings::patterns_library());
        engine
    }

    pub fn add_library(&mut self, lib: Library) {
        self.libraries.insert(lib.name.clone(), lib);
    }

    /// Replace the print/console sink.
    pub fn set_output(&mut self, f: impl FnMut(&str) + 'static) {
        self.output = Rc::new(RefCell::new(Box::new(f)));
    }

    pub fn emit(&self, line: &str) {
        let mut out = self.output.borrow_mut();
        (&mut **out)(line);
    }

    pub fn register_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    /// Build a native function value without installing it anywhere.
    pub fn native_fn(
        name: impl Into<String>,
        arity: Arity,
        func: impl Fn(&mut Engine, Vec<Value>) -> NativeResult + 'static,
    ) -> Value {
        Value::NativeFn(Rc::new(NativeFnDef {
            name: name.into(),
            arity,
            func: Box::new(func),
        }))
    }

    /// Install a native function as a global.
    pub fn register_native(
        &mut self,
        name: &str,
        arity: Arity,
        func: impl Fn(&mut Engine, Vec<Value>) -> NativeResult + 'static,
    ) {
        let value = Engine::native_fn(name, arity, func);
        self.register_global(name, value);
    }

    /// Register an extension method for a native type tag. Re-registration
    /// replaces the previous entry, keeping registration idempotent.
    pub fn register_method(
        &mut self,
        type_tag: &'static str,
        name: &str,
        arity: Arity,
        func: impl Fn(&mut Engine, Value, Vec<Value>) -> NativeResult + 'static,
    ) {
        self.methods.insert(
            (type_tag, name.to_string()),
            Rc::new(NativeMethodDef {
                type_tag,
                name: name.to_string(),
                arity,
                func: Box::new(func),
            }),
        );
    }

    pub fn method(&self, type_tag: &str, name: &str) -> Option<Rc<NativeMethodDef>> {
        // Tags are static identities; compare by string content for lookup.
        self.methods
            .iter()
            .find(|((tag, m), _)| *tag == type_tag && m == name)
            .map(|(_, def)| def.clone())
    }

    /// Load a library's exports, applying its native registrations on first
    /// import and executing its source in a fresh module environment.
    pub fn import(&mut self, name: &str) -> Result<IndexMap<String, Value>, RuntimeError> {
        if let Some(cached) = self.exports_cache.get(name) {
            return Ok(cached.clone());
        }
        if self.loading.contains(name) {
            return Err(RuntimeError::Type(format!(
                "circular import of library \"{name}\""
            )));
        }
        self.loading.insert(name.to_string());
        let result = self.load_library(name);
        self.loading.remove(name);
        result
    }

    fn load_library(&mut self, name: &str) -> Result<IndexMap<String, Value>, RuntimeError> {
        let (registrations, source, native_exports) = {
            let lib = self
                .libraries
                .get(name)
                .ok_or_else(|| RuntimeError::Import(name.to_string()))?;
            (
                lib.registrations.clone(),
                lib.source.clone(),
                lib.native_exports.clone(),
            )
        };

        if !self.applied.contains(name) {
            self.applied.insert(name.to_string());
            for registration in &registrations {
                registration(self);
            }
        }

        let mut exports: IndexMap<String, Value> = IndexMap::new();
        for global in &native_exports {
            if let Some(value) = self.global(global) {
                exports.insert(global.clone(), value);
            }
        }

        if let Some(src) = source {
            let program = parser::parse(&src).map_err(|e| {
                RuntimeError::Type(format!("library \"{name}\" failed to parse: {e}"))
            })?;
            let env = self.root_env();
            let outcome = interpreter::exec_program(self, &env, &program)?;
            exports.extend(outcome.exports);
        }

        self.exports_cache.insert(name.to_string(), exports.clone());
        Ok(exports)
    }

    /// Bind a library's exports into an environment per the import spec.
    pub fn import_into(
        &mut self,
        name: &str,
        spec: &ImportSpec,
        env: &Rc<RefCell<Env>>,
    ) -> Result<(), RuntimeError> {
        let exports = self.import(name)?;
        match spec {
            ImportSpec::All => {
                for (export, value) in exports {
                    env.borrow_mut().define(&export, value, false)?;
                }
            }
            ImportSpec::AllAs(ns) => {
                env.borrow_mut()
                    .define(ns, Value::Object(exports), false)?;
            }
            ImportSpec::Named(names) => {
                for (exported, local) in names {
                    let value = exports.get(exported).cloned().ok_or_else(|| {
                        RuntimeError::Name(format!(
                            "library \"{name}\" does not export '{exported}'"
                        ))
                    })?;
                    env.borrow_mut().define(local, value, false)?;
                }
            }
        }
        Ok(())
    }

    /// A fresh top-level environment with the implicit stdlib loaded.
    fn root_env(&mut self) -> Rc<RefCell<Env>> {
        let env = Env::root();
        if self.libraries.contains_key("stdlib") {
            let _ = self.import_into("stdlib", &ImportSpec::All, &env);
        }
        if self.libraries.contains_key("patterns") {
            let _ = self.import_into("patterns", &ImportSpec::All, &env);
        }
        env
    }

    /// Parse and evaluate a script; the value of the final statement (or of
    /// a top-level `return`) is the result.
    pub fn eval(&mut self, source: &str) -> Result<Value, ScriptError> {
        let program = parser::parse(source)?;
        let env = self.root_env();
        let outcome = interpreter::exec_program(self, &env, &program)?;
        Ok(outcome.value)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::with_defaults()
    }
}
