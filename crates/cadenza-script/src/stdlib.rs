//! The implicitly imported standard library: output, `Math`, and string
//! helpers.

use crate::engine::{Engine, Library};
use crate::error::RuntimeError;
use crate::value::{Arity, Value};
use indexmap::IndexMap;

fn join_args(args: &[Value]) -> String {
    args.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn unary_math(name: &'static str, f: fn(f64) -> f64) -> (String, Value) {
    (
        name.to_string(),
        Engine::native_fn(format!("Math.{name}"), Arity::Exact(1), move |_, args| {
            Ok(Value::Num(f(args[0].as_number()?)))
        }),
    )
}

fn binary_math(name: &'static str, f: fn(f64, f64) -> f64) -> (String, Value) {
    (
        name.to_string(),
        Engine::native_fn(format!("Math.{name}"), Arity::Exact(2), move |_, args| {
            Ok(Value::Num(f(args[0].as_number()?, args[1].as_number()?)))
        }),
    )
}

pub fn stdlib() -> Library {
    Library::builder("stdlib")
        .register(|engine| {
            engine.register_native("print", Arity::AtLeast(0), |engine, args| {
                engine.emit(&join_args(&args));
                Ok(Value::Null)
            });

            let log = Engine::native_fn("console.log", Arity::AtLeast(0), |engine, args| {
                engine.emit(&join_args(&args));
                Ok(Value::Null)
            });
            let mut console = IndexMap::new();
            console.insert("log".to_string(), log);
            engine.register_global("console", Value::Object(console));

            let math: IndexMap<String, Value> = [
                unary_math("sqrt", f64::sqrt),
                unary_math("abs", f64::abs),
                unary_math("floor", f64::floor),
                unary_math("ceil", f64::ceil),
                unary_math("round", f64::round),
                unary_math("sin", f64::sin),
                unary_math("cos", f64::cos),
                unary_math("tan", f64::tan),
                binary_math("min", f64::min),
                binary_math("max", f64::max),
                binary_math("pow", f64::powf),
            ]
            .into_iter()
            .collect();
            engine.register_global("Math", Value::Object(math));

            engine.register_native("length", Arity::Exact(1), |_, args| match &args[0] {
                Value::Str(s) => Ok(Value::Num(s.chars().count() as f64)),
                Value::Array(items) => Ok(Value::Num(items.len() as f64)),
                other => Err(RuntimeError::Type(format!(
                    "length expects a string or array, got {}",
                    other.type_name()
                ))),
            });
            engine.register_native("toUpperCase", Arity::Exact(1), |_, args| {
                Ok(Value::Str(args[0].as_str()?.to_uppercase()))
            });
            engine.register_native("toLowerCase", Arity::Exact(1), |_, args| {
                Ok(Value::Str(args[0].as_str()?.to_lowercase()))
            });
        })
        .exports(&[
            "print",
            "console",
            "Math",
            "length",
            "toUpperCase",
            "toLowerCase",
        ])
        .build()
}
