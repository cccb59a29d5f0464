//! AST walker. Environments are mutated only while a script evaluates; the
//! whole interpreter is confined to one thread.

use crate::ast::*;
use crate::engine::Engine;
use crate::env::Env;
use crate::error::RuntimeError;
use crate::value::{Closure, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Result of running a program: its final value and whatever it exported.
pub struct ExecOutcome {
    pub value: Value,
    pub exports: IndexMap<String, Value>,
}

pub fn exec_program(
    engine: &mut Engine,
    env: &Rc<RefCell<Env>>,
    program: &[Stmt],
) -> Result<ExecOutcome, RuntimeError> {
    let mut exports = IndexMap::new();
    let mut last = Value::Null;
    for stmt in program {
        match exec_stmt(engine, env, stmt, &mut exports)? {
            StmtOutcome::Value(v) => last = v,
            StmtOutcome::Return(v) => {
                return Ok(ExecOutcome { value: v, exports });
            }
        }
    }
    Ok(ExecOutcome {
        value: last,
        exports,
    })
}

enum StmtOutcome {
    Value(Value),
    Return(Value),
}

fn exec_stmt(
    engine: &mut Engine,
    env: &Rc<RefCell<Env>>,
    stmt: &Stmt,
    exports: &mut IndexMap<String, Value>,
) -> Result<StmtOutcome, RuntimeError> {
    match stmt {
        Stmt::Let { name, init } => {
            let value = match init {
                Some(expr) => eval_expr(engine, env, expr)?,
                None => Value::Null,
            };
            env.borrow_mut().define(name, value, false)?;
            Ok(StmtOutcome::Value(Value::Null))
        }
        Stmt::Const { name, init } => {
            let value = eval_expr(engine, env, init)?;
            env.borrow_mut().define(name, value, true)?;
            Ok(StmtOutcome::Value(Value::Null))
        }
        Stmt::Return(value) => {
            let value = match value {
                Some(expr) => eval_expr(engine, env, expr)?,
                None => Value::Null,
            };
            Ok(StmtOutcome::Return(value))
        }
        Stmt::Import { library, spec } => {
            engine.import_into(library, spec, env)?;
            Ok(StmtOutcome::Value(Value::Null))
        }
        Stmt::Export(names) => {
            for (local, exported) in names {
                let value = env.borrow().lookup(local).ok_or_else(|| {
                    RuntimeError::Name(format!("cannot export undefined '{local}'"))
                })?;
                exports.insert(exported.clone(), value);
            }
            Ok(StmtOutcome::Value(Value::Null))
        }
        Stmt::Expr(expr) => Ok(StmtOutcome::Value(eval_expr(engine, env, expr)?)),
    }
}

pub fn eval_expr(
    engine: &mut Engine,
    env: &Rc<RefCell<Env>>,
    expr: &Expr,
) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Number(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Ident(name) => {
            let local = env.borrow().lookup(name);
            local
                .or_else(|| engine.global(name))
                .ok_or_else(|| RuntimeError::Name(format!("undefined identifier '{name}'")))
        }
        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(engine, env, item)?);
            }
            Ok(Value::Array(values))
        }
        Expr::Object(props) => {
            let mut map = IndexMap::with_capacity(props.len());
            for (key, value) in props {
                map.insert(key.clone(), eval_expr(engine, env, value)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Arrow { params, body } => Ok(Value::Closure(Rc::new(Closure {
            params: params.clone(),
            body: body.clone(),
            env: env.clone(),
        }))),
        Expr::Unary { op, expr } => {
            let value = eval_expr(engine, env, expr)?;
            eval_unary(*op, value)
        }
        Expr::Binary { op, left, right } => eval_binary(engine, env, *op, left, right),
        Expr::Call { callee, args } => {
            let callee = eval_expr(engine, env, callee)?;
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(eval_expr(engine, env, arg)?);
            }
            call_value(engine, &callee, arg_values)
        }
        Expr::Member { object, property } => {
            let object = eval_expr(engine, env, object)?;
            eval_member(engine, object, property)
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => Ok(Value::Num(-value.as_number()?)),
        UnaryOp::Pos => Ok(Value::Num(value.as_number()?)),
    }
}

fn eval_binary(
    engine: &mut Engine,
    env: &Rc<RefCell<Env>>,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> Result<Value, RuntimeError> {
    // Short-circuit forms yield the deciding operand.
    match op {
        BinaryOp::Or => {
            let l = eval_expr(engine, env, left)?;
            if l.is_truthy() {
                return Ok(l);
            }
            return eval_expr(engine, env, right);
        }
        BinaryOp::And => {
            let l = eval_expr(engine, env, left)?;
            if !l.is_truthy() {
                return Ok(l);
            }
            return eval_expr(engine, env, right);
        }
        _ => {}
    }

    let l = eval_expr(engine, env, left)?;
    let r = eval_expr(engine, env, right)?;
    match op {
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::NotEq => Ok(Value::Bool(l != r)),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            let ordering = match (&l, &r) {
                (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(RuntimeError::Type(format!(
                        "cannot compare {} with {}",
                        l.type_name(),
                        r.type_name()
                    )));
                }
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            let result = match op {
                BinaryOp::Less => ordering.is_lt(),
                BinaryOp::LessEq => ordering.is_le(),
                BinaryOp::Greater => ordering.is_gt(),
                BinaryOp::GreaterEq => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => match (&l, &r) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (Value::Str(a), _) => Ok(Value::Str(format!("{a}{r}"))),
            (_, Value::Str(b)) => Ok(Value::Str(format!("{l}{b}"))),
            _ => Err(RuntimeError::Type(format!(
                "cannot add {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        },
        BinaryOp::Sub => Ok(Value::Num(l.as_number()? - r.as_number()?)),
        BinaryOp::Mul => Ok(Value::Num(l.as_number()? * r.as_number()?)),
        BinaryOp::Div => Ok(Value::Num(l.as_number()? / r.as_number()?)),
        BinaryOp::Rem => Ok(Value::Num(l.as_number()? % r.as_number()?)),
        BinaryOp::Or | BinaryOp::And => unreachable!(),
    }
}

fn eval_member(engine: &mut Engine, object: Value, property: &str) -> Result<Value, RuntimeError> {
    match &object {
        Value::Object(props) => Ok(props.get(property).cloned().unwrap_or(Value::Null)),
        Value::NativeObject(native) => {
            match engine.method(native.type_tag, property) {
                Some(method) => Ok(Value::BoundMethod(Rc::new(crate::value::BoundMethod {
                    receiver: object.clone(),
                    method,
                }))),
                None => Err(RuntimeError::Type(format!(
                    "no method '{property}' on {}",
                    native.type_tag
                ))),
            }
        }
        other => Err(RuntimeError::Type(format!(
            "cannot access '{property}' on {}",
            other.type_name()
        ))),
    }
}

/// Call any callable value with already-evaluated arguments.
pub fn call_value(
    engine: &mut Engine,
    callee: &Value,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match callee {
        Value::Closure(closure) => {
            let scope = Env::child_of(&closure.env);
            for (i, param) in closure.params.iter().enumerate() {
                let value = args.get(i).cloned().unwrap_or(Value::Null);
                scope.borrow_mut().define(param, value, false)?;
            }
            match &closure.body {
                ArrowBody::Expr(expr) => eval_expr(engine, &scope, expr),
                ArrowBody::Block(stmts) => {
                    let outcome = exec_program(engine, &scope, stmts)?;
                    Ok(outcome.value)
                }
            }
        }
        Value::NativeFn(def) => {
            if !def.arity.admits(args.len()) {
                return Err(RuntimeError::argument(
                    &def.name,
                    def.arity.describe(),
                    format!("{} argument(s)", args.len()),
                ));
            }
            (def.func)(engine, args)
        }
        Value::BoundMethod(bound) => {
            if !bound.method.arity.admits(args.len()) {
                return Err(RuntimeError::argument(
                    &bound.method.name,
                    bound.method.arity.describe(),
                    format!("{} argument(s)", args.len()),
                ));
            }
            (bound.method.func)(engine, bound.receiver.clone(), args)
        }
        other => Err(RuntimeError::Type(format!(
            "{} is not callable",
            other.type_name()
        ))),
    }
}
