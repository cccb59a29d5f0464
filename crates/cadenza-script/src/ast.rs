use serde::{Deserialize, Serialize};

/// A parsed script: zero or more statements.
pub type Program = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let { name: String, init: Option<Expr> },
    Const { name: String, init: Expr },
    Return(Option<Expr>),
    Import { library: String, spec: ImportSpec },
    /// Pairs of (local name, exported name).
    Export(Vec<(String, String)>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportSpec {
    /// `import * from "lib"` — copy every export.
    All,
    /// `import * as ns from "lib"` — bind the exports as one object.
    AllAs(String),
    /// `import {a, b as c} from "lib"` — pairs of (exported name, local name).
    Named(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<Expr>),
    /// Insertion-ordered properties.
    Object(Vec<(String, Expr)>),
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}
