//! Recursive-descent parser over the token stream. Precedence, low to high:
//! arrow functions, `||`, `&&`, comparisons, additive, multiplicative, unary
//! prefix, call/member chains, primaries.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token};
use crate::span::Pos;

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<(Token, Pos)>,
    idx: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Pos)>) -> Self {
        Parser { tokens, idx: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.idx + offset).map(|(t, _)| t)
    }

    fn pos(&self) -> Pos {
        self.tokens
            .get(self.idx)
            .or_else(|| self.tokens.last())
            .map(|(_, p)| *p)
            .unwrap_or_else(Pos::start)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.idx).map(|(t, _)| t.clone());
        if t.is_some() {
            self.idx += 1;
        }
        t
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = self
            .peek()
            .map(|t| t.describe())
            .unwrap_or_else(|| "end of input".into());
        ParseError::new(format!("expected {expected}, found {found}"), self.pos())
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let stmt = match self.peek() {
            Some(Token::Let) => self.parse_let()?,
            Some(Token::Const) => self.parse_const()?,
            Some(Token::Return) => self.parse_return()?,
            Some(Token::Import) => self.parse_import()?,
            Some(Token::Export) => self.parse_export()?,
            _ => Stmt::Expr(self.parse_expr()?),
        };
        // Statement terminators are optional.
        while self.eat(&Token::Semicolon) {}
        Ok(stmt)
    }

    fn parse_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.bump() {
                Some(Token::Ident(name)) => Ok(name),
                _ => unreachable!(),
            },
            _ => Err(self.unexpected(what)),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Let, "'let'")?;
        let name = self.parse_ident("a variable name")?;
        let init = if self.eat(&Token::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::Let { name, init })
    }

    fn parse_const(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Const, "'const'")?;
        let name = self.parse_ident("a constant name")?;
        self.expect(Token::Assign, "'=' after const name")?;
        let init = self.parse_expr()?;
        Ok(Stmt::Const { name, init })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Return, "'return'")?;
        // `return` with nothing returnable after it is a bare return.
        let value = match self.peek() {
            None
            | Some(Token::Semicolon)
            | Some(Token::RBrace)
            | Some(Token::Let)
            | Some(Token::Const)
            | Some(Token::Return)
            | Some(Token::Import)
            | Some(Token::Export) => None,
            _ => Some(self.parse_expr()?),
        };
        Ok(Stmt::Return(value))
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Import, "'import'")?;
        let spec = if self.eat(&Token::Star) {
            if self.eat(&Token::As) {
                ImportSpec::AllAs(self.parse_ident("a namespace name")?)
            } else {
                ImportSpec::All
            }
        } else if self.eat(&Token::LBrace) {
            let mut names = Vec::new();
            while !self.at(&Token::RBrace) {
                let exported = self.parse_ident("an import name")?;
                let local = if self.eat(&Token::As) {
                    self.parse_ident("a local name")?
                } else {
                    exported.clone()
                };
                names.push((exported, local));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBrace, "'}' after import list")?;
            ImportSpec::Named(names)
        } else {
            return Err(self.unexpected("'*' or '{' after 'import'"));
        };
        self.expect(Token::From, "'from'")?;
        let library = match self.bump() {
            Some(Token::Str(name)) => name,
            _ => return Err(self.unexpected("a library name string")),
        };
        Ok(Stmt::Import { library, spec })
    }

    fn parse_export(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Export, "'export'")?;
        self.expect(Token::LBrace, "'{' after 'export'")?;
        let mut names = Vec::new();
        while !self.at(&Token::RBrace) {
            let local = self.parse_ident("an export name")?;
            let exported = if self.eat(&Token::As) {
                self.parse_ident("an exported name")?
            } else {
                local.clone()
            };
            names.push((local, exported));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "'}' after export list")?;
        Ok(Stmt::Export(names))
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if let Some(params) = self.try_arrow_params() {
            self.expect(Token::Arrow, "'=>'")?;
            let body = self.parse_arrow_body()?;
            return Ok(Expr::Arrow { params, body });
        }
        self.parse_or()
    }

    /// Commit to an arrow function only when the parameter list is followed
    /// by `=>`; otherwise leave the cursor untouched.
    fn try_arrow_params(&mut self) -> Option<Vec<String>> {
        match self.peek() {
            Some(Token::Ident(name)) if self.peek_at(1) == Some(&Token::Arrow) => {
                let name = name.clone();
                self.idx += 1;
                Some(vec![name])
            }
            Some(Token::LParen) => {
                let mut probe = self.idx + 1;
                let mut params = Vec::new();
                loop {
                    match self.tokens.get(probe).map(|(t, _)| t) {
                        Some(Token::RParen) => {
                            probe += 1;
                            break;
                        }
                        Some(Token::Ident(name)) => {
                            params.push(name.clone());
                            probe += 1;
                            match self.tokens.get(probe).map(|(t, _)| t) {
                                Some(Token::Comma) => probe += 1,
                                Some(Token::RParen) => {}
                                _ => return None,
                            }
                        }
                        _ => return None,
                    }
                }
                if self.tokens.get(probe).map(|(t, _)| t) == Some(&Token::Arrow) {
                    self.idx = probe;
                    Some(params)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody, ParseError> {
        if self.at(&Token::LBrace) && !self.brace_opens_object() {
            self.expect(Token::LBrace, "'{'")?;
            let mut stmts = Vec::new();
            while !self.at(&Token::RBrace) {
                if self.peek().is_none() {
                    return Err(self.unexpected("'}' to close the function body"));
                }
                stmts.push(self.parse_stmt()?);
            }
            self.expect(Token::RBrace, "'}'")?;
            Ok(ArrowBody::Block(stmts))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_expr()?)))
        }
    }

    /// After `{`, `identifier|string ':'` means an object literal rather
    /// than a block.
    fn brace_opens_object(&self) -> bool {
        matches!(
            (self.peek_at(1), self.peek_at(2)),
            (Some(Token::Ident(_)), Some(Token::Colon))
                | (Some(Token::Str(_)), Some(Token::Colon))
        )
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_cmp()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_cmp()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessEq) => BinaryOp::LessEq,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterEq) => BinaryOp::GreaterEq,
                _ => break,
            };
            self.idx += 1;
            let right = self.parse_add()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.idx += 1;
            let right = self.parse_mul()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.idx += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => Some(UnaryOp::Pos),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.idx += 1;
            // Right-associative: -!x parses inside out.
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let property = self.parse_ident("a property name")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                while !self.at(&Token::RParen) {
                    args.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RParen, "')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Number(_)) => match self.bump() {
                Some(Token::Number(n)) => Ok(Expr::Number(n)),
                _ => unreachable!(),
            },
            Some(Token::Str(_)) => match self.bump() {
                Some(Token::Str(s)) => Ok(Expr::Str(s)),
                _ => unreachable!(),
            },
            Some(Token::True) => {
                self.idx += 1;
                Ok(Expr::Bool(true))
            }
            Some(Token::False) => {
                self.idx += 1;
                Ok(Expr::Bool(false))
            }
            Some(Token::Null) => {
                self.idx += 1;
                Ok(Expr::Null)
            }
            Some(Token::Ident(_)) => Ok(Expr::Ident(self.parse_ident("an expression")?)),
            Some(Token::LBracket) => {
                self.idx += 1;
                let mut items = Vec::new();
                while !self.at(&Token::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket, "']' after array elements")?;
                Ok(Expr::Array(items))
            }
            Some(Token::LBrace) => self.parse_object(),
            Some(Token::LParen) => {
                self.idx += 1;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut props = Vec::new();
        while !self.at(&Token::RBrace) {
            let key = match self.bump() {
                Some(Token::Ident(name)) => name,
                Some(Token::Str(s)) => s,
                _ => {
                    self.idx = self.idx.saturating_sub(1);
                    return Err(self.unexpected("a property name"));
                }
            };
            self.expect(Token::Colon, "':' after property name")?;
            let value = self.parse_expr()?;
            props.push((key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "'}' after object properties")?;
        Ok(Expr::Object(props))
    }
}
