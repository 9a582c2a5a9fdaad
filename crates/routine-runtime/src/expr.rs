//! Sandboxed expressions for step conditions and critic rules.
//!
//! The language is deliberately small: literals, run-context references
//! (`$3.flag`, `$campaign`), the `result` identifier, member access,
//! indexing, arithmetic, comparison and boolean connectives. Nothing can
//! call out of the evaluator.
//!
//! Conditions and guards are fail-closed: any lexing, parsing or evaluation
//! error (an unbound reference included) counts as `false`.

use serde_json::{Number, Value};
use thiserror::Error;
use tracing::debug;

use crate::context::RunContext;

/// Identifier bound to the current step's result inside critic rules.
pub const RESULT_IDENT: &str = "result";

/// Expression error. Never escapes [`evaluate_condition`] or
/// [`evaluate_guard`]; both turn it into `false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unterminated string starting at {pos}")]
    UnterminatedString { pos: usize },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Unexpected token {found} at {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unbound reference {0}")]
    Unbound(String),

    #[error("Unknown identifier {0}")]
    UnknownIdentifier(String),

    #[error("No field '{0}'")]
    MissingField(String),

    #[error("Cannot index {0}")]
    BadIndex(String),

    #[error("Operator {op} does not apply to {detail}")]
    TypeMismatch { op: &'static str, detail: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic produced a non-finite number")]
    NonFinite,
}

// ── Lexer ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Str(String),
    Ref(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpAmp,
    PipePipe,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn next_token(&mut self) -> Result<Token, ExprError> {
        while matches!(self.peek_byte(0), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let start = self.pos;
        let Some(b) = self.peek_byte(0) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos: start,
            });
        };

        let kind = match b {
            b'0'..=b'9' => self.number()?,
            b'\'' | b'"' => self.string(b)?,
            b'$' => self.reference()?,
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let word = self.word();
                match word {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    other => TokenKind::Ident(other.to_string()),
                }
            }
            _ => self.operator()?,
        };
        Ok(Token { kind, pos: start })
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek_byte(0), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        &self.source[start..self.pos]
    }

    fn number(&mut self) -> Result<TokenKind, ExprError> {
        let start = self.pos;
        while matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let fraction = matches!(self.peek_byte(1), Some(b) if b.is_ascii_digit());
        if self.peek_byte(0) == Some(b'.') && fraction {
            self.pos += 1;
            while matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let mut look = 1;
            if matches!(self.peek_byte(1), Some(b'+' | b'-')) {
                look = 2;
            }
            if matches!(self.peek_byte(look), Some(b) if b.is_ascii_digit()) {
                self.pos += look;
                while matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let text = &self.source[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ExprError::InvalidNumber(text.to_string()))
    }

    fn string(&mut self, quote: u8) -> Result<TokenKind, ExprError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.source[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                c if c as u32 == quote as u32 => {
                    self.pos += offset + 1;
                    return Ok(TokenKind::Str(out));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(ExprError::UnterminatedString { pos: start })
    }

    /// `$<digits>.<field>` or `$<name>`.
    fn reference(&mut self) -> Result<TokenKind, ExprError> {
        let start = self.pos;
        self.pos += 1;
        let is_digit = matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit());
        if is_digit {
            while matches!(self.peek_byte(0), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
            let field_follows = self.peek_byte(0) == Some(b'.')
                && matches!(self.peek_byte(1), Some(b) if b.is_ascii_alphanumeric() || b == b'_');
            if !field_follows {
                return Err(ExprError::UnexpectedChar { ch: '$', pos: start });
            }
            self.pos += 1;
            self.word();
        } else if self.word().is_empty() {
            return Err(ExprError::UnexpectedChar { ch: '$', pos: start });
        }
        Ok(TokenKind::Ref(self.source[start..self.pos].to_string()))
    }

    fn operator(&mut self) -> Result<TokenKind, ExprError> {
        let start = self.pos;
        let two = (self.peek_byte(0), self.peek_byte(1), self.peek_byte(2));
        let (kind, len) = match two {
            (Some(b'='), Some(b'='), Some(b'=')) => (TokenKind::EqEqEq, 3),
            (Some(b'!'), Some(b'='), Some(b'=')) => (TokenKind::BangEqEq, 3),
            (Some(b'='), Some(b'='), _) => (TokenKind::EqEq, 2),
            (Some(b'!'), Some(b'='), _) => (TokenKind::BangEq, 2),
            (Some(b'<'), Some(b'='), _) => (TokenKind::LtEq, 2),
            (Some(b'>'), Some(b'='), _) => (TokenKind::GtEq, 2),
            (Some(b'&'), Some(b'&'), _) => (TokenKind::AmpAmp, 2),
            (Some(b'|'), Some(b'|'), _) => (TokenKind::PipePipe, 2),
            (Some(b'<'), _, _) => (TokenKind::Lt, 1),
            (Some(b'>'), _, _) => (TokenKind::Gt, 1),
            (Some(b'!'), _, _) => (TokenKind::Bang, 1),
            (Some(b'+'), _, _) => (TokenKind::Plus, 1),
            (Some(b'-'), _, _) => (TokenKind::Minus, 1),
            (Some(b'*'), _, _) => (TokenKind::Star, 1),
            (Some(b'/'), _, _) => (TokenKind::Slash, 1),
            (Some(b'%'), _, _) => (TokenKind::Percent, 1),
            (Some(b'('), _, _) => (TokenKind::LParen, 1),
            (Some(b')'), _, _) => (TokenKind::RParen, 1),
            (Some(b'['), _, _) => (TokenKind::LBracket, 1),
            (Some(b']'), _, _) => (TokenKind::RBracket, 1),
            (Some(b'.'), _, _) => (TokenKind::Dot, 1),
            _ => {
                let ch = self.source[start..].chars().next().unwrap_or('\0');
                return Err(ExprError::UnexpectedChar { ch, pos: start });
            }
        };
        self.pos += len;
        Ok(kind)
    }
}

// ── AST ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::StrictEq => "===",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Exact run-context key, e.g. `$3.flag`.
    Ref(String),
    Result,
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

// ── Parser (Pratt) ─────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

const PREFIX_BP: u8 = 14;

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn unexpected(&self) -> ExprError {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Eof,
                ..
            })
            | None => ExprError::UnexpectedEnd,
            Some(token) => ExprError::UnexpectedToken {
                found: format!("{:?}", token.kind),
                pos: token.pos,
            },
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if *self.peek() == kind {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    match self.advance().map(|t| t.kind) {
                        Some(TokenKind::Ident(name)) => {
                            lhs = Expr::Member(Box::new(lhs), name);
                        }
                        // `result.true` and friends are still plain field names.
                        Some(TokenKind::True) => lhs = Expr::Member(Box::new(lhs), "true".into()),
                        Some(TokenKind::False) => lhs = Expr::Member(Box::new(lhs), "false".into()),
                        Some(TokenKind::Null) => lhs = Expr::Member(Box::new(lhs), "null".into()),
                        _ => {
                            self.pos -= 1;
                            return Err(self.unexpected());
                        }
                    }
                    continue;
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr(0)?;
                    self.expect(TokenKind::RBracket)?;
                    lhs = Expr::Index(Box::new(lhs), Box::new(index));
                    continue;
                }
                _ => {}
            }

            let (op, bp) = match self.peek() {
                TokenKind::PipePipe => (BinaryOp::Or, 2),
                TokenKind::AmpAmp => (BinaryOp::And, 4),
                TokenKind::EqEq => (BinaryOp::Eq, 6),
                TokenKind::EqEqEq => (BinaryOp::StrictEq, 6),
                TokenKind::BangEq => (BinaryOp::Ne, 6),
                TokenKind::BangEqEq => (BinaryOp::StrictNe, 6),
                TokenKind::Lt => (BinaryOp::Lt, 8),
                TokenKind::LtEq => (BinaryOp::Le, 8),
                TokenKind::Gt => (BinaryOp::Gt, 8),
                TokenKind::GtEq => (BinaryOp::Ge, 8),
                TokenKind::Plus => (BinaryOp::Add, 10),
                TokenKind::Minus => (BinaryOp::Sub, 10),
                TokenKind::Star => (BinaryOp::Mul, 12),
                TokenKind::Slash => (BinaryOp::Div, 12),
                TokenKind::Percent => (BinaryOp::Rem, 12),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(bp + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match token.kind {
            TokenKind::Number(n) => Number::from_f64(n)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or(ExprError::NonFinite),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Ref(key) => Ok(Expr::Ref(key)),
            TokenKind::Ident(name) if name == RESULT_IDENT => Ok(Expr::Result),
            TokenKind::Ident(name) => Err(ExprError::UnknownIdentifier(name)),
            TokenKind::Minus => {
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_expr(PREFIX_BP)?)))
            }
            TokenKind::Bang => Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_expr(PREFIX_BP)?))),
            TokenKind::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Eof => Err(ExprError::UnexpectedEnd),
            other => Err(ExprError::UnexpectedToken {
                found: format!("{:?}", other),
                pos: token.pos,
            }),
        }
    }
}

/// Parse an expression.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(0)?;
    if *parser.peek() != TokenKind::Eof {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

// ── Evaluation ─────────────────────────────────────────────

/// What an expression can see.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub context: &'a RunContext,
    /// Bound only for critic rules.
    pub result: Option<&'a Value>,
}

impl<'a> Scope<'a> {
    pub fn new(context: &'a RunContext) -> Self {
        Self {
            context,
            result: None,
        }
    }

    pub fn with_result(context: &'a RunContext, result: &'a Value) -> Self {
        Self {
            context,
            result: Some(result),
        }
    }
}

impl Expr {
    /// Evaluate to a JSON value.
    pub fn eval(&self, scope: &Scope<'_>) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ref(key) => scope
                .context
                .get(key)
                .cloned()
                .ok_or_else(|| ExprError::Unbound(key.clone())),
            Expr::Result => scope
                .result
                .cloned()
                .ok_or_else(|| ExprError::UnknownIdentifier(RESULT_IDENT.to_string())),
            Expr::Member(object, name) => member(object.eval(scope)?, name),
            Expr::Index(object, index) => {
                let object = object.eval(scope)?;
                let index = index.eval(scope)?;
                index_value(object, &index)
            }
            Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!truthy(&operand.eval(scope)?))),
            Expr::Unary(UnaryOp::Neg, operand) => {
                let value = operand.eval(scope)?;
                let n = value.as_f64().ok_or_else(|| ExprError::TypeMismatch {
                    op: "-",
                    detail: type_name(&value).to_string(),
                })?;
                number(-n)
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                if !truthy(&lhs.eval(scope)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truthy(&rhs.eval(scope)?)))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                if truthy(&lhs.eval(scope)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truthy(&rhs.eval(scope)?)))
            }
            Expr::Binary(op, lhs, rhs) => binary(*op, lhs.eval(scope)?, rhs.eval(scope)?),
        }
    }

    /// Evaluate and coerce to a boolean, failing closed.
    pub fn test(&self, scope: &Scope<'_>) -> bool {
        match self.eval(scope) {
            Ok(value) => truthy(&value),
            Err(err) => {
                debug!(error = %err, "Expression evaluation failed; treating as false");
                false
            }
        }
    }
}

/// Evaluate a step condition over the run context. Any error is `false`.
pub fn evaluate_condition(source: &str, context: &RunContext) -> bool {
    evaluate(source, &Scope::new(context))
}

/// Evaluate a critic rule over the run context and the step result. Any
/// error is `false`.
pub fn evaluate_guard(source: &str, context: &RunContext, result: &Value) -> bool {
    evaluate(source, &Scope::with_result(context, result))
}

fn evaluate(source: &str, scope: &Scope<'_>) -> bool {
    match parse(source) {
        Ok(expr) => expr.test(scope),
        Err(err) => {
            debug!(expr = %source, error = %err, "Expression did not parse; treating as false");
            false
        }
    }
}

/// JSON truthiness: `null`, `false`, `0`, and `""` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number(n: f64) -> Result<Value, ExprError> {
    Number::from_f64(n).map(Value::Number).ok_or(ExprError::NonFinite)
}

fn member(object: Value, name: &str) -> Result<Value, ExprError> {
    match object {
        Value::Object(mut map) => map
            .remove(name)
            .ok_or_else(|| ExprError::MissingField(name.to_string())),
        Value::Array(items) if name == "length" => Ok(Value::from(items.len())),
        Value::String(s) if name == "length" => Ok(Value::from(s.chars().count())),
        other => Err(ExprError::MissingField(format!("{}.{}", type_name(&other), name))),
    }
}

fn index_value(object: Value, index: &Value) -> Result<Value, ExprError> {
    match (object, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let i = n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && (*f as usize) < items.len())
                .ok_or_else(|| ExprError::BadIndex(format!("array with {}", n)))?;
            Ok(items.swap_remove(i as usize))
        }
        (Value::Object(mut map), Value::String(key)) => map
            .remove(key)
            .ok_or_else(|| ExprError::MissingField(key.clone())),
        (other, index) => Err(ExprError::BadIndex(format!(
            "{} with {}",
            type_name(&other),
            type_name(index)
        ))),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExprError {
    ExprError::TypeMismatch {
        op: op.symbol(),
        detail: format!("{} and {}", type_name(lhs), type_name(rhs)),
    }
}

fn strict_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

/// `==`: strict equality plus number/string coercion.
fn loose_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        (a, b) => strict_equal(a, b),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_equal(&lhs, &rhs))),
        BinaryOp::StrictEq => Ok(Value::Bool(strict_equal(&lhs, &rhs))),
        BinaryOp::StrictNe => Ok(Value::Bool(!strict_equal(&lhs, &rhs))),
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => {
                number(a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN))
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", display(&lhs), display(&rhs))))
            }
            _ => Err(mismatch(op, &lhs, &rhs)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Err(mismatch(op, &lhs, &rhs));
            };
            match op {
                BinaryOp::Sub => number(a - b),
                BinaryOp::Mul => number(a * b),
                BinaryOp::Div if b == 0.0 => Err(ExprError::DivisionByZero),
                BinaryOp::Div => number(a / b),
                BinaryOp::Rem if b == 0.0 => Err(ExprError::DivisionByZero),
                _ => number(a % b),
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .zip(b.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or_else(|| mismatch(op, &lhs, &rhs))?;
            let holds = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(holds))
        }
        // Short-circuiting connectives are handled in `Expr::eval`.
        BinaryOp::And => Ok(Value::Bool(truthy(&lhs) && truthy(&rhs))),
        BinaryOp::Or => Ok(Value::Bool(truthy(&lhs) || truthy(&rhs))),
    }
}
