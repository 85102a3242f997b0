//! Arithmetic formulas over the two free variables `x` and `y`.
//!
//! A formula is tokenized and compiled by recursive descent into a postfix
//! [`Program`], which is then replayed once per sample. Precedence, lowest
//! to highest: `+ -`, `* /`, `^` (right-associative), prefix sign, primary
//! (parenthesized group, number, variable, function application).

use std::fmt;

use thiserror::Error;

/// Why a formula could not be compiled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("syntax error at column {pos}: {detail}")]
    Syntax { pos: usize, detail: String },
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("no expression")]
    NoExpression,
    #[error("invalid variable `{0}` (only `x` and `y` are allowed)")]
    InvalidVariable(String),
}

/// Named unary transforms recognized in formulas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Rad,
    Deg,
    Sqrt,
    Exp,
    Ln,
    Log10,
}

impl Function {
    /// Case-sensitive lookup of a function name.
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "arcsin" => Self::Arcsin,
            "arccos" => Self::Arccos,
            "arctan" => Self::Arctan,
            "rad" => Self::Rad,
            "deg" => Self::Deg,
            "sqrt" => Self::Sqrt,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "log10" => Self::Log10,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Arcsin => "arcsin",
            Self::Arccos => "arccos",
            Self::Arctan => "arctan",
            Self::Rad => "rad",
            Self::Deg => "deg",
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
        }
    }

    pub fn apply(self, v: f64) -> f64 {
        match self {
            Self::Sin => v.sin(),
            Self::Cos => v.cos(),
            Self::Tan => v.tan(),
            Self::Arcsin => v.asin(),
            Self::Arccos => v.acos(),
            Self::Arctan => v.atan(),
            Self::Rad => v.to_radians(),
            Self::Deg => v.to_degrees(),
            Self::Sqrt => v.sqrt(),
            Self::Exp => v.exp(),
            Self::Ln => v.ln(),
            Self::Log10 => v.log10(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum TokenKind {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Number(f64),
    X,
    Y,
    Function(Function),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Caret => write!(f, "^"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Number(v) => write!(f, "{v}"),
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Function(func) => write!(f, "{}", func.name()),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn delimiter(c: char) -> Option<TokenKind> {
    let kind = match c {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '^' => TokenKind::Caret,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        _ => return None,
    };
    Some(kind)
}

fn ends_run(c: char) -> bool {
    c.is_whitespace() || delimiter(c).is_some()
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if let Some(kind) = delimiter(c) {
            chars.next();
            tokens.push(Token { kind, pos });
            continue;
        }

        if !(c.is_alphabetic() || c.is_ascii_digit()) {
            return Err(EvalError::Syntax {
                pos,
                detail: format!("unexpected character `{c}`"),
            });
        }

        // Numbers and identifiers both run until the next delimiter or space.
        let mut end = pos;
        while let Some(&(i, c)) = chars.peek() {
            if ends_run(c) {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        let text = &src[pos..end];

        let kind = if c.is_ascii_digit() {
            let value = text.parse::<f64>().map_err(|_| EvalError::Syntax {
                pos,
                detail: format!("malformed number `{text}`"),
            })?;
            TokenKind::Number(value)
        } else if let Some(func) = Function::from_name(text) {
            TokenKind::Function(func)
        } else {
            match text {
                "x" => TokenKind::X,
                "y" => TokenKind::Y,
                _ => return Err(EvalError::InvalidVariable(text.to_owned())),
            }
        };
        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Op {
    Const(f64),
    X,
    Y,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Neg,
    Call(Function),
}

/// A compiled formula, ready to be evaluated at many `(x, y)` points.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    ops: Vec<Op>,
    max_depth: usize,
}

impl Program {
    pub fn compile(src: &str) -> Result<Self, EvalError> {
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err(EvalError::NoExpression);
        }

        let mut parser = Parser {
            tokens: &tokens,
            next: 0,
            ops: Vec::with_capacity(tokens.len()),
        };
        parser.additive()?;

        if let Some(t) = parser.peek() {
            return Err(match t.kind {
                TokenKind::RParen => EvalError::UnbalancedParentheses,
                kind => EvalError::Syntax {
                    pos: t.pos,
                    detail: format!("unexpected `{kind}` after complete expression"),
                },
            });
        }

        let max_depth = stack_depth(&parser.ops);
        Ok(Self {
            ops: parser.ops,
            max_depth,
        })
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let mut stack = Vec::with_capacity(self.max_depth);
        for op in &self.ops {
            let v = match *op {
                Op::Const(v) => v,
                Op::X => x,
                Op::Y => y,
                Op::Neg => -pop(&mut stack),
                Op::Call(f) => f.apply(pop(&mut stack)),
                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => {
                    let rhs = pop(&mut stack);
                    let lhs = pop(&mut stack);
                    match op {
                        Op::Add => lhs + rhs,
                        Op::Sub => lhs - rhs,
                        Op::Mul => lhs * rhs,
                        Op::Div => lhs / rhs,
                        _ => power(lhs, rhs),
                    }
                }
            };
            stack.push(v);
        }
        pop(&mut stack)
    }
}

// Operand counts are checked at compile time.
fn pop(stack: &mut Vec<f64>) -> f64 {
    stack.pop().unwrap_or_default()
}

fn stack_depth(ops: &[Op]) -> usize {
    let mut depth = 0usize;
    let mut max = 0;
    for op in ops {
        match op {
            Op::Const(_) | Op::X | Op::Y => depth += 1,
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => depth -= 1,
            Op::Neg | Op::Call(_) => (),
        }
        max = max.max(depth);
    }
    max
}

/// Iterated-multiplication power: the exponent is truncated toward zero, a
/// zero exponent yields 1, and exponents that truncate below 2 leave the base
/// unchanged (so `x^-1 == x` and `x^0.5 == x`).
fn power(base: f64, exponent: f64) -> f64 {
    if exponent == 0.0 {
        return 1.0;
    }
    let n = exponent.trunc();
    if !(n >= 2.0) {
        return base;
    }
    base.powi(n.min(i32::MAX as f64) as i32)
}

struct Parser<'a> {
    tokens: &'a [Token],
    next: usize,
    ops: Vec<Op>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.next).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.next += 1;
        }
        t
    }

    fn additive(&mut self) -> Result<(), EvalError> {
        self.multiplicative()?;
        while let Some(t) = self.peek() {
            let op = match t.kind {
                TokenKind::Plus => Op::Add,
                TokenKind::Minus => Op::Sub,
                _ => break,
            };
            self.bump();
            self.multiplicative()?;
            self.ops.push(op);
        }
        Ok(())
    }

    fn multiplicative(&mut self) -> Result<(), EvalError> {
        self.power()?;
        while let Some(t) = self.peek() {
            let op = match t.kind {
                TokenKind::Star => Op::Mul,
                TokenKind::Slash => Op::Div,
                _ => break,
            };
            self.bump();
            self.power()?;
            self.ops.push(op);
        }
        Ok(())
    }

    fn power(&mut self) -> Result<(), EvalError> {
        self.unary()?;
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Caret) {
            self.bump();
            self.power()?;
            self.ops.push(Op::Pow);
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), EvalError> {
        let negate = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Minus) => {
                self.bump();
                true
            }
            Some(TokenKind::Plus) => {
                self.bump();
                false
            }
            _ => false,
        };
        self.primary()?;
        if negate {
            self.ops.push(Op::Neg);
        }
        Ok(())
    }

    fn primary(&mut self) -> Result<(), EvalError> {
        let end = self.tokens.last().map_or(0, |t| t.pos + 1);
        let Some(t) = self.bump() else {
            return Err(EvalError::Syntax {
                pos: end,
                detail: "unexpected end of expression".to_owned(),
            });
        };

        match t.kind {
            TokenKind::LParen => self.group_tail(),
            TokenKind::Number(v) => {
                self.ops.push(Op::Const(v));
                Ok(())
            }
            TokenKind::X => {
                self.ops.push(Op::X);
                Ok(())
            }
            TokenKind::Y => {
                self.ops.push(Op::Y);
                Ok(())
            }
            TokenKind::Function(f) => {
                match self.bump() {
                    Some(open) if open.kind == TokenKind::LParen => self.group_tail()?,
                    other => {
                        return Err(EvalError::Syntax {
                            pos: other.map_or(end, |o| o.pos),
                            detail: format!("expected `(` after `{}`", f.name()),
                        });
                    }
                }
                self.ops.push(Op::Call(f));
                Ok(())
            }
            kind => Err(EvalError::Syntax {
                pos: t.pos,
                detail: format!("unexpected `{kind}`"),
            }),
        }
    }

    /// Parses the inside of a group whose `(` was already consumed.
    fn group_tail(&mut self) -> Result<(), EvalError> {
        self.additive()?;
        match self.bump() {
            Some(t) if t.kind == TokenKind::RParen => Ok(()),
            _ => Err(EvalError::UnbalancedParentheses),
        }
    }
}

/// Evaluates `src` at `(x, y)`, returning the error instead of a fallback.
pub fn try_evaluate(src: &str, x: f64, y: f64) -> Result<f64, EvalError> {
    Program::compile(src).map(|p| p.eval(x, y))
}

/// Evaluates `src` at `(x, y)`. A malformed formula is reported through the
/// log and evaluates to 0.0.
pub fn evaluate(src: &str, x: f64, y: f64) -> f64 {
    match try_evaluate(src, x, y) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("formula {src:?}: {e}");
            0.0
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4", 0.0, 0.0), 14.0);
        assert_eq!(evaluate("(2+3)*4", 0.0, 0.0), 20.0);
        assert_eq!(evaluate("10 - 4 - 3", 0.0, 0.0), 3.0);
        assert_eq!(evaluate("8 / 2 / 2", 0.0, 0.0), 2.0);
        assert_eq!(evaluate("  1 +\t2 ", 0.0, 0.0), 3.0);
        assert_eq!(evaluate("2.5*4", 0.0, 0.0), 10.0);
    }

    #[test]
    fn test_power() {
        assert_eq!(evaluate("2^3", 0.0, 0.0), 8.0);
        assert_eq!(evaluate("2^0", 0.0, 0.0), 1.0);
        assert_eq!(evaluate("0^0", 0.0, 0.0), 1.0);
        assert_eq!(evaluate("5^1", 0.0, 0.0), 5.0);

        // Right-associative: 2^(3^2)
        assert_eq!(evaluate("2^3^2", 0.0, 0.0), 512.0);

        // Exponent truncation
        assert_eq!(evaluate("x^2.9", 3.0, 0.0), 9.0);
        assert_eq!(evaluate("3^0.5", 0.0, 0.0), 3.0);
        assert_eq!(evaluate("2^-1", 0.0, 0.0), 2.0);
        assert_eq!(evaluate("2^-3", 0.0, 0.0), 2.0);
    }

    #[test]
    fn test_unary() {
        assert_eq!(evaluate("-3", 0.0, 0.0), -3.0);
        assert_eq!(evaluate("+3", 0.0, 0.0), 3.0);
        assert_eq!(evaluate("2*-3", 0.0, 0.0), -6.0);
        assert_eq!(evaluate("-(1+2)", 0.0, 0.0), -3.0);

        // Sign binds tighter than `^`
        assert_eq!(evaluate("-2^2", 0.0, 0.0), 4.0);
        assert_eq!(evaluate("-x", 4.0, 0.0), -4.0);
    }

    #[test]
    fn test_variables() {
        assert_eq!(evaluate("x*x", 3.0, 0.0), 9.0);
        assert_eq!(evaluate("x+y", 2.0, 5.0), 7.0);
        assert_eq!(evaluate("x * y", -5.0, -5.0), 25.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(evaluate("sqrt(x)", 16.0, 0.0), 4.0);
        assert!(close(evaluate("sin(rad(90))", 0.0, 0.0), 1.0));
        assert!(close(evaluate("deg(arctan(1))", 0.0, 0.0), 45.0));
        assert!(close(evaluate("cos(0)", 0.0, 0.0), 1.0));
        assert!(close(evaluate("ln(exp(2))", 0.0, 0.0), 2.0));
        assert!(close(evaluate("log10(1000)", 0.0, 0.0), 3.0));
        assert!(close(evaluate("arcsin(1) * 2", 0.0, 0.0), std::f64::consts::PI));
        assert!(close(evaluate("arccos(1)", 0.0, 0.0), 0.0));
        assert!(close(evaluate("tan(0)", 0.0, 0.0), 0.0));
        assert!(close(evaluate("sin(x)^2 + cos(x)^2", 0.7, 0.0), 1.0));
        assert_eq!(evaluate("-sqrt(4)", 0.0, 0.0), -2.0);
    }

    #[test]
    fn test_ieee_division() {
        assert_eq!(evaluate("1/0", 0.0, 0.0), f64::INFINITY);
        assert!(evaluate("0/0", 0.0, 0.0).is_nan());
        assert!(evaluate("x/y", 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_invalid_variable() {
        assert_eq!(
            try_evaluate("q*2", 1.0, 1.0),
            Err(EvalError::InvalidVariable("q".to_owned()))
        );
        assert_eq!(
            try_evaluate("x2 + 1", 1.0, 1.0),
            Err(EvalError::InvalidVariable("x2".to_owned()))
        );
        // Function names are case-sensitive
        assert_eq!(
            try_evaluate("Sin(x)", 1.0, 1.0),
            Err(EvalError::InvalidVariable("Sin".to_owned()))
        );
        assert_eq!(evaluate("q*2", 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_no_expression() {
        assert_eq!(try_evaluate("", 0.0, 0.0), Err(EvalError::NoExpression));
        assert_eq!(try_evaluate("   ", 0.0, 0.0), Err(EvalError::NoExpression));
        assert_eq!(evaluate("", 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(
            try_evaluate("(1+2", 0.0, 0.0),
            Err(EvalError::UnbalancedParentheses)
        );
        assert_eq!(
            try_evaluate("1+2)", 0.0, 0.0),
            Err(EvalError::UnbalancedParentheses)
        );
        assert_eq!(
            try_evaluate("sqrt(4", 0.0, 0.0),
            Err(EvalError::UnbalancedParentheses)
        );
    }

    #[test]
    fn test_syntax_errors() {
        for src in ["2+", "*3", "2 3", "sin x", "sin", "()", "--2", "1.2.3", "3 # 4", "x ^"] {
            assert!(
                matches!(try_evaluate(src, 1.0, 1.0), Err(EvalError::Syntax { .. })),
                "{src:?} should be a syntax error"
            );
            assert_eq!(evaluate(src, 1.0, 1.0), 0.0);
        }
    }

    #[test]
    fn test_syntax_error_position() {
        let Err(EvalError::Syntax { pos, .. }) = try_evaluate("1 + 2 3", 0.0, 0.0) else {
            panic!("expected a syntax error");
        };
        assert_eq!(pos, 6);
    }

    #[test]
    fn test_program_reuse() {
        let p = Program::compile("x*x - y").unwrap();
        assert_eq!(p.eval(2.0, 1.0), 3.0);
        assert_eq!(p.eval(-3.0, 4.0), 5.0);
        assert_eq!(p, Program::compile("x*x - y").unwrap());
    }
}
