//! Lexer for MML statements using logos
//!
//! Tokenizing a line runs four passes:
//!
//! 1. [`scan`]: raw tokens from the source text
//! 2. [`disambiguate`]: every `[` becomes either a matrix literal marker or
//!    the indexing operator `$`, and all brackets turn into parentheses
//! 3. [`resolve_literals`]: literal markers learn their shape and get the
//!    trailing dimension operands appended
//! 4. [`resolve_arity`]: every function call learns its argument count
//!
//! [`tokenize`] runs all of them; the statement translator calls [`scan`]
//! first to look at keywords and `=` and then [`prepare`] on each expression.

use std::fmt;

use log::trace;
use logos::Logos;

use crate::ast::{Builtin, Op};
use crate::error::{MmlError, MmlResult};

/// Statement keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    While,
    For,
    To,
    Downto,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::ElseIf => "elseif",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::To => "to",
            Keyword::Downto => "downto",
        }
    }
}

/// Surface lexemes as logos sees them
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*)")]
enum Lexeme {
    #[regex(r"[0-9]+", number)]
    Number(f64),

    #[regex(r"[a-zA-Z][a-zA-Z0-9]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("if", |_| Keyword::If)]
    #[token("elseif", |_| Keyword::ElseIf)]
    #[token("else", |_| Keyword::Else)]
    #[token("while", |_| Keyword::While)]
    #[token("for", |_| Keyword::For)]
    #[token("to", |_| Keyword::To)]
    #[token("downto", |_| Keyword::Downto)]
    Keyword(Keyword),

    #[token("+", |_| Op::Add)]
    #[token("-", |_| Op::Sub)]
    #[token("~", |_| Op::Neg)]
    #[token("*", |_| Op::Mul)]
    #[token(".*", |_| Op::ElemMul)]
    #[token("./", |_| Op::ElemDiv)]
    #[token(".^", |_| Op::ElemPow)]
    #[token(".%", |_| Op::ElemMod)]
    #[token("/", |_| Op::Div)]
    #[token("^", |_| Op::Pow)]
    #[token("%", |_| Op::Mod)]
    #[token("'", |_| Op::Transpose)]
    #[token("|", |_| Op::Beside)]
    #[token("_", |_| Op::Below)]
    #[token("*|", |_| Op::RepeatBeside)]
    #[token("*_", |_| Op::RepeatBelow)]
    #[token(":", |_| Op::Range)]
    #[token("==", |_| Op::Eq)]
    #[token("!=", |_| Op::Ne)]
    #[token("<", |_| Op::Lt)]
    #[token(">", |_| Op::Gt)]
    #[token("<=", |_| Op::Le)]
    #[token(">=", |_| Op::Ge)]
    #[token("and", |_| Op::And)]
    #[token("or", |_| Op::Or)]
    #[token("not", |_| Op::Not)]
    #[token("!", |_| Op::Bang)]
    Operator(Op),

    #[token("=")]
    Assign,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,
}

fn digits_from(bytes: &[u8], start: usize) -> usize {
    bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count()
}

/// Extend an integer part with an optional `.digits` fraction and exponent.
/// A dot is only part of the number when a digit follows it, so `1.*2` stays
/// `1 .* 2`.
fn number(lex: &mut logos::Lexer<Lexeme>) -> Option<f64> {
    let rest = lex.remainder().as_bytes();
    let mut len = 0;
    if rest.first() == Some(&b'.') {
        let frac = digits_from(rest, 1);
        if frac > 0 {
            len = 1 + frac;
        }
    }
    if matches!(rest.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(rest.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let digits = digits_from(rest, exp);
        if digits > 0 {
            len = exp + digits;
        }
    }
    lex.bump(len);
    lex.slice().parse().ok()
}

/// Token classes shared by all lexer passes
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    /// Built-in function; the arity is filled in by [`resolve_arity`]
    Function { func: Builtin, arity: Option<usize> },
    Operator(Op),
    Keyword(Keyword),
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    /// `[` opening a matrix literal whose shape is not known yet
    LiteralStart,
    /// Dimension operand appended to a resolved matrix literal
    Dim(usize),
}

impl From<Lexeme> for Token {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Number(n) => Token::Number(n),
            Lexeme::Ident(name) => match Builtin::from_name(&name) {
                Some(func) => Token::Function { func, arity: None },
                None => Token::Ident(name),
            },
            Lexeme::Keyword(k) => Token::Keyword(k),
            Lexeme::Operator(op) => Token::Operator(op),
            Lexeme::Assign => Token::Assign,
            Lexeme::LParen => Token::LParen,
            Lexeme::RParen => Token::RParen,
            Lexeme::LBracket => Token::LBracket,
            Lexeme::RBracket => Token::RBracket,
            Lexeme::LBrace => Token::LBrace,
            Lexeme::RBrace => Token::RBrace,
            Lexeme::Comma => Token::Comma,
            Lexeme::Semicolon => Token::Semicolon,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Function { func, arity: Some(n) } => write!(f, "{}/{}", func, n),
            Token::Function { func, arity: None } => write!(f, "{}", func),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Keyword(k) => write!(f, "{}", k.as_str()),
            Token::Assign => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::LiteralStart => write!(f, "#["),
            Token::Dim(d) => write!(f, "<{}>", d),
        }
    }
}

/// Lexer wrapper yielding [`Token`]s and reporting the offending text on
/// failure
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Lexeme>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Lexeme::lexer(source),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = MmlResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        let lexeme = self.inner.next()?;
        Some(lexeme.map(Token::from).map_err(|()| {
            MmlError::parse_error(format!(
                "unexpected '{}' at column {}",
                self.inner.slice(),
                self.inner.span().start + 1
            ))
        }))
    }
}

/// Pass 1: raw tokens
pub fn scan(source: &str) -> MmlResult<Vec<Token>> {
    Lexer::new(source).collect()
}

/// A `[` opens a matrix literal when nothing operand-like precedes it
fn opens_literal(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(Token::Operator(op)) => *op != Op::Transpose,
        Some(
            Token::LParen
            | Token::Comma
            | Token::Semicolon
            | Token::Assign
            | Token::Keyword(_)
            | Token::LiteralStart,
        ) => true,
        _ => false,
    }
}

/// Pass 2: split `[` into literal markers and indexing, then replace every
/// bracket with a parenthesis
pub fn disambiguate(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + 4);
    for token in tokens {
        match token {
            Token::LBracket => {
                if opens_literal(out.last()) {
                    out.push(Token::LiteralStart);
                } else {
                    out.push(Token::Operator(Op::Index));
                }
                out.push(Token::LParen);
            }
            Token::RBracket => out.push(Token::RParen),
            other => out.push(other),
        }
    }
    out
}

/// Index of the parenthesis closing the one at `open`
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Pass 3: give every matrix literal its shape.
///
/// Columns are the commas of the first row plus one; rows are the
/// semicolons plus one. Every row must have as many elements as the first
/// and the literal must not be empty. The marker becomes `#` with arity
/// `rows*cols + 2`, `, rows, cols` is appended before the closing parenthesis, and every
/// semicolon becomes a comma.
pub fn resolve_literals(tokens: Vec<Token>) -> MmlResult<Vec<Token>> {
    let mut shapes = Vec::new();
    let mut closing = Vec::new();

    for (start, token) in tokens.iter().enumerate() {
        if *token != Token::LiteralStart {
            continue;
        }
        let open = start + 1;
        if tokens.get(open) != Some(&Token::LParen) {
            return Err(MmlError::malformed_literal("expected '[' after literal start"));
        }
        let close = matching_paren(&tokens, open).ok_or(MmlError::UnbalancedParentheses)?;
        if close == open + 1 {
            return Err(MmlError::malformed_literal("empty matrix literal"));
        }

        let ragged = |row: usize, cols: usize, len: usize| {
            MmlError::malformed_literal(format!(
                "row {} has {} elements, expected {}",
                row, len, cols
            ))
        };
        let (mut rows, mut row_len) = (1usize, 1usize);
        let mut first_row: Option<usize> = None;
        let mut depth = 0usize;
        for token in &tokens[open..close] {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Comma if depth == 1 => row_len += 1,
                Token::Semicolon if depth == 1 => {
                    match first_row {
                        None => first_row = Some(row_len),
                        Some(cols) if cols != row_len => {
                            return Err(ragged(rows, cols, row_len));
                        }
                        Some(_) => {}
                    }
                    rows += 1;
                    row_len = 1;
                }
                _ => {}
            }
        }
        let cols = first_row.unwrap_or(row_len);
        if row_len != cols {
            return Err(ragged(rows, cols, row_len));
        }
        shapes.push((start, rows, cols));
        closing.push((close, rows, cols));
    }

    if shapes.is_empty() {
        return Ok(tokens
            .into_iter()
            .map(|t| if t == Token::Semicolon { Token::Comma } else { t })
            .collect());
    }

    let mut out = Vec::with_capacity(tokens.len() + 4 * shapes.len());
    for (i, token) in tokens.into_iter().enumerate() {
        match token {
            Token::LiteralStart => {
                let (rows, cols) = shapes
                    .iter()
                    .find(|(at, _, _)| *at == i)
                    .map(|&(_, r, c)| (r, c))
                    .ok_or_else(|| MmlError::malformed_literal("unresolved matrix literal"))?;
                out.push(Token::Operator(Op::Matrix { rows, cols }));
            }
            Token::RParen => {
                if let Some(&(_, rows, cols)) = closing.iter().find(|(at, _, _)| *at == i) {
                    out.extend([Token::Comma, Token::Dim(rows), Token::Comma, Token::Dim(cols)]);
                }
                out.push(Token::RParen);
            }
            Token::Semicolon => out.push(Token::Comma),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Pass 4: count the arguments of every function call
pub fn resolve_arity(mut tokens: Vec<Token>) -> MmlResult<Vec<Token>> {
    for i in 0..tokens.len() {
        let func = match tokens[i] {
            Token::Function { func, arity: None } => func,
            _ => continue,
        };
        let unresolved = || MmlError::UnresolvedArity {
            name: func.name().to_string(),
        };
        if tokens.get(i + 1) != Some(&Token::LParen) {
            return Err(unresolved());
        }
        let close = matching_paren(&tokens, i + 1).ok_or_else(unresolved)?;
        let arity = if close == i + 2 {
            0
        } else {
            let mut depth = 0usize;
            let mut commas = 0;
            for token in &tokens[i + 1..close] {
                match token {
                    Token::LParen => depth += 1,
                    Token::RParen => depth -= 1,
                    Token::Comma if depth == 1 => commas += 1,
                    _ => {}
                }
            }
            commas + 1
        };
        tokens[i] = Token::Function {
            func,
            arity: Some(arity),
        };
    }
    Ok(tokens)
}

/// Passes 2 to 4 over already scanned tokens
pub fn prepare(tokens: Vec<Token>) -> MmlResult<Vec<Token>> {
    let tokens = resolve_literals(disambiguate(tokens))?;
    let tokens = resolve_arity(tokens)?;
    trace!(
        "tokens: {}",
        tokens.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    );
    Ok(tokens)
}

/// All four passes over one statement's text
pub fn tokenize(source: &str) -> MmlResult<Vec<Token>> {
    prepare(scan(source)?)
}
