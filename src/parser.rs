//! Infix to postfix conversion
//!
//! A shunting-yard pass over the fully resolved tokens of one expression.
//! Operators with a lower priority number bind tighter; at equal priority the
//! operator already on the stack is applied first, so everything is
//! left-associative. Prefix operators (`-`, `not`, `!`) never pop on arrival,
//! which lets `2^-1` parse as `2^(-1)`, while a following operator of equal
//! priority pops them, so `-2^2` is `(-2)^2`.

use std::fmt;

use log::trace;

use crate::ast::{Builtin, Op};
use crate::error::{MmlError, MmlResult};
use crate::lexer::Token;

/// One postfix instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Number(f64),
    Variable(String),
    /// Literal dimension appended by the lexer
    Dim(usize),
    /// Apply an operator to `op.arity()` operands
    Apply(Op),
    Call { func: Builtin, arity: usize },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Number(n) => write!(f, "{}", n),
            Instruction::Variable(name) => write!(f, "{}", name),
            Instruction::Dim(d) => write!(f, "<{}>", d),
            Instruction::Apply(op) => write!(f, "{}", op),
            Instruction::Call { func, arity } => write!(f, "{}/{}", func, arity),
        }
    }
}

/// Operator stack entries
#[derive(Debug, Clone, Copy)]
enum Pending {
    Paren,
    Op(Op),
    Call(Builtin, usize),
}

/// Shunting-yard state for one expression
pub struct Parser<'t> {
    tokens: &'t [Token],
    output: Vec<Instruction>,
    stack: Vec<Pending>,
    /// Last token that was not `(`, used to spot unary minus
    last: Option<&'t Token>,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            output: Vec::with_capacity(tokens.len()),
            stack: Vec::new(),
            last: None,
        }
    }

    /// `-` is unary at the start, after an operator other than `'`, after a
    /// function name and after a separator
    fn minus_is_unary(&self) -> bool {
        match self.last {
            None => true,
            Some(Token::Operator(op)) => *op != Op::Transpose,
            Some(Token::Function { .. } | Token::Comma | Token::Semicolon) => true,
            _ => false,
        }
    }

    fn emit(&mut self, pending: Pending) {
        match pending {
            Pending::Op(op) => self.output.push(Instruction::Apply(op)),
            Pending::Call(func, arity) => self.output.push(Instruction::Call { func, arity }),
            Pending::Paren => {}
        }
    }

    /// Pop everything above the innermost `(`; the paren itself stays
    fn unwind_to_paren(&mut self) -> bool {
        while let Some(top) = self.stack.last().copied() {
            if let Pending::Paren = top {
                return true;
            }
            self.stack.pop();
            self.emit(top);
        }
        false
    }

    fn push_operator(&mut self, op: Op) {
        if !op.is_prefix() {
            while let Some(top) = self.stack.last().copied() {
                let pops = match top {
                    Pending::Paren => false,
                    Pending::Call(..) => true,
                    Pending::Op(pending) => pending.priority() <= op.priority(),
                };
                if !pops {
                    break;
                }
                self.stack.pop();
                self.emit(top);
            }
        }
        self.stack.push(Pending::Op(op));
    }

    /// Produce the postfix sequence
    pub fn parse(mut self) -> MmlResult<Vec<Instruction>> {
        let tokens = self.tokens;
        for token in tokens {
            match token {
                Token::Number(n) => self.output.push(Instruction::Number(*n)),
                Token::Ident(name) => self.output.push(Instruction::Variable(name.clone())),
                Token::Dim(d) => self.output.push(Instruction::Dim(*d)),
                Token::Function { func, arity: Some(arity) } => {
                    self.stack.push(Pending::Call(*func, *arity))
                }
                Token::Function { func, arity: None } => {
                    return Err(MmlError::UnresolvedArity {
                        name: func.name().to_string(),
                    })
                }
                Token::Comma | Token::Semicolon => {
                    if !self.unwind_to_paren() {
                        return Err(MmlError::parse_error(
                            "argument separator outside parentheses",
                        ));
                    }
                }
                Token::Operator(op) => {
                    let op = if *op == Op::Sub && self.minus_is_unary() {
                        Op::Neg
                    } else {
                        *op
                    };
                    self.push_operator(op);
                }
                Token::LParen => self.stack.push(Pending::Paren),
                Token::RParen => {
                    if !self.unwind_to_paren() {
                        return Err(MmlError::UnbalancedParentheses);
                    }
                    self.stack.pop();
                }
                other => {
                    return Err(MmlError::parse_error(format!(
                        "unexpected '{}' in expression",
                        other
                    )))
                }
            }
            if *token != Token::LParen {
                self.last = Some(token);
            }
        }

        while let Some(top) = self.stack.pop() {
            if let Pending::Paren = top {
                return Err(MmlError::UnbalancedParentheses);
            }
            self.emit(top);
        }

        trace!(
            "postfix: {}",
            self.output.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
        );
        Ok(self.output)
    }
}

/// Convert resolved tokens to postfix order
pub fn to_postfix(tokens: &[Token]) -> MmlResult<Vec<Instruction>> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn postfix(source: &str) -> String {
        let tokens = tokenize(source).unwrap();
        to_postfix(&tokens)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_precedence() {
        assert_eq!(postfix("2 + 3 * 4"), "2 3 4 * +");
        assert_eq!(postfix("(2 + 3) * 4"), "2 3 + 4 *");
        assert_eq!(postfix("a < b and c"), "a b < c and");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(postfix("8 - 2 - 1"), "8 2 - 1 -");
        assert_eq!(postfix("2 ^ 3 ^ 2"), "2 3 ^ 2 ^");
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(postfix("-2 ^ 2"), "2 ~ 2 ^");
        assert_eq!(postfix("2 ^ -1"), "2 1 ~ ^");
        assert_eq!(postfix("a - -b"), "a b ~ -");
        assert_eq!(postfix("max(-1, 2)"), "1 ~ 2 max/2");
        assert_eq!(postfix("a' - b"), "a ' b -");
    }

    #[test]
    fn test_functions_and_literals() {
        assert_eq!(postfix("sum(a) + 1"), "a sum/1 1 +");
        assert_eq!(postfix("[1, 2]"), "1 2 <1> <2> #1x2");
        assert_eq!(postfix("a[2]"), "a 2 $");
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let tokens = tokenize("(1 + 2").unwrap();
        assert_eq!(to_postfix(&tokens), Err(MmlError::UnbalancedParentheses));
        let tokens = tokenize("1 + 2)").unwrap();
        assert_eq!(to_postfix(&tokens), Err(MmlError::UnbalancedParentheses));
    }

    #[test]
    fn test_stray_separator() {
        let tokens = tokenize("1, 2").unwrap();
        assert!(matches!(to_postfix(&tokens), Err(MmlError::ParseError { .. })));
    }
}
