//! Statement translation
//!
//! Walks the segments produced by [`crate::block::segment`] and turns each
//! one into a [`Stmt`]. Control flow is recognised by its leading keyword:
//!
//! - `if (c) { ... } elseif (d) { ... } else { ... }`
//! - `while (c) { ... }`
//! - `for v = a to b { ... }` and `for v = a downto b { ... }`
//!
//! A clause body is either a braced block or, when something follows the
//! parenthesised condition on the same line, that single statement. Any
//! other segment is an assignment (`x = e`, `x[i] = e`, `x[i][j] = e`) or an
//! expression evaluated for its side effects.

use std::collections::BTreeSet;

use log::debug;

use crate::ast::{Branch, Expr, Program, Step, Stmt, StmtKind};
use crate::block::{segment, Segment};
use crate::codegen::build;
use crate::error::{CompileResult, MmlError};
use crate::lexer::{prepare, scan, Keyword, Token};
use crate::parser::to_postfix;

/// Position of the first `=` outside parentheses and brackets
fn top_level_assign(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen | Token::LBracket => depth += 1,
            Token::RParen | Token::RBracket => depth -= 1,
            Token::Assign if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Position of the first top-level `to`/`downto`
fn range_keyword(tokens: &[Token]) -> Option<(usize, Step)> {
    let mut depth = 0i32;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen | Token::LBracket => depth += 1,
            Token::RParen | Token::RBracket => depth -= 1,
            Token::Keyword(Keyword::To) if depth == 0 => return Some((i, Step::Up)),
            Token::Keyword(Keyword::Downto) if depth == 0 => return Some((i, Step::Down)),
            _ => {}
        }
    }
    None
}

/// Index of the `)` closing the `(` at position 0
fn closing_paren(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The bracketed coordinate groups of an assignment target, `[i][j]`
fn coordinate_groups(tokens: &[Token]) -> Option<Vec<&[Token]>> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] != Token::LBracket {
            return None;
        }
        let mut depth = 0usize;
        let mut close = None;
        for (j, token) in tokens.iter().enumerate().skip(i) {
            match token {
                Token::LBracket => depth += 1,
                Token::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(j);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close?;
        groups.push(&tokens[i + 1..close]);
        i = close + 1;
    }
    Some(groups)
}

/// Translates a whole program
pub struct Translator {
    segments: Vec<Segment>,
    pos: usize,
    variables: BTreeSet<String>,
}

impl Translator {
    pub fn new(source: &str) -> CompileResult<Self> {
        Ok(Self {
            segments: segment(source)?,
            pos: 0,
            variables: BTreeSet::new(),
        })
    }

    pub fn translate(mut self) -> CompileResult<Program> {
        let statements = self.statements(false)?;
        debug!(
            "compiled {} top-level statements, {} variables",
            statements.len(),
            self.variables.len()
        );
        Ok(Program::new(statements, self.variables))
    }

    fn peek(&self) -> Option<&Segment> {
        self.segments.get(self.pos)
    }

    fn advance(&mut self) -> Option<Segment> {
        let segment = self.segments.get(self.pos).cloned();
        if segment.is_some() {
            self.pos += 1;
        }
        segment
    }

    fn last_line(&self) -> usize {
        self.segments.last().map_or(1, Segment::line)
    }

    /// Statements up to the end of input, or up to the closing brace when
    /// `nested`
    fn statements(&mut self, nested: bool) -> CompileResult<Vec<Stmt>> {
        let mut out = Vec::new();
        loop {
            match self.advance() {
                None if nested => {
                    return Err(MmlError::UnbalancedBraces.at_line(self.last_line()))
                }
                None => return Ok(out),
                Some(Segment::Close { line }) => {
                    if nested {
                        return Ok(out);
                    }
                    return Err(MmlError::UnbalancedBraces.at_line(line));
                }
                Some(Segment::Open { line }) => {
                    let body = self.statements(true)?;
                    out.push(Stmt::new(line, StmtKind::Block(body)));
                }
                Some(Segment::Text { line, text }) => out.push(self.statement(line, &text)?),
            }
        }
    }

    fn statement(&mut self, line: usize, text: &str) -> CompileResult<Stmt> {
        let tokens = scan(text).map_err(|e| e.at_line(line))?;
        let stmt = match tokens.first() {
            Some(Token::Keyword(Keyword::If)) => self.conditional(line, &tokens[1..])?,
            Some(Token::Keyword(Keyword::While)) => {
                let (cond, body) = self.clause(line, &tokens[1..])?;
                Stmt::new(line, StmtKind::While { cond, body })
            }
            Some(Token::Keyword(Keyword::For)) => self.for_loop(line, &tokens[1..])?,
            Some(Token::Keyword(k @ (Keyword::ElseIf | Keyword::Else))) => {
                return Err(MmlError::parse_error(format!(
                    "'{}' without a matching 'if'",
                    k.as_str()
                ))
                .at_line(line))
            }
            _ => self.simple(line, &tokens)?,
        };
        debug!("line {}: {}", line, stmt.describe());
        Ok(stmt)
    }

    /// A braced body that must follow a clause header
    fn body(&mut self, line: usize) -> CompileResult<Vec<Stmt>> {
        match self.peek() {
            Some(Segment::Open { .. }) => {
                self.pos += 1;
                self.statements(true)
            }
            _ => Err(MmlError::parse_error("expected '{' to open the body").at_line(line)),
        }
    }

    /// Condition plus body of an `if`, `elseif` or `while`
    fn clause(&mut self, line: usize, tokens: &[Token]) -> CompileResult<(Expr, Vec<Stmt>)> {
        if tokens.is_empty() {
            return Err(MmlError::parse_error("missing condition").at_line(line));
        }
        if tokens[0] == Token::LParen {
            if let Some(close) = closing_paren(tokens) {
                let rest = &tokens[close + 1..];
                let braced = matches!(self.peek(), Some(Segment::Open { .. }));
                if !rest.is_empty() && (top_level_assign(rest).is_some() || !braced) {
                    let cond = self.expression(line, &tokens[..=close])?;
                    let body = vec![self.simple(line, rest)?];
                    return Ok((cond, body));
                }
            }
        }
        let cond = self.expression(line, tokens)?;
        let body = self.body(line)?;
        Ok((cond, body))
    }

    fn conditional(&mut self, line: usize, tokens: &[Token]) -> CompileResult<Stmt> {
        let (cond, body) = self.clause(line, tokens)?;
        let mut branches = vec![Branch { cond, body }];
        let mut otherwise = None;

        while let Some(Segment::Text { line: at, text }) = self.peek().cloned() {
            let tokens = scan(&text).map_err(|e| e.at_line(at))?;
            match tokens.first() {
                Some(Token::Keyword(Keyword::ElseIf)) => {
                    self.pos += 1;
                    let (cond, body) = self.clause(at, &tokens[1..])?;
                    branches.push(Branch { cond, body });
                }
                Some(Token::Keyword(Keyword::Else)) => {
                    self.pos += 1;
                    let rest = &tokens[1..];
                    if rest.first() == Some(&Token::Keyword(Keyword::If)) {
                        let (cond, body) = self.clause(at, &rest[1..])?;
                        branches.push(Branch { cond, body });
                        continue;
                    }
                    otherwise = Some(if rest.is_empty() {
                        self.body(at)?
                    } else {
                        vec![self.simple(at, rest)?]
                    });
                    break;
                }
                _ => break,
            }
        }

        Ok(Stmt::new(line, StmtKind::If { branches, otherwise }))
    }

    /// `for v = start to|downto limit { ... }`
    fn for_loop(&mut self, line: usize, tokens: &[Token]) -> CompileResult<Stmt> {
        let malformed = |what: &str| {
            MmlError::parse_error(format!("malformed for statement: {}", what)).at_line(line)
        };
        let var = match tokens.first() {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(malformed("expected a loop variable")),
        };
        if tokens.get(1) != Some(&Token::Assign) {
            return Err(malformed("expected '=' after the loop variable"));
        }
        let rest = &tokens[2..];
        let (at, step) = range_keyword(rest).ok_or_else(|| malformed("expected 'to' or 'downto'"))?;
        let (start, limit) = (&rest[..at], &rest[at + 1..]);
        if start.is_empty() || limit.is_empty() {
            return Err(malformed("missing loop bound"));
        }

        let start = self.expression(line, start)?;
        let limit = self.expression(line, limit)?;
        self.variables.insert(var.clone());
        let body = self.body(line)?;
        Ok(Stmt::new(
            line,
            StmtKind::For {
                var,
                start,
                limit,
                step,
                body,
            },
        ))
    }

    /// Assignment or bare expression
    fn simple(&mut self, line: usize, tokens: &[Token]) -> CompileResult<Stmt> {
        let eq = match top_level_assign(tokens) {
            Some(eq) => eq,
            None => {
                let expr = self.expression(line, tokens)?;
                return Ok(Stmt::new(line, StmtKind::Eval(expr)));
            }
        };
        let invalid_target = || MmlError::parse_error("invalid assignment target").at_line(line);

        let (lhs, rhs) = (&tokens[..eq], &tokens[eq + 1..]);
        if rhs.is_empty() {
            return Err(MmlError::parse_error("missing value after '='").at_line(line));
        }
        let target = match lhs.first() {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(invalid_target()),
        };
        let coords = coordinate_groups(&lhs[1..]).ok_or_else(invalid_target)?;

        let kind = match coords.as_slice() {
            [] => StmtKind::Assign {
                target: target.clone(),
                value: self.expression(line, rhs)?,
            },
            [index] => StmtKind::AssignIndex {
                target: target.clone(),
                index: self.expression(line, index)?,
                value: self.expression(line, rhs)?,
            },
            [row, col] => StmtKind::AssignBlock {
                target: target.clone(),
                row: self.expression(line, row)?,
                col: self.expression(line, col)?,
                value: self.expression(line, rhs)?,
            },
            _ => return Err(invalid_target()),
        };
        self.variables.insert(target);
        Ok(Stmt::new(line, kind))
    }

    /// Run the expression pipeline over raw tokens
    fn expression(&mut self, line: usize, tokens: &[Token]) -> CompileResult<Expr> {
        let at_line = |e: MmlError| e.at_line(line);
        let tokens = prepare(tokens.to_vec()).map_err(at_line)?;
        let postfix = to_postfix(&tokens).map_err(at_line)?;
        let expr = build(&postfix).map_err(at_line)?;
        expr.collect_variables(&mut self.variables);
        Ok(expr)
    }
}

/// Compile MML source text into a [`Program`]
pub fn compile(source: &str) -> CompileResult<Program> {
    Translator::new(source)?.translate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rendered(source: &str) -> Vec<String> {
        compile(source)
            .unwrap()
            .statements
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_assignments() {
        assert_eq!(
            rendered("x = 2 + 3 * 4\nm[2] = 9\nm[1][2] = [1, 2]"),
            vec!["x = (2 + (3 * 4))", "m[2] = 9", "m[1][2] = [1, 2]"]
        );
    }

    #[test]
    fn test_if_chain() {
        let source = "if (a < 1) {\n x = 1\n} elseif (a < 2) {\n x = 2\n} else {\n x = 3\n}";
        let program = compile(source).unwrap();
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StmtKind::If { branches, otherwise } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].body[0].line, 4);
                assert_eq!(otherwise.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_clause_body() {
        assert_eq!(
            rendered("if (a == 1) b = 2\nelse b = 3"),
            vec!["if (a == 1) { b = 2; } else { b = 3; }"]
        );
        assert_eq!(rendered("while (i < 3) inc(i)"), vec!["while (i < 3) { inc(i); }"]);
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(
            rendered("s = 0; for i = 1 to 3 { s = s + i }"),
            vec!["s = 0", "for i = 1 to 3 { s = (s + i); }"]
        );
        assert_eq!(
            rendered("for k = n downto 1 {\n}"),
            vec!["for k = n downto 1 { }"]
        );
    }

    #[test]
    fn test_variables_collected() {
        let program = compile("a = 1\nfor i = 1 to n { b[i] = a }").unwrap();
        let names: Vec<_> = program.variables().iter().cloned().collect();
        assert_eq!(names, vec!["a", "b", "i", "n"]);
    }

    #[test]
    fn test_errors_carry_lines() {
        let err = compile("x = 1\ny = (2 + 3\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.cause, MmlError::UnbalancedParentheses);

        let err = compile("x = 1\n\nsum = 2").unwrap_err();
        assert_eq!(err.line, 3);

        let err = compile("else { x = 1 }").unwrap_err();
        assert!(matches!(err.cause, MmlError::ParseError { .. }));

        let err = compile("for i = 1 { }").unwrap_err();
        assert!(matches!(err.cause, MmlError::ParseError { .. }));
    }

    #[test]
    fn test_literal_errors() {
        let err = compile("x = [1, 2; 3]").unwrap_err();
        assert!(matches!(err.cause, MmlError::MalformedLiteral { .. }));
    }
}
