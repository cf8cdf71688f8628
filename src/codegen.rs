//! Postfix to expression tree
//!
//! Replays a postfix sequence on an operand stack. Each operator or call
//! pops its arity, restores source order and pushes the new node. Matrix
//! literals pop their elements plus the two dimension operands the lexer
//! appended.

use crate::ast::{BinaryOp, Expr, Op, UnaryOp};
use crate::error::{MmlError, MmlResult};
use crate::parser::Instruction;

/// Operand stack entries
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Node(Expr),
    Dim(usize),
}

/// Node kind an operator produces
enum Shape {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Matrix { rows: usize, cols: usize },
}

fn shape_of(op: Op) -> Shape {
    match op {
        Op::Neg => Shape::Unary(UnaryOp::Neg),
        Op::Transpose => Shape::Unary(UnaryOp::Transpose),
        Op::Not | Op::Bang => Shape::Unary(UnaryOp::Not),
        Op::Matrix { rows, cols } => Shape::Matrix { rows, cols },
        Op::Add => Shape::Binary(BinaryOp::Add),
        Op::Sub => Shape::Binary(BinaryOp::Sub),
        Op::Mul => Shape::Binary(BinaryOp::Mul),
        Op::ElemMul => Shape::Binary(BinaryOp::ElemMul),
        Op::ElemDiv => Shape::Binary(BinaryOp::ElemDiv),
        Op::ElemPow => Shape::Binary(BinaryOp::ElemPow),
        Op::ElemMod => Shape::Binary(BinaryOp::ElemMod),
        Op::Div => Shape::Binary(BinaryOp::Div),
        Op::Pow => Shape::Binary(BinaryOp::Pow),
        Op::Mod => Shape::Binary(BinaryOp::Mod),
        Op::Beside => Shape::Binary(BinaryOp::Beside),
        Op::Below => Shape::Binary(BinaryOp::Below),
        Op::RepeatBeside => Shape::Binary(BinaryOp::RepeatBeside),
        Op::RepeatBelow => Shape::Binary(BinaryOp::RepeatBelow),
        Op::Range => Shape::Binary(BinaryOp::Range),
        Op::Index => Shape::Binary(BinaryOp::Index),
        Op::Eq => Shape::Binary(BinaryOp::Eq),
        Op::Ne => Shape::Binary(BinaryOp::Ne),
        Op::Lt => Shape::Binary(BinaryOp::Lt),
        Op::Gt => Shape::Binary(BinaryOp::Gt),
        Op::Le => Shape::Binary(BinaryOp::Le),
        Op::Ge => Shape::Binary(BinaryOp::Ge),
        Op::And => Shape::Binary(BinaryOp::And),
        Op::Or => Shape::Binary(BinaryOp::Or),
    }
}

/// Builds expression trees from postfix instructions
#[derive(Default)]
pub struct CodeGenerator {
    stack: Vec<Operand>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree for one expression
    pub fn generate(&mut self, postfix: &[Instruction]) -> MmlResult<Expr> {
        self.stack.clear();
        for instruction in postfix {
            match instruction {
                Instruction::Number(n) => self.stack.push(Operand::Node(Expr::Literal(*n))),
                Instruction::Variable(name) => {
                    self.stack.push(Operand::Node(Expr::Variable(name.clone())))
                }
                Instruction::Dim(d) => self.stack.push(Operand::Dim(*d)),
                Instruction::Apply(op) => {
                    let node = self.apply(*op)?;
                    self.stack.push(Operand::Node(node));
                }
                Instruction::Call { func, arity } => {
                    if !func.accepts(*arity) {
                        return Err(MmlError::parse_error(format!(
                            "{} does not take {} argument{}",
                            func,
                            arity,
                            if *arity == 1 { "" } else { "s" }
                        )));
                    }
                    let args = self.pop_nodes(*arity, func.name())?;
                    self.stack.push(Operand::Node(Expr::Call { func: *func, args }));
                }
            }
        }

        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(Operand::Node(expr)), true) => Ok(expr),
            (None, _) => Err(MmlError::parse_error("empty expression")),
            _ => Err(MmlError::parse_error("expression leaves extra operands")),
        }
    }

    /// Pop `n` operands in source order
    fn pop_operands(&mut self, n: usize, what: &str) -> MmlResult<Vec<Operand>> {
        if self.stack.len() < n {
            return Err(MmlError::parse_error(format!("missing operand for '{}'", what)));
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    fn pop_nodes(&mut self, n: usize, what: &str) -> MmlResult<Vec<Expr>> {
        self.pop_operands(n, what)?
            .into_iter()
            .map(|operand| match operand {
                Operand::Node(expr) => Ok(expr),
                Operand::Dim(_) => Err(MmlError::parse_error(format!(
                    "misplaced matrix dimension near '{}'",
                    what
                ))),
            })
            .collect()
    }

    fn apply(&mut self, op: Op) -> MmlResult<Expr> {
        match shape_of(op) {
            Shape::Unary(unary) => {
                let mut args = self.pop_nodes(1, op.symbol())?;
                let operand = Box::new(args.remove(0));
                Ok(Expr::Unary { op: unary, operand })
            }
            Shape::Binary(binary) => {
                let mut args = self.pop_nodes(2, op.symbol())?.into_iter();
                match (args.next(), args.next()) {
                    (Some(lhs), Some(rhs)) => Ok(Expr::Binary {
                        op: binary,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }),
                    _ => Err(MmlError::parse_error(format!("missing operand for '{}'", op))),
                }
            }
            Shape::Matrix { rows, cols } => {
                let mut operands = self.pop_operands(op.arity(), op.symbol())?;
                let dims = operands.split_off(rows * cols);
                if dims != [Operand::Dim(rows), Operand::Dim(cols)] {
                    return Err(MmlError::malformed_literal(format!(
                        "{}x{} literal does not end with its dimensions",
                        rows, cols
                    )));
                }
                let elements = operands
                    .into_iter()
                    .map(|operand| match operand {
                        Operand::Node(expr) => Ok(expr),
                        Operand::Dim(_) => {
                            Err(MmlError::malformed_literal("dimension inside literal elements"))
                        }
                    })
                    .collect::<MmlResult<Vec<_>>>()?;
                Ok(Expr::Matrix { rows, cols, elements })
            }
        }
    }
}

/// Build an expression tree from postfix instructions
pub fn build(postfix: &[Instruction]) -> MmlResult<Expr> {
    CodeGenerator::new().generate(postfix)
}
