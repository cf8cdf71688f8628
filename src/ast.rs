//! Program node definitions and the static operator and builtin tables

use std::collections::BTreeSet;
use std::fmt;

/// Operator kinds, resolved once by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    /// Unary minus, `~` in postfix listings
    Neg,
    Mul,
    ElemMul,
    ElemDiv,
    ElemPow,
    ElemMod,
    Div,
    Pow,
    Mod,
    Transpose,
    /// `|`
    Beside,
    /// `_`
    Below,
    /// `*|`
    RepeatBeside,
    /// `*_`
    RepeatBelow,
    /// `:`
    Range,
    /// `$`, produced for `[` following an operand
    Index,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    /// keyword `not`
    Not,
    /// `!`, binds as tightly as `^`
    Bang,
    /// `#`, produced for `[` opening a matrix literal
    Matrix { rows: usize, cols: usize },
}

impl Op {
    /// Binding strength; a higher number binds looser
    pub fn priority(self) -> u8 {
        match self {
            Op::And | Op::Or | Op::Not => 11,
            Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => 10,
            Op::Add | Op::Sub => 3,
            Op::Mod
            | Op::ElemMod
            | Op::Mul
            | Op::ElemMul
            | Op::Div
            | Op::ElemDiv
            | Op::RepeatBeside
            | Op::RepeatBelow
            | Op::Beside
            | Op::Below => 2,
            Op::ElemPow | Op::Pow | Op::Transpose | Op::Bang | Op::Neg | Op::Range => 1,
            Op::Index | Op::Matrix { .. } => 0,
        }
    }

    /// Number of operands consumed in postfix order
    pub fn arity(self) -> usize {
        match self {
            Op::Neg | Op::Transpose | Op::Not | Op::Bang => 1,
            Op::Matrix { rows, cols } => rows * cols + 2,
            _ => 2,
        }
    }

    /// Prefix operators have nothing on their left to bind
    pub fn is_prefix(self) -> bool {
        matches!(self, Op::Neg | Op::Not | Op::Bang)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Neg => "~",
            Op::Mul => "*",
            Op::ElemMul => ".*",
            Op::ElemDiv => "./",
            Op::ElemPow => ".^",
            Op::ElemMod => ".%",
            Op::Div => "/",
            Op::Pow => "^",
            Op::Mod => "%",
            Op::Transpose => "'",
            Op::Beside => "|",
            Op::Below => "_",
            Op::RepeatBeside => "*|",
            Op::RepeatBelow => "*_",
            Op::Range => ":",
            Op::Index => "$",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Bang => "!",
            Op::Matrix { .. } => "#",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Matrix { rows, cols } => write!(f, "#{}x{}", rows, cols),
            other => write!(f, "{}", other.symbol()),
        }
    }
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Min,
    Max,
    Sum,
    Size,
    Mean,
    Count,
    Sqrt,
    Zeros,
    Ones,
    Ident,
    Sub,
    Vectorize,
    Inc,
    Dec,
    Abs,
    Conv2,
    Imconv,
    Cos,
    Sin,
    Tg,
    Ctg,
    Exp,
    Prod,
    Ceil,
}

impl Builtin {
    pub const ALL: [Builtin; 24] = [
        Builtin::Min,
        Builtin::Max,
        Builtin::Sum,
        Builtin::Size,
        Builtin::Mean,
        Builtin::Count,
        Builtin::Sqrt,
        Builtin::Zeros,
        Builtin::Ones,
        Builtin::Ident,
        Builtin::Sub,
        Builtin::Vectorize,
        Builtin::Inc,
        Builtin::Dec,
        Builtin::Abs,
        Builtin::Conv2,
        Builtin::Imconv,
        Builtin::Cos,
        Builtin::Sin,
        Builtin::Tg,
        Builtin::Ctg,
        Builtin::Exp,
        Builtin::Prod,
        Builtin::Ceil,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Size => "size",
            Builtin::Mean => "mean",
            Builtin::Count => "count",
            Builtin::Sqrt => "sqrt",
            Builtin::Zeros => "zeros",
            Builtin::Ones => "ones",
            Builtin::Ident => "ident",
            Builtin::Sub => "sub",
            Builtin::Vectorize => "vectorize",
            Builtin::Inc => "inc",
            Builtin::Dec => "dec",
            Builtin::Abs => "abs",
            Builtin::Conv2 => "conv2",
            Builtin::Imconv => "imconv",
            Builtin::Cos => "cos",
            Builtin::Sin => "sin",
            Builtin::Tg => "tg",
            Builtin::Ctg => "ctg",
            Builtin::Exp => "exp",
            Builtin::Prod => "prod",
            Builtin::Ceil => "ceil",
        }
    }

    /// Argument counts the function is defined for
    pub fn accepts(self, arity: usize) -> bool {
        match self {
            Builtin::Min | Builtin::Max | Builtin::Mean | Builtin::Zeros | Builtin::Ones => {
                arity == 1 || arity == 2
            }
            Builtin::Sub => arity == 3 || arity == 5,
            Builtin::Conv2 => arity == 2,
            Builtin::Imconv => arity == 2 || arity == 3,
            _ => arity == 1,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Transpose,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    ElemMul,
    ElemDiv,
    ElemPow,
    ElemMod,
    Div,
    Pow,
    Mod,
    Beside,
    Below,
    RepeatBeside,
    RepeatBelow,
    Range,
    Index,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::ElemMul => ".*",
            BinaryOp::ElemDiv => "./",
            BinaryOp::ElemPow => ".^",
            BinaryOp::ElemMod => ".%",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Mod => "%",
            BinaryOp::Beside => "|",
            BinaryOp::Below => "_",
            BinaryOp::RepeatBeside => "*|",
            BinaryOp::RepeatBelow => "*_",
            BinaryOp::Range => ":",
            BinaryOp::Index => "$",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Literal(f64),

    /// Variable reference
    Variable(String),

    /// Matrix literal `[1, 2; 3, 4]`, elements in row-major order
    Matrix {
        rows: usize,
        cols: usize,
        elements: Vec<Expr>,
    },

    Unary { op: UnaryOp, operand: Box<Expr> },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Built-in function call
    Call { func: Builtin, args: Vec<Expr> },
}

impl Expr {
    /// Collect every variable name read by this expression
    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                out.insert(name.clone());
            }
            Expr::Matrix { elements, .. } => elements.iter().for_each(|e| e.collect_variables(out)),
            Expr::Unary { operand, .. } => operand.collect_variables(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Expr::Call { args, .. } => args.iter().for_each(|e| e.collect_variables(out)),
        }
    }
}

/// Fully parenthesised rendering, handy for checking precedence
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(n) => write!(f, "{}", n),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Matrix { cols, elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", if i % cols == 0 { "; " } else { ", " })?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "(-{})", operand),
                UnaryOp::Transpose => write!(f, "({}')", operand),
                UnaryOp::Not => write!(f, "(not {})", operand),
            },
            Expr::Binary { op: BinaryOp::Index, lhs, rhs } => write!(f, "{}[{}]", lhs, rhs),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call { func, args } => {
                write!(f, "{}(", func)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Direction of a `for` loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `to`: increment while `v <= limit`
    Up,
    /// `downto`: decrement while `v >= limit`
    Down,
}

/// One `if`/`elseif` arm
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// A statement tagged with the source line it was compiled from
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `x = expr`
    Assign { target: String, value: Expr },
    /// `x[i] = expr`
    AssignIndex {
        target: String,
        index: Expr,
        value: Expr,
    },
    /// `x[i][j] = expr`
    AssignBlock {
        target: String,
        row: Expr,
        col: Expr,
        value: Expr,
    },
    /// Expression evaluated for its effect, e.g. `inc(i)`
    Eval(Expr),
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Stmt>>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    For {
        var: String,
        start: Expr,
        limit: Expr,
        step: Step,
        body: Vec<Stmt>,
    },
    /// Bare `{ ... }`
    Block(Vec<Stmt>),
}

impl Stmt {
    pub fn new(line: usize, kind: StmtKind) -> Self {
        Self { line, kind }
    }

    /// Short name for logs
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            StmtKind::Assign { .. } => "assignment",
            StmtKind::AssignIndex { .. } => "indexed assignment",
            StmtKind::AssignBlock { .. } => "block assignment",
            StmtKind::Eval(_) => "expression",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::For { .. } => "for",
            StmtKind::Block(_) => "block",
        }
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &[Stmt]) -> fmt::Result {
    write!(f, "{{ ")?;
    for stmt in body {
        write!(f, "{}; ", stmt)?;
    }
    write!(f, "}}")
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Assign { target, value } => write!(f, "{} = {}", target, value),
            StmtKind::AssignIndex { target, index, value } => {
                write!(f, "{}[{}] = {}", target, index, value)
            }
            StmtKind::AssignBlock { target, row, col, value } => {
                write!(f, "{}[{}][{}] = {}", target, row, col, value)
            }
            StmtKind::Eval(expr) => write!(f, "{}", expr),
            StmtKind::If { branches, otherwise } => {
                for (i, branch) in branches.iter().enumerate() {
                    write!(f, "{} {} ", if i == 0 { "if" } else { " elseif" }, branch.cond)?;
                    write_body(f, &branch.body)?;
                }
                if let Some(body) = otherwise {
                    write!(f, " else ")?;
                    write_body(f, body)?;
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                write!(f, "while {} ", cond)?;
                write_body(f, body)
            }
            StmtKind::For { var, start, limit, step, body } => {
                let dir = match step {
                    Step::Up => "to",
                    Step::Down => "downto",
                };
                write!(f, "for {} = {} {} {} ", var, start, dir, limit)?;
                write_body(f, body)
            }
            StmtKind::Block(body) => write_body(f, body),
        }
    }
}

/// A compiled program: top-level statements plus every variable name the
/// source refers to
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub(crate) variables: BTreeSet<String>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>, variables: BTreeSet<String>) -> Self {
        Self { statements, variables }
    }

    /// Names assigned, read or used as loop counters anywhere in the source
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_table() {
        assert!(Op::Mul.priority() < Op::Add.priority());
        assert!(Op::Add.priority() < Op::Lt.priority());
        assert!(Op::Eq.priority() < Op::And.priority());
        assert_eq!(Op::Neg.priority(), Op::Pow.priority());
        assert_eq!(Op::Matrix { rows: 2, cols: 3 }.arity(), 8);
    }

    #[test]
    fn test_builtin_lookup() {
        for b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
        assert_eq!(Builtin::from_name("conv3"), None);
        assert!(Builtin::Sub.accepts(5));
        assert!(!Builtin::Sum.accepts(2));
    }

    #[test]
    fn test_expr_display_and_variables() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::Variable("a".to_string())),
            rhs: Box::new(Expr::Call {
                func: Builtin::Sum,
                args: vec![Expr::Variable("b".to_string())],
            }),
        };
        assert_eq!(expr.to_string(), "(a + sum(b))");

        let mut vars = BTreeSet::new();
        expr.collect_variables(&mut vars);
        assert_eq!(vars.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
