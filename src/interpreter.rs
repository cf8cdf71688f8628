//! Tree-walking evaluation of compiled programs
//!
//! Every statement is executed against one mutable [`Environment`]. Errors
//! abort the run and carry the line of the failing statement; whatever the
//! program already wrote stays in the environment.

use std::collections::BTreeMap;

use log::{debug, trace};
use serde::{Serialize, Serializer};

use crate::ast::{BinaryOp, Builtin, Expr, Program, Step, Stmt, StmtKind, UnaryOp};
use crate::config::{MmlConfig, CONSTANTS};
use crate::error::{MmlError, MmlResult, RunResult, RuntimeError};
use crate::value::{MissingPolicy, Side, Value};

/// Variable bindings for one program run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
    image_missing: MissingPolicy,
}

impl Environment {
    /// Empty environment with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment holding the named constants
    pub fn with_constants() -> Self {
        Self::with_config(&MmlConfig::default())
    }

    pub fn with_config(config: &MmlConfig) -> Self {
        let mut env = Self {
            bindings: BTreeMap::new(),
            image_missing: config.image_missing,
        };
        if config.seed_constants {
            for (name, value) in CONSTANTS {
                env.set(name, Value::scalar(value));
            }
        }
        env
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bindings sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn lookup(&self, name: &str) -> MmlResult<&Value> {
        self.bindings.get(name).ok_or_else(|| MmlError::undeclared(name))
    }

    fn lookup_mut(&mut self, name: &str) -> MmlResult<&mut Value> {
        self.bindings.get_mut(name).ok_or_else(|| MmlError::undeclared(name))
    }

    /// Evaluate one expression
    pub fn eval(&mut self, expr: &Expr) -> MmlResult<Value> {
        match expr {
            Expr::Literal(n) => Ok(Value::scalar(*n)),
            Expr::Variable(name) => self.lookup(name).cloned(),
            Expr::Matrix {
                rows,
                cols,
                elements,
            } => {
                let data = elements
                    .iter()
                    .map(|e| self.eval(e)?.as_scalar("Matrix literal element"))
                    .collect::<MmlResult<Vec<_>>>()?;
                Value::new(*rows, *cols, data)
            }
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Neg => v.negate(),
                    UnaryOp::Transpose => v.transpose(),
                    UnaryOp::Not => v.not(),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                binary(*op, &l, &r)
            }
            Expr::Call { func, args } => self.call(*func, args),
        }
    }

    fn call(&mut self, func: Builtin, args: &[Expr]) -> MmlResult<Value> {
        if let (Builtin::Inc | Builtin::Dec, [Expr::Variable(name)]) = (func, args) {
            let target = self.lookup_mut(name)?;
            if func == Builtin::Inc {
                target.increment();
            } else {
                target.decrement();
            }
            return Ok(target.clone());
        }
        let values = args
            .iter()
            .map(|a| self.eval(a))
            .collect::<MmlResult<Vec<_>>>()?;
        builtin(func, &values, self.image_missing)
    }

    /// Execute one statement, tagging failures with its line
    pub fn exec(&mut self, stmt: &Stmt) -> RunResult<()> {
        let at_line = |cause: MmlError| RuntimeError {
            line: stmt.line,
            cause,
        };
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let v = self.eval(value).map_err(at_line)?;
                self.set(target.as_str(), v);
            }
            StmtKind::AssignIndex {
                target,
                index,
                value,
            } => {
                let i = self
                    .eval(index)
                    .and_then(|v| v.as_integer("Index"))
                    .map_err(at_line)?;
                let v = self.eval(value).map_err(at_line)?;
                self.lookup_mut(target)
                    .and_then(|t| t.set(i, &v))
                    .map_err(at_line)?;
            }
            StmtKind::AssignBlock {
                target,
                row,
                col,
                value,
            } => {
                let r = self
                    .eval(row)
                    .and_then(|v| v.as_integer("Row index"))
                    .map_err(at_line)?;
                let c = self
                    .eval(col)
                    .and_then(|v| v.as_integer("Column index"))
                    .map_err(at_line)?;
                let v = self.eval(value).map_err(at_line)?;
                self.lookup_mut(target)
                    .and_then(|t| t.set_block(r, c, &v))
                    .map_err(at_line)?;
            }
            StmtKind::Eval(expr) => {
                let v = self.eval(expr).map_err(at_line)?;
                trace!("line {} evaluated to {}", stmt.line, v);
            }
            StmtKind::If {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    if self.eval(&branch.cond).map_err(at_line)?.is_truthy() {
                        return self.exec_all(&branch.body);
                    }
                }
                if let Some(body) = otherwise {
                    self.exec_all(body)?;
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(cond).map_err(at_line)?.is_truthy() {
                    self.exec_all(body)?;
                }
            }
            StmtKind::For {
                var,
                start,
                limit,
                step,
                body,
            } => {
                let first = self.eval(start).map_err(at_line)?;
                self.set(var.as_str(), first);
                loop {
                    let current = self
                        .lookup(var)
                        .and_then(|v| v.as_scalar("Loop variable"))
                        .map_err(at_line)?;
                    let bound = self
                        .eval(limit)
                        .and_then(|v| v.as_scalar("Loop bound"))
                        .map_err(at_line)?;
                    let keep_going = match step {
                        Step::Up => current <= bound,
                        Step::Down => current >= bound,
                    };
                    if !keep_going {
                        break;
                    }
                    self.exec_all(body)?;
                    let counter = self.lookup_mut(var).map_err(at_line)?;
                    match step {
                        Step::Up => counter.increment(),
                        Step::Down => counter.decrement(),
                    }
                }
            }
            StmtKind::Block(body) => self.exec_all(body)?,
        }
        Ok(())
    }

    fn exec_all(&mut self, body: &[Stmt]) -> RunResult<()> {
        body.iter().try_for_each(|stmt| self.exec(stmt))
    }
}

/// Serialises as a plain name -> value map
impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bindings.serialize(serializer)
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> MmlResult<Value> {
    match op {
        BinaryOp::Add => l.add(r),
        BinaryOp::Sub => l.subtract(r),
        BinaryOp::Mul => l.multiply(r),
        BinaryOp::ElemMul => l.elem_multiply(r),
        BinaryOp::ElemDiv => l.elem_divide(r),
        BinaryOp::ElemPow => l.elem_power(r),
        BinaryOp::ElemMod => l.elem_modulo(r),
        BinaryOp::Div => l.divide(r),
        BinaryOp::Pow => l.power(r),
        BinaryOp::Mod => l.modulo(r),
        BinaryOp::Beside => l.concat(r, Side::Beside),
        BinaryOp::Below => l.concat(r, Side::Below),
        BinaryOp::RepeatBeside => l.repeat(r, Side::Beside),
        BinaryOp::RepeatBelow => l.repeat(r, Side::Below),
        BinaryOp::Range => l.to(r),
        BinaryOp::Index => l.get(r.as_integer("Index")?),
        BinaryOp::Eq => Ok(l.equal(r)),
        BinaryOp::Ne => Ok(l.not_equal(r)),
        BinaryOp::Lt => Ok(l.less(r)),
        BinaryOp::Gt => Ok(l.greater(r)),
        BinaryOp::Le => Ok(l.less_equal(r)),
        BinaryOp::Ge => Ok(l.greater_equal(r)),
        BinaryOp::And => Ok(l.and(r)),
        BinaryOp::Or => Ok(l.or(r)),
    }
}

fn builtin(func: Builtin, args: &[Value], missing: MissingPolicy) -> MmlResult<Value> {
    let filled = |fill: f64| -> MmlResult<Value> {
        let (rows, cols) = match args {
            [size] => Value::shape_from(size)?,
            [rows, cols] => Value::shape_from_pair(rows, cols)?,
            _ => return Err(arity_error(func, args.len())),
        };
        Value::filled(rows, cols, fill)
    };

    match (func, args) {
        (Builtin::Min, [a]) => Ok(a.min()),
        (Builtin::Min, [a, b]) => a.min_with(b),
        (Builtin::Max, [a]) => Ok(a.max()),
        (Builtin::Max, [a, b]) => a.max_with(b),
        (Builtin::Mean, [a]) => Ok(a.mean()),
        (Builtin::Mean, [a, b]) => a.mean_with(b),
        (Builtin::Sum, [a]) => Ok(a.sum()),
        (Builtin::Prod, [a]) => Ok(a.prod()),
        (Builtin::Size, [a]) => Ok(a.size()),
        (Builtin::Count, [a]) => Ok(a.count()),
        (Builtin::Sqrt, [a]) => Ok(a.sqrt()),
        (Builtin::Abs, [a]) => Ok(a.abs()),
        (Builtin::Cos, [a]) => Ok(a.cos()),
        (Builtin::Sin, [a]) => Ok(a.sin()),
        (Builtin::Tg, [a]) => Ok(a.tan()),
        (Builtin::Ctg, [a]) => Ok(a.cot()),
        (Builtin::Exp, [a]) => Ok(a.exp()),
        (Builtin::Ceil, [a]) => Ok(a.ceil()),
        (Builtin::Vectorize, [a]) => Ok(a.vectorize()),
        (Builtin::Zeros, _) => filled(0.0),
        (Builtin::Ones, _) => filled(1.0),
        (Builtin::Ident, [n]) => Value::identity(n),
        (Builtin::Sub, [m, origin, extent]) => m.sub(origin, extent),
        (Builtin::Sub, [m, row, col, height, width]) => m.submatrix(
            row.as_integer("Row")?,
            col.as_integer("Column")?,
            height.as_integer("Height")?,
            width.as_integer("Width")?,
        ),
        // inc/dec of a temporary; variables are updated in place by the caller
        (Builtin::Inc, [a]) => {
            let mut v = a.clone();
            v.increment();
            Ok(v)
        }
        (Builtin::Dec, [a]) => {
            let mut v = a.clone();
            v.decrement();
            Ok(v)
        }
        (Builtin::Conv2, [a, k]) => Ok(a.convolution_full(k)),
        (Builtin::Imconv, [a, k]) => Ok(a.convolution_same(k, missing)),
        (Builtin::Imconv, [a, k, policy]) => Ok(a.convolution_same(
            k,
            MissingPolicy::from_code(policy.as_integer("Missing-value policy")?)?,
        )),
        _ => Err(arity_error(func, args.len())),
    }
}

fn arity_error(func: Builtin, got: usize) -> MmlError {
    MmlError::parse_error(format!("{} does not take {} arguments", func, got))
}

impl Program {
    /// Run every statement in order against `env`
    pub fn run(&self, env: &mut Environment) -> RunResult<()> {
        for stmt in &self.statements {
            debug!("executing line {}: {}", stmt.line, stmt.describe());
            env.exec(stmt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::compile;
    use crate::value::mat;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Environment {
        let mut env = Environment::with_constants();
        compile(source).unwrap().run(&mut env).unwrap();
        env
    }

    fn run_err(source: &str) -> RuntimeError {
        let mut env = Environment::with_constants();
        compile(source).unwrap().run(&mut env).unwrap_err()
    }

    fn scalar(env: &Environment, name: &str) -> f64 {
        env.get(name).unwrap().as_scalar(name).unwrap()
    }

    #[test]
    fn test_constants_seeded() {
        let env = Environment::with_constants();
        assert_eq!(scalar(&env, "TWO"), 2.0);
        assert!((scalar(&env, "pi") - std::f64::consts::PI).abs() < 1e-12);
        assert!(Environment::new().is_empty());

        let bare = Environment::with_config(&MmlConfig::new(false, MissingPolicy::Zero));
        assert!(!bare.contains("pi"));
    }

    #[test]
    fn test_unary_minus_binds_before_power() {
        let env = run("x = -2 ^ 2\ny = 2 ^ -1\nz = 0 - 2 ^ 2");
        assert_eq!(scalar(&env, "x"), 4.0);
        assert_eq!(scalar(&env, "y"), 0.5);
        assert_eq!(scalar(&env, "z"), -4.0);
    }

    #[test]
    fn test_inc_dec_in_place() {
        let env = run("i = 1\ninc(i)\ninc(i)\nj = dec(i)\nk = inc(j + 10)");
        assert_eq!(scalar(&env, "i"), 2.0);
        assert_eq!(scalar(&env, "j"), 2.0);
        assert_eq!(scalar(&env, "k"), 13.0);
    }

    #[test]
    fn test_while_and_downto() {
        let env = run("n = 0\nwhile (n < 5) {\n n = n + 2\n}");
        assert_eq!(scalar(&env, "n"), 6.0);

        let env = run("v = 0\nfor i = 3 downto 1 {\n v = v * 10 + i\n}");
        assert_eq!(scalar(&env, "v"), 321.0);
        assert_eq!(scalar(&env, "i"), 0.0);
    }

    #[test]
    fn test_for_limit_reevaluated() {
        let env = run("n = 3\nc = 0\nfor i = 1 to n {\n c = c + 1\n n = 2\n}");
        assert_eq!(scalar(&env, "c"), 2.0);
    }

    #[test]
    fn test_nested_control_flow() {
        let source = "\
evens = 0
odds = 0
for i = 1 to 6 {
  if (i % 2 == 0) {
    evens = evens + 1
  } elseif (i == 5) {
    odds = odds + 10
  } else {
    odds = odds + 1
  }
}";
        let env = run(source);
        assert_eq!(scalar(&env, "evens"), 3.0);
        assert_eq!(scalar(&env, "odds"), 12.0);
    }

    #[test]
    fn test_builtins_dispatch() {
        let env = run(
            "m = [1, 2; 3, 4]\n\
             s = sum(m)\n\
             z = zeros(2, 3)\n\
             o = ones([2, 2])\n\
             r = sub(m, 2, 1)\n\
             b = sub(m, 1, 2, 2, 1)\n\
             f = imconv(m, [1], 0)\n\
             c = size(conv2(m, ones(2, 2)))",
        );
        assert_eq!(scalar(&env, "s"), 10.0);
        assert_eq!(env.get("z").unwrap().shape(), (2, 3));
        assert_eq!(env.get("o").unwrap(), &mat(2, 2, &[1.0, 1.0, 1.0, 1.0]));
        assert_eq!(env.get("r").unwrap(), &mat(1, 2, &[3.0, 4.0]));
        assert_eq!(env.get("b").unwrap(), &mat(2, 1, &[2.0, 4.0]));
        assert_eq!(env.get("f").unwrap(), env.get("m").unwrap());
        assert_eq!(env.get("c").unwrap(), &mat(1, 2, &[3.0, 3.0]));
    }

    #[test]
    fn test_runtime_errors_keep_prior_writes() {
        let mut env = Environment::new();
        let program = compile("a = 1\nb = a / 0\nc = 3").unwrap();
        let err = program.run(&mut env).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.cause, MmlError::DivideByZero);
        assert!(env.contains("a"));
        assert!(!env.contains("c"));
    }

    #[test]
    fn test_undeclared_and_non_scalar() {
        let err = run_err("x = y + 1");
        assert_eq!(err.cause, MmlError::undeclared("y"));

        let err = run_err("q[1] = 2");
        assert_eq!(err.cause, MmlError::undeclared("q"));

        let err = run_err("m = [1, 2]\nfor i = 1 to m {\n}");
        assert!(matches!(err.cause, MmlError::NonScalarContext { .. }));
        assert_eq!(err.line, 2);

        let err = run_err("x = [[1, 2], 3]");
        assert!(matches!(err.cause, MmlError::NonScalarContext { .. }));
    }

    #[test]
    fn test_error_inside_block_reports_inner_line() {
        let err = run_err("i = 0\nwhile (i < 3) {\n  inc(i)\n  x = [1, 2] + [1, 2, 3]\n}");
        assert_eq!(err.line, 4);
        assert!(matches!(err.cause, MmlError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_environment_serializes_as_map() {
        let mut env = Environment::new();
        env.set("x", Value::scalar(1.0));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["x"]["rows"], 1);
        assert_eq!(json["x"]["data"][0], 1.0);
    }
}
