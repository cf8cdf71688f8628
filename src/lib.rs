//! MML, the Matrix Micro Language
//!
//! A small imperative language whose only datatype is a dense `f64` matrix.
//! Source text is compiled line by line through a four-pass lexer, a
//! shunting-yard parser and a postfix tree builder into a [`Program`], which
//! is then run against an [`Environment`] of variable bindings.
//!
//! # Example
//!
//! ```rust
//! use mml::{compile, Environment};
//!
//! let program = compile("x = [1, 2; 3, 4]\ns = 0\nfor i = 1 to 2 { s = s + sum(x[i]) }").unwrap();
//! let mut env = Environment::with_constants();
//! program.run(&mut env).unwrap();
//! assert_eq!(env.get("s").unwrap().as_scalar("s").unwrap(), 10.0);
//! ```

pub mod ast;
pub mod block;
pub mod codegen;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod translator;
pub mod value;

pub use ast::{Builtin, Expr, Op, Program, Stmt, StmtKind};
pub use codegen::{build, CodeGenerator};
pub use config::MmlConfig;
pub use error::{CompileError, CompileResult, Error, MmlError, MmlResult, RunResult, RuntimeError};
pub use interpreter::Environment;
pub use lexer::{tokenize, Token};
pub use parser::{to_postfix, Instruction, Parser};
pub use translator::{compile, Translator};
pub use value::{MissingPolicy, Side, Value};

/// Compile `source` and run it in a fresh environment built from `config`
pub fn run_source(source: &str, config: &MmlConfig) -> Result<Environment, Error> {
    let program = compile(source)?;
    let mut env = Environment::with_config(config);
    program.run(&mut env)?;
    Ok(env)
}
