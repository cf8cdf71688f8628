//! Example: Matrix Basics
//!
//! Compiles a short MML program, shows how the parser grouped each
//! statement and prints the resulting variables.
//!
//! Run with: cargo run --example matrix_basics

use mml::{compile, tokenize, to_postfix, Environment};

const PROGRAM: &str = "\
// literals, transpose and matrix products
a = [1, 2; 3, 4]
b = a' * a
c = a .* a - 1

// indexing and indexed assignment
r = a[2]
a[1] = [9, 9]
a[2][2] = 0

// loops and conditions
s = 0
for i = 1 to count(c) {
  v = vectorize(c)
  if (v[i] % 2 == 0) s = s + v[i]
}
";

fn main() {
    println!("=== MML Matrix Basics ===\n");

    // Example 1: one expression through the pipeline
    let expression = "-2 ^ 2 + [1, 2] * [3; 4]";
    println!("Expression: {}", expression);
    let tokens = tokenize(expression).unwrap();
    let postfix = to_postfix(&tokens).unwrap();
    println!(
        "Postfix:    {}\n",
        postfix.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    );

    // Example 2: a whole program
    let program = compile(PROGRAM).unwrap();
    println!("Compiled statements:");
    for stmt in &program.statements {
        println!("  line {:>2}: {}", stmt.line, stmt);
    }
    println!();

    let mut env = Environment::with_constants();
    program.run(&mut env).unwrap();

    println!("Variables:");
    for name in program.variables() {
        if let Some(value) = env.get(name) {
            println!("  {} ({}) = {}", name, value.shape_string(), value);
        }
    }
}
