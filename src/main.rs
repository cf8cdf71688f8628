//! MML compiler and runner CLI
//!
//! Usage:
//!   mmlc program.mml
//!   mmlc -e "x = [1, 2; 3, 4]'" --var x
//!   mmlc program.mml --json --config settings.json

use clap::Parser as ClapParser;
use colored::Colorize;
use std::fs;
use std::io::{self, Read};

use mml::{compile, Environment, Error, MmlConfig, Program};

#[derive(ClapParser, Debug)]
#[command(name = "mmlc")]
#[command(author = "MML Team")]
#[command(version = "0.1.0")]
#[command(about = "Compiles and runs Matrix Micro Language programs")]
struct Args {
    /// Program file to run
    #[arg(value_name = "FILE")]
    input_file: Option<String>,

    /// Program text given inline
    #[arg(short = 'e', long = "eval", conflicts_with = "input_file")]
    eval: Option<String>,

    /// Print only these variables (repeatable)
    #[arg(long = "var", value_name = "NAME")]
    vars: Vec<String>,

    /// Print the final environment as JSON
    #[arg(short = 'j', long = "json")]
    json_output: bool,

    /// Print the compiled statements instead of running them
    #[arg(long = "dump")]
    dump: bool,

    /// Do not seed pi, e, ZERO, ONE and TWO
    #[arg(long = "no-constants")]
    no_constants: bool,

    /// JSON runtime configuration
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", "Error".red(), message);
    std::process::exit(1);
}

fn read_source(args: &Args) -> String {
    if let Some(source) = &args.eval {
        source.clone()
    } else if let Some(file) = &args.input_file {
        fs::read_to_string(file)
            .unwrap_or_else(|e| fail(format!("Failed to read file '{}': {}", file, e)))
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .unwrap_or_else(|e| fail(format!("Failed to read stdin: {}", e)));
        buffer
    }
}

fn load_config(args: &Args) -> MmlConfig {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("Failed to read config '{}': {}", path, e)));
            MmlConfig::from_json(&json)
                .unwrap_or_else(|e| fail(format!("Invalid config '{}': {}", path, e)))
        }
        None => MmlConfig::default(),
    };
    if args.no_constants {
        config.seed_constants = false;
    }
    config
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let source = read_source(&args);
    let config = load_config(&args);

    let program = compile(&source).unwrap_or_else(|e| fail(e));

    if args.dump {
        print_program(&program);
        return;
    }

    let mut env = Environment::with_config(&config);
    if let Err(e) = program.run(&mut env) {
        // partial results are still worth showing
        print_environment(&program, &env, &args);
        fail(Error::from(e));
    }
    print_environment(&program, &env, &args);
}

fn print_program(program: &Program) {
    println!("{}", "Compiled statements".bold().green());
    for stmt in &program.statements {
        println!("  {} {}", format!("{:>4}", stmt.line).cyan(), stmt);
    }
    println!(
        "{}: {}",
        "Variables".cyan(),
        program.variables().iter().cloned().collect::<Vec<_>>().join(", ")
    );
}

fn print_environment(program: &Program, env: &Environment, args: &Args) {
    let names: Vec<&str> = if args.vars.is_empty() {
        program
            .variables()
            .iter()
            .map(String::as_str)
            .filter(|name| env.contains(name))
            .collect()
    } else {
        args.vars.iter().map(String::as_str).collect()
    };

    if args.json_output {
        let selected: std::collections::BTreeMap<&str, _> = names
            .iter()
            .filter_map(|name| env.get(name).map(|v| (*name, v)))
            .collect();
        match serde_json::to_string_pretty(&selected) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(format!("Failed to serialize to JSON: {}", e)),
        }
        return;
    }

    for name in names {
        match env.get(name) {
            Some(value) => println!(
                "{} {} {}",
                name.bold(),
                format!("({})", value.shape_string()).dimmed(),
                value
            ),
            None => println!("{} {}", name.bold(), "undefined".yellow()),
        }
    }
}
