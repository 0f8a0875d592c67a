use std::io::Write;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use ape::compiler::{CompileError, Compiler};
use ape::interpreter::{self, environment::Environment};
use ape::parser::{parse, ParseErrors};
use ape::vm::{RuntimeError, Vm};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

const DEFAULT_COMMAND: Command = Command::Repl;

impl Cli {
    fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&DEFAULT_COMMAND)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a script with the tree-walking interpreter
    Run(FileArgs),
    /// Interactive session over a persistent environment
    Repl,
    /// Compile a script to bytecode and run it on the VM
    Compile(FileArgs),
}

#[derive(Debug, Args)]
struct FileArgs {
    file: String,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseErrors),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command() {
        Command::Run(args) => run_command(args),
        Command::Repl => repl_command(),
        Command::Compile(args) => compile_command(args),
    };

    if let Err(error) = result {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

fn run_command(args: &FileArgs) -> Result<(), DriverError> {
    let source = std::fs::read_to_string(&args.file)?;
    let program = parse(&source)?;

    let env = Environment::new();
    if let Some(value) = interpreter::eval(&program, &env) {
        println!("{}", value);
    }

    Ok(())
}

fn repl_command() -> Result<(), DriverError> {
    let env = Environment::new();

    loop {
        print!(">> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        let read = std::io::stdin().read_line(&mut input)?;
        if read == 0 {
            return Ok(());
        }

        let line = input.trim();
        if line == "exit" {
            return Ok(());
        }
        if line.is_empty() {
            continue;
        }

        match parse(line) {
            Ok(program) => {
                if let Some(value) = interpreter::eval(&program, &env) {
                    println!("{}", value);
                }
            }
            // A bad line ends the line, not the session.
            Err(errors) => print!("{}", errors),
        }
    }
}

fn compile_command(args: &FileArgs) -> Result<(), DriverError> {
    let source = std::fs::read_to_string(&args.file)?;
    let program = parse(&source)?;

    let mut compiler = Compiler::new();
    compiler.compile(&program)?;

    let mut vm = Vm::new(compiler.bytecode());
    vm.run()?;

    let contents: Vec<String> = vm.stack_contents().iter().map(|v| v.to_string()).collect();
    println!("Stack: [{}]", contents.join(", "));
    if let Some(top) = vm.stack_top() {
        println!("{}", top);
    }

    Ok(())
}
