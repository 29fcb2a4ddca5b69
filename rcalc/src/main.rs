use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::debug;
use rcalc_lib::config::DebugConfig;
use rcalc_lib::value::Value;
use rcalc_lib::vm::{InterpretError, Result, VM};

/// Compiles arithmetic expressions to bytecode and runs them.
#[derive(Debug, Parser)]
#[command(name = "rcalc", version)]
struct Cli {
    /// File holding a single expression. Starts a prompt when omitted.
    path: Option<PathBuf>,

    /// Print the bytecode of every compiled expression to stderr.
    #[arg(long)]
    print_code: bool,

    /// Trace the stack and each executed instruction to stderr.
    #[arg(long)]
    trace_execution: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = DebugConfig::environment()
        .with_print_code(cli.print_code)
        .with_trace_execution(cli.trace_execution);
    let mut vm = VM::new().with_config(config);

    match cli.path {
        None => {
            repl(&mut vm);
            ExitCode::SUCCESS
        }
        Some(path) => match run_file(&path, &mut vm) {
            Ok(_) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{error}");
                match error {
                    InterpretError::Compile(_) => ExitCode::from(65),
                    InterpretError::Runtime(_) => ExitCode::from(70),
                    InterpretError::Io(_) => ExitCode::from(74),
                }
            }
        },
    }
}

fn repl<W: Write>(vm: &mut VM<W>) {
    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("> ");
        if let Err(error) = io::stdout().flush() {
            eprintln!("Failed to flush stdout: {error}");
        }

        buffer.clear();
        match stdin.read_line(&mut buffer) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(error) => {
                eprintln!("Failed to read line: {error}");
                break;
            }
        }

        let line = buffer.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        if let Err(error) = vm.interpret(line) {
            eprintln!("{error}");
        }
    }
}

fn run_file<W: Write>(path: &Path, vm: &mut VM<W>) -> Result<Value> {
    debug!("running {}", path.display());
    let source = fs::read_to_string(path)?;
    vm.interpret(&source)
}
