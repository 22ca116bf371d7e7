use clap::Parser;
use funcscript::{StdFsServices, Value, Vm, VmOptions, render_error};
use funcscript_core::parser;
use miette::{IntoDiagnostic, Result};
use std::io::{BufRead, IsTerminal, Write};
use std::process::ExitCode;

/// FuncScript - evaluate expressions from the command line
#[derive(Parser, Debug)]
#[command(name = "funcscript")]
#[command(about = "Evaluate FuncScript expressions", long_about = None)]
struct Args {
    /// Print results as JSON snapshots
    #[arg(long)]
    json: bool,

    /// Print the parsed expression tree (for debugging)
    #[arg(long)]
    debug_parse: bool,

    /// Largest file `file(path)` may read
    #[arg(long, default_value_t = VmOptions::default().max_file_bytes)]
    max_file_bytes: u64,

    /// Maximum evaluation depth
    #[arg(long, default_value_t = VmOptions::default().max_depth)]
    max_depth: usize,

    /// Expression to evaluate (if not provided, reads lines from stdin)
    expression: Option<String>,
}

fn show(value: Value<'_>) -> Result<String, funcscript::Error> {
    if let Value::Function(_) = value {
        return Ok("<function>".to_string());
    }
    let literal = value.to_literal()?;
    // Nested functions and non-finite numbers have no literal spelling.
    Ok(literal.to_source().unwrap_or_else(|_| format!("{literal:?}")))
}

/// Evaluate one input, reporting failures. Returns whether it succeeded.
fn interpret_input(vm: &Vm, input: &str, args: &Args) -> bool {
    if args.debug_parse {
        match parser::parse(input) {
            Ok(expr) => {
                println!("=== Parsed expression ===");
                println!("{expr:#?}");
                println!();
            }
            Err(e) => tracing::debug!(error = %e, "parse failed"),
        }
    }

    if args.json {
        return match vm.eval_json(input) {
            Ok(json) => {
                match serde_json::to_string_pretty(&json) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
                true
            }
            Err(e) => {
                render_error(&e, input);
                false
            }
        };
    }

    match vm.eval(input).and_then(show) {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(e) => {
            render_error(&e, input);
            false
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    use tracing_subscriber::{EnvFilter, fmt};

    // FUNCSCRIPT_LOG wins over RUST_LOG; WARN when neither is set.
    let filter = EnvFilter::try_from_env("FUNCSCRIPT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let options = VmOptions {
        max_file_bytes: args.max_file_bytes,
        max_depth: args.max_depth,
    };
    let vm = Vm::with_services(StdFsServices::new(options.max_file_bytes), options)
        .into_diagnostic()?;

    if let Some(expr) = &args.expression {
        let ok = interpret_input(&vm, expr, &args);
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    if interactive {
        println!("FuncScript - one expression per line (Ctrl+D to exit)");
    }

    let mut failed = false;
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush().into_diagnostic()?;
        }
        let Some(line) = lines.next() else { break };
        let line = line.into_diagnostic()?;
        if line.trim().is_empty() {
            continue;
        }
        failed |= !interpret_input(&vm, &line, &args);
    }

    Ok(if failed && !interactive {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
