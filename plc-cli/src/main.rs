use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use plc_core::{compile_java, parse_source, run_source, tokenize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Compile PLC programs to Java or run them directly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file; read from stdin when omitted.
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output file; written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        default_value = "java",
        help = "Output format: java, tokens, ast"
    )]
    emit: Emit,

    #[arg(long, help = "Interpret the program after emitting it")]
    run: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Java,
    Tokens,
    Ast,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };
    debug!(bytes = source.len(), emit = ?cli.emit, "read source");

    let rendered = match cli.emit {
        Emit::Java => {
            let artifact = compile_java(&source)?;
            let builtins: Vec<&str> = artifact.builtins.iter().map(|b| b.name).collect();
            info!(?builtins, "compiled to java");
            format!("{}\n", artifact.java)
        }
        Emit::Tokens => tokenize(&source)?
            .iter()
            .map(|token| format!("{:?} {:?} @{}\n", token.kind, token.literal, token.index))
            .collect(),
        Emit::Ast => format!("{:#?}\n", parse_source(&source)?),
    };

    match &cli.output {
        Some(path) => write_output(path, rendered.as_bytes())?,
        None => io::stdout()
            .write_all(rendered.as_bytes())
            .context("failed to write output to stdout")?,
    }

    if cli.run {
        let stdout = io::stdout();
        let result = run_source(&source, stdout.lock())?;
        println!("Program exited with {result}");
    }

    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
