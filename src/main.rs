use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use j2py::TranslateConfig;

/// Translate a subset of Java source code to Python 3.10+.
#[derive(Parser)]
#[command(name = "j2py")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Java source file to translate
    input: PathBuf,

    /// Write the Python output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Spaces per indentation level
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Omit parameter and return type annotations
    #[arg(long)]
    no_type_hints: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(&cli) {
        eprintln!("{}", error);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let source = fs::read_to_string(&cli.input)
        .map_err(|e| format!("{}: {}", cli.input.display(), e))?;

    let config = TranslateConfig {
        indent: " ".repeat(cli.indent),
        emit_type_hints: !cli.no_type_hints,
        ..TranslateConfig::default()
    };
    let python = j2py::transpile_with_config(&source, &config).map_err(|e| e.to_string())?;

    match &cli.output {
        Some(path) => fs::write(path, python).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => print!("{}", python),
    }
    Ok(())
}
