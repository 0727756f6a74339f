// bipc: single-pass compiler to BIP assembly

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};

use bipc::compiler::{format_symbol_table, line_column};
use bipc::config::{CodegenStrategy, ShadowingPolicy};
use bipc::{CompileError, Compiler, CompilerConfig};

#[derive(Parser)]
#[command(name = "bipc")]
#[command(about = "Compile a small C-like language to BIP assembly", long_about = None)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file ("-" for stdout; default: input with .asm extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Code generation strategy
    #[arg(long, value_enum)]
    strategy: Option<CodegenStrategy>,

    /// Redeclaration policy inside functions
    #[arg(long, value_enum)]
    shadowing: Option<ShadowingPolicy>,

    /// Print every semantic action as it runs
    #[arg(long)]
    trace: bool,

    /// Annotate data lines with their types
    #[arg(long)]
    annotate: bool,

    /// Print the symbol table after compiling
    #[arg(long)]
    symbols: bool,
}

fn print_colored(color: Color, text: &str) {
    let mut stderr = io::stderr();
    // write failures on stderr are ignored
    let _ = execute!(
        stderr,
        SetForegroundColor(color),
        Print(text),
        ResetColor,
        Print("\n")
    );
}

fn report_error(source: &str, error: &CompileError) {
    let (line, column) = line_column(source, error.offset());
    let mut stderr = io::stderr();
    let _ = execute!(
        stderr,
        SetForegroundColor(Color::Red),
        SetAttribute(Attribute::Bold),
        Print(format!("{} error", error.class())),
        SetAttribute(Attribute::Reset),
        ResetColor,
        Print(format!(
            " at {}:{} (offset {}): {}\n",
            line,
            column,
            error.offset(),
            error.message()
        ))
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CompilerConfig::load(path)?,
        None => CompilerConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.codegen.strategy = strategy;
    }
    if let Some(shadowing) = cli.shadowing {
        config.shadowing = shadowing;
    }
    config.trace_actions |= cli.trace;
    config.codegen.annotate_types |= cli.annotate;

    let source = fs::read_to_string(&cli.input)
        .map_err(|e| format!("cannot read '{}': {}", cli.input.display(), e))?;

    let compiler = Compiler::new(config)?;
    eprintln!("Compiling {}...", cli.input.display());

    let sink = |line: &str| {
        let color = if line.starts_with("warning") {
            Color::Yellow
        } else {
            Color::DarkGrey
        };
        print_colored(color, line);
    };
    let compilation = match compiler.compile_with_sink(&source, sink) {
        Ok(compilation) => compilation,
        Err(e) => {
            report_error(&source, &e);
            std::process::exit(1);
        }
    };

    if cli.symbols {
        print!("{}", format_symbol_table(&compilation.symbols));
    }

    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("asm"));
    if output.as_os_str() == "-" {
        io::stdout().write_all(compilation.program.as_bytes())?;
    } else {
        fs::write(&output, &compilation.program)?;
        eprintln!(
            "Wrote {} ({} warning(s)).",
            output.display(),
            compilation.warnings.len()
        );
    }

    Ok(())
}
