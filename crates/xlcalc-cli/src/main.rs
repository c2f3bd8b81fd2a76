//! xlcalc CLI - evaluate spreadsheet functions from the command line

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::str::FromStr;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use xlcalc::prelude::*;
use xlcalc::get_function_registry;

#[derive(Parser)]
#[command(name = "xlcalc")]
#[command(author, version, about = "Evaluate Excel-compatible spreadsheet functions")]
struct Cli {
    /// Log dispatch details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one function call
    ///
    /// Arguments are read as numbers, TRUE/FALSE, error literals such as
    /// #N/A, or text. Wrap an argument in double quotes to force text.
    Eval {
        /// Function name (case-insensitive)
        function: String,

        /// Function arguments
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Count serial numbers from 1904-01-01
        #[arg(long)]
        date_1904: bool,

        /// Decimal separator for number text (',' switches to de-DE conventions)
        #[arg(long, default_value = ".")]
        decimal_separator: char,
    },

    /// List the registered function names
    Functions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Eval {
            function,
            args,
            date_1904,
            decimal_separator,
        } => eval(&function, &args, date_1904, decimal_separator),
        Commands::Functions => {
            list_functions();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "xlcalc=trace,xlcalc_formula=trace" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn eval(function: &str, raw_args: &[String], date_1904: bool, decimal_separator: char) -> Result<()> {
    let mut workbook = Workbook::new();
    let settings = workbook.settings_mut();
    settings.date_1904 = date_1904;
    settings.locale = match decimal_separator {
        '.' => Locale::en_us(),
        ',' => Locale::de_de(),
        other => bail!("Unsupported decimal separator '{}'", other),
    };

    let args: Vec<FormulaValue> = raw_args.iter().map(|a| parse_argument(a)).collect();
    debug!(function, args = ?args, "parsed arguments");

    let result = evaluate_at(&workbook, 0, 0, 0, function, &args)
        .with_context(|| format!("Failed to evaluate {}", function))?;
    println!("{}", result);
    Ok(())
}

/// Read a command-line argument as the literal it spells
fn parse_argument(raw: &str) -> FormulaValue {
    if let Some(text) = raw.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return FormulaValue::String(text.into());
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => return FormulaValue::Number(n),
        _ => {}
    }
    if raw.eq_ignore_ascii_case("TRUE") {
        return FormulaValue::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("FALSE") {
        return FormulaValue::Boolean(false);
    }
    if let Ok(e) = CellError::from_str(raw) {
        return FormulaValue::Error(e);
    }
    FormulaValue::String(raw.into())
}

fn list_functions() {
    let registry = get_function_registry();
    for name in registry.names() {
        println!("{}", name);
    }
    eprintln!("{} functions", registry.len());
}
