use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::{error, info, warn};

use ga4filter::config::{Config, OutputFormat};
use ga4filter::core::{FilterMode, FilterType};
use ga4filter::services::FilterEdit;
use ga4filter::session::{Overrides, Session};

/// Replay a filter edit script and print the GA4 report filter it builds
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Editing mode: simple or advanced
    #[arg(long = "mode")]
    mode: Option<FilterMode>,
    /// Filter type: dimension or metric
    #[arg(long = "type")]
    filter_type: Option<FilterType>,
    /// Output format: json, pretty or outline
    #[arg(long = "output")]
    output: Option<OutputFormat>,
    /// Field names the filter may use, comma separated (overrides config)
    #[arg(long = "fields", value_name = "NAMES", value_delimiter = ',')]
    fields: Option<Vec<String>>,
    /// Reject unknown field names instead of warning about them
    #[arg(long = "strict")]
    strict: bool,
    /// JSON5 array of edits. Use `-` to read stdin.
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel { Error, Warn, Info, Debug, Trace }

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let level = match args.logging {
        Some(LogLevel::Error) => Some(tracing::Level::ERROR),
        Some(LogLevel::Warn)  => Some(tracing::Level::WARN),
        Some(LogLevel::Info)  => Some(tracing::Level::INFO),
        Some(LogLevel::Debug) => Some(tracing::Level::DEBUG),
        Some(LogLevel::Trace) => Some(tracing::Level::TRACE),
        None => None,
    };
    ga4filter::logging::init_with(None, level)?;

    if let Err(err) = run(args) {
        error!("{err:?}");
        return Err(err);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let cfg = Config::from_path(args.config.as_ref()).wrap_err("failed to load config")?;
    let session = Session::resolve(
        &cfg,
        Overrides {
            mode: args.mode,
            filter_type: args.filter_type,
            output: args.output,
            fields: args.fields,
            strict: args.strict,
        },
    );

    let text = read_script(&args.script)?;
    let script = FilterEdit::parse_script(&text)
        .wrap_err_with(|| format!("failed to parse edit script {}", args.script.display()))?;
    info!(edits = script.len(), mode = %session.mode, filter_type = %session.filter_type, "replaying filter script");

    let replay = session.replay(&script)?;
    for problem in &replay.warnings {
        warn!("{problem}");
        eprintln!("warning: {problem}");
    }
    println!("{}", session.render(&replay.store)?);
    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).wrap_err("failed to read edit script from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).wrap_err_with(|| format!("failed to read edit script {}", path.display()))
}
