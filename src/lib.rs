pub mod util;
pub mod interpreter;
pub mod repl;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use clap::{ArgAction, Parser as ClapParser};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;
use crate::interpreter::error::Diagnostic;
use crate::interpreter::evaluator::EvaluatorConfig;
use crate::interpreter::parser::ParserConfig;
use crate::interpreter::runner::Interpreter;
use crate::repl::Repl;

/// Overrides the `-v` verbosity with any `tracing` filter directive.
pub const LOG_LEVEL_VAR: &str = "LANGXA_LOG_LEVEL";

#[derive(ClapParser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    #[clap(help = "Script to run; starts an interactive session if omitted")]
    pub script: Option<PathBuf>,
    #[clap(short, long, conflicts_with = "script", help = "Run the given source text and exit")]
    pub command: Option<String>,

    #[clap(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,
    #[clap(long, help = "Write log output to this file instead of stderr")]
    pub log: Option<PathBuf>,
    #[clap(long, help = "Disable colored log output")]
    pub no_color: bool,

    #[clap(long, default_value_t = EvaluatorConfig::default().max_call_depth, help = "Maximum function call depth")]
    pub max_depth: usize,
    #[clap(long, default_value_t = ParserConfig::default().max_nesting, help = "Maximum syntactic nesting depth")]
    pub max_nesting: usize,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("{0}")]
    Language(#[from] Diagnostic),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunError::Language(_) => ExitCode::from(1),
            RunError::Io(_) => ExitCode::from(2),
        }
    }
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Builds the log filter from an optional directive, falling back to the
/// verbosity level. A directive that does not parse is handed back with its error.
fn log_filter(directive: Option<&str>, verbose: u8) -> (EnvFilter, Option<(String, ParseError)>) {
    let fallback = || EnvFilter::new(default_directive(verbose));

    match directive {
        Some(directive) => match EnvFilter::try_new(directive) {
            Ok(filter) => (filter, None),
            Err(err) => (fallback(), Some((directive.to_owned(), err))),
        },
        None => (fallback(), None),
    }
}

/// Installs the global `tracing` subscriber described by `config`.
pub fn init_logging(config: &Config) -> std::io::Result<()> {
    let directive = std::env::var(LOG_LEVEL_VAR).ok();
    let (filter, rejected) = log_filter(directive.as_deref(), config.verbose);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match &config.log {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        },
        None => builder.with_ansi(!config.no_color).with_writer(std::io::stderr).try_init(),
    };

    if result.is_err() {
        debug!("Logging was already initialized");
    }

    if let Some((directive, err)) = rejected {
        warn!(directive = %directive, error = %err, "Ignoring invalid {}, using -v level '{}'",
            LOG_LEVEL_VAR, default_directive(config.verbose));
    }

    Ok(())
}

pub fn run(config: &Config) -> Result<(), RunError> {
    let mode = match (&config.script, &config.command) {
        (Some(_), _) => "script",
        (None, Some(_)) => "command",
        (None, None) => "shell",
    };

    info!(version = env!("CARGO_PKG_VERSION"), pid = std::process::id(), mode, "Starting langxa interpreter");

    let mut interpreter = Interpreter::with_config(
        std::io::stdout(),
        ParserConfig { max_nesting: config.max_nesting },
        EvaluatorConfig { max_call_depth: config.max_depth },
    );

    if let Some(path) = &config.script {
        let source = std::fs::read_to_string(path)?;
        interpreter.run(&path.display().to_string(), &source)?;
    } else if let Some(command) = &config.command {
        interpreter.run("<string>", command)?;
    } else {
        let stdin = std::io::stdin();
        Repl::new(interpreter).run(stdin.lock(), std::io::stderr())?;
        return Ok(());
    }

    interpreter.output_mut().flush()?;
    Ok(())
}
