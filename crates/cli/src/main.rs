// negdash - negativation status dashboard, headless

mod dashboard;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "negdash")]
#[command(about = "Reconcile negativation ledgers, registry and extracts into one status table")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (TOML). Defaults to ./negdash.toml, or built-in defaults when absent
    #[arg(long, short, global = true, env = "NEGDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Only log warnings and errors; no summary on stderr
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every source, reconcile, and write the artifact and presentation
    #[command(after_help = "\
Examples:
  negdash run
  negdash run --config /srv/dashboard/negdash.toml
  negdash run --json > result.json")]
    Run {
        /// Print the full reconciliation result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check config and input gates without writing anything
    #[command(after_help = "\
Examples:
  negdash validate
  negdash validate --json")]
    Validate {
        /// Print input fingerprints as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Summarize a previously written artifact
    #[command(after_help = "\
Examples:
  negdash report output/resultado_unificado.xlsx
  negdash report output/resultado_unificado.xlsx --json")]
    Report {
        /// Path to the .xlsx artifact
        artifact: PathBuf,

        /// Print rows and status counts as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  negdash-recon ",
        env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env("NEGDASH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr; stdout is reserved for --json output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };
    init_logging(cli.quiet);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run { json } => dashboard::cmd_run(config, json, cli.quiet),
        Commands::Validate { json } => dashboard::cmd_validate(config, json, cli.quiet),
        Commands::Report { artifact, json } => dashboard::cmd_report(&artifact, json, cli.quiet),
        Commands::Config => dashboard::cmd_config(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
