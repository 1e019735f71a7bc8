//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sitechat_core::{FeedbackRecord, Services, validate_message};
use sitechat_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteChat: answer questions grounded in your own website.
#[derive(Parser)]
#[command(
    name = "sitechat",
    version,
    about = "Website-grounded chat service with a feedback-driven refinement loop.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.sitechat/sitechat.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP server.
    Serve {
        /// Interface to bind (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer a single message and print the reply.
    Ask {
        /// The user message.
        message: String,
    },

    /// Submit feedback on a previous answer.
    Feedback {
        /// thumbs_up or thumbs_down.
        #[arg(long)]
        verdict: String,

        /// The answer being rated.
        #[arg(long)]
        response: String,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

const LOG_TARGETS: &[&str] = &[
    "sitechat_server",
    "sitechat_core",
    "sitechat_catalog",
    "sitechat_extractor",
    "sitechat_generation",
    "sitechat_shared",
    "tower_http",
];

/// Initialize tracing based on CLI flags. `RUST_LOG` wins when set.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Serve { host, port } => {
            let mut config = load_config(config_path)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_serve(config).await
        }
        Command::Ask { message } => cmd_ask(load_config(config_path)?, &message).await,
        Command::Feedback { verdict, response } => {
            cmd_feedback(load_config(config_path)?, &verdict, &response).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(load_config(config_path)?),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(config: AppConfig) -> Result<()> {
    let services = Services::from_config(&config)?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        version = env!("CARGO_PKG_VERSION"),
        "starting sitechat server"
    );
    crate::server::run(&config, services).await
}

async fn cmd_ask(config: AppConfig, message: &str) -> Result<()> {
    let message = validate_message(Some(message))?;
    let services = Services::from_config(&config)?;

    let spinner = Spinner::new("Reading the site and thinking...");
    let result = services.chat.answer(message).await;
    spinner.finish();

    println!("{}", result?.text());
    Ok(())
}

async fn cmd_feedback(config: AppConfig, verdict: &str, response: &str) -> Result<()> {
    let record = FeedbackRecord::parse(Some(verdict), Some(response))?;
    let handler = Services::feedback_from_config(&config)?;

    let spinner = Spinner::new("Submitting feedback...");
    let result = handler.handle(&record).await;
    spinner.finish();

    println!("{}", result?.text());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress spinner
// ---------------------------------------------------------------------------

/// Indicatif spinner shown while a request is in flight.
struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(self) {
        self.bar.finish_and_clear();
    }
}
