//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use contentpipe_core::{GatewayClient, StageProgress, join_context, run_pipeline};
use contentpipe_server::dto::PipelineResponse;
use contentpipe_shared::{
    AppConfig, PipelineRequest, PipelineResult, Stage, init_config, load_config, load_config_from,
    resolve_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contentpipe — brainstorm, draft, and edit content with three chained prompts.
#[derive(Parser)]
#[command(
    name = "contentpipe",
    version,
    about = "Run the Idea → Draft → Editor content pipeline against a chat-completion API.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.contentpipe/contentpipe.toml.
    #[arg(long, global = true, env = "CONTENTPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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
    /// Serve the pipeline over HTTP.
    Serve {
        /// Address to bind (overrides [server].host).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides [server].port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Model identifier (overrides [gateway].model).
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run the pipeline once and print the result.
    Run {
        /// The request to write content for.
        message: String,

        /// Inline context text placed ahead of the request.
        #[arg(short, long)]
        context: Option<String>,

        /// Document(s) to read into the context (repeatable).
        #[arg(long = "context-file")]
        context_files: Vec<PathBuf>,

        /// Model identifier (overrides [gateway].model).
        #[arg(short, long)]
        model: Option<String>,

        /// Print the full response JSON instead of the final text.
        #[arg(long)]
        json: bool,

        /// Print every stage's output before the final text.
        #[arg(long)]
        show_stages: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contentpipe=info,tower_http=info",
        1 => "contentpipe=debug,tower_http=debug",
        _ => "contentpipe=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config;
    match cli.command {
        Command::Serve { host, port, model } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            apply_model(&mut config, model);
            cmd_serve(&config).await
        }
        Command::Run {
            message,
            context,
            context_files,
            model,
            json,
            show_stages,
        } => {
            let mut config = resolve_config(config_path.as_deref())?;
            apply_model(&mut config, model);
            let opts = RunOptions {
                context,
                context_files,
                json,
                show_stages,
            };
            cmd_run(&config, &message, &opts).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn apply_model(config: &mut AppConfig, model: Option<String>) {
    if let Some(model) = model {
        config.gateway.model = model;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(config: &AppConfig) -> Result<()> {
    println!(
        "Serving content pipeline on http://{}:{}/content-pipeline",
        config.server.host, config.server.port
    );
    contentpipe_server::serve(config).await?;
    Ok(())
}

struct RunOptions {
    context: Option<String>,
    context_files: Vec<PathBuf>,
    json: bool,
    show_stages: bool,
}

async fn cmd_run(config: &AppConfig, message: &str, opts: &RunOptions) -> Result<()> {
    // Fail on a missing key before reading documents or calling out.
    let api_key = resolve_api_key(&config.gateway)?;

    let context = join_context(opts.context.as_deref(), &opts.context_files)?;
    let request = PipelineRequest::new(message, context)?;
    let client = GatewayClient::new(&config.gateway, api_key)?;

    info!(
        model = client.model(),
        context_files = opts.context_files.len(),
        "running content pipeline"
    );

    let reporter = CliProgress::new();
    let outcome = run_pipeline(&client, &request, &reporter).await;
    reporter.finish();
    let result = outcome?;

    println!("{}", render_result(result, opts)?);
    Ok(())
}

/// Format a finished run for stdout according to `--json` / `--show-stages`.
fn render_result(result: PipelineResult, opts: &RunOptions) -> Result<String> {
    if opts.json {
        let response = PipelineResponse::from(result);
        return Ok(serde_json::to_string_pretty(&response)?);
    }

    let mut out = String::new();
    if opts.show_stages {
        for stage in &result.stages {
            out.push_str(&format!("── {} ──\n{}\n\n", stage.stage, stage.output));
        }
        out.push_str("── Final ──\n");
    }
    out.push_str(&result.final_text);
    Ok(out)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl StageProgress for CliProgress {
    fn stage_started(&self, stage: Stage) {
        let step = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0) + 1;
        let activity = match stage {
            Stage::Idea => "brainstorming",
            Stage::Draft => "drafting",
            Stage::Editor => "polishing",
        };
        self.spinner
            .set_message(format!("[{step}/{}] {stage}: {activity}", Stage::ALL.len()));
    }

    fn stage_completed(&self, stage: Stage, output: &str) {
        self.spinner
            .println(format!("  ✓ {stage} ({} chars)", output.chars().count()));
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&std::path::Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}
