//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use fieldfill_core::coordinator::Coordinator;
use fieldfill_core::page::{FillOutcome, PageSession, SETUP_REQUIRED_MESSAGE};
use fieldfill_core::protocol::{
    BackgroundClient, BackgroundRequest, PageClient, PageRequest, PageResponse,
};
use fieldfill_core::{bus, share};
use fieldfill_dom::Document;
use fieldfill_provider::AnthropicFactory;
use fieldfill_shared::{
    AppConfig, EXAMPLE_SYSTEM_PROMPT, FillSettings, init_config, load_config, resolve_api_key,
    validate_system_prompt,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

/// Queued requests per bus before senders wait.
const BUS_CAPACITY: usize = 16;

/// Timeout for fetching a page given by URL.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// fieldfill: fill web forms with AI-generated values.
#[derive(Parser)]
#[command(
    name = "fieldfill",
    version,
    about = "Detect fillable form fields in an HTML page and fill them with AI-generated values.",
    long_about = None,
)]
pub(crate) struct Cli {
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
    /// List the fillable fields of a page without filling anything.
    Scan {
        /// HTML file path or http(s) URL.
        source: String,
    },

    /// Fill the forms of a page and write the resulting HTML.
    Fill {
        /// HTML file path or http(s) URL.
        source: String,

        /// System prompt (overrides the configured one).
        #[arg(short, long, conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the system prompt from a file.
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Where to write the filled HTML (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check that the configured API key is accepted.
    TestConnection,

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
    /// Print an example system prompt.
    ExamplePrompt,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "fieldfill=info",
        1 => "fieldfill=debug",
        _ => "fieldfill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so filled HTML on stdout stays clean.
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
    match cli.command {
        Command::Scan { source } => cmd_scan(&source).await,
        Command::Fill {
            source,
            prompt,
            prompt_file,
            out,
        } => cmd_fill(&source, prompt, prompt_file.as_deref(), out.as_deref()).await,
        Command::TestConnection => cmd_test_connection().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
            ConfigAction::ExamplePrompt => cmd_config_example_prompt().await,
        },
    }
}

// ---------------------------------------------------------------------------
// In-process page + background wiring
// ---------------------------------------------------------------------------

/// A page session and the coordinator it talks to, both on this runtime.
struct Pipeline {
    session: Arc<PageSession>,
    popup: PageClient,
    background: BackgroundClient,
}

impl Pipeline {
    fn start(doc: Document, config: &AppConfig) -> Self {
        let (background, background_rx) = bus::channel(BUS_CAPACITY);
        let factory = Arc::new(AnthropicFactory::new(config.anthropic.clone()));
        Coordinator::new(factory, config.fill.max_concurrency).spawn(background_rx);

        let session = Arc::new(PageSession::new(share(doc), background.clone()));
        let (popup, page_rx) = bus::channel(BUS_CAPACITY);
        session.clone().spawn(page_rx);

        Self {
            session,
            popup,
            background,
        }
    }
}

/// Read HTML from a file or fetch it from an http(s) URL.
async fn load_source(source: &str) -> Result<Document> {
    let html = if source.starts_with("http://") || source.starts_with("https://") {
        let url = Url::parse(source).map_err(|e| eyre!("invalid URL '{source}': {e}"))?;
        fetch(&url).await?
    } else {
        std::fs::read_to_string(source).wrap_err_with(|| format!("cannot read '{source}'"))?
    };
    Ok(Document::parse(&html))
}

async fn fetch(url: &Url) -> Result<String> {
    info!(%url, "fetching page");
    let client = reqwest::Client::builder()
        .user_agent(concat!("fieldfill/", env!("CARGO_PKG_VERSION")))
        .timeout(FETCH_TIMEOUT)
        .build()?;
    let html = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(html)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner shown while the batch is out.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(message: &str) -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message(message.to_string());
        Ok(Self { spinner })
    }

    fn phase(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn done(&self) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scan(source: &str) -> Result<()> {
    let config = load_config()?;
    let doc = load_source(source).await?;
    let pipeline = Pipeline::start(doc, &config);

    let response = pipeline.popup.request(PageRequest::GetFieldCount).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    if let PageResponse::FieldCount { count, .. } = response {
        info!(count, "scan complete");
    }
    Ok(())
}

async fn cmd_fill(
    source: &str,
    prompt: Option<String>,
    prompt_file: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    let mut settings = FillSettings::from_config(&config);

    if let Some(path) = prompt_file {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read prompt file '{}'", path.display()))?;
        settings.system_prompt = Some(text);
    } else if prompt.is_some() {
        settings.system_prompt = prompt;
    }
    if let Some(prompt) = &settings.system_prompt {
        validate_system_prompt(prompt)?;
    }
    if settings.api_key.is_some() {
        settings.api_key = Some(resolve_api_key(&config)?);
    }

    let doc = load_source(source).await?;
    let pipeline = Pipeline::start(doc, &config);

    let progress = CliProgress::new("Filling fields")?;
    let outcome = pipeline.session.fill_with_settings(&settings).await;
    progress.phase("Waiting for visual feedback to settle");
    pipeline.session.timers().settle().await;
    progress.done();

    match outcome? {
        FillOutcome::NotConfigured => {
            return Err(eyre!(
                "{SETUP_REQUIRED_MESSAGE} Pass --prompt or set [prompt] system_prompt, and export {}.",
                config.anthropic.api_key_env
            ));
        }
        FillOutcome::Rejected(error) => return Err(eyre!("fill failed: {error}")),
        FillOutcome::NoFields => {
            eprintln!("No fillable fields found on this page.");
            return Ok(());
        }
        FillOutcome::Filled(summary) => eprintln!("{}", summary.message()),
    }

    let html = pipeline.session.document().lock().await.to_html();
    match out {
        Some(path) => {
            std::fs::write(path, html)
                .wrap_err_with(|| format!("cannot write '{}'", path.display()))?;
            eprintln!("Filled page written to {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

async fn cmd_test_connection() -> Result<()> {
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;
    let pipeline = Pipeline::start(Document::default(), &config);

    let progress = CliProgress::new("Testing API connection")?;
    let response = pipeline
        .background
        .request(BackgroundRequest::TestConnection {
            api_key: Some(api_key),
        })
        .await;
    progress.done();

    let response = response?;
    if response.success {
        println!("{}", response.message.unwrap_or_default());
        Ok(())
    } else {
        Err(eyre!(
            "connection failed: {}",
            response.error.unwrap_or_else(|| "unknown error".into())
        ))
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

async fn cmd_config_example_prompt() -> Result<()> {
    println!("{EXAMPLE_SYSTEM_PROMPT}");
    Ok(())
}
