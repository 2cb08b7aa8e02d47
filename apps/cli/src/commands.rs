//! CLI command definitions, routing, and tracing setup.

use bundlescout_resolve::pipeline::resolve_bundles;
use bundlescout_resolve::report::{LogLevel, Progress, Reporter};
use bundlescout_shared::{AppConfig, Bundle, ResolveOptions, init_config, load_config};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bundlescout — find the storefront bundles that include a game.
#[derive(Parser)]
#[command(
    name = "bundlescout",
    version,
    about = "Find every storefront bundle that includes a given app.",
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
    /// Resolve the bundles that include a catalog app.
    Resolve(ResolveArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `bundlescout resolve`.
#[derive(clap::Args)]
pub(crate) struct ResolveArgs {
    /// Catalog app id whose bundles to resolve.
    pub subject_id: String,

    /// Print the resolved bundles as JSON.
    #[arg(long)]
    pub json: bool,

    /// Storefront base URL override.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Storefront country code (the cc query parameter).
    #[arg(long)]
    pub country: Option<String>,

    /// Storefront language (the l query parameter).
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum concurrent bundle page fetches; 0 disables the cap.
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Proxy prefix tried before the built-in fallbacks.
    #[arg(long, env = "BUNDLESCOUT_PROXY")]
    pub proxy: Option<String>,

    /// Skip all proxies and fetch the storefront directly only.
    #[arg(long)]
    pub no_proxy: bool,
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

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = [
        "bundlescout",
        "bundlescout_shared",
        "bundlescout_extract",
        "bundlescout_fetch",
        "bundlescout_resolve",
    ]
    .map(|target| format!("{target}={level}"))
    .join(",");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
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
        Command::Resolve(args) => cmd_resolve(&args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

async fn cmd_resolve(args: &ResolveArgs) -> Result<()> {
    let mut config = load_config()?;

    if let Some(base_url) = &args.base_url {
        let parsed =
            Url::parse(base_url).map_err(|e| eyre!("invalid base URL '{base_url}': {e}"))?;
        config.storefront.base_url = parsed.to_string();
    }
    if let Some(country) = &args.country {
        config.storefront.country = country.clone();
    }
    if let Some(language) = &args.language {
        config.storefront.language = language.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.resolve.concurrency = concurrency;
    }
    if let Some(proxy) = &args.proxy {
        config.proxy.primary = Some(proxy.clone());
    }
    if args.no_proxy {
        config.proxy.enabled = false;
    }

    let opts = ResolveOptions::from(&config);

    info!(
        subject = %args.subject_id,
        concurrency = opts.concurrency,
        proxy = opts.proxy.enabled,
        "resolving bundles"
    );

    let reporter = CliReporter::new();
    let result = resolve_bundles(&args.subject_id, &opts, &reporter).await;
    reporter.finish();
    let bundles = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    print_summary(&args.subject_id, &bundles);
    Ok(())
}

/// Render the resolved bundles as an indented terminal summary.
fn print_summary(subject_id: &str, bundles: &[Bundle]) {
    println!();
    if bundles.is_empty() {
        println!("  No bundles include app {subject_id}.");
        println!();
        return;
    }

    println!("  {} bundle(s) include app {subject_id}:", bundles.len());
    for bundle in bundles {
        println!();
        println!("  {} (bundle {})", bundle.name, bundle.id);
        for item in &bundle.items {
            let name = item.name.as_deref().unwrap_or(item.id.as_str());
            let mut line = format!("    - {name}");
            if let Some(price) = item.price {
                line.push_str(&format!("  ${price:.2}"));
            }
            if let Some(pct) = item.positive_review_pct {
                line.push_str(&format!("  {pct}% positive"));
            }
            println!("{line}");
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI reporter
// ---------------------------------------------------------------------------

/// Terminal reporter: an indicatif bar with log lines printed above it.
///
/// Page bodies and interim snapshots are capabilities this front end does
/// not render, so their trait defaults stay in place.
struct CliReporter {
    bar: ProgressBar,
}

impl CliReporter {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Reporter for CliReporter {
    fn log(&self, level: LogLevel, message: &str) {
        let prefix = match level {
            LogLevel::Info => "·",
            LogLevel::Success => "✓",
            LogLevel::Warning => "!",
            LogLevel::Error => "✗",
        };
        self.bar.println(format!("{prefix} {message}"));
    }

    fn progress(&self, progress: &Progress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.current as u64);
        self.bar.set_message(progress.message.clone());
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

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
