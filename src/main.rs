use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pepper::config::DEFAULT_EXCEPTIONS_FILE;
use pepper::{
    Account, Config, ConfigError, GitHubClient, Options, ProtectionEngine, RunSummary,
    ShutdownSignal,
};

#[derive(Parser)]
#[command(name = "pepper")]
#[command(about = "Protect the default branch of every repository a GitHub user or organization owns")]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// GitHub API token
    #[arg(long)]
    token: Option<String>,

    /// GitHub Enterprise URL
    #[arg(long)]
    url: Option<String>,

    /// Organization to include
    #[arg(long)]
    org: Option<String>,

    /// Do not include your user, process --org instead
    #[arg(long)]
    nouser: bool,

    /// Do not change branch settings, just print the changes that would occur
    #[arg(long)]
    dry_run: bool,

    /// JSON file listing repositories to leave alone
    #[arg(long, default_value = DEFAULT_EXCEPTIONS_FILE)]
    exceptions: PathBuf,

    /// Run in debug mode
    #[arg(short, long)]
    debug: bool,

    /// Print version and exit
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            token: self.token,
            enterprise_url: self.url,
            org: self.org,
            nouser: self.nouser,
            dry_run: self.dry_run,
            exceptions_path: self.exceptions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    let config = match Config::from_options(cli.into_options()) {
        Ok(config) => config,
        Err(e) => match e.downcast_ref::<ConfigError>() {
            Some(config_error) => usage_and_exit(&config_error.to_string(), 1),
            None => return Err(e),
        },
    };

    info!("Starting pepper v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = ShutdownSignal::new();
    let _listener = shutdown.listen();

    let client = GitHubClient::new(&config)?;
    let account = Account::resolve(&client, &config.subject).await?;

    let engine = ProtectionEngine::new(&client, &config, shutdown);
    let summary = engine.run(&account).await?;

    print_summary(&summary, config.dry_run);

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Print the problem and the usage text to stderr, then exit
fn usage_and_exit(message: &str, code: i32) -> ! {
    eprintln!("{}\n", message);
    eprintln!("{}", Cli::command().render_help());
    std::process::exit(code);
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if summary.interrupted {
        println!("\nStopped early on request");
    }

    println!("\nSummary:");
    println!("   Pages fetched: {}", summary.pages_fetched);
    println!("   Repositories listed: {}", summary.total_repositories);
    println!("   Filtered out: {}", summary.filtered);
    println!("   Already protected: {}", summary.already_protected);
    if dry_run {
        println!("   Would be protected: {}", summary.would_update);
    } else {
        println!("   Protected now: {}", summary.updated);
    }
    println!("   Skipped: {}", summary.skipped);
    println!("   Failed: {}", summary.failed);
    println!("   Duration: {:.2}s", summary.duration.as_secs_f64());
}
