//! Gold/egg price tracker CLI.
//!
//! Commands:
//! - `run`: fetch both prices, update the history, render the dashboard,
//!   and mail the report when SMTP settings are present (default)
//! - `fetch`: fetch and print only; nothing is written
//! - `render`: rebuild the dashboard page from the stored history

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gold_egg_tracker_core::config::{MailConfig, TrackerConfig};
use gold_egg_tracker_core::services::notification_service::{Notifier, NotifyOutcome};
use gold_egg_tracker_core::PriceTracker;

use logging::{init_logging, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "gold-egg-tracker",
    about = "Scrape gold and egg prices, track their ratio, publish a dashboard"
)]
struct Cli {
    /// History file (JSON). Defaults to data/price_history.json.
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Dashboard output file. Defaults to index.html.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full daily run: fetch, record, render, notify.
    Run {
        /// Do not send the report mail even if SMTP is configured.
        #[arg(long, default_value_t = false)]
        no_email: bool,
    },
    /// Fetch and print today's prices without writing anything.
    Fetch,
    /// Regenerate the dashboard from stored history.
    Render,
}

fn build_config(cli: &Cli) -> TrackerConfig {
    let mut config = TrackerConfig::default();
    if let Some(path) = &cli.history {
        config.history_path = path.clone();
    }
    if let Some(path) = &cli.output {
        config.html_path = path.clone();
    }
    config
}

async fn run(tracker: &PriceTracker, no_email: bool) -> Result<()> {
    let report = tracker
        .run()
        .await
        .context("failed to write the dashboard page")?;

    print!("{}", tracker.formatter().format_summary(&report.record));
    println!("生成的文件: {}", tracker.config().html_path.display());

    if no_email {
        return Ok(());
    }

    let mail = match MailConfig::from_env() {
        Ok(mail) => mail,
        Err(e) => {
            tracing::warn!(error = %e, "invalid mail settings, skipping notification");
            None
        }
    };

    let notifier = Notifier::new(mail, tracker.config().alert_threshold);
    match notifier.notify(&report.record, &report.history).await {
        Ok(NotifyOutcome::Sent { recipients }) => {
            tracing::info!(recipients, "report mail sent");
        }
        Ok(NotifyOutcome::Skipped) => {}
        Err(e) => {
            tracing::warn!(error = %e, "report mail failed");
        }
    }

    Ok(())
}

async fn execute(cli: Cli) -> Result<()> {
    let tracker = PriceTracker::new(build_config(&cli));

    match cli.command.unwrap_or(Commands::Run { no_email: false }) {
        Commands::Run { no_email } => run(&tracker, no_email).await,
        Commands::Fetch => {
            let record = tracker.collect().await;
            print!("{}", tracker.formatter().format_summary(&record));
            Ok(())
        }
        Commands::Render => {
            let history = tracker
                .render_only()
                .context("failed to write the dashboard page")?;
            println!(
                "生成的文件: {} ({} 条记录)",
                tracker.config().html_path.display(),
                history.len()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is the normal case in CI, where the environment is set directly.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = init_logging(LoggingConfig::from_env().with_verbose(cli.verbose)) {
        eprintln!("logging init failed: {e}");
    }

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
