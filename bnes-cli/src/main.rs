//! Command line runner that checks the council page once and reminds everyone about tomorrow's collections.

mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bnes_channel_email as email;
use bnes_channel_slack as slack;
use bnes_channel_twitter as twitter;
use bnes_core::{
    ChannelRegistry, NotificationChannel, Notifier, NotifyOutcome, RunConfig, due_tomorrow,
    extract_collections, fetch_page,
};
use chrono::{Local, NaiveDate};
use clap::Parser;
use reqwest::Client;

#[derive(Debug, Parser)]
#[command(
    name = "bnes",
    version,
    about = "Send reminders the day before a waste collection"
)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Run as if today were this date (YYYY-MM-DD).
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Notify about every listed collection, whatever its date.
    #[arg(long)]
    ignore_date_check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RunConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let _log_guard = logging::init(&config.logging)?;

    run(&cli, &config)
        .await
        .inspect_err(|err| tracing::error!("run aborted: {err:#}"))
}

async fn run(cli: &Cli, config: &RunConfig) -> Result<()> {
    // Every network call shares this bound
    let client = Client::builder()
        .user_agent(&config.http.user_agent)
        .timeout(config.http.timeout())
        .build()?;

    let page = fetch_page(&client, &config.target_url, &config.diagnostics_dir).await?;
    let collections =
        extract_collections(&page).context("collections page no longer has the expected layout")?;

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let ignore_date_check = cli.ignore_date_check || config.ignore_date_check;
    let found = collections.len();
    let due = due_tomorrow(collections, today, ignore_date_check);
    tracing::info!(%today, found, due = due.len(), ignore_date_check, "checked collections");

    let registry = Arc::new(build_registry(client, config));
    tracing::debug!(channels = ?registry.methods().collect::<Vec<_>>(), "channels registered");
    let notifier = Notifier::new(registry, config.send_notification);

    let mut failures = 0;
    for event in &due {
        let notification = notifier.notify(event, &config.users).await;
        if matches!(notification.outcome, NotifyOutcome::Previewed) {
            print_preview(&notification.message);
        }
        failures += notification.failures();
    }

    if failures > 0 {
        tracing::warn!(failures, "some notifications were not delivered");
    }

    Ok(())
}

// Only channels with credentials are registered; recipients of the others are reported.
fn build_registry(client: Client, config: &RunConfig) -> ChannelRegistry {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if let Some(sender) = &config.email_sender {
        channels.push(email::channel(sender.clone(), config.http.timeout()));
    }
    if let Some(keys) = &config.twitter_api {
        channels.push(twitter::channel(client.clone(), keys.clone()));
    }
    if let Some(login) = &config.slack_login {
        channels.push(slack::channel(client, login.clone()));
    }

    ChannelRegistry::new(channels)
}

#[expect(clippy::print_stdout, reason = "previews are the operator-facing output")]
fn print_preview(message: &str) {
    println!("{message}");
}
