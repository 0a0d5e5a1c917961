mod cli;
mod config;
mod db;
mod dispatch;
mod error;
mod forecast;
mod mail;
mod report;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::db::{create_pool, run_migrations, SqliteForecastArchive};
use crate::dispatch::{DispatchMode, DispatchOutcome, Dispatcher};
use crate::error::RunError;
use crate::forecast::{ForecastClient, ForecastClientConfig};
use crate::mail::SendmailTransport;

/// Shared HTTP client configuration
const HTTP_TIMEOUT_SECS: u64 = 30;
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;

fn create_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .build()
}

async fn run(cli: Cli) -> Result<Vec<DispatchOutcome>, RunError> {
    let config = Arc::new(AppConfig::load(&cli.config)?);
    tracing::info!(
        recipients = config.recipients.len(),
        locations = config.locations.len(),
        timezone = %config.timezone,
        "Configuration loaded successfully"
    );

    let http_client = create_http_client().map_err(|e| {
        crate::forecast::ForecastError::Network(format!("Failed to create HTTP client: {}", e))
    })?;

    let mut forecast_client = ForecastClient::new(
        http_client,
        ForecastClientConfig {
            base_url: config.api_base_url.clone(),
            api_key: config.darksky_api_key.clone(),
            timezone: config.timezone,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        },
    );

    if cli.persist {
        let pool = create_pool(&config.db).await?;
        run_migrations(&pool).await?;
        forecast_client = forecast_client.with_archive(Arc::new(SqliteForecastArchive::new(pool)));
        tracing::info!(url = %config.db.url, "Forecast archive enabled");
    }

    let mode = if cli.debug {
        DispatchMode::Debug
    } else {
        DispatchMode::Send
    };

    let dispatcher = Dispatcher::new(
        Arc::clone(&config),
        Arc::new(forecast_client),
        Arc::new(SendmailTransport::new(config.sendmail_path.clone())),
        mode,
    );

    let today = chrono::Utc::now().with_timezone(&config.timezone).date_naive();
    dispatcher.run(today).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so debug mails on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groundhandling_forecast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(outcomes) => {
            for outcome in &outcomes {
                tracing::debug!(
                    recipient = outcome.recipient(),
                    outcome = ?outcome,
                    "Recipient done"
                );
            }
            let sent = outcomes
                .iter()
                .filter(|o| matches!(o, DispatchOutcome::Sent { .. }))
                .count();
            tracing::info!(recipients = outcomes.len(), sent = sent, "Forecast run complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "Forecast run failed");
            Err(e.into())
        }
    }
}
