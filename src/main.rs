//! tickerdeck - headless dashboard driver.
//!
//! Loads configuration and stored preferences, activates the market tab and
//! logs the watchlist whenever fresh quotes arrive, until Ctrl-C.

use anyhow::Context;
use tickerdeck::state::{QuoteSnapshot, WatchlistSummary};
use tickerdeck::{App, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let log_dir = tickerdeck::config::log_dir().context("resolving log directory")?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tickerdeck.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickerdeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    // Load configuration
    let config = Config::load_or_default().context("loading configuration")?;
    tracing::info!("Using backend {}", config.api.base_url);

    // Run the application
    let mut app = App::new(&config).context("starting application")?;
    app.sync_views();

    let mut reader = app
        .market_reader()
        .cloned()
        .context("market view did not activate")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            open = reader.changed() => {
                if !open {
                    break;
                }
                log_summary(&app.watchlist_summary(), app.benchmark_quote().as_deref());
            }
        }
    }

    app.shutdown().await;
    Ok(())
}

fn log_summary(summary: &WatchlistSummary, benchmark: Option<&QuoteSnapshot>) {
    if let Some(q) = benchmark {
        tracing::info!(
            "{} {} ({}%)",
            q.symbol,
            q.price.round_dp(2),
            q.percent_change.round_dp(2)
        );
    }
    for row in &summary.rows {
        match &row.quote {
            Some(q) => tracing::info!(
                "{:<6} {:>10} {:>7}%  {}",
                row.symbol,
                q.price.round_dp(2),
                q.percent_change.round_dp(2),
                row.name
            ),
            None => tracing::info!("{:<6} {:>10}  {}", row.symbol, "--", row.name),
        }
    }
    tracing::info!(
        "{} up / {} down / {} flat{}",
        summary.gainers,
        summary.losers,
        summary.neutral,
        if summary.any_simulated {
            " (simulated data)"
        } else {
            ""
        }
    );
}
