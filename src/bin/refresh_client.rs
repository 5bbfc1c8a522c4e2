//! Command-line refresh client
//!
//! Usage: `refresh-client [BASE_URL] [--watch MINUTES]`
//!
//! Without `--watch` it runs one refresh (or joins the running one) and
//! prints progress until it finishes. With `--watch` it keeps syncing in the
//! background until Ctrl-C.

use anyhow::{bail, Context};
use market_analyzer::client::{spawn_periodic_sync, ClientPoller, HttpRefreshApi, PollerOptions};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

struct Args {
    base_url: String,
    watch: Option<Duration>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut base_url = std::env::var("MARKET_ANALYZER_URL").ok();
    let mut watch = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--watch" => {
                let minutes: u64 = args
                    .next()
                    .context("--watch needs a number of minutes")?
                    .parse()
                    .context("--watch minutes must be a positive integer")?;
                if minutes == 0 {
                    bail!("--watch minutes must be a positive integer");
                }
                watch = Some(Duration::from_secs(minutes * 60));
            }
            other if other.starts_with("--") => bail!("unknown option {}", other),
            other => base_url = Some(other.to_string()),
        }
    }

    Ok(Args {
        base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        watch,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    market_analyzer::init_tracing("market_analyzer=info");

    let args = parse_args()?;
    let api = Arc::new(HttpRefreshApi::new(&args.base_url)?);
    let poller = Arc::new(ClientPoller::new(api, PollerOptions::default()));

    if let Some(every) = args.watch {
        tracing::info!("Syncing {} every {:?}", args.base_url, every);
        let handle = spawn_periodic_sync(poller, every);
        tokio::signal::ctrl_c().await?;
        handle.abort();
        return Ok(());
    }

    let outcome = poller
        .run_refresh_and_wait(|update| {
            let label = update.view.label.as_deref().unwrap_or("Waiting");
            let slow = if update.view.taking_longer_than_usual {
                " (taking longer than usual)"
            } else {
                ""
            };
            println!("[{:>3}%] {}{}", update.view.percent, label, slow);
        })
        .await?;

    if outcome.joined {
        println!("Joined a refresh that was already running");
    }
    match outcome.latest {
        Some(snapshot) => {
            println!(
                "Snapshot {} generated at {}: {} stocks, {} FX pairs, {} cryptos, {} error(s)",
                snapshot.run_id,
                snapshot.generated_at,
                snapshot.stocks.len(),
                snapshot.fx.len(),
                snapshot.crypto.len(),
                snapshot.errors.len()
            );
            println!("Mood: {}", snapshot.guidance.public_mood);
        }
        None => println!("No snapshot available"),
    }
    println!("{} snapshot(s) in history", outcome.history.len());
    Ok(())
}
