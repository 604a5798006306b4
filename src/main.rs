use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use news_crawler::index::{self, IndexWriter};
use news_crawler::logging::configure_logging;
use news_crawler::rss::{create_http_client, FeedFetcher, FetchOptions};
use news_crawler::scraper::{ScrapeOptions, Scraper};
use news_crawler::sources::load_sources;
use news_crawler::store::{resolve, DayStore, Resolution};

mod cli;

use cli::{Cli, Command, FeedsArgs, ScrapeArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Feeds(args) => args.common.verbose,
        Command::Scrape(args) => args.common.verbose,
    };
    configure_logging(verbose);

    match cli.command {
        Command::Feeds(args) => run_feeds(args).await,
        Command::Scrape(args) => run_scrape(args).await,
    }
}

/// Cancellation flag flipped by Ctrl-C or, when given, by the deadline.
fn cancellation(deadline: Option<Duration>) -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);

    let on_signal = Arc::clone(&cancel_tx);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
            return;
        }
        warn!("Interrupted, finishing in-flight requests");
        let _ = on_signal.send(true);
    });

    if let Some(deadline) = deadline {
        tokio::spawn(async move {
            sleep(deadline).await;
            warn!("Deadline of {:?} reached, finishing in-flight requests", deadline);
            let _ = cancel_tx.send(true);
        });
    }

    cancel_rx
}

async fn run_feeds(args: FeedsArgs) -> Result<()> {
    // Configuration problems surface before any request is made.
    let tz = args.common.timezone()?;
    let sources = load_sources(&args.file)?;
    let client = create_http_client()?;

    let mut options = FetchOptions {
        workers: args.common.workers,
        retries: args.retries,
        retry_delay: Duration::from_secs(args.retry_delay),
        ..FetchOptions::default()
    };
    if let Some(request_timeout) = args.common.request_timeout() {
        options.request_timeout = request_timeout;
    }

    let fetcher = FeedFetcher::new(client, options)
        .with_cancellation(cancellation(args.common.deadline()));

    let start = Instant::now();
    let report = fetcher.fetch(&sources).await;
    info!(
        "Downloaded {} feeds with {} items in {:?}",
        report.feeds.len(),
        report.total_items(),
        start.elapsed()
    );

    if report.failure_count() > 0 {
        warn!("{} of {} feeds failed", report.failure_count(), report.feeds.len());
        if args.common.verbose {
            for feed in report.failed_feeds() {
                warn!(
                    "  {}: {}",
                    feed.source_url,
                    feed.fetch_error.as_deref().unwrap_or_default()
                );
            }
        }
    }

    let store = DayStore::new(args.out, tz);
    let path = store
        .store(&report.feeds, Utc::now())
        .with_context(|| format!("storing feeds in {}", store.dir().display()))?;
    info!("Feed items written to {}", path.display());

    Ok(())
}

async fn run_scrape(args: ScrapeArgs) -> Result<()> {
    let tz = args.common.timezone()?;

    let path = match resolve(&args.file, tz, Utc::now())? {
        Resolution::Found(path) => path,
        Resolution::Missing { .. } => {
            info!(
                "Articles: 0 successful, 0 failures in 0s from {}",
                args.file.display()
            );
            return Ok(());
        }
    };

    let mut options = ScrapeOptions {
        workers: args.common.workers,
        min_body_chars: args.min_body_chars,
        ..ScrapeOptions::default()
    };
    if let Some(request_timeout) = args.common.request_timeout() {
        options.request_timeout = request_timeout;
    }

    let client = create_http_client()?;
    let index = index::connect(&args.index_url)
        .await
        .with_context(|| format!("opening index {}", args.index_url))?;
    let writer = IndexWriter::new(index);

    let scraper = Scraper::from_path(client, &path, options)?
        .with_cancellation(cancellation(args.common.deadline()));

    let start = Instant::now();
    let run = scraper.scrape(&writer, args.common.verbose).await?;
    info!(
        "Articles: {} successful, {} failures in {:?} from {} into {}",
        run.succeeded(),
        run.failed,
        start.elapsed(),
        path.display(),
        writer.location()
    );

    Ok(())
}
