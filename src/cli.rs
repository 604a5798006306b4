//! Command-line interface for the crawler binary.
//!
//! Every flag can also come from the environment, so the two commands can run
//! from cron with nothing but a few exported variables.

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use news_crawler::error::ConfigError;
use std::path::PathBuf;
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch all listed feeds and store their items in today's bucket
    Feeds(FeedsArgs),

    /// Scrape the articles of a stored bucket into the search index
    Scrape(ScrapeArgs),
}

/// Flags shared by both commands.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// IANA timezone that decides which day a run belongs to
    #[arg(short, long, env = "NEWS_CRAWLER_TIMEZONE", default_value = "Europe/Berlin")]
    pub timezone: String,

    /// Concurrent requests
    #[arg(short, long, env = "NEWS_CRAWLER_WORKERS", default_value_t = 20)]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "NEWS_CRAWLER_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Stop issuing new requests after this many seconds
    #[arg(long, env = "NEWS_CRAWLER_DEADLINE")]
    pub deadline: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_secs)
    }
}

#[derive(Args, Debug)]
pub struct FeedsArgs {
    /// Path to a file with feeds
    #[arg(short, long, env = "NEWS_CRAWLER_FEEDS", default_value = "feeds/feeds_de.txt")]
    pub file: PathBuf,

    /// Directory where to store the feed items
    #[arg(short, long, env = "NEWS_CRAWLER_OUT", default_value = "out/feeds/")]
    pub out: PathBuf,

    /// Attempts after the first failed fetch of a feed
    #[arg(long, default_value_t = 2)]
    pub retries: usize,

    /// Seconds to wait between fetch attempts
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Path to a JSON bucket, or a directory of buckets
    #[arg(short, long, env = "NEWS_CRAWLER_ITEMS", default_value = "out/feeds")]
    pub file: PathBuf,

    /// Search index: http(s)://host:port/index, sqlite:path or memory:
    #[arg(long, env = "INDEX_URL", default_value = "http://localhost:9200/news")]
    pub index_url: String,

    /// Minimum characters of extracted text for an article to count
    #[arg(long, default_value_t = news_crawler::scraper::MIN_BODY_CHARS)]
    pub min_body_chars: usize,

    #[command(flatten)]
    pub common: CommonArgs,
}
