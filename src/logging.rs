use std::io;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_STDOUT_FILTER: &str = "info,web_request=warn,store=info,index=info,sqlx=off";
const VERBOSE_STDOUT_FILTER: &str = "debug,html5ever=info,selectors=info,hyper=info,reqwest=info,sqlx=warn";

/// Install the stdout and daily rolling file layers. `RUST_LOG` replaces the
/// stdout filter; `verbose` raises its default to debug.
pub fn configure_logging(verbose: bool) {
    // Readability re-serializes scraped markup and html5ever warns on every
    // oddity it finds.
    let custom_filter = FilterFn::new(|metadata| {
        !(metadata.level() == &Level::WARN && metadata.target() == "html5ever::serialize")
    });

    let default_filter = if verbose {
        VERBOSE_STDOUT_FILTER
    } else {
        DEFAULT_STDOUT_FILTER
    };
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter)
        .with_filter(custom_filter);

    let file_appender = rolling::daily("logs", "news_crawler.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new("web_request=debug,store=debug,index=debug,info,sqlx=info"));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .try_init();
}
