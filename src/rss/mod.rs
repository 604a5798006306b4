//! RSS feed processing module.
//!
//! This module handles the fetching and parsing of syndication feeds.

mod client;
mod fetcher;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::client::{create_http_client, fetch_with_fallback, FetchedBody, FEED_ACCEPT, HTML_ACCEPT};
pub use self::fetcher::FeedFetcher;
pub use self::parser::parse_feed;
pub use self::util::{decode_text, decompress_body, header_value, is_valid_url};
