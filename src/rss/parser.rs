//! Feed parsing logic for RSS, Atom, and JSON formats.

use feed_rs::parser;
use std::io::Cursor;
use tracing::debug;

use super::types::{Feed, FeedItem};
use super::util::cleanup_xml;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Parse a feed document into a [`Feed`] for `source_url`.
///
/// Malformed XML gets one more attempt after [`cleanup_xml`]. Entries without
/// any link are dropped since nothing downstream can use them.
pub fn parse_feed(body: &str, source_url: &str) -> Result<Feed, FetchError> {
    let parsed = match parser::parse(Cursor::new(body.as_bytes())) {
        Ok(feed) => feed,
        Err(first_err) => {
            let cleaned = cleanup_xml(body);
            if !(cleaned.contains("<rss") || cleaned.contains("<feed") || cleaned.contains("<rdf")) {
                return Err(FetchError::Parse(format!(
                    "not an RSS or Atom document ({}); preview: {}",
                    first_err,
                    preview(body)
                )));
            }
            match parser::parse(Cursor::new(cleaned.as_bytes())) {
                Ok(feed) => {
                    debug!(target: TARGET_WEB_REQUEST, "Feed {} parsed after XML cleanup", source_url);
                    feed
                }
                Err(second_err) => {
                    return Err(FetchError::Parse(format!(
                        "first error: {}, after cleanup: {}",
                        first_err, second_err
                    )));
                }
            }
        }
    };

    let mut dropped = 0;
    let items = parsed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let Some(link) = entry.links.first().map(|l| l.href.trim().to_string()) else {
                dropped += 1;
                return None;
            };
            Some(FeedItem {
                title: entry
                    .title
                    .map(|t| t.content.trim().to_string())
                    .unwrap_or_default(),
                link,
                published_at: entry.published.or(entry.updated),
                summary: entry
                    .summary
                    .map(|s| s.content.trim().to_string())
                    .unwrap_or_default(),
                source_feed_url: source_url.to_string(),
            })
        })
        .collect::<Vec<_>>();

    if dropped > 0 {
        debug!(target: TARGET_WEB_REQUEST, "Dropped {} entries without a link from {}", dropped, source_url);
    }

    Ok(Feed {
        source_url: source_url.to_string(),
        title: parsed.title.map(|t| t.content.trim().to_string()),
        items,
        fetch_error: None,
    })
}

fn preview(body: &str) -> String {
    if body.chars().all(|c| c.is_ascii_graphic() || c.is_whitespace()) {
        body.chars().take(100).collect()
    } else {
        "[binary data]".to_string()
    }
}
