//! Loading the list of feeds to fetch.

use std::path::Path;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::rss::{is_valid_url, FeedSource};
use crate::TARGET_WEB_REQUEST;

/// Read feed sources from a line-oriented file.
///
/// Each non-empty line not starting with `#` holds a URL, optionally followed
/// by whitespace and a free-form label. Order is preserved.
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<FeedSource>, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let sources = parse_sources(&contents);
    debug!(target: TARGET_WEB_REQUEST, "Loaded {} feed sources from {}", sources.len(), path.display());
    Ok(sources)
}

pub fn parse_sources(contents: &str) -> Vec<FeedSource> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (url, label) = match line.split_once(char::is_whitespace) {
                Some((url, label)) => (url, Some(label.trim().to_string())),
                None => (line, None),
            };
            if !is_valid_url(url) {
                warn!(target: TARGET_WEB_REQUEST, "Skipping invalid feed URL: {}", url);
                return None;
            }
            Some(FeedSource {
                url: url.to_string(),
                label: label.filter(|l| !l.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_sources_skips_comments_and_blanks() {
        let contents = "\
# German feeds
https://www.tagesschau.de/xml/rss2

   https://www.spiegel.de/schlagzeilen/index.rss   Spiegel Online
# https://disabled.example.com/rss
";
        let sources = parse_sources(contents);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], FeedSource::new("https://www.tagesschau.de/xml/rss2"));
        assert_eq!(sources[1].url, "https://www.spiegel.de/schlagzeilen/index.rss");
        assert_eq!(sources[1].label.as_deref(), Some("Spiegel Online"));
    }

    #[test]
    fn test_parse_sources_skips_invalid_urls() {
        let sources = parse_sources("not-a-url\nftp://example.com/feed\nhttps://example.com/feed\n");
        assert_eq!(sources, vec![FeedSource::new("https://example.com/feed")]);
    }

    #[test]
    fn test_load_sources_empty_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();
        assert!(load_sources(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_sources_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sources(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
