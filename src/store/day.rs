use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::rss::{Feed, FeedItem};
use crate::TARGET_STORE;

/// All feeds fetched on one calendar day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DayBucket {
    pub date: String,
    #[serde(default)]
    pub feeds: Vec<Feed>,
}

impl DayBucket {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            feeds: Vec::new(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &FeedItem> {
        self.feeds.iter().flat_map(|feed| feed.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.feeds.iter().map(|feed| feed.items.len()).sum()
    }
}

/// Day key for `now` in `tz`, formatted `d-m-yyyy` without zero padding.
pub fn day_key(now: DateTime<Utc>, tz: Tz) -> String {
    date_key(local_date(now, tz))
}

/// Day key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%-d-%-m-%Y").to_string()
}

/// The calendar date `now` falls on in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

pub fn bucket_file_name(key: &str) -> String {
    format!("{}.json", key)
}

/// Read a day bucket from disk.
pub fn load_bucket(path: impl AsRef<Path>) -> Result<DayBucket, StorageError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StorageError::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

/// Day-bucketed feed storage under one output directory.
#[derive(Debug, Clone)]
pub struct DayStore {
    dir: PathBuf,
    tz: Tz,
}

impl DayStore {
    pub fn new(dir: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            dir: dir.into(),
            tz,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, now: DateTime<Utc>) -> PathBuf {
        self.dir.join(bucket_file_name(&day_key(now, self.tz)))
    }

    /// Merge `feeds` into the bucket for the day `now` falls on.
    ///
    /// Existing feeds and items are kept; new feeds are appended as-is. The
    /// record is replaced by rename, so readers see either the old or the new
    /// file and never a partial one.
    pub fn store(&self, feeds: &[Feed], now: DateTime<Utc>) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let key = day_key(now, self.tz);
        let path = self.dir.join(bucket_file_name(&key));

        let mut bucket = if path.exists() {
            let existing = load_bucket(&path)?;
            debug!(target: TARGET_STORE, "Merging into existing bucket {} ({} feeds)", path.display(), existing.feeds.len());
            existing
        } else {
            DayBucket::new(key)
        };
        bucket.feeds.extend(feeds.iter().cloned());

        self.write_atomic(&path, &bucket)?;
        info!(target: TARGET_STORE, "Stored {} feeds ({} items total) in {}", feeds.len(), bucket.item_count(), path.display());
        Ok(path)
    }

    fn write_atomic(&self, path: &Path, bucket: &DayBucket) -> Result<(), StorageError> {
        // Same directory as the target so the rename never crosses filesystems.
        let tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, bucket).map_err(|source| {
                StorageError::Serialization {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            writer.flush().map_err(|e| StorageError::io(tmp.path(), e))?;
        }
        tmp.as_file().sync_all().map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|source| StorageError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed(url: &str, links: &[&str]) -> Feed {
        Feed {
            source_url: url.to_string(),
            title: None,
            items: links
                .iter()
                .map(|link| FeedItem {
                    title: format!("Title {}", link),
                    link: link.to_string(),
                    published_at: None,
                    summary: String::new(),
                    source_feed_url: url.to_string(),
                })
                .collect(),
            fetch_error: None,
        }
    }

    #[test]
    fn test_day_key_has_no_padding() {
        let now = Utc.with_ymd_and_hms(2024, 11, 3, 12, 0, 0).unwrap();
        assert_eq!(day_key(now, chrono_tz::Europe::Berlin), "3-11-2024");
    }

    #[test]
    fn test_day_key_uses_timezone() {
        // 23:30 UTC on Nov 3rd is already Nov 4th in Berlin
        let now = Utc.with_ymd_and_hms(2024, 11, 3, 23, 30, 0).unwrap();
        assert_eq!(day_key(now, chrono_tz::UTC), "3-11-2024");
        assert_eq!(day_key(now, chrono_tz::Europe::Berlin), "4-11-2024");
        assert_eq!(day_key(now, chrono_tz::America::New_York), "3-11-2024");
    }

    #[test]
    fn test_date_key_matches_day_key() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let date = local_date(now, chrono_tz::Europe::Berlin);
        assert_eq!(date_key(date), "9-3-2024");
        assert_eq!(date_key(date), day_key(now, chrono_tz::Europe::Berlin));
    }

    #[test]
    fn test_store_creates_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path().join("feeds"), chrono_tz::Europe::Berlin);
        let now = Utc.with_ymd_and_hms(2024, 11, 3, 12, 0, 0).unwrap();

        let path = store.store(&[feed("https://a.example/rss", &["https://a.example/1"])], now).unwrap();
        assert_eq!(path, dir.path().join("feeds").join("3-11-2024.json"));

        let bucket = load_bucket(&path).unwrap();
        assert_eq!(bucket.date, "3-11-2024");
        assert_eq!(bucket.item_count(), 1);
    }

    #[test]
    fn test_store_twice_is_additive() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path(), chrono_tz::UTC);
        let morning = Utc.with_ymd_and_hms(2024, 11, 3, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 11, 3, 20, 0, 0).unwrap();

        store
            .store(&[feed("https://a.example/rss", &["https://a.example/1", "https://a.example/2"])], morning)
            .unwrap();
        let path = store
            .store(&[feed("https://a.example/rss", &["https://a.example/2", "https://a.example/3"])], evening)
            .unwrap();

        let bucket = load_bucket(&path).unwrap();
        assert_eq!(bucket.feeds.len(), 2);
        // duplicates are kept, suppression is not the store's job
        assert_eq!(bucket.item_count(), 4);
        let links: Vec<_> = bucket.items().map(|i| i.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://a.example/1",
                "https://a.example/2",
                "https://a.example/2",
                "https://a.example/3"
            ]
        );
    }

    #[test]
    fn test_store_keeps_failed_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path(), chrono_tz::UTC);
        let mut failed = feed("https://down.example/rss", &[]);
        failed.fetch_error = Some("HTTP status 500 Internal Server Error".to_string());

        let path = store.store(&[failed.clone()], Utc::now()).unwrap();
        let bucket = load_bucket(&path).unwrap();
        assert_eq!(bucket.feeds, vec![failed]);
    }

    #[test]
    fn test_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path(), chrono_tz::UTC);
        store.store(&[feed("https://a.example/rss", &["https://a.example/1"])], Utc::now()).unwrap();
        store.store(&[feed("https://b.example/rss", &["https://b.example/1"])], Utc::now()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_store_rejects_corrupt_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = DayStore::new(dir.path(), chrono_tz::UTC);
        let now = Utc::now();
        fs::write(store.path_for(now), "{ not json").unwrap();

        let err = store.store(&[], now).unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
        // the corrupt record is left for an operator to inspect
        assert_eq!(fs::read_to_string(store.path_for(now)).unwrap(), "{ not json");
    }
}
