use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::day::{bucket_file_name, date_key, local_date};
use crate::error::ConfigError;
use crate::TARGET_STORE;

/// Where the scraper should read feed items from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    /// Neither today's nor yesterday's bucket exists. Nothing to scrape,
    /// which is not an error, but the candidates are kept for reporting.
    Missing { tried: Vec<PathBuf> },
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Found(path) => Some(path),
            Resolution::Missing { .. } => None,
        }
    }
}

/// Resolve `input` to a concrete day bucket.
///
/// A file is used as given. For a directory, today's bucket (in `tz`) wins,
/// then yesterday's, since the most recent run may predate midnight.
pub fn resolve(
    input: impl AsRef<Path>,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Resolution, ConfigError> {
    let input = input.as_ref();
    let metadata = std::fs::metadata(input).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingInput(input.to_path_buf())
        } else {
            ConfigError::Read {
                path: input.to_path_buf(),
                source,
            }
        }
    })?;

    if !metadata.is_dir() {
        return Ok(Resolution::Found(input.to_path_buf()));
    }

    // Yesterday is the previous calendar date in `tz`, not `now` minus 24
    // hours, which lands on the wrong day around DST changes.
    let today = local_date(now, tz);
    let mut tried = Vec::with_capacity(2);
    for day in [Some(today), today.pred_opt()].into_iter().flatten() {
        let candidate = input.join(bucket_file_name(&date_key(day)));
        if candidate.is_file() {
            debug!(target: TARGET_STORE, "Resolved {} to {}", input.display(), candidate.display());
            return Ok(Resolution::Found(candidate));
        }
        tried.push(candidate);
    }

    warn!(
        target: TARGET_STORE,
        "No feed items for today or yesterday in {} (tried {:?})",
        input.display(),
        tried
    );
    Ok(Resolution::Missing { tried })
}
