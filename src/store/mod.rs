//! Day-bucketed persistence of fetched feeds and lookup of the most recent
//! bucket for scraping.

mod day;
mod resolver;

pub use self::day::{bucket_file_name, date_key, day_key, load_bucket, local_date, DayBucket, DayStore};
pub use self::resolver::{resolve, Resolution};
