pub mod error;
pub mod index;
pub mod logging;
pub mod rss;
pub mod scraper;
pub mod sources;
pub mod store;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_STORE: &str = "store";
pub const TARGET_INDEX: &str = "index";
