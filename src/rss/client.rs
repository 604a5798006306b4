//! HTTP client creation and request handling for feeds and articles.

use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::util::{decode_text, decompress_body, header_value};
use crate::error::{ConfigError, FetchError};
use crate::TARGET_WEB_REQUEST;

const STANDARD_USER_AGENT: &str = concat!("news_crawler/", env!("CARGO_PKG_VERSION"));
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:138.0) Gecko/20100101 Firefox/138.0";

pub const FEED_ACCEPT: &str = "application/feed+json, application/json, application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9";
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Build the shared client for one run. Per-request timeouts are applied by
/// the callers so a slow host only ever holds its own worker slot.
pub fn create_http_client() -> Result<reqwest::Client, ConfigError> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(ConfigError::HttpClient)
}

/// A success response read to the end.
#[derive(Debug)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

impl FetchedBody {
    /// Decompress and charset-decode the body.
    pub fn into_text(self, url: &str) -> Result<String, FetchError> {
        let bytes = decompress_body(&self.bytes, self.content_encoding.as_deref(), url);
        decode_text(bytes, self.content_type.as_deref()).ok_or(FetchError::Decode)
    }
}

/// GET `url`, retrying once with browser-like headers when the plain request
/// is refused. Only a success response is returned, fully read.
///
/// `request_timeout` bounds each attempt from sending the request until the
/// last body byte arrives.
pub async fn fetch_with_fallback(
    client: &reqwest::Client,
    url: &str,
    accept: &str,
    request_timeout: Duration,
) -> Result<FetchedBody, FetchError> {
    debug!(target: TARGET_WEB_REQUEST, "Attempting standard request to {}", url);

    let standard = send(
        client
            .get(url)
            .header(header::USER_AGENT, STANDARD_USER_AGENT)
            .header(header::ACCEPT, accept),
        request_timeout,
    )
    .await;

    let standard_err = match standard {
        Ok(resp) => return Ok(resp),
        // A refused connection will not improve with other headers.
        Err(FetchError::Request(err)) if err.is_connect() => return Err(FetchError::Request(err)),
        Err(err) => err,
    };

    debug!(target: TARGET_WEB_REQUEST, "Standard request to {} failed ({}), trying browser emulation", url, standard_err);

    send(
        client
            .get(url)
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1"),
        request_timeout,
    )
    .await
}

async fn send(
    request: reqwest::RequestBuilder,
    request_timeout: Duration,
) -> Result<FetchedBody, FetchError> {
    match timeout(request_timeout, read_response(request)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(request_timeout)),
    }
}

async fn read_response(request: reqwest::RequestBuilder) -> Result<FetchedBody, FetchError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let content_type = header_value(response.headers(), header::CONTENT_TYPE);
    let content_encoding = header_value(response.headers(), header::CONTENT_ENCODING);
    let bytes = response.bytes().await?;

    Ok(FetchedBody {
        bytes: bytes.to_vec(),
        content_type,
        content_encoding,
    })
}
