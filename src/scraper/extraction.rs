use chrono::Utc;
use once_cell::sync::Lazy;
use readability::extractor;
use regex::Regex;
use scraper::{Html, Selector};
use std::io::Cursor;
use tracing::debug;
use url::Url;

use super::types::{Article, ScrapeOptions};
use crate::error::FetchError;
use crate::rss::{fetch_with_fallback, FeedItem, HTML_ACCEPT};
use crate::TARGET_WEB_REQUEST;

static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p"));
static CANONICAL: Lazy<Selector> = Lazy::new(|| selector(r#"link[rel="canonical"]"#));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    selector(r#"meta[name="description"], meta[property="og:description"]"#)
});
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*").unwrap());

// Selectors above are literals known to parse.
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Fetch `item.link` and extract its article.
pub async fn extract_article(
    client: &reqwest::Client,
    item: &FeedItem,
    options: &ScrapeOptions,
) -> Result<Article, FetchError> {
    let url = Url::parse(&item.link).map_err(|_| FetchError::InvalidUrl(item.link.clone()))?;

    debug!(target: TARGET_WEB_REQUEST, "Extracting {}", item.link);
    let html = fetch_with_fallback(client, &item.link, HTML_ACCEPT, options.request_timeout)
        .await?
        .into_text(&item.link)?;

    // Both parsers are synchronous and `scraper::Html` is not `Send`.
    let min_chars = options.min_body_chars;
    let page = tokio::task::spawn_blocking(move || extract_page(&html, &url, min_chars))
        .await
        .map_err(|e| FetchError::Extraction(e.to_string()))??;

    let length = page.body.chars().count();
    if length < options.min_body_chars {
        return Err(FetchError::TooShort {
            len: length,
            min: options.min_body_chars,
        });
    }

    let title = if page.title.is_empty() {
        item.title.clone()
    } else {
        page.title
    };

    Ok(Article {
        source_link: item.link.clone(),
        title,
        body: page.body,
        published_at: item.published_at,
        extracted_at: Utc::now(),
        canonical_url: page.canonical_url,
        description: page.description,
    })
}

#[derive(Debug)]
pub(crate) struct ExtractedPage {
    pub title: String,
    pub body: String,
    pub canonical_url: Option<String>,
    pub description: Option<String>,
}

/// Readability main text. The page's `<p>` text is used only when readability
/// yields fewer than `min_chars` characters and the paragraphs yield more.
pub(crate) fn extract_page(
    html: &str,
    url: &Url,
    min_chars: usize,
) -> Result<ExtractedPage, FetchError> {
    let document = Html::parse_document(html);

    let readable = extractor::extract(&mut Cursor::new(html.as_bytes()), url)
        .map_err(|e| FetchError::Extraction(e.to_string()));

    let (mut title, readable_text) = match readable {
        Ok(product) => (product.title.trim().to_string(), normalize_text(&product.text)),
        Err(err) => {
            debug!(target: TARGET_WEB_REQUEST, "Readability failed for {}: {}", url, err);
            (String::new(), String::new())
        }
    };

    let readable_len = readable_text.chars().count();
    let body = if readable_len >= min_chars {
        readable_text
    } else {
        let paragraphs = paragraph_text(&document);
        if paragraphs.chars().count() > readable_len {
            paragraphs
        } else {
            readable_text
        }
    };

    if title.is_empty() {
        title = attribute(&document, &OG_TITLE, "content").unwrap_or_default();
    }

    Ok(ExtractedPage {
        title,
        body,
        canonical_url: attribute(&document, &CANONICAL, "href")
            .and_then(|href| url.join(&href).ok())
            .map(|u| u.to_string()),
        description: attribute(&document, &DESCRIPTION, "content"),
    })
}

fn paragraph_text(document: &Html) -> String {
    document
        .select(&PARAGRAPHS)
        .map(|p| normalize_text(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn attribute(document: &Html, selector: &Selector, name: &str) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn normalize_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    BLANK_LINES.replace_all(collapsed.trim(), "\n\n").into_owned()
}
