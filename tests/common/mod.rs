#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use futures::stream::{self, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind an ephemeral local port. Returned before serving so routes can
/// embed the server's own base URL.
pub async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

pub fn serve_on(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let (listener, base) = listen().await;
    serve_on(listener, app);
    base
}

/// A local address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// RSS 2.0 document with `count` items linking to `{base}/articles/{slug}-{i}`.
pub fn rss_feed(base: &str, slug: &str, count: usize) -> String {
    let items: String = (1..=count)
        .map(|i| {
            format!(
                r#"<item>
  <title>{slug} story {i}</title>
  <link>{base}/articles/{slug}-{i}</link>
  <description>Summary of {slug} story {i}</description>
  <pubDate>Mon, 04 Nov 2024 0{i}:00:00 GMT</pubDate>
</item>
"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>{slug} news</title>
  <link>{base}</link>
  <description>Test feed</description>
{items}</channel>
</rss>"#
    )
}

/// An article page long enough to pass the minimum body length.
pub fn article_page(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title}</title><meta name="description" content="About {title}"></head>
<body>
  <nav><a href="/">Home</a></nav>
  <article>
    <h1>{title}</h1>
    <p>The city council voted on Thursday to extend the tram line to the northern districts, ending a debate that lasted almost a decade.</p>
    <p>Construction is expected to begin next spring and the first trams should run within four years, according to the transport department.</p>
    <p>Residents welcomed the decision but asked for noise barriers along the route, which the council promised to review before tendering.</p>
  </article>
</body>
</html>"#
    )
}

/// A chunked body that sends `head` and then never finishes.
pub fn stalled_body(head: &'static str) -> Body {
    let chunks = stream::once(async move { Ok::<_, std::io::Error>(head) }).chain(stream::pending());
    Body::from_stream(chunks)
}
