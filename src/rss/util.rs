//! Body repair and decoding shared by feed and article fetching.

use reqwest::header::{HeaderMap, HeaderName};
use std::io::Read;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

/// Absolute http(s) URL.
pub fn is_valid_url(url: &str) -> bool {
    url::Url::parse(url).map_or(false, |parsed| matches!(parsed.scheme(), "http" | "https"))
}

/// HTML named entities feeds commonly use but XML leaves undefined.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", "&#160;"),
    ("&ndash;", "&#8211;"),
    ("&mdash;", "&#8212;"),
    ("&lsquo;", "&#8216;"),
    ("&rsquo;", "&#8217;"),
    ("&ldquo;", "&#8220;"),
    ("&rdquo;", "&#8221;"),
    ("&hellip;", "&#8230;"),
    ("&apos;", "&#39;"),
    ("&amp;amp;", "&amp;"),
];

/// Best-effort repair of a feed document that failed to parse: leading junk
/// and BOMs go, HTML entities become numeric references, characters XML 1.0
/// forbids are dropped and a declaration is added when missing.
pub fn cleanup_xml(xml: &str) -> String {
    let trimmed = xml.trim().trim_start_matches('\u{FEFF}');
    let start = ["<?xml", "<rss", "<feed", "<rdf"]
        .iter()
        .filter_map(|marker| trimmed.find(marker))
        .min()
        .unwrap_or(0);

    let mut cleaned = HTML_ENTITIES
        .iter()
        .fold(trimmed[start..].to_string(), |doc, (entity, numeric)| {
            doc.replace(entity, numeric)
        });
    cleaned.retain(is_xml_char);

    if !cleaned.starts_with("<?xml") {
        cleaned.insert_str(0, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }
    cleaned
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Undo compression the HTTP client did not handle itself.
///
/// reqwest transparently inflates `Content-Encoding: gzip`, so this only
/// catches brotli bodies and servers that gzip without saying so.
pub fn decompress_body(bytes: &[u8], content_encoding: Option<&str>, url: &str) -> Vec<u8> {
    if content_encoding == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(bytes, 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed brotli content from {}", url);
            return decoded;
        }
    }

    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoded = Vec::new();
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed unannounced gzip content from {}", url);
            return decoded;
        }
    }

    // zlib header: CMF 0x78 with a valid FCHECK
    if bytes.len() > 2 && bytes[0] == 0x78 && (u16::from(bytes[0]) << 8 | u16::from(bytes[1])) % 31 == 0 {
        let mut decoded = Vec::new();
        let mut decoder = flate2::read::ZlibDecoder::new(bytes);
        if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Decompressed zlib content from {}", url);
            return decoded;
        }
    }

    bytes.to_vec()
}

/// Decode a body to text, honouring the charset from `Content-Type` and
/// falling back to Windows-1252 for invalid UTF-8.
pub fn decode_text(bytes: Vec<u8>, content_type: Option<&str>) -> Option<String> {
    let charset = content_type.and_then(|ct| {
        ct.split(';')
            .map(str::trim)
            .find_map(|part| part.strip_prefix("charset="))
            .map(|c| c.trim_matches('"').to_string())
    });

    if let Some(charset) = charset {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            if encoding != encoding_rs::UTF_8 {
                let (decoded, _, had_errors) = encoding.decode(&bytes);
                if !had_errors {
                    return Some(decoded.into_owned());
                }
            }
        }
    }

    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&bytes);
            if had_errors {
                None
            } else {
                Some(decoded.into_owned())
            }
        }
    }
}

/// Lowercased value of a header, if present and valid ASCII.
pub fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/feed.xml"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("ftp://example.com/feed.xml"));
        assert!(!is_valid_url("example.com/feed.xml"));
    }

    #[test]
    fn test_cleanup_xml_strips_leading_garbage_and_entities() {
        let cleaned = cleanup_xml("\u{FEFF}  junk<rss><title>A&nbsp;B</title></rss>");
        assert!(cleaned.starts_with("<?xml"));
        assert!(cleaned.contains("<rss><title>A&#160;B</title></rss>"));
        assert!(!cleaned.contains("junk"));
    }

    #[test]
    fn test_decompress_unannounced_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<rss></rss>").unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = decompress_body(&compressed, None, "http://example.com");
        assert_eq!(decoded, b"<rss></rss>");
    }

    #[test]
    fn test_plain_body_passes_through() {
        let body = b"<?xml version=\"1.0\"?><rss></rss>";
        assert_eq!(decompress_body(body, None, "http://example.com"), body.to_vec());
    }

    #[test]
    fn test_decode_text_with_latin1_charset() {
        let bytes = vec![b'c', b'a', b'f', 0xE9];
        let text = decode_text(bytes, Some("application/rss+xml; charset=ISO-8859-1")).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_decode_text_falls_back_to_windows_1252() {
        let bytes = vec![b'n', 0xE4, b'h', b'e'];
        assert_eq!(decode_text(bytes, None).unwrap(), "nähe");
    }

    #[test]
    fn test_header_value_is_lowercased() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "Text/HTML; Charset=UTF-8".parse().unwrap(),
        );

        assert_eq!(
            header_value(&headers, reqwest::header::CONTENT_TYPE).as_deref(),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(header_value(&headers, reqwest::header::CONTENT_ENCODING), None);
    }
}
