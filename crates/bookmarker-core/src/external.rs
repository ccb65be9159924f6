use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{BookmarkerError, Result};
use crate::models::Bookmark;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves a page title for a link.
pub trait PageTitleFetcher: Send + Sync {
    /// `Ok(None)` when the page was fetched but carries no usable title.
    fn fetch_title(&self, url: &str) -> Result<Option<String>>;
}

/// Anything that yields bookmark-shaped records for import, such as an HTML
/// bookmark export reader.
pub trait BookmarkSource {
    fn read_bookmarks(&self) -> Result<Vec<Bookmark>>;
}

impl BookmarkSource for Vec<Bookmark> {
    fn read_bookmarks(&self) -> Result<Vec<Bookmark>> {
        Ok(self.clone())
    }
}

/// GETs the page and takes the text of its first `<title>` element.
#[derive(Debug, Clone)]
pub struct HttpTitleFetcher {
    http: Client,
}

impl HttpTitleFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl PageTitleFetcher for HttpTitleFetcher {
    fn fetch_title(&self, url: &str) -> Result<Option<String>> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| BookmarkerError::Validation(format!("invalid url {url}: {err}")))?;
        let resp = self.http.get(parsed).send()?.error_for_status()?;
        let body = resp.text()?;
        let title = extract_title(&body);
        debug!(url, found = title.is_some(), "fetched page title");
        Ok(title)
    }
}

/// Text of the first `<title>` element, whitespace-collapsed with the common
/// character entities decoded.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let text = decode_entities(&html[start..end]);
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_title_element() {
        let html = "<html><head><TITLE lang=\"en\">\n  Rust &amp; Cargo\n</TITLE></head>\
                    <body><svg><title>icon</title></svg></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Rust & Cargo"));
    }

    #[test]
    fn missing_or_blank_title_is_none() {
        assert_eq!(extract_title("<html><body>no title</body></html>"), None);
        assert_eq!(extract_title("<title>   </title>"), None);
        assert_eq!(extract_title("<title>unterminated"), None);
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let fetcher = HttpTitleFetcher::new().expect("client");
        let err = fetcher.fetch_title("not a url").expect_err("invalid");
        assert!(matches!(err, BookmarkerError::Validation(_)));
    }

    #[test]
    fn vec_source_yields_its_records() {
        let source = vec![Bookmark::new("a", "https://a.example")];
        assert_eq!(source.read_bookmarks().expect("read").len(), 1);
    }
}
