//! Single-page fetch and HTML → [`ContentDocument`] reduction.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::{Client, Response};
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use sitechat_shared::{ContentDocument, FetchConfig, Result, SiteChatError};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("SiteChat/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow per page.
const MAX_REDIRECTS: usize = 5;

static CONTENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p").expect("static content selector")
});

// ---------------------------------------------------------------------------
// ContentExtractor
// ---------------------------------------------------------------------------

/// Turns one URL into a [`ContentDocument`].
///
/// Implementations must report every failure as [`SiteChatError::FetchFailed`]
/// and never panic on bad input.
#[async_trait::async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ContentDocument>;
}

// ---------------------------------------------------------------------------
// HtmlExtractor
// ---------------------------------------------------------------------------

/// Fetches pages over HTTP and reads their headings and paragraphs.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    client: Client,
    max_response_bytes: u64,
    reject_error_status: bool,
}

impl HtmlExtractor {
    /// Create an extractor with the configured timeout and size limit.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SiteChatError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
            reject_error_status: config.reject_error_status,
        })
    }

    /// Read the body chunk by chunk, failing as soon as it passes the limit.
    async fn read_body(&self, url: &str, mut response: Response) -> Result<String> {
        if response
            .content_length()
            .is_some_and(|len| len > self.max_response_bytes)
        {
            return Err(self.too_large(url));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SiteChatError::FetchFailed(format!("{url}: body read failed: {e}")))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_response_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn too_large(&self, url: &str) -> SiteChatError {
        SiteChatError::FetchFailed(format!(
            "{url}: response too large (max {} bytes)",
            self.max_response_bytes
        ))
    }
}

#[async_trait::async_trait]
impl ContentExtractor for HtmlExtractor {
    #[instrument(skip(self))]
    async fn extract(&self, url: &str) -> Result<ContentDocument> {
        let parsed = Url::parse(url)
            .map_err(|e| SiteChatError::FetchFailed(format!("invalid URL {url:?}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(SiteChatError::FetchFailed(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        debug!("fetching page");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| SiteChatError::FetchFailed(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            if self.reject_error_status {
                return Err(SiteChatError::FetchFailed(format!("{url}: HTTP {status}")));
            }
            warn!(%status, "page returned an error status, extracting its body anyway");
        }

        let body = self.read_body(url, response).await?;

        let document = extract_document(&body);
        debug!(
            headings = (1..=6).map(|l| document.headings(l).len()).sum::<usize>(),
            paragraphs = document.p.len(),
            "page extracted"
        );
        Ok(document)
    }
}

// ---------------------------------------------------------------------------
// HTML reduction
// ---------------------------------------------------------------------------

/// Collect the text of every h1..h6 and p element in document order.
///
/// An element's text nodes are concatenated as they appear, so inline markup
/// such as `in <strong>1998</strong> by` keeps its surrounding spaces. The
/// result is trimmed and every internal whitespace run (newlines, indentation,
/// `&nbsp;`) becomes a single space. Elements left empty are dropped.
pub fn extract_document(html: &str) -> ContentDocument {
    let doc = Html::parse_document(html);
    let mut content = ContentDocument::default();

    for el in doc.select(&CONTENT_SELECTOR) {
        let text = normalize_text(el.text());
        if text.is_empty() {
            continue;
        }
        if let Some(section) = content.section_mut(el.value().name()) {
            section.push(text);
        }
    }

    content
}

fn normalize_text<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    let joined: String = fragments.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn fetch_config() -> FetchConfig {
        FetchConfig {
            timeout_secs: 5,
            concurrency: 1,
            max_response_bytes: 64 * 1024,
            reject_error_status: false,
        }
    }

    /// Serve `body` once with `Transfer-Encoding: chunked` and no
    /// content-length, so only the streaming read can enforce a limit.
    async fn serve_chunked(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
                        Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for chunk in body.chunks(16 * 1024) {
                let mut frame = format!("{:x}\r\n", chunk.len()).into_bytes();
                frame.extend_from_slice(chunk);
                frame.extend_from_slice(b"\r\n");
                if socket.write_all(&frame).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        format!("http://{addr}/")
    }

    #[test]
    fn extracts_headings_and_paragraphs_in_order() {
        let doc = extract_document(&load_fixture("about.html"));

        assert_eq!(doc.h1, vec!["About Example Financial"]);
        assert_eq!(doc.h2, vec!["Our Mission"]);
        assert_eq!(doc.h3, vec!["Leadership"]);
        assert!(doc.h4.is_empty());
        assert!(doc.h5.is_empty());
        assert_eq!(doc.h6, vec!["Fine print"]);
        assert_eq!(
            doc.p,
            vec![
                "We help families plan for the future.",
                "Clear, honest advice for every stage of life.",
                "Founded in 1998 by two local advisors.",
                "Copyright 2024 Example Financial",
            ]
        );
    }

    #[test]
    fn page_without_matches_is_empty_not_error() {
        let doc = extract_document(&load_fixture("empty.html"));
        assert!(doc.is_empty());
    }

    #[test]
    fn malformed_html_is_tolerated() {
        let doc = extract_document("<h1>Unclosed <p>Para <h2>Sub");
        assert_eq!(doc.h1.len(), 1);
        assert!(!doc.p.is_empty());
    }

    #[tokio::test]
    async fn test_extract_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/about-us/"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(load_fixture("about.html")),
            )
            .mount(&server)
            .await;

        let extractor = HtmlExtractor::new(&fetch_config()).unwrap();
        let doc = extractor
            .extract(&format!("{}/about-us/", server.uri()))
            .await
            .unwrap();

        assert_eq!(doc.h1, vec!["About Example Financial"]);
        assert_eq!(doc.p.len(), 4);
    }

    #[tokio::test]
    async fn test_extract_not_found_still_reads_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/gone"))
            .respond_with(
                wiremock::ResponseTemplate::new(404)
                    .set_body_string("<h1>Page not found</h1><p>Try the home page.</p>"),
            )
            .mount(&server)
            .await;

        let extractor = HtmlExtractor::new(&fetch_config()).unwrap();
        let doc = extractor
            .extract(&format!("{}/gone", server.uri()))
            .await
            .unwrap();

        assert_eq!(doc.h1, vec!["Page not found"]);
        assert_eq!(doc.p, vec!["Try the home page."]);
    }

    #[tokio::test]
    async fn test_extract_not_found_rejected_when_strict() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/missing"))
            .respond_with(wiremock::ResponseTemplate::new(404).set_body_string("<h1>Nope</h1>"))
            .mount(&server)
            .await;

        let config = FetchConfig {
            reject_error_status: true,
            ..fetch_config()
        };
        let extractor = HtmlExtractor::new(&config).unwrap();
        let err = extractor
            .extract(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, SiteChatError::FetchFailed(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_extract_rejects_oversized_body() {
        let server = wiremock::MockServer::start().await;

        let big = format!("<p>{}</p>", "x".repeat(128 * 1024));
        wiremock::Mock::given(wiremock::matchers::path("/big"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(big))
            .mount(&server)
            .await;

        let extractor = HtmlExtractor::new(&fetch_config()).unwrap();
        let err = extractor
            .extract(&format!("{}/big", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_extract_rejects_oversized_chunked_body() {
        let big = format!("<p>{}</p>", "x".repeat(256 * 1024)).into_bytes();
        let url = serve_chunked(big).await;

        let extractor = HtmlExtractor::new(&fetch_config()).unwrap();
        let err = extractor.extract(&url).await.unwrap_err();

        assert!(matches!(err, SiteChatError::FetchFailed(_)));
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_extract_small_chunked_body() {
        let url = serve_chunked(b"<h2>Chunked</h2><p>Still fine.</p>".to_vec()).await;

        let extractor = HtmlExtractor::new(&fetch_config()).unwrap();
        let doc = extractor.extract(&url).await.unwrap();

        assert_eq!(doc.h2, vec!["Chunked"]);
        assert_eq!(doc.p, vec!["Still fine."]);
    }

    #[tokio::test]
    async fn test_extract_invalid_url() {
        let extractor = HtmlExtractor::new(&fetch_config()).unwrap();

        let err = extractor.extract("not a url").await.unwrap_err();
        assert!(matches!(err, SiteChatError::FetchFailed(_)));

        let err = extractor.extract("file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }
}
