//! In-memory stand-ins for the pipeline's network collaborators.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use sitechat_catalog::CatalogSource;
use sitechat_extractor::ContentExtractor;
use sitechat_generation::GenerationEngine;
use sitechat_shared::{ContentDocument, GenerationParams, PageCatalog, Result, SiteChatError};

/// Catalog that returns a fixed catalog (or a fixed failure) and counts calls.
pub(crate) struct StubCatalog {
    catalog: PageCatalog,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StubCatalog {
    pub(crate) fn with(catalog: PageCatalog) -> Self {
        Self {
            catalog,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(cause: &str) -> Self {
        Self {
            catalog: PageCatalog::new(),
            failure: Some(cause.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CatalogSource for StubCatalog {
    async fn resolve(&self) -> Result<PageCatalog> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(cause) => Err(SiteChatError::UpstreamUnavailable(cause.clone())),
            None => Ok(self.catalog.clone()),
        }
    }
}

/// Extractor serving fixed documents by URL and recording call order.
pub(crate) struct StubExtractor {
    pages: HashMap<String, ContentDocument>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl StubExtractor {
    pub(crate) fn with_pages<'a>(
        pages: impl IntoIterator<Item = (&'a str, ContentDocument)>,
    ) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, doc)| (url.to_string(), doc))
                .collect(),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_on(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ContentExtractor for StubExtractor {
    async fn extract(&self, url: &str) -> Result<ContentDocument> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.iter().any(|f| f == url) {
            return Err(SiteChatError::FetchFailed(format!("{url}: connection reset")));
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| SiteChatError::FetchFailed(format!("{url}: HTTP 404 Not Found")))
    }
}

enum Reply {
    Fixed(String),
    Fail(String),
    /// Deterministic function of the prompt.
    PromptLength,
}

/// Generation engine recording every prompt it receives.
pub(crate) struct StubEngine {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl StubEngine {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self::new(Reply::Fixed(text.to_string()))
    }

    pub(crate) fn failing(cause: &str) -> Self {
        Self::new(Reply::Fail(cause.to_string()))
    }

    pub(crate) fn echo_len() -> Self {
        Self::new(Reply::PromptLength)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerationEngine for StubEngine {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::Fail(cause) => Err(SiteChatError::GenerationFailed(cause.clone())),
            Reply::PromptLength => Ok(format!("prompt had {} characters", prompt.len())),
        }
    }
}
