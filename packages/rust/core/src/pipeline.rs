//! End-to-end chat pipeline: message → keywords → catalog → content → prompt → generation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use sitechat_catalog::CatalogSource;
use sitechat_extractor::ContentAggregator;
use sitechat_generation::GenerationEngine;
use sitechat_shared::{GenerationParams, Result, SiteChatError};

use crate::prompt::PromptComposer;
use crate::router::KeywordRouter;

/// Result of one chat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAnswer {
    /// Keyword table hit; no network call was made.
    Canned(String),
    /// Grounded model output.
    Generated(String),
}

impl ChatAnswer {
    pub fn text(&self) -> &str {
        match self {
            Self::Canned(text) | Self::Generated(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Canned(text) | Self::Generated(text) => text,
        }
    }

    pub fn is_canned(&self) -> bool {
        matches!(self, Self::Canned(_))
    }
}

/// Turn an optional raw `message` field into a usable message.
pub fn validate_message(message: Option<&str>) -> Result<&str> {
    message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| SiteChatError::validation("message is required"))
}

/// Reject blank engine output.
pub(crate) fn require_text(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(SiteChatError::GenerationFailed(
            "engine returned an empty response".into(),
        ));
    }
    Ok(text)
}

/// The request-augmentation pipeline. Holds only immutable, shareable parts,
/// so one instance serves every request.
#[derive(Clone)]
pub struct ChatPipeline {
    router: Arc<KeywordRouter>,
    catalog: Arc<dyn CatalogSource>,
    aggregator: ContentAggregator,
    composer: PromptComposer,
    engine: Arc<dyn GenerationEngine>,
    params: GenerationParams,
}

impl ChatPipeline {
    pub fn new(
        router: KeywordRouter,
        catalog: Arc<dyn CatalogSource>,
        aggregator: ContentAggregator,
        composer: PromptComposer,
        engine: Arc<dyn GenerationEngine>,
        params: GenerationParams,
    ) -> Self {
        Self {
            router: Arc::new(router),
            catalog,
            aggregator,
            composer,
            engine,
            params,
        }
    }

    /// Answer a non-empty user message.
    ///
    /// 1. Keyword table (no network on a hit)
    /// 2. Resolve the page catalog
    /// 3. Extract every page, all-or-nothing
    /// 4. Compose the prompt
    /// 5. Generate
    #[instrument(skip_all, fields(message_len = message.len()))]
    pub async fn answer(&self, message: &str) -> Result<ChatAnswer> {
        if let Some(canned) = self.router.lookup(message) {
            info!("keyword match, returning canned response");
            return Ok(ChatAnswer::Canned(canned.to_string()));
        }

        let start = Instant::now();

        let catalog = self.catalog.resolve().await.inspect_err(|e| {
            warn!(error = %e, "catalog resolution failed");
        })?;

        let bundle = self.aggregator.collect(&catalog).await?;

        let prompt = self.composer.build(message, &bundle);

        let text = self
            .engine
            .generate(prompt.as_str(), &self.params)
            .await
            .and_then(require_text)
            .inspect_err(|e| warn!(error = %e, "generation failed"))?;

        info!(
            pages = bundle.len(),
            prompt_len = prompt.as_str().len(),
            elapsed_ms = start.elapsed().as_millis(),
            "grounded answer generated"
        );

        Ok(ChatAnswer::Generated(text))
    }
}
