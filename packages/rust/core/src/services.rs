//! Wiring: build the chat pipeline and feedback handler from [`AppConfig`].

use std::sync::Arc;

use tracing::info;

use sitechat_catalog::CatalogClient;
use sitechat_extractor::{ContentAggregator, HtmlExtractor};
use sitechat_generation::{GenerationEngine, InferenceClient};
use sitechat_shared::{AppConfig, GenerationParams, Result};

use crate::feedback::FeedbackHandler;
use crate::pipeline::ChatPipeline;
use crate::prompt::PromptComposer;
use crate::router::KeywordRouter;

/// The two request-facing services. Built once at startup; both share one
/// generation engine and never change afterwards.
#[derive(Clone)]
pub struct Services {
    pub chat: ChatPipeline,
    pub feedback: FeedbackHandler,
}

impl Services {
    /// Validate `config` and construct production collaborators.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate_for_serving()?;

        let engine = generation_engine(config)?;
        let params = GenerationParams::from(&config.generation);

        let catalog = Arc::new(CatalogClient::new(&config.catalog)?);
        let extractor = Arc::new(HtmlExtractor::new(&config.fetch)?);
        let router = KeywordRouter::new(&config.keywords);

        info!(
            keywords = router.len(),
            catalog = %config.catalog.url,
            endpoint = %config.generation.endpoint,
            fetch_concurrency = config.fetch.concurrency,
            "services initialized"
        );

        let chat = ChatPipeline::new(
            router,
            catalog,
            ContentAggregator::new(extractor, config.fetch.concurrency),
            PromptComposer::from(&config.persona),
            engine.clone(),
            params.clone(),
        );
        let feedback = FeedbackHandler::new(engine, params);

        Ok(Self { chat, feedback })
    }

    /// Build only the feedback handler. Needs the generation endpoint but not
    /// the catalog, so `sitechat feedback` works on a generation-only config.
    pub fn feedback_from_config(config: &AppConfig) -> Result<FeedbackHandler> {
        config.validate_for_feedback()?;

        let engine = generation_engine(config)?;
        Ok(FeedbackHandler::new(
            engine,
            GenerationParams::from(&config.generation),
        ))
    }
}

fn generation_engine(config: &AppConfig) -> Result<Arc<dyn GenerationEngine>> {
    Ok(Arc::new(InferenceClient::new(
        &config.generation,
        config.generation_api_key(),
    )?))
}
