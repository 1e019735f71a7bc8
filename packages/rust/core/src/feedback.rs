//! Feedback verdicts and the refinement loop.
//!
//! A `thumbs_down` verdict sends the prior answer back through the
//! generation engine with a rewrite instruction. Refinement works on the
//! prior text alone; it does not re-read the site content, so a refined
//! answer can drift from what the pages actually say.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use sitechat_generation::GenerationEngine;
use sitechat_shared::{GenerationParams, Result, SiteChatError};

use crate::pipeline::require_text;
use crate::prompt::Prompt;

/// Returned for positive feedback.
pub const ACKNOWLEDGEMENT: &str = "Thank you for your feedback! Glad you liked it!";

const REFINE_INSTRUCTION: &str =
    "Refine the following response to make it more clear and helpful:";

// ---------------------------------------------------------------------------
// Verdict / FeedbackRecord
// ---------------------------------------------------------------------------

/// A caller's judgement of a previous answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    ThumbsUp,
    ThumbsDown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThumbsUp => "thumbs_up",
            Self::ThumbsDown => "thumbs_down",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = SiteChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "thumbs_up" => Ok(Self::ThumbsUp),
            "thumbs_down" => Ok(Self::ThumbsDown),
            _ => Err(SiteChatError::validation(
                "invalid feedback value, use 'thumbs_up' or 'thumbs_down'",
            )),
        }
    }
}

/// One feedback call's input. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub verdict: Verdict,
    pub prior_response: String,
}

impl FeedbackRecord {
    /// Validate raw request fields. Both must be present and non-empty; the
    /// verdict must be one of the two accepted literals.
    pub fn parse(verdict: Option<&str>, prior_response: Option<&str>) -> Result<Self> {
        let (Some(verdict), Some(prior_response)) = (
            verdict.filter(|v| !v.is_empty()),
            prior_response.filter(|r| !r.is_empty()),
        ) else {
            return Err(SiteChatError::validation("feedback and response are required"));
        };

        Ok(Self {
            verdict: verdict.parse()?,
            prior_response: prior_response.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// FeedbackHandler
// ---------------------------------------------------------------------------

/// What a feedback call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Positive verdict; static acknowledgement.
    Acknowledged(&'static str),
    /// Negative verdict; the rewritten answer.
    Refined(String),
}

impl FeedbackOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Acknowledged(text) => text,
            Self::Refined(text) => text,
        }
    }
}

/// Build the rewrite prompt around a previous answer.
pub fn refinement_prompt(prior_response: &str) -> Prompt {
    Prompt::from(format!("{REFINE_INSTRUCTION} {prior_response}"))
}

/// Interprets verdicts and drives refinement.
#[derive(Clone)]
pub struct FeedbackHandler {
    engine: Arc<dyn GenerationEngine>,
    params: GenerationParams,
}

impl FeedbackHandler {
    pub fn new(engine: Arc<dyn GenerationEngine>, params: GenerationParams) -> Self {
        Self { engine, params }
    }

    #[instrument(skip_all, fields(verdict = %record.verdict))]
    pub async fn handle(&self, record: &FeedbackRecord) -> Result<FeedbackOutcome> {
        match record.verdict {
            Verdict::ThumbsUp => {
                info!("positive feedback received");
                Ok(FeedbackOutcome::Acknowledged(ACKNOWLEDGEMENT))
            }
            Verdict::ThumbsDown => {
                let prompt = refinement_prompt(&record.prior_response);
                let refined = self
                    .engine
                    .generate(prompt.as_str(), &self.params)
                    .await
                    .and_then(require_text)
                    .map_err(|e| {
                        warn!(error = %e, "refinement failed");
                        let cause = match e {
                            SiteChatError::GenerationFailed(cause) => cause,
                            other => other.to_string(),
                        };
                        SiteChatError::GenerationFailed(format!("error refining response: {cause}"))
                    })?;
                info!(refined_len = refined.len(), "response refined");
                Ok(FeedbackOutcome::Refined(refined))
            }
        }
    }
}
