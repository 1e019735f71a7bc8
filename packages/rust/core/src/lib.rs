//! Request-augmentation pipeline and feedback loop for SiteChat.
//!
//! This crate ties together the keyword table, catalog resolution, content
//! aggregation, prompt composition and generation into the two operations
//! the outer surfaces expose: answering a chat message and handling feedback.

pub mod feedback;
pub mod pipeline;
pub mod prompt;
pub mod router;
pub mod services;

#[cfg(test)]
mod test_support;

pub use feedback::{ACKNOWLEDGEMENT, FeedbackHandler, FeedbackOutcome, FeedbackRecord, Verdict};
pub use pipeline::{ChatAnswer, ChatPipeline, validate_message};
pub use prompt::{Prompt, PromptComposer};
pub use router::KeywordRouter;
pub use services::Services;
