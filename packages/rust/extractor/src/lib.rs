//! Page content extraction and aggregation.
//!
//! This crate provides:
//! - [`ContentExtractor`] / [`HtmlExtractor`]: fetch one page and reduce it to headings + paragraphs
//! - [`ContentAggregator`]: all-or-nothing fan-out over a page catalog

pub mod aggregate;
pub mod extract;

pub use aggregate::ContentAggregator;
pub use extract::{ContentExtractor, HtmlExtractor, extract_document};
