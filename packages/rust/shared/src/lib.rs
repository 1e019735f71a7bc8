//! Shared types, error model, and configuration for SiteChat.
//!
//! This crate is the foundation depended on by all other SiteChat crates.
//! It provides:
//! - [`SiteChatError`]: the unified error type
//! - Domain types ([`PageCatalog`], [`ContentDocument`], [`ContentBundle`], [`GenerationParams`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, FetchConfig, GenerationConfig, KeywordEntry, PersonaConfig,
    ServerConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ErrorKind, Result, SiteChatError};
pub use types::{CatalogEntry, ContentBundle, ContentDocument, GenerationParams, PageCatalog};
