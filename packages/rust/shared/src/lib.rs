//! Shared types, error model, and configuration for pagewise.
//!
//! This crate is the foundation depended on by all other pagewise crates.
//! It provides:
//! - [`PagewiseError`], the unified error type
//! - Domain types ([`Heading`], [`Outline`], [`PageText`], [`DocumentRecord`], [`QaAnswer`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendConfig, DefaultsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_config,
};
pub use error::{PagewiseError, Result};
pub use types::{
    DocumentId, DocumentRecord, Heading, HeadingId, Outline, PageText, QaAnswer, content_hash,
};
