//! Shared types, error model, and configuration for chimei.
//!
//! This crate is the foundation depended on by all other chimei crates.
//! It provides:
//! - [`ChimeiError`]: the unified error type
//! - Domain types ([`SpanCandidate`], [`ResolvedPlace`], [`Category`], [`WorkExtraction`])
//! - Configuration ([`AppConfig`], [`ExtractionOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AiConfig, AppConfig, CatalogConfig, CustomPatternConfig, ExtractionConfig, ExtractionOptions,
    RunOverrides, TaggerConfig, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{ChimeiError, Result};
pub use types::{
    Category, Confidence, ResolvedPlace, RunId, SpanCandidate, StrategyKind, WorkExtraction,
    WorkText,
};
