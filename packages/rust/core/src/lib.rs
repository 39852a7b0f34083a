//! Core pipeline orchestration for chimei.
//!
//! This crate ties together text preparation, the strategy registry, the
//! per-sentence conflict resolver, and work-level deduplication into the
//! end-to-end [`Pipeline`].

pub mod ai;
pub mod dedup;
pub mod pipeline;
pub mod resolver;

pub use ai::AiStrategy;
pub use dedup::dedup_work;
pub use pipeline::{Pipeline, ProgressReporter, SilentProgress};
pub use resolver::{is_overlap_free, precedence, resolve};
