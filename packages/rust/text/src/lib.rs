//! Text preparation for place-name extraction.
//!
//! Cleans Aozora Bunko markup, splits prose into sentences, and provides the
//! character-offset and context-window helpers shared by the strategies and
//! the pipeline.

pub mod aozora;
pub mod chars;
pub mod context;
pub mod segment;

pub use aozora::strip_markup;
pub use chars::{CharIndex, KANJI_CLASS, char_len, char_slice, is_kanji, last_chars, take_chars};
pub use context::{ContextWindow, context_window};
pub use segment::split_sentences;
