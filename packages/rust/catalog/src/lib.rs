//! Pattern catalog for place-name extraction.
//!
//! Holds the lexical and compound patterns, the known-compound
//! decompositions, the stoplist, and the plausibility screen. A [`Catalog`]
//! is compiled once and never mutated; [`CatalogHandle`] swaps whole
//! catalogs on reload.

pub mod builtin;
mod catalog;
mod pattern;
mod screen;

pub use catalog::{Catalog, CatalogHandle};
pub use pattern::{Pattern, PatternGroup, PatternMatch, PatternSpec};
pub use screen::Screen;
