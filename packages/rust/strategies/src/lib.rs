//! Extraction strategies and their ordered registry.
//!
//! Each strategy scans one sentence and proposes [`SpanCandidate`]s; the
//! registry fans a sentence out to all of them and isolates failures.
//!
//! [`SpanCandidate`]: chimei_shared::SpanCandidate

mod compound;
mod gazetteer;
mod lexical;
mod registry;
mod strategy;
mod tagger;

pub use compound::CompoundStrategy;
pub use gazetteer::GazetteerTagger;
pub use lexical::LexicalStrategy;
pub use registry::{Proposal, RegistryBuilder, StrategyRegistry};
pub use strategy::{ExtractionStrategy, Locality, SentenceInput};
pub use tagger::{EntityTagger, TaggedEntity, TaggerStrategy};
