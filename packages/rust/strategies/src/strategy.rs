//! The extraction strategy contract.

use async_trait::async_trait;

use chimei_catalog::Catalog;
use chimei_shared::{Result, SpanCandidate};

/// Everything a strategy sees for one sentence.
#[derive(Debug, Clone, Copy)]
pub struct SentenceInput<'a> {
    /// Position of the sentence within the work.
    pub index: usize,
    pub text: &'a str,
    pub previous: Option<&'a str>,
    pub next: Option<&'a str>,
    /// Catalog snapshot taken when the work started.
    pub catalog: &'a Catalog,
}

/// Where a strategy spends its time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    /// CPU-bound matching over the sentence.
    Local,
    /// Waits on a network service that paces itself.
    Remote,
}

/// An independent place-name detector.
///
/// Implementations must not share mutable state across calls so the
/// registry can run them concurrently. Errors are reported through the
/// `Result`; the registry turns them into an empty contribution.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync + std::fmt::Debug {
    /// Identifier recorded as the `method` of every candidate.
    fn name(&self) -> &str;

    /// Remote strategies run outside the pipeline's CPU pool.
    fn locality(&self) -> Locality {
        Locality::Local
    }

    /// Propose candidates for one sentence. Offsets are char offsets into
    /// `input.text`.
    async fn extract(&self, input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>>;
}
