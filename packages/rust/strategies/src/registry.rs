//! Ordered strategy registry.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, info, warn};

use chimei_shared::{SpanCandidate, StrategyKind};

use crate::compound::CompoundStrategy;
use crate::lexical::LexicalStrategy;
use crate::strategy::{ExtractionStrategy, Locality, SentenceInput};
use crate::tagger::{EntityTagger, TaggerStrategy};

/// Default per-strategy, per-sentence timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds strategies in a fixed order: lexical, compound, tagger, AI, then
/// any custom strategies in registration order.
///
/// Candidates are concatenated in this order regardless of which strategy
/// finishes first.
#[derive(Debug)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    timeout: Duration,
}

impl StrategyRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registered strategy names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Whether any registered strategy is [`Locality::Remote`].
    pub fn has_remote(&self) -> bool {
        self.strategies
            .iter()
            .any(|s| s.locality() == Locality::Remote)
    }

    /// Run every strategy on one sentence concurrently and concatenate their
    /// candidates in registry order.
    ///
    /// A strategy that errors, panics, or exceeds the timeout contributes
    /// nothing; the failure is logged and the others are unaffected.
    pub async fn propose(&self, input: &SentenceInput<'_>) -> Vec<SpanCandidate> {
        let runs = self
            .strategies
            .iter()
            .enumerate()
            .map(|(slot, strategy)| self.run(slot, strategy.as_ref(), input));
        let candidates = Proposal {
            slots: join_all(runs).await,
        }
        .into_candidates();
        debug!(sentence = input.index, candidates = candidates.len(), "candidates proposed");
        candidates
    }

    /// Like [`propose`](Self::propose), restricted to strategies of one
    /// locality. Merge the partial proposals to recover registry order.
    pub async fn propose_where(&self, input: &SentenceInput<'_>, locality: Locality) -> Proposal {
        let runs = self
            .strategies
            .iter()
            .enumerate()
            .filter(|(_, strategy)| strategy.locality() == locality)
            .map(|(slot, strategy)| self.run(slot, strategy.as_ref(), input));
        Proposal {
            slots: join_all(runs).await,
        }
    }

    async fn run(
        &self,
        slot: usize,
        strategy: &dyn ExtractionStrategy,
        input: &SentenceInput<'_>,
    ) -> (usize, Vec<SpanCandidate>) {
        let call = tokio::time::timeout(self.timeout, strategy.extract(input));
        let candidates = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(Ok(candidates))) => candidates,
            Ok(Ok(Err(e))) => {
                warn!(
                    strategy = strategy.name(),
                    sentence = input.index,
                    error = %e,
                    "strategy failed, skipping its candidates"
                );
                Vec::new()
            }
            Ok(Err(_elapsed)) => {
                warn!(
                    strategy = strategy.name(),
                    sentence = input.index,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "strategy timed out, skipping its candidates"
                );
                Vec::new()
            }
            Err(_panic) => {
                warn!(
                    strategy = strategy.name(),
                    sentence = input.index,
                    "strategy panicked, skipping its candidates"
                );
                Vec::new()
            }
        };
        (slot, candidates)
    }
}

/// Candidates from part of the registry, keyed by registry position.
#[derive(Debug, Default)]
pub struct Proposal {
    slots: Vec<(usize, Vec<SpanCandidate>)>,
}

impl Proposal {
    /// Combine two partial proposals of the same sentence.
    pub fn merge(mut self, other: Proposal) -> Self {
        self.slots.extend(other.slots);
        self.slots.sort_by_key(|(slot, _)| *slot);
        self
    }

    /// Candidates in registry order.
    pub fn into_candidates(self) -> Vec<SpanCandidate> {
        self.slots
            .into_iter()
            .flat_map(|(_, candidates)| candidates)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a registry from enabled kinds and optional capabilities.
///
/// A capability that is enabled but not supplied (no tagger, no AI
/// credential) is left out of the registry instead of failing per call.
pub struct RegistryBuilder {
    enabled: Vec<StrategyKind>,
    tagger: Option<Arc<dyn EntityTagger>>,
    ai: Option<Box<dyn ExtractionStrategy>>,
    custom: Vec<Box<dyn ExtractionStrategy>>,
    timeout: Duration,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            enabled: StrategyKind::ALL.to_vec(),
            tagger: None,
            ai: None,
            custom: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RegistryBuilder {
    /// Restrict the built-in strategies to `kinds`.
    pub fn enable(mut self, kinds: &[StrategyKind]) -> Self {
        self.enabled = kinds.to_vec();
        self
    }

    pub fn tagger(mut self, tagger: Option<Arc<dyn EntityTagger>>) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn ai(mut self, ai: Option<Box<dyn ExtractionStrategy>>) -> Self {
        self.ai = ai;
        self
    }

    /// Append a strategy after the built-ins.
    pub fn custom(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.custom.push(strategy);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> StrategyRegistry {
        let enabled = |kind: StrategyKind| self.enabled.contains(&kind);
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();

        if enabled(StrategyKind::Lexical) {
            strategies.push(Box::new(LexicalStrategy));
        }
        if enabled(StrategyKind::Compound) {
            strategies.push(Box::new(CompoundStrategy));
        }
        if enabled(StrategyKind::Tagger) {
            match self.tagger {
                Some(tagger) => strategies.push(Box::new(TaggerStrategy::new(tagger))),
                None => info!("no entity tagger configured, tagger strategy disabled"),
            }
        }
        if enabled(StrategyKind::Ai) {
            match self.ai {
                Some(ai) => strategies.push(ai),
                None => info!("no AI credential configured, AI strategy disabled"),
            }
        }
        strategies.extend(self.custom);

        StrategyRegistry {
            strategies,
            timeout: self.timeout,
        }
    }
}
