//! Compound-place matcher: base place plus modifier.

use async_trait::async_trait;

use chimei_catalog::{Catalog, Pattern, PatternGroup, PatternMatch};
use chimei_shared::{Result, SpanCandidate};
use chimei_text::{char_len, char_slice};

use crate::lexical::AFTER_CHARS;
use crate::strategy::{ExtractionStrategy, SentenceInput};

/// Shortest compound worth keeping, in characters.
const MIN_COMPOUND_CHARS: usize = 3;

/// Matches direction, facility, and terrain compounds plus the fixed list of
/// well-known compounds, and records the base/modifier split.
#[derive(Debug, Default)]
pub struct CompoundStrategy;

impl CompoundStrategy {
    /// Screened patterns run the base, not the modifier, through the
    /// plausibility screen.
    fn accept(catalog: &Catalog, pattern: &Pattern, m: &PatternMatch, sentence: &str) -> bool {
        if char_len(&m.text) < MIN_COMPOUND_CHARS || catalog.is_stopword(&m.text) {
            return false;
        }
        let Some(base) = m.base.as_deref() else {
            return true;
        };
        if catalog.is_stopword(base) {
            return false;
        }
        let after = char_slice(sentence, m.end, m.end + AFTER_CHARS);
        !pattern.is_screened() || catalog.is_plausible(base, pattern.category(), after)
    }
}

#[async_trait]
impl ExtractionStrategy for CompoundStrategy {
    fn name(&self) -> &str {
        "compound"
    }

    async fn extract(&self, input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
        let catalog = input.catalog;
        let mut candidates = Vec::new();

        for pattern in catalog.group(PatternGroup::Compound) {
            for m in pattern.matches(input.text) {
                if !Self::accept(catalog, pattern, &m, input.text) {
                    continue;
                }

                let (base, modifier) = match (m.base.clone(), m.modifier.clone()) {
                    (Some(base), Some(modifier)) => (Some(base), Some(modifier)),
                    _ => match catalog.decompose(&m.text) {
                        Some((base, modifier)) => {
                            (Some(base.to_string()), Some(modifier.to_string()))
                        }
                        None => (None, None),
                    },
                };

                let candidate = SpanCandidate::new(
                    input.index,
                    m.text,
                    m.start,
                    m.end,
                    pattern.category(),
                    self.name(),
                )?
                .with_priority(pattern.priority())
                .with_confidence(pattern.confidence())
                .with_decomposition(base, modifier);
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}
