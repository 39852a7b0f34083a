//! Boundary-aware lexical matcher.

use async_trait::async_trait;

use chimei_catalog::PatternGroup;
use chimei_shared::{Result, SpanCandidate};
use chimei_text::char_slice;

use crate::strategy::{ExtractionStrategy, SentenceInput};

/// How much of the following text the screen sees.
pub(crate) const AFTER_CHARS: usize = 3;

/// Runs every lexical catalog pattern over the sentence.
///
/// Prefecture, municipality, and natural-feature patterns are guarded
/// against adjacent kanji so a known name is not clipped out of a longer
/// compound; famous places match anywhere. Matches from screened patterns
/// must also pass the catalog's plausibility screen.
#[derive(Debug, Default)]
pub struct LexicalStrategy;

#[async_trait]
impl ExtractionStrategy for LexicalStrategy {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn extract(&self, input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
        let mut candidates = Vec::new();

        for pattern in input.catalog.group(PatternGroup::Lexical) {
            for m in pattern.matches(input.text) {
                if input.catalog.is_stopword(&m.text) {
                    continue;
                }
                if pattern.is_screened() {
                    let after = char_slice(input.text, m.end, m.end + AFTER_CHARS);
                    if !input.catalog.is_plausible(&m.text, pattern.category(), after) {
                        continue;
                    }
                }
                let candidate = SpanCandidate::new(
                    input.index,
                    m.text,
                    m.start,
                    m.end,
                    pattern.category(),
                    self.name(),
                )?
                .with_priority(pattern.priority())
                .with_confidence(pattern.confidence());
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}
