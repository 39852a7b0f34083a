//! Adapter over a general-purpose named-entity tagger.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use chimei_shared::{Category, Result, SpanCandidate};
use chimei_text::char_slice;

use crate::strategy::{ExtractionStrategy, SentenceInput};

/// An entity reported by a tagger, in char offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEntity {
    pub text: String,
    /// Tagger label, e.g. `GPE`, `LOC`, `FAC`, `PERSON`.
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// A named-entity recognizer. Any model or dictionary can sit behind this.
pub trait EntityTagger: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn tag(&self, text: &str) -> Result<Vec<TaggedEntity>>;
}

/// Keeps location-like entities and drops single-character hits.
#[derive(Debug, Clone)]
pub struct TaggerStrategy {
    tagger: Arc<dyn EntityTagger>,
}

impl TaggerStrategy {
    pub fn new(tagger: Arc<dyn EntityTagger>) -> Self {
        Self { tagger }
    }

    fn category_for(label: &str) -> Option<Category> {
        match label.to_ascii_uppercase().as_str() {
            "GPE" => Some(Category::TaggedGeopolitical),
            "LOC" | "LOCATION" => Some(Category::TaggedLocation),
            "FAC" | "FACILITY" => Some(Category::TaggedFacility),
            _ => None,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for TaggerStrategy {
    fn name(&self) -> &str {
        "tagger"
    }

    async fn extract(&self, input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
        let entities = self.tagger.tag(input.text)?;
        let mut candidates = Vec::new();

        for entity in entities {
            let Some(category) = Self::category_for(&entity.label) else {
                continue;
            };
            if entity.text.chars().count() <= 1 || input.catalog.is_stopword(&entity.text) {
                continue;
            }
            if char_slice(input.text, entity.start, entity.end) != entity.text {
                debug!(
                    tagger = self.tagger.name(),
                    text = %entity.text,
                    start = entity.start,
                    "tagger offsets do not match sentence, skipping"
                );
                continue;
            }

            candidates.push(SpanCandidate::new(
                input.index,
                entity.text,
                entity.start,
                entity.end,
                category,
                self.name(),
            )?);
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use chimei_catalog::Catalog;
    use chimei_shared::ChimeiError;

    use super::*;

    #[derive(Debug)]
    struct FixedTagger(Vec<TaggedEntity>);

    impl EntityTagger for FixedTagger {
        fn name(&self) -> &str {
            "fixed"
        }

        fn tag(&self, _text: &str) -> Result<Vec<TaggedEntity>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct BrokenTagger;

    impl EntityTagger for BrokenTagger {
        fn name(&self) -> &str {
            "broken"
        }

        fn tag(&self, _text: &str) -> Result<Vec<TaggedEntity>> {
            Err(ChimeiError::Tagger("model not loaded".into()))
        }
    }

    fn entity(text: &str, label: &str, start: usize) -> TaggedEntity {
        TaggedEntity {
            text: text.into(),
            label: label.into(),
            start,
            end: start + text.chars().count(),
        }
    }

    #[tokio::test]
    async fn keeps_location_labels_only() {
        let catalog = Catalog::builtin().expect("builtin");
        let sentence = "三四郎は本郷の大学で熊本の友と会った";
        let tagger = FixedTagger(vec![
            entity("三四郎", "PERSON", 0),
            entity("本郷", "GPE", 4),
            entity("大学", "FAC", 7),
            entity("熊", "LOC", 10),
            entity("熊本", "LOC", 10),
            entity("熊本", "LOC", 2),
        ]);
        let strategy = TaggerStrategy::new(Arc::new(tagger));
        let input = SentenceInput {
            index: 0,
            text: sentence,
            previous: None,
            next: None,
            catalog: &catalog,
        };

        let candidates = strategy.extract(&input).await.expect("extract");
        let found: Vec<(&str, Category)> = candidates
            .iter()
            .map(|c| (c.text.as_str(), c.category))
            .collect();
        assert_eq!(
            found,
            vec![
                ("本郷", Category::TaggedGeopolitical),
                ("大学", Category::TaggedFacility),
                ("熊本", Category::TaggedLocation),
            ]
        );
        assert!(candidates.iter().all(|c| c.priority == 6));
    }

    #[tokio::test]
    async fn tagger_errors_propagate() {
        let catalog = Catalog::builtin().expect("builtin");
        let strategy = TaggerStrategy::new(Arc::new(BrokenTagger));
        let input = SentenceInput {
            index: 0,
            text: "本郷にて",
            previous: None,
            next: None,
            catalog: &catalog,
        };
        assert!(strategy.extract(&input).await.is_err());
    }
}
