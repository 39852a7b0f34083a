//! Core domain types for place-name extraction.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChimeiError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one extraction run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// A confidence score that is always within `[0, 1]`.
///
/// Out-of-range inputs are clamped and NaN becomes `0.0`, so every value
/// that reaches the resolver or the output is already valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Confidence(f32);

impl Confidence {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Total order over scores; used for deterministic sorting.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f32> for Confidence {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f32 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Fixed vocabulary of place-name categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Prefecture followed by a municipality, e.g. 千葉県船橋市.
    CompletePlace,
    Prefecture,
    /// City, ward, town, or village.
    City,
    County,
    FamousPlace,
    /// River, mountain, lake, cape and similar.
    NaturalPlace,
    /// Temple or shrine, e.g. 浅草寺, 明治神宮.
    TempleShrine,
    CompoundDirection,
    CompoundFacility,
    CompoundTerrain,
    /// A well-known compound from the fixed list (新宿駅前, 銀座周辺, ...).
    FallbackCompound,
    TaggedGeopolitical,
    TaggedLocation,
    TaggedFacility,
    AiExtracted,
    /// User-supplied catalog pattern.
    Custom,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 16] = [
        Self::CompletePlace,
        Self::Prefecture,
        Self::City,
        Self::County,
        Self::FamousPlace,
        Self::NaturalPlace,
        Self::TempleShrine,
        Self::CompoundDirection,
        Self::CompoundFacility,
        Self::CompoundTerrain,
        Self::FallbackCompound,
        Self::TaggedGeopolitical,
        Self::TaggedLocation,
        Self::TaggedFacility,
        Self::AiExtracted,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompletePlace => "complete-place",
            Self::Prefecture => "prefecture",
            Self::City => "city",
            Self::County => "county",
            Self::FamousPlace => "famous-place",
            Self::NaturalPlace => "natural-place",
            Self::TempleShrine => "temple-shrine",
            Self::CompoundDirection => "compound-direction",
            Self::CompoundFacility => "compound-facility",
            Self::CompoundTerrain => "compound-terrain",
            Self::FallbackCompound => "fallback-compound",
            Self::TaggedGeopolitical => "tagged-geopolitical",
            Self::TaggedLocation => "tagged-location",
            Self::TaggedFacility => "tagged-facility",
            Self::AiExtracted => "ai-extracted",
            Self::Custom => "custom",
        }
    }

    /// Resolution priority; lower wins. Multi-part names outrank
    /// single-part names, which outrank dictionary and model hits.
    pub fn default_priority(&self) -> u8 {
        match self {
            Self::CompletePlace => 0,
            Self::Prefecture
            | Self::CompoundDirection
            | Self::CompoundFacility
            | Self::CompoundTerrain
            | Self::FallbackCompound => 1,
            Self::City => 2,
            Self::County => 3,
            Self::FamousPlace => 4,
            Self::NaturalPlace | Self::TempleShrine | Self::Custom => 5,
            Self::TaggedGeopolitical
            | Self::TaggedLocation
            | Self::TaggedFacility
            | Self::AiExtracted => 6,
        }
    }

    /// Base confidence assigned when a strategy has no better estimate.
    pub fn default_confidence(&self) -> Confidence {
        let value = match self {
            Self::CompletePlace | Self::TaggedGeopolitical => 0.95,
            Self::Prefecture | Self::FamousPlace | Self::TaggedLocation => 0.90,
            Self::City
            | Self::CompoundFacility
            | Self::FallbackCompound
            | Self::TaggedFacility => 0.85,
            Self::County | Self::CompoundDirection | Self::CompoundTerrain => 0.80,
            Self::NaturalPlace | Self::Custom => 0.75,
            Self::TempleShrine | Self::AiExtracted => 0.70,
        };
        Confidence::new(value)
    }

    /// Whether spans of this category carry a base/modifier decomposition.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Self::CompoundDirection
                | Self::CompoundFacility
                | Self::CompoundTerrain
                | Self::FallbackCompound
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ChimeiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ChimeiError::validation(format!("unknown category `{s}`")))
    }
}

// ---------------------------------------------------------------------------
// StrategyKind
// ---------------------------------------------------------------------------

/// Built-in extraction strategies that can be enabled per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Lexical,
    Compound,
    Tagger,
    Ai,
}

impl StrategyKind {
    /// Registry order. Candidate concatenation follows this order.
    pub const ALL: [StrategyKind; 4] = [Self::Lexical, Self::Compound, Self::Tagger, Self::Ai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Compound => "compound",
            Self::Tagger => "tagger",
            Self::Ai => "ai",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = ChimeiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "compound" => Ok(Self::Compound),
            "tagger" => Ok(Self::Tagger),
            "ai" => Ok(Self::Ai),
            other => Err(ChimeiError::validation(format!(
                "unknown strategy `{other}` (expected lexical, compound, tagger, or ai)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// SpanCandidate
// ---------------------------------------------------------------------------

/// A single proposed place-name mention within one sentence.
///
/// Offsets are half-open character (not byte) offsets into the sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanCandidate {
    pub sentence_index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub category: Category,
    /// Name of the strategy that proposed the span.
    pub method: String,
    pub priority: u8,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
}

impl SpanCandidate {
    /// Create a candidate with the category's default priority and confidence.
    ///
    /// Fails when the range is empty or inverted, or when `text` does not
    /// have exactly `end - start` characters.
    pub fn new(
        sentence_index: usize,
        text: impl Into<String>,
        start: usize,
        end: usize,
        category: Category,
        method: impl Into<String>,
    ) -> Result<Self> {
        let text = text.into();
        if start >= end {
            return Err(ChimeiError::validation(format!(
                "empty or inverted span [{start}, {end}) for `{text}`"
            )));
        }
        let chars = text.chars().count();
        if chars != end - start {
            return Err(ChimeiError::validation(format!(
                "span [{start}, {end}) does not fit `{text}` ({chars} chars)"
            )));
        }

        Ok(Self {
            sentence_index,
            text,
            start,
            end,
            category,
            method: method.into(),
            priority: category.default_priority(),
            confidence: category.default_confidence(),
            base_form: None,
            modifier: None,
        })
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_confidence(mut self, confidence: impl Into<Confidence>) -> Self {
        self.confidence = confidence.into();
        self
    }

    pub fn with_decomposition(
        mut self,
        base_form: Option<String>,
        modifier: Option<String>,
    ) -> Self {
        self.base_form = base_form;
        self.modifier = modifier;
        self
    }

    /// Length of the span in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Half-open intersection test: `[s1,e1)` and `[s2,e2)` intersect
    /// unless one ends at or before the other starts.
    pub fn overlaps(&self, other: &SpanCandidate) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }
}

// ---------------------------------------------------------------------------
// ResolvedPlace
// ---------------------------------------------------------------------------

/// A surviving candidate with its surrounding text attached. Immutable once
/// emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub place_name: String,
    pub category: Category,
    pub confidence: Confidence,
    pub method: String,
    pub before_text: String,
    pub sentence: String,
    pub after_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    pub sentence_index: usize,
    pub start: usize,
    pub end: usize,
}

impl ResolvedPlace {
    /// Promote a resolved candidate, attaching its context windows.
    pub fn promote(
        candidate: SpanCandidate,
        before_text: String,
        sentence: String,
        after_text: String,
    ) -> Self {
        Self {
            place_name: candidate.text,
            category: candidate.category,
            confidence: candidate.confidence,
            method: candidate.method,
            before_text,
            sentence,
            after_text,
            base_form: candidate.base_form,
            modifier: candidate.modifier,
            sentence_index: candidate.sentence_index,
            start: candidate.start,
            end: candidate.end,
        }
    }
}

// ---------------------------------------------------------------------------
// Work input / output
// ---------------------------------------------------------------------------

/// A work to extract from: an identifier plus its decoded full text.
#[derive(Debug, Clone)]
pub struct WorkText {
    pub work_id: String,
    pub text: String,
}

impl WorkText {
    pub fn new(work_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            work_id: work_id.into(),
            text: text.into(),
        }
    }
}

/// Final annotated output for one work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExtraction {
    pub run_id: RunId,
    pub work_id: String,
    /// Ordered by sentence index, then start offset.
    pub places: Vec<ResolvedPlace>,
    pub sentence_count: usize,
    /// Raw candidates proposed before resolution.
    pub candidate_count: usize,
    pub extracted_at: DateTime<Utc>,
}

impl WorkExtraction {
    /// An empty result (short input, or nothing found).
    pub fn empty(work_id: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            work_id: work_id.into(),
            places: Vec::new(),
            sentence_count: 0,
            candidate_count: 0,
            extracted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Confidence::new(1.7).get(), 1.0);
        assert_eq!(Confidence::new(-0.2).get(), 0.0);
        assert_eq!(Confidence::new(f32::NAN).get(), 0.0);
        assert_eq!(Confidence::new(0.85).get(), 0.85);

        let parsed: Confidence = serde_json::from_str("3.5").expect("parse");
        assert_eq!(parsed.get(), 1.0);
    }

    #[test]
    fn candidate_rejects_bad_ranges() {
        assert!(SpanCandidate::new(0, "千葉", 2, 2, Category::FamousPlace, "lexical").is_err());
        assert!(SpanCandidate::new(0, "千葉", 3, 2, Category::FamousPlace, "lexical").is_err());
        assert!(SpanCandidate::new(0, "千葉県", 0, 2, Category::Prefecture, "lexical").is_err());

        let ok = SpanCandidate::new(0, "千葉県", 0, 3, Category::Prefecture, "lexical")
            .expect("valid span");
        assert_eq!(ok.priority, 1);
        assert_eq!(ok.char_len(), 3);
    }

    #[test]
    fn overlap_is_half_open() {
        let a = SpanCandidate::new(0, "千葉", 0, 2, Category::FamousPlace, "t").expect("a");
        let b = SpanCandidate::new(0, "県船", 2, 4, Category::FamousPlace, "t").expect("b");
        let c = SpanCandidate::new(0, "葉県", 1, 3, Category::FamousPlace, "t").expect("c");
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn category_serde_is_kebab_case() {
        let json = serde_json::to_string(&Category::FallbackCompound).expect("serialize");
        assert_eq!(json, "\"fallback-compound\"");
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().expect("parse"), category);
        }
    }

    #[test]
    fn default_confidences_are_valid() {
        for category in Category::ALL {
            let c = category.default_confidence().get();
            assert!((0.0..=1.0).contains(&c), "{category}: {c}");
        }
        assert_eq!(Category::CompletePlace.default_priority(), 0);
        assert_eq!(Category::FallbackCompound.default_confidence().get(), 0.85);
    }

    #[test]
    fn strategy_kind_parses() {
        assert_eq!("Lexical".parse::<StrategyKind>().expect("parse"), StrategyKind::Lexical);
        assert_eq!(" ai ".parse::<StrategyKind>().expect("parse"), StrategyKind::Ai);
        assert!("geocoder".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse");
        assert_eq!(id, parsed);
    }
}
