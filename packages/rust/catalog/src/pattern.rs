//! Compiled catalog patterns and boundary-guarded matching.

use regex::Regex;

use chimei_shared::{Category, ChimeiError, Confidence, Result};
use chimei_text::{CharIndex, KANJI_CLASS, is_kanji};

/// Which strategy consumes a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternGroup {
    /// Single place names: prefectures, municipalities, famous places.
    Lexical,
    /// Base place plus modifier.
    Compound,
}

/// Uncompiled pattern definition.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub name: String,
    /// Regex source. May use `(?P<base>..)` and `(?P<modifier>..)` groups.
    pub source: String,
    pub category: Category,
    pub priority: u8,
    pub confidence: Confidence,
    pub group: PatternGroup,
    /// Reject matches with a kanji immediately before or after.
    pub guarded: bool,
    /// Run matches through the catalog's plausibility screen.
    pub screened: bool,
}

impl PatternSpec {
    /// Unguarded spec with the category's default priority and confidence.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        category: Category,
        group: PatternGroup,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            category,
            priority: category.default_priority(),
            confidence: category.default_confidence(),
            group,
            guarded: false,
            screened: false,
        }
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    pub fn screened(mut self) -> Self {
        self.screened = true;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_confidence(mut self, confidence: impl Into<Confidence>) -> Self {
        self.confidence = confidence.into();
        self
    }
}

/// One match, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub base: Option<String>,
    pub modifier: Option<String>,
}

/// A compiled, immutable catalog entry.
#[derive(Debug, Clone)]
pub struct Pattern {
    spec: PatternSpec,
    regex: Regex,
}

impl Pattern {
    /// Compile a spec. A guarded pattern `X` becomes
    /// `(?:^|[^K])(?P<span>X)(?:[^K]|$)`, which accepts exactly the matches
    /// that a look-behind/look-ahead pair against kanji would.
    pub fn compile(spec: PatternSpec) -> Result<Self> {
        let source = if spec.guarded {
            format!(
                "(?:^|[^{KANJI_CLASS}])(?P<span>(?:{}))(?:[^{KANJI_CLASS}]|$)",
                spec.source
            )
        } else {
            format!("(?P<span>(?:{}))", spec.source)
        };

        let regex =
            Regex::new(&source).map_err(|e| ChimeiError::pattern(&spec.name, e.to_string()))?;
        Ok(Self { spec, regex })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn category(&self) -> Category {
        self.spec.category
    }

    pub fn priority(&self) -> u8 {
        self.spec.priority
    }

    pub fn confidence(&self) -> Confidence {
        self.spec.confidence
    }

    pub fn group(&self) -> PatternGroup {
        self.spec.group
    }

    pub fn is_guarded(&self) -> bool {
        self.spec.guarded
    }

    pub fn is_screened(&self) -> bool {
        self.spec.screened
    }

    /// Non-overlapping matches, left to right.
    pub fn matches(&self, sentence: &str) -> Vec<PatternMatch> {
        let chars = CharIndex::new(sentence);
        let mut found = Vec::new();
        let mut pos = 0;

        while pos <= sentence.len() {
            let Some(caps) = self.regex.captures_at(sentence, pos) else {
                break;
            };
            let Some(span) = caps.name("span") else {
                break;
            };

            if span.is_empty() {
                match sentence[span.end()..].chars().next() {
                    Some(c) => pos = span.end() + c.len_utf8(),
                    None => break,
                }
                continue;
            }

            found.push(PatternMatch {
                text: span.as_str().to_string(),
                start: chars.char_offset(span.start()),
                end: chars.char_offset(span.end()),
                base: caps.name("base").map(|m| m.as_str().to_string()),
                modifier: caps.name("modifier").map(|m| m.as_str().to_string()),
            });

            pos = self.resume_after(span.as_str(), span.end(), pos);
        }

        found
    }

    /// Where the next search starts. The guard before a match consumes one
    /// char, so when a guarded match ends in a non-kanji char the search
    /// restarts on that char to let it act as the next match's left guard.
    fn resume_after(&self, span: &str, span_end: usize, previous: usize) -> usize {
        if !self.spec.guarded {
            return span_end;
        }
        match span.chars().next_back() {
            Some(last) if !is_kanji(last) => {
                let resume = span_end - last.len_utf8();
                if resume > previous { resume } else { span_end }
            }
            _ => span_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str, guarded: bool) -> Pattern {
        let mut spec = PatternSpec::new("test", source, Category::City, PatternGroup::Lexical);
        spec.guarded = guarded;
        Pattern::compile(spec).expect("compile")
    }

    fn texts(pattern: &Pattern, sentence: &str) -> Vec<String> {
        pattern.matches(sentence).into_iter().map(|m| m.text).collect()
    }

    #[test]
    fn guard_rejects_clipped_names() {
        let prefecture = compile("千葉県|東京都", true);
        assert!(texts(&prefecture, "千葉県船橋市に疎開している").is_empty());
        assert_eq!(texts(&prefecture, "千葉県に疎開している"), vec!["千葉県"]);
        assert_eq!(texts(&prefecture, "東京都"), vec!["東京都"]);
    }

    #[test]
    fn guard_backtracks_like_lookahead() {
        let city = compile("[一-龯]{2,6}[市区町村]", true);
        let found = city.matches("千葉県船橋市に疎開している");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "千葉県船橋市");
        assert_eq!((found[0].start, found[0].end), (0, 6));
    }

    #[test]
    fn adjacent_guarded_matches_share_separator() {
        let prefecture = compile("千葉県|東京都", true);
        let found = prefecture.matches("東京都、千葉県");
        assert_eq!(found.len(), 2);
        assert_eq!((found[1].start, found[1].end), (4, 7));
    }

    #[test]
    fn guarded_match_ending_in_kana_allows_next_match() {
        let pattern = compile("あい|うえ", true);
        assert_eq!(texts(&pattern, "あいうえ"), vec!["あい", "うえ"]);
    }

    #[test]
    fn unguarded_matches_inside_compounds() {
        let famous = compile("船橋|千葉", false);
        let found = famous.matches("千葉県船橋市");
        assert_eq!(found.len(), 2);
        assert_eq!((found[1].start, found[1].end), (3, 5));
    }

    #[test]
    fn named_groups_become_decomposition() {
        let compound = compile("(?P<base>[一-龯]{2,})(?P<modifier>駅前|駅周辺)", false);
        let found = compound.matches("新宿駅前の喫茶店");
        assert_eq!(found[0].base.as_deref(), Some("新宿"));
        assert_eq!(found[0].modifier.as_deref(), Some("駅前"));
    }

    #[test]
    fn empty_matches_are_skipped() {
        let pattern = compile("本?", false);
        assert_eq!(texts(&pattern, "日本橋"), vec!["本"]);
    }

    #[test]
    fn malformed_pattern_names_itself() {
        let spec = PatternSpec::new("broken", "(千葉", Category::Custom, PatternGroup::Lexical);
        let err = Pattern::compile(spec).expect_err("must fail");
        assert!(err.to_string().contains("`broken`"));
    }
}
