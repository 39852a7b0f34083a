//! Dictionary-backed entity tagger.
//!
//! Loads a TSV gazetteer (`surface<TAB>label`, `#` comments allowed) and tags
//! the leftmost-longest surface at each position.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use tracing::info;

use chimei_shared::{ChimeiError, Result};
use chimei_text::CharIndex;

use crate::tagger::{EntityTagger, TaggedEntity};

#[derive(Debug, Clone)]
pub struct GazetteerTagger {
    labels: HashMap<String, String>,
    /// `None` when the gazetteer is empty.
    matcher: Option<Regex>,
}

impl GazetteerTagger {
    /// Load a gazetteer file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ChimeiError::io(path, e))?;
        let tagger = Self::parse(&content)?;
        info!(?path, entries = tagger.len(), "gazetteer loaded");
        Ok(tagger)
    }

    /// Parse TSV content. Later duplicates override earlier ones.
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((surface, label)) = line.split_once('\t') else {
                return Err(ChimeiError::Tagger(format!(
                    "gazetteer line {}: expected `surface<TAB>label`",
                    n + 1
                )));
            };
            entries.push((surface.trim().to_string(), label.trim().to_string()));
        }
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let labels: HashMap<String, String> = entries
            .into_iter()
            .filter(|(surface, _)| !surface.is_empty())
            .collect();

        let mut surfaces: Vec<&str> = labels.keys().map(String::as_str).collect();
        surfaces.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

        let matcher = if surfaces.is_empty() {
            None
        } else {
            let source = surfaces
                .iter()
                .map(|s| regex::escape(s))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&source).map_err(|e| ChimeiError::Tagger(e.to_string()))?)
        };

        Ok(Self { labels, matcher })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl EntityTagger for GazetteerTagger {
    fn name(&self) -> &str {
        "gazetteer"
    }

    fn tag(&self, text: &str) -> Result<Vec<TaggedEntity>> {
        let Some(matcher) = &self.matcher else {
            return Ok(Vec::new());
        };

        let chars = CharIndex::new(text);
        let entities = matcher
            .find_iter(text)
            .filter_map(|m| {
                self.labels.get(m.as_str()).map(|label| TaggedEntity {
                    text: m.as_str().to_string(),
                    label: label.clone(),
                    start: chars.char_offset(m.start()),
                    end: chars.char_offset(m.end()),
                })
            })
            .collect();

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tsv_with_comments() {
        let tagger = GazetteerTagger::parse("# surface\tlabel\n本郷\tGPE\n\n不忍池\tLOC\n")
            .expect("parse");
        assert_eq!(tagger.len(), 2);
    }

    #[test]
    fn rejects_lines_without_label() {
        let err = GazetteerTagger::parse("本郷\tGPE\n不忍池\n").expect_err("must fail");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn tags_leftmost_longest() {
        let tagger = GazetteerTagger::parse("上野\tGPE\n上野公園\tFAC\n不忍池\tLOC\n").expect("parse");
        let entities = tagger.tag("上野公園から不忍池を見た").expect("tag");
        assert_eq!(
            entities,
            vec![
                TaggedEntity {
                    text: "上野公園".into(),
                    label: "FAC".into(),
                    start: 0,
                    end: 4,
                },
                TaggedEntity {
                    text: "不忍池".into(),
                    label: "LOC".into(),
                    start: 6,
                    end: 9,
                },
            ]
        );
    }

    #[test]
    fn empty_gazetteer_tags_nothing() {
        let tagger = GazetteerTagger::parse("").expect("parse");
        assert!(tagger.is_empty());
        assert!(tagger.tag("本郷").expect("tag").is_empty());
    }
}
