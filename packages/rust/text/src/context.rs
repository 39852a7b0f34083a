//! Before/after context windows around a span.

use crate::chars::{CharIndex, last_chars, take_chars};

/// Text surrounding one span, each part capped independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Previous sentence plus the sentence prefix, keeping the last `cap` chars.
    pub before: String,
    /// The sentence itself, keeping the first `cap` chars.
    pub sentence: String,
    /// Sentence suffix plus the next sentence, keeping the first `cap` chars.
    pub after: String,
}

/// Build the context window for the span `[start, end)` (char offsets) of
/// `sentences[index]`.
pub fn context_window(
    sentences: &[String],
    index: usize,
    start: usize,
    end: usize,
    cap: usize,
) -> ContextWindow {
    let Some(sentence) = sentences.get(index) else {
        return ContextWindow {
            before: String::new(),
            sentence: String::new(),
            after: String::new(),
        };
    };

    let chars = CharIndex::new(sentence);
    let prefix = &sentence[..chars.byte_offset(start)];
    let suffix = &sentence[chars.byte_offset(end)..];

    let mut before = String::new();
    if let Some(previous) = index.checked_sub(1).and_then(|i| sentences.get(i)) {
        before.push_str(previous);
    }
    before.push_str(prefix);

    let mut after = suffix.to_string();
    if let Some(next) = sentences.get(index + 1) {
        after.push_str(next);
    }

    ContextWindow {
        before: last_chars(&before, cap).to_string(),
        sentence: take_chars(sentence, cap).to_string(),
        after: take_chars(&after, cap).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences() -> Vec<String> {
        vec![
            "汽車は熊本を出た。".to_string(),
            "千葉県船橋市に疎開している。".to_string(),
            "本郷は遠い。".to_string(),
        ]
    }

    #[test]
    fn window_spans_neighbouring_sentences() {
        let window = context_window(&sentences(), 1, 0, 6, 500);
        assert_eq!(window.before, "汽車は熊本を出た。");
        assert_eq!(window.sentence, "千葉県船橋市に疎開している。");
        assert_eq!(window.after, "に疎開している。本郷は遠い。");
    }

    #[test]
    fn window_at_work_edges() {
        let window = context_window(&sentences(), 0, 3, 5, 500);
        assert_eq!(window.before, "汽車は");
        assert_eq!(window.after, "を出た。千葉県船橋市に疎開している。");

        let window = context_window(&sentences(), 2, 0, 2, 500);
        assert_eq!(window.after, "は遠い。");
    }

    #[test]
    fn window_parts_are_capped() {
        let window = context_window(&sentences(), 1, 3, 6, 4);
        assert_eq!(window.before, "。千葉県");
        assert_eq!(window.sentence, "千葉県船");
        assert_eq!(window.after, "に疎開し");
    }

    #[test]
    fn out_of_range_index_is_empty() {
        let window = context_window(&sentences(), 9, 0, 1, 500);
        assert!(window.sentence.is_empty());
    }
}
