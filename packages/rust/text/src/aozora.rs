//! Aozora Bunko markup cleanup.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The result is plain prose: no ruby, no input annotations, no
//! bibliographic footer.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on an Aozora Bunko text.
pub fn strip_markup(text: &str) -> String {
    let mut result = text.replace("\r\n", "\n");

    result = strip_notation_block(&result);
    result = strip_footer(&result);
    result = strip_annotations(&result);
    result = strip_ruby(&result);
    result = strip_rules(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Notation explanation block
// ---------------------------------------------------------------------------

/// Remove the 【テキスト中に現れる記号について】 block framed by dashed rules.
fn strip_notation_block(text: &str) -> String {
    static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)-{5,}[ \t]*\n【テキスト中に現れる記号について】.*?\n-{5,}[ \t]*")
            .expect("valid regex")
    });

    BLOCK_RE.replace_all(text, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Bibliographic footer
// ---------------------------------------------------------------------------

/// Cut everything from the first 底本/入力/校正 footer line to the end.
fn strip_footer(text: &str) -> String {
    static FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t　]*(?:底本：|底本の親本：|入力：|校正：)").expect("valid regex")
    });

    match FOOTER_RE.find(text) {
        Some(m) => text[..m.start()].to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Pass 3: Input annotations
// ---------------------------------------------------------------------------

/// Remove ［＃...］ annotations, including the ※ gaiji marker before them.
fn strip_annotations(text: &str) -> String {
    static NOTE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"※?［＃[^］]*］").expect("valid regex"));

    NOTE_RE.replace_all(text, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Ruby
// ---------------------------------------------------------------------------

/// Remove 《ruby》 readings and the ｜ ruby-start marker.
fn strip_ruby(text: &str) -> String {
    static RUBY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"《[^》]*》|｜").expect("valid regex"));

    RUBY_RE.replace_all(text, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Separator rules
// ---------------------------------------------------------------------------

/// Drop lines made only of dashes, equals signs, or box-drawing rules.
fn strip_rules(text: &str) -> String {
    static RULE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[-=─]{3,}$").expect("valid regex"));

    text.lines()
        .filter(|line| !RULE_RE.is_match(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 6: Whitespace
// ---------------------------------------------------------------------------

/// Trim every line (including ideographic indentation) and collapse runs of
/// blank lines.
fn normalize_whitespace(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    MULTI_BLANK_RE
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}
