//! Character-offset helpers.
//!
//! Spans are reported in characters, while `regex` and `str` work in bytes.

/// Regex character-class body for "kanji": the CJK block `一`-`龯` plus the
/// iteration marks and the small ヶ used inside place names (代々木, 関ヶ原).
pub const KANJI_CLASS: &str = "一-龯々〆ヶ";

/// Whether `c` belongs to [`KANJI_CLASS`].
pub fn is_kanji(c: char) -> bool {
    ('一'..='龯').contains(&c) || matches!(c, '々' | '〆' | 'ヶ')
}

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The first `n` characters of `s` (all of `s` if shorter).
pub fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

/// The last `n` characters of `s` (all of `s` if shorter).
pub fn last_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return &s[s.len()..];
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((byte, _)) => &s[byte..],
        None => s,
    }
}

/// Slice `s` by character offsets, clamping out-of-range bounds.
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let index = CharIndex::new(s);
    let end = end.min(index.char_count());
    let start = start.min(end);
    &s[index.byte_offset(start)..index.byte_offset(end)]
}

/// Byte/char offset map for one string.
#[derive(Debug, Clone)]
pub struct CharIndex {
    /// Byte offset of every char start, plus the total byte length.
    starts: Vec<usize>,
}

impl CharIndex {
    pub fn new(s: &str) -> Self {
        let mut starts: Vec<usize> = s.char_indices().map(|(b, _)| b).collect();
        starts.push(s.len());
        Self { starts }
    }

    pub fn char_count(&self) -> usize {
        self.starts.len() - 1
    }

    /// Char offset of a byte offset that lies on a char boundary.
    pub fn char_offset(&self, byte: usize) -> usize {
        match self.starts.binary_search(&byte) {
            Ok(i) | Err(i) => i,
        }
    }

    /// Byte offset of a char offset (clamped to the end of the string).
    pub fn byte_offset(&self, char_offset: usize) -> usize {
        self.starts[char_offset.min(self.char_count())]
    }
}
