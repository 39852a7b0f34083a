//! Sentence segmentation.

/// Sentence-final punctuation. The terminator stays with its sentence.
const TERMINATORS: [char; 5] = ['。', '！', '？', '!', '?'];

/// Closing brackets that belong to the sentence they close (「…。」).
const CLOSERS: [char; 6] = ['」', '』', '）', ')', '】', '〕'];

/// Split `text` into trimmed, non-empty sentences.
///
/// Boundaries are sentence-final punctuation and line breaks. Closing
/// brackets directly after a terminator are kept with the sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' || c == '\r' {
            push_trimmed(&mut sentences, &mut current);
            continue;
        }

        current.push(c);
        if TERMINATORS.contains(&c) {
            while let Some(&next) = chars.peek() {
                if TERMINATORS.contains(&next) || CLOSERS.contains(&next) {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            push_trimmed(&mut sentences, &mut current);
        }
    }
    push_trimmed(&mut sentences, &mut current);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}
