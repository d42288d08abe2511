//! Confidence filter for recognized words.

use super::engine::RecognizedWord;

/// Joins the words whose confidence reaches `min_confidence`, in their
/// original order, separated by single spaces.
///
/// Blank words are skipped. Returns an empty string when nothing survives.
pub fn join_confident_words(words: &[RecognizedWord], min_confidence: i32) -> String {
    words
        .iter()
        .map(|w| (w.text.trim(), w.confidence))
        .filter(|(text, conf)| !text.is_empty() && *conf >= min_confidence)
        .map(|(text, _)| text)
        .collect::<Vec<_>>()
        .join(" ")
}
