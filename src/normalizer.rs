// 🔤 Plate Normalizer - recognizer fragments → canonical plate identifier

use crate::recognizer::Fragment;

/// Fragments at or below this confidence are dropped (exclusive threshold)
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Concatenate confident fragments in produced order, whitespace removed,
/// ASCII-uppercased. An empty result is a valid plate id that matches nothing.
pub fn normalize(fragments: &[Fragment]) -> String {
    let joined: String = fragments
        .iter()
        .filter(|f| f.confidence > MIN_CONFIDENCE)
        .flat_map(|f| f.text.chars())
        .collect();

    canonicalize(&joined)
}

/// Strip all whitespace and uppercase ASCII letters
pub fn canonicalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
