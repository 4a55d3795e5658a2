//! Span text normalization.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalizes the text of extracted spans.
///
/// Applies NFKC (folds full-width forms and compatibility characters),
/// expands ligatures, strips private-use, replacement and control characters,
/// and collapses runs of whitespace.
pub struct TextNormalizer {
    whitespace_regex: Regex,
    ligature_map: Vec<(&'static str, &'static str)>,
}

impl TextNormalizer {
    /// Create a new normalizer.
    pub fn new() -> Self {
        Self {
            whitespace_regex: Regex::new(r"\s+").unwrap(),
            ligature_map: vec![
                ("\u{FB00}", "ff"),
                ("\u{FB01}", "fi"),
                ("\u{FB02}", "fl"),
                ("\u{FB03}", "ffi"),
                ("\u{FB04}", "ffl"),
                ("\u{FB05}", "st"),
                ("\u{FB06}", "st"),
            ],
        }
    }

    /// Normalize one fragment of text.
    pub fn normalize(&self, text: &str) -> String {
        let mut result = text.to_string();

        // Ligatures first: NFKC would fold most of them anyway, but not ﬅ
        for (ligature, replacement) in &self.ligature_map {
            if result.contains(ligature) {
                result = result.replace(ligature, replacement);
            }
        }

        result = result
            .nfkc()
            .filter(|c| !is_garbled_char(*c) || c.is_whitespace())
            .collect();

        self.whitespace_regex
            .replace_all(result.trim(), " ")
            .into_owned()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Characters that carry no readable text: replacement, private use, and
/// control characters.
pub(crate) fn is_garbled_char(c: char) -> bool {
    let code = c as u32;
    c == '\u{FFFD}'
        || c.is_control()
        || (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

/// Share of non-whitespace characters in `text` that are garbled.
pub(crate) fn garbled_ratio(text: &str) -> f32 {
    let mut total = 0usize;
    let mut garbled = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_garbled_char(c) {
            garbled += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        garbled as f32 / total as f32
    }
}
