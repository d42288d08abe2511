use super::fix_char;

/// Digits and glyphs OCR commonly reads in place of letters in card names.
const NAME_CHAR_FIXES: &[(char, char)] = &[
    ('0', 'O'),
    ('1', 'I'),
    ('5', 'S'),
    ('6', 'G'),
    ('8', 'B'),
    ('|', 'I'),
    ('¢', 'C'),
];

/// Cleans a card name read by OCR.
///
/// Uppercases, swaps misread digits for letters, keeps only `A-Z`, digits,
/// whitespace and hyphens, collapses whitespace, then capitalizes each word
/// (first letter upper, rest lower).
pub fn correct_chars_for_name(raw: &str) -> String {
    let fixed: String = raw
        .to_uppercase()
        .chars()
        .map(|c| fix_char(NAME_CHAR_FIXES, c))
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    fixed
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
