//! Monster type correction against a closed vocabulary.

use std::collections::BTreeSet;

use super::fix_char;
use crate::config::TypeMatchConfig;

/// Known monster types. Matching walks this list in order, so on equal
/// scores the earlier entry wins.
pub const KNOWN_TYPES: &[&str] = &[
    "AQUA",
    "BEAST",
    "BEAST-WARRIOR",
    "CREATOR GOD",
    "CYBERSE",
    "DINOSAUR",
    "DIVINE-BEAST",
    "DRAGON",
    "FAIRY",
    "FIEND",
    "FISH",
    "INSECT",
    "MACHINE",
    "PLANT",
    "PSYCHIC",
    "PYRO",
    "REPTILE",
    "ROCK",
    "SEA SERPENT",
    "SPELLCASTER",
    "THUNDER",
    "WARRIOR",
    "WINGED BEAST",
    "WYRM",
    "ZOMBIE",
];

/// What is left of "[DRAGON]" after OCR mangles it on small type lines.
pub const DRAGON_ABBREVIATIONS: &[&str] = &["TD", "FD", "RD", "ID", "DD", "D"];

/// Matches scoring below this fall back to the cleaned text.
pub const MIN_TYPE_SCORE: f64 = 0.2;

const TYPE_CHAR_FIXES: &[(char, char)] = &[
    ('0', 'O'),
    ('1', 'I'),
    ('5', 'S'),
    ('6', 'G'),
    ('8', 'B'),
    ('4', 'A'),
    ('|', 'I'),
    ('{', '['),
    ('}', ']'),
];

/// Normalizes raw OCR type text before matching.
///
/// Uppercases, fixes misread characters, keeps only `A-Z`, brackets,
/// hyphens and spaces, then drops the brackets.
pub fn clean_raw_type(text: &str) -> String {
    let kept: String = text
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| fix_char(TYPE_CHAR_FIXES, c))
        .filter(|c| c.is_ascii_uppercase() || matches!(c, '[' | ']' | '-' | ' '))
        .filter(|c| !matches!(c, '[' | ']'))
        .collect();
    kept.trim().to_string()
}

/// Share of the candidate's distinct letters that also appear in `cleaned`.
///
/// Separators (`-` and space) are ignored on the candidate side.
pub fn overlap_score(cleaned: &BTreeSet<char>, candidate: &str) -> f64 {
    let candidate_set: BTreeSet<char> = candidate
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect();
    if candidate_set.is_empty() {
        return 0.0;
    }
    cleaned.intersection(&candidate_set).count() as f64 / candidate_set.len() as f64
}

/// Matches raw type text using the default vocabulary and threshold.
pub fn match_monster_type(raw: &str) -> String {
    match_monster_type_with(raw, &TypeMatchConfig::default())
}

/// Matches raw type text against `config.known_types`.
///
/// Empty input gives an empty result. A known short misread resolves to
/// DRAGON. Otherwise the highest scoring type is returned, first in
/// vocabulary order on ties, unless its score is under `config.min_score`
/// in which case the cleaned text itself is returned.
pub fn match_monster_type_with(raw: &str, config: &TypeMatchConfig) -> String {
    let cleaned = clean_raw_type(raw);
    if cleaned.is_empty() {
        return String::new();
    }

    if config.dragon_abbreviations.iter().any(|a| *a == cleaned) {
        return "DRAGON".to_string();
    }

    let cleaned_set: BTreeSet<char> = cleaned.chars().collect();

    let mut best: Option<(&str, f64)> = None;
    for candidate in &config.known_types {
        let score = overlap_score(&cleaned_set, candidate);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate.as_str(), score));
        }
    }

    match best {
        Some((candidate, score)) if score >= config.min_score => candidate.to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_raw_type() {
        assert_eq!(clean_raw_type("[DRAG0N/EFFECT]"), "DRAGONEFFECT");
        assert_eq!(clean_raw_type(" {5pellcaster} "), "SPELLCASTER");
        assert_eq!(clean_raw_type("[Beast-Warrior / Effect]"), "BEAST-WARRIOR  EFFECT");
        assert_eq!(clean_raw_type(""), "");
        assert_eq!(clean_raw_type("[]"), "");
    }

    #[test]
    fn test_exact_type_matches_itself() {
        assert_eq!(match_monster_type("DRAGON"), "DRAGON");
        assert_eq!(match_monster_type("[ZOMBIE]"), "ZOMBIE");
        assert_eq!(match_monster_type("[WYRM]"), "WYRM");
    }

    #[test]
    fn test_dragon_abbreviations() {
        assert_eq!(match_monster_type("TD"), "DRAGON");
        assert_eq!(match_monster_type("[D]"), "DRAGON");
        assert_eq!(match_monster_type("1D"), "DRAGON");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(match_monster_type(""), "");
        assert_eq!(match_monster_type("%%"), "");
    }

    #[test]
    fn test_garbled_type_is_corrected() {
        assert_eq!(match_monster_type("[5PELLCA5TER]"), "SPELLCASTER");
        assert_eq!(match_monster_type("[MACH1NE]"), "MACHINE");
    }

    #[test]
    fn test_low_score_returns_cleaned_text() {
        assert_eq!(match_monster_type("JJX"), "JJX");
        // V only appears in DIVINE-BEAST, scoring 1/9
        assert_eq!(match_monster_type("VVV"), "VVV");
    }

    #[test]
    fn test_ties_resolve_in_vocabulary_order() {
        // Contains every letter of both BEAST and BEAST-WARRIOR
        assert_eq!(match_monster_type("BEAST WARRIOR"), "BEAST");

        let config = TypeMatchConfig {
            known_types: vec!["BEAST-WARRIOR".to_string(), "BEAST".to_string()],
            ..TypeMatchConfig::default()
        };
        assert_eq!(match_monster_type_with("BEAST WARRIOR", &config), "BEAST-WARRIOR");
    }

    #[test]
    fn test_overlap_score() {
        let set: BTreeSet<char> = "DRGN".chars().collect();
        assert!((overlap_score(&set, "DRAGON") - 4.0 / 6.0).abs() < 1e-9);
        assert!((overlap_score(&set, "SEA SERPENT") - 2.0 / 7.0).abs() < 1e-9);
        assert_eq!(overlap_score(&set, "- "), 0.0);
    }
}
