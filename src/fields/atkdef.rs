//! ATK/DEF label repair and number extraction.

use anyhow::Result;
use regex::{Captures, Regex};

use super::fix_char;

/// Label misreads and their fixes, applied in order.
const LABEL_FIXES: &[(&str, &str)] = &[
    ("ALK", "ATK"),
    ("DFF", "DEF"),
    ("DE8", "DEF"),
    ("DEF/", "DEF:"),
    ("ATK/", "ATK:"),
];

/// Letters OCR reads in place of digits.
const DIGIT_FIXES: &[(char, char)] = &[('O', '0'), ('I', '1'), ('L', '1'), ('S', '5'), ('B', '8')];

/// Shapes the ATK/DEF line can take, tried in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtkDefPattern {
    /// `ATK:3000 DEF:2500`, colons optional, anything non-numeric between
    Labeled,
    /// `3000/2500`
    Slashed,
    /// `3000 2500`
    Spaced,
}

impl AtkDefPattern {
    pub const PRIORITY: [AtkDefPattern; 3] = [
        AtkDefPattern::Labeled,
        AtkDefPattern::Slashed,
        AtkDefPattern::Spaced,
    ];

    pub fn pattern(self) -> &'static str {
        match self {
            AtkDefPattern::Labeled => r"ATK:?([0-9]{2,5})[^0-9]+DEF:?([0-9]{2,5})",
            AtkDefPattern::Slashed => r"([0-9]{2,5})/([0-9]{2,5})",
            AtkDefPattern::Spaced => r"([0-9]{2,5})\s+([0-9]{2,5})",
        }
    }
}

/// Attack and defense read from one card. Always present together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtkDef {
    pub attack: u32,
    pub defense: u32,
}

/// Repairs OCR confusions of the ATK/DEF labels.
///
/// Spaces are removed before the substitutions so a label split by a stray
/// space is still repaired, then a single space is put back before `DEF:`.
/// Applying it to its own output changes nothing.
pub fn fix_atkdef_labels(text: &str) -> String {
    let mut t: String = text.to_uppercase().chars().filter(|c| *c != ' ').collect();
    for (from, to) in LABEL_FIXES {
        t = t.replace(from, to);
    }
    t.replace("DEF:", " DEF:")
}

fn parse_group(caps: &Captures, index: usize) -> Option<u32> {
    let digits: String = caps
        .get(index)?
        .as_str()
        .chars()
        .map(|c| fix_char(DIGIT_FIXES, c))
        .collect();
    digits.parse().ok()
}

/// Finds attack and defense in label-fixed text.
///
/// Patterns are tried in `AtkDefPattern::PRIORITY` order and the first
/// match wins. Returns `None` when no pattern matches.
pub fn extract_atk_def(text: &str) -> Result<Option<AtkDef>> {
    for kind in AtkDefPattern::PRIORITY {
        let re = Regex::new(kind.pattern())?;
        let Some(caps) = re.captures(text) else {
            continue;
        };
        if let (Some(attack), Some(defense)) = (parse_group(&caps, 1), parse_group(&caps, 2)) {
            crate::log(&format!("ATK/DEF matched {:?}: {}/{}", kind, attack, defense));
            return Ok(Some(AtkDef { attack, defense }));
        }
    }
    Ok(None)
}

/// `extract_atk_def` as an `(attack, defense)` pair of options.
pub fn extract_atk_def_numbers(text: &str) -> Result<(Option<u32>, Option<u32>)> {
    Ok(match extract_atk_def(text)? {
        Some(AtkDef { attack, defense }) => (Some(attack), Some(defense)),
        None => (None, None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_labels() {
        assert_eq!(fix_atkdef_labels("ALK/3000 DFF/2500"), "ATK:3000 DEF:2500");
        assert_eq!(fix_atkdef_labels("atk/2500 de8/2100"), "ATK:2500 DEF:2100");
        assert_eq!(fix_atkdef_labels("ATK: 3000   DEF: 2500"), "ATK:3000 DEF:2500");
        assert_eq!(fix_atkdef_labels("AL K/1200 D E8/900"), "ATK:1200 DEF:900");
    }

    #[test]
    fn test_fix_labels_idempotent() {
        for raw in [
            "ATK/3000 DEF/2500",
            "ALK 3000 DFF 2500",
            "AL K/1200 D E8/900",
            "DEF:100",
            "3000/2500",
            "",
            "atk ? def ?",
            "DDFFF/ALKLK",
        ] {
            let once = fix_atkdef_labels(raw);
            assert_eq!(fix_atkdef_labels(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_extract_labeled() {
        assert_eq!(
            extract_atk_def_numbers("ATK:3000 DEF:2500").unwrap(),
            (Some(3000), Some(2500))
        );
        assert_eq!(
            extract_atk_def_numbers(&fix_atkdef_labels("ALK/1800 DFF/1500")).unwrap(),
            (Some(1800), Some(1500))
        );
    }

    #[test]
    fn test_extract_slashed_and_spaced() {
        assert_eq!(
            extract_atk_def_numbers("3000/2500").unwrap(),
            (Some(3000), Some(2500))
        );
        assert_eq!(
            extract_atk_def_numbers("1200  800").unwrap(),
            (Some(1200), Some(800))
        );
    }

    #[test]
    fn test_labeled_pattern_takes_priority() {
        // Both the labeled and slashed shapes are present
        let text = "11/22 ATK:3000 DEF:2500";
        assert_eq!(
            extract_atk_def(text).unwrap(),
            Some(AtkDef {
                attack: 3000,
                defense: 2500
            })
        );
    }

    #[test]
    fn test_no_digit_pair() {
        assert_eq!(extract_atk_def_numbers("ATK:? DEF:?").unwrap(), (None, None));
        assert_eq!(extract_atk_def_numbers("").unwrap(), (None, None));
        assert_eq!(extract_atk_def_numbers("ATK:5 DEF:0").unwrap(), (None, None));
    }

    #[test]
    fn test_digit_runs_longer_than_five() {
        // The regex finds a 2-5 digit window inside longer runs
        assert_eq!(
            extract_atk_def_numbers("123456/78").unwrap(),
            (Some(23456), Some(78))
        );
    }
}
