//! Field normalizers.
//!
//! Each corrector takes the raw text OCR produced for one zone and turns it
//! into a canonical value. None of them fail on bad input: an unreadable
//! field becomes an empty string or `None`.

pub mod atkdef;
pub mod description;
pub mod monster_type;
pub mod name;

pub use atkdef::{extract_atk_def, extract_atk_def_numbers, fix_atkdef_labels, AtkDef};
pub use description::clean_description;
pub use monster_type::{clean_raw_type, match_monster_type, match_monster_type_with};
pub use name::correct_chars_for_name;

/// Replaces `c` using a misread table, or returns it unchanged.
pub(crate) fn fix_char(table: &[(char, char)], c: char) -> char {
    table
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}
