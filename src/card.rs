//! The assembled card record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Card category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardType {
    Monster,
    Spell,
    Trap,
    Unknown,
}

impl CardType {
    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Monster => "Monster",
            CardType::Spell => "Spell",
            CardType::Trap => "Trap",
            CardType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infers the card category.
///
/// A card with an attack value is a monster. Otherwise the attribute icon
/// decides: the SPELL and TRAP icons mark spells and traps.
pub fn infer_card_type(attack: Option<u32>, attribute: Option<&str>) -> CardType {
    if attack.is_some() {
        CardType::Monster
    } else if attribute == Some("SPELL") {
        CardType::Spell
    } else if attribute == Some("TRAP") {
        CardType::Trap
    } else {
        CardType::Unknown
    }
}

/// Everything extracted from one card image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    pub card_type: CardType,
    pub monster_type: String,
    pub attribute: Option<String>,
    pub description: String,
    pub attack: Option<u32>,
    pub defense: Option<u32>,
    pub image_filename: String,
}
