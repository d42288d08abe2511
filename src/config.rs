//! Configuration types for card extraction.
//!
//! Loads settings from config.json at startup. Provides zone geometry,
//! per-field confidence thresholds, OCR engine settings and the monster
//! type vocabulary. Every field falls back to its default when missing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fields::monster_type::{DRAGON_ABBREVIATIONS, KNOWN_TYPES, MIN_TYPE_SCORE};

/// A box in fractional coordinates (0.0 to 1.0) of the source image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneBox {
    /// Left edge as fraction of image width
    pub left: f64,
    /// Top edge as fraction of image height
    pub top: f64,
    /// Right edge as fraction of image width
    pub right: f64,
    /// Bottom edge as fraction of image height
    pub bottom: f64,
}

impl ZoneBox {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Fractional boxes for the five card zones, tuned for an upright card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneLayout {
    pub name: ZoneBox,
    pub attribute: ZoneBox,
    #[serde(rename = "type")]
    pub monster_type: ZoneBox,
    pub description: ZoneBox,
    pub atkdef: ZoneBox,
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self {
            name: ZoneBox::new(0.07, 0.05, 0.80, 0.13),
            attribute: ZoneBox::new(0.80, 0.07, 0.91, 0.15),
            monster_type: ZoneBox::new(0.08, 0.73, 0.70, 0.78),
            description: ZoneBox::new(0.07, 0.68, 0.93, 0.87),
            atkdef: ZoneBox::new(0.50, 0.89, 0.89, 0.93),
        }
    }
}

/// Minimum per-word OCR confidence (0-100) kept for each text field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub name: i32,
    #[serde(rename = "type")]
    pub monster_type: i32,
    pub description: i32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            name: 50,
            monster_type: 45,
            description: 45,
        }
    }
}

/// Tesseract invocation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Explicit path to the tesseract executable (searched for when unset)
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory (searched for when unset)
    pub tessdata_dir: Option<PathBuf>,
    /// Recognition language
    pub language: String,
    /// Per-call timeout in milliseconds, 0 disables the bound
    pub timeout_ms: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            language: "eng".to_string(),
            timeout_ms: 30000,
        }
    }
}

/// Monster type matching parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMatchConfig {
    /// Closed vocabulary; declared order decides ties
    pub known_types: Vec<String>,
    /// Short misreads resolved straight to DRAGON
    pub dragon_abbreviations: Vec<String>,
    /// Best scores below this return the cleaned text instead
    pub min_score: f64,
}

impl Default for TypeMatchConfig {
    fn default() -> Self {
        Self {
            known_types: KNOWN_TYPES.iter().map(|t| t.to_string()).collect(),
            dragon_abbreviations: DRAGON_ABBREVIATIONS.iter().map(|t| t.to_string()).collect(),
            min_score: MIN_TYPE_SCORE,
        }
    }
}

/// Complete extraction configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub zones: ZoneLayout,
    pub thresholds: ConfidenceThresholds,
    /// Directory of attribute reference icons (`<LABEL>.png`)
    pub template_dir: PathBuf,
    pub ocr: OcrSettings,
    pub type_match: TypeMatchConfig,
    /// When set, raw zone crops are written here for inspection
    pub debug_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            zones: ZoneLayout::default(),
            thresholds: ConfidenceThresholds::default(),
            template_dir: PathBuf::from("attributes"),
            ocr: OcrSettings::default(),
            type_match: TypeMatchConfig::default(),
            debug_dir: None,
        }
    }
}

impl ExtractorConfig {
    /// Loads configuration from a JSON file, or returns defaults if the file
    /// is missing or unreadable.
    pub fn load(config_path: &Path) -> Self {
        crate::log(&format!("Looking for config at: {}", config_path.display()));

        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        crate::log(&format!("Config loaded from {}", config_path.display()));
                        return config;
                    }
                    Err(e) => {
                        crate::log(&format!(
                            "Failed to parse {}: {}. Using defaults.",
                            config_path.display(),
                            e
                        ));
                    }
                },
                Err(e) => {
                    crate::log(&format!(
                        "Failed to read {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ));
                }
            }
        } else {
            crate::log("Config file not found. Using default config.");
        }

        Self::default()
    }

    /// Writes the default config to a file for reference.
    pub fn save_default(config_path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())?;
        fs::write(config_path, json)?;
        Ok(())
    }
}
