//! Attribute icon classification.
//!
//! The attribute is not read with OCR. The enhanced icon is compared to a
//! set of labelled reference icons with a normalized cross-correlation and
//! the best scoring label wins.

use anyhow::{anyhow, Context, Result};
use image::{GrayImage, RgbaImage};
use std::fs;
use std::path::Path;

use crate::enhance::{enhance_attribute_zone, prepare_for_match};
use crate::log;

/// Added to the standard deviation so flat images don't divide by zero.
const STD_EPSILON: f32 = 1e-6;

/// Attribute labels shipped as reference icons.
pub const KNOWN_ATTRIBUTES: &[&str] = &[
    "DARK", "LIGHT", "DIVINE", "EARTH", "FIRE", "WATER", "WIND", "SPELL", "TRAP",
];

/// One labelled reference icon, already standardized.
#[derive(Debug, Clone)]
pub struct AttributeTemplate {
    pub label: String,
    values: Vec<f32>,
}

/// Standardizes pixel values: subtract the mean, divide by the standard
/// deviation (population) plus a small epsilon.
pub fn standardize(img: &GrayImage) -> Vec<f32> {
    let values: Vec<f32> = img.pixels().map(|p| p[0] as f32).collect();
    if values.is_empty() {
        return values;
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let denom = variance.sqrt() + STD_EPSILON;

    values.iter().map(|v| (v - mean) / denom).collect()
}

/// Mean of the elementwise product of two standardized arrays.
///
/// Returns `None` if the arrays differ in length or are empty.
pub fn correlation(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let sum: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Some(sum / a.len() as f32)
}

/// Reference icons loaded once and reused for every card.
#[derive(Debug, Clone)]
pub struct AttributeClassifier {
    templates: Vec<AttributeTemplate>,
}

impl AttributeClassifier {
    /// Loads every `.png` in `dir` (extension matched case-insensitively).
    ///
    /// The label is the uppercased file stem. Templates are kept sorted by
    /// label so ties always resolve the same way. Fails if the directory
    /// can't be read, an icon can't be decoded, or no icons are found.
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read template directory: {}", dir.display()))?;

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if !is_png || !path.is_file() {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // "fire.old.png" is still FIRE
            let label = stem.split('.').next().unwrap_or(stem).to_uppercase();
            if !KNOWN_ATTRIBUTES.contains(&label.as_str()) {
                log(&format!("Template {} has an unrecognised label {}", path.display(), label));
            }

            let icon = image::open(&path)
                .with_context(|| format!("Failed to load template {}", path.display()))?
                .to_rgba8();
            templates.push((label, icon));
        }

        let classifier = Self::from_images(templates)?;
        log(&format!(
            "Loaded {} attribute templates from {}",
            classifier.templates.len(),
            dir.display()
        ));
        Ok(classifier)
    }

    /// Builds a classifier from labelled icons already in memory.
    pub fn from_images(icons: Vec<(String, RgbaImage)>) -> Result<Self> {
        if icons.is_empty() {
            return Err(anyhow!("No attribute templates found"));
        }

        let mut templates: Vec<AttributeTemplate> = icons
            .into_iter()
            .map(|(label, icon)| AttributeTemplate {
                label,
                values: standardize(&prepare_for_match(&icon)),
            })
            .collect();
        templates.sort_by(|a, b| a.label.cmp(&b.label));

        Ok(Self { templates })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.label.as_str())
    }

    /// Correlation of an attribute crop with every template, in template
    /// order. The crop goes through the same preparation as the templates.
    pub fn scores(&self, attribute_crop: &RgbaImage) -> Vec<(&str, f32)> {
        let prepared = prepare_for_match(&enhance_attribute_zone(attribute_crop));
        let values = standardize(&prepared);

        self.templates
            .iter()
            .filter_map(|t| correlation(&values, &t.values).map(|s| (t.label.as_str(), s)))
            .collect()
    }

    /// Returns the best matching label. Earlier templates win ties.
    pub fn classify(&self, attribute_crop: &RgbaImage) -> Option<String> {
        let mut best: Option<(&str, f32)> = None;
        for (label, score) in self.scores(attribute_crop) {
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((label, score));
            }
        }

        best.map(|(label, score)| {
            log(&format!("Attribute: {} (score {:.3})", label, score));
            label.to_string()
        })
    }
}
