//! Card extraction pipeline.
//!
//! Crops the zones, enhances each one, reads the text zones through the OCR
//! engine, classifies the attribute icon, normalizes every field and
//! assembles the record. One extractor is built per run and reused for
//! every card; it holds no mutable state.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::fs;
use std::path::Path;

use crate::attribute::AttributeClassifier;
use crate::card::{infer_card_type, CardRecord};
use crate::config::ExtractorConfig;
use crate::enhance::enhance_text_zone;
use crate::fields::{
    clean_description, correct_chars_for_name, extract_atk_def_numbers, fix_atkdef_labels,
    match_monster_type_with,
};
use crate::log;
use crate::ocr::{join_confident_words, OcrEngine, OcrRequest, TesseractEngine};
use crate::region::{crop_regions, RegionSet, Zone};

/// Characters the type line can contain.
pub const TYPE_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ[]";

pub struct CardExtractor<E: OcrEngine> {
    config: ExtractorConfig,
    engine: E,
    classifier: AttributeClassifier,
}

impl CardExtractor<TesseractEngine> {
    /// Locates Tesseract and loads the attribute templates named in the config.
    pub fn from_config(config: ExtractorConfig) -> Result<Self> {
        let engine = TesseractEngine::from_settings(&config.ocr)?;
        let classifier = AttributeClassifier::load(&config.template_dir)?;
        Ok(Self::new(config, engine, classifier))
    }
}

impl<E: OcrEngine> CardExtractor<E> {
    pub fn new(config: ExtractorConfig, engine: E, classifier: AttributeClassifier) -> Self {
        Self {
            config,
            engine,
            classifier,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Loads a card image from disk and extracts it. The record carries the
    /// file's base name.
    pub fn extract(&self, path: &Path) -> Result<CardRecord> {
        let img = image::open(path)
            .with_context(|| format!("Failed to load card image {}", path.display()))?
            .to_rgba8();

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.extract_image(&img, &filename)
    }

    /// Runs the pipeline on an image already in memory.
    pub fn extract_image(&self, img: &RgbaImage, image_filename: &str) -> Result<CardRecord> {
        log(&format!(
            "Extracting {} ({}x{})",
            image_filename,
            img.width(),
            img.height()
        ));

        let regions = crop_regions(img, &self.config.zones)?;
        for (zone, crop) in regions.iter() {
            log(&format!("  {} zone: {}x{}", zone, crop.width(), crop.height()));
        }
        if let Some(dir) = &self.config.debug_dir {
            if let Err(e) = save_debug_crops(dir, image_filename, &regions) {
                log(&format!("Failed to save debug crops: {}", e));
            }
        }

        let name = self.read_name(&regions.name)?;
        let monster_type = self.read_monster_type(&regions.monster_type)?;
        let description = self.read_description(&regions.description)?;
        let (attack, defense) = self.read_atk_def(&regions.atkdef)?;
        let attribute = self.classifier.classify(&regions.attribute);

        let card_type = infer_card_type(attack, attribute.as_deref());
        log(&format!("Card type: {}", card_type));

        Ok(CardRecord {
            name,
            card_type,
            monster_type,
            attribute,
            description,
            attack,
            defense,
            image_filename: image_filename.to_string(),
        })
    }

    /// Reads a zone word by word and keeps the words above `threshold`.
    fn read_confident(
        &self,
        zone: Zone,
        crop: &RgbaImage,
        request: &OcrRequest,
        threshold: i32,
    ) -> Result<String> {
        let enhanced = enhance_text_zone(zone, crop);
        let words = self
            .engine
            .recognize_words(&enhanced, request)
            .with_context(|| format!("OCR failed on {} zone", zone))?;
        let text = join_confident_words(&words, threshold);
        log(&format!(
            "  {} OCR ({}): {} words, kept {:?}",
            zone,
            request.config_string(),
            words.len(),
            text
        ));
        Ok(text)
    }

    fn read_name(&self, crop: &RgbaImage) -> Result<String> {
        let raw = self.read_confident(
            Zone::Name,
            crop,
            &OcrRequest::single_line(),
            self.config.thresholds.name,
        )?;
        let name = correct_chars_for_name(&raw);
        log(&format!("  Name: {:?}", name));
        Ok(name)
    }

    fn read_monster_type(&self, crop: &RgbaImage) -> Result<String> {
        let request = OcrRequest::single_line().with_whitelist(TYPE_WHITELIST);
        let raw = self.read_confident(
            Zone::Type,
            crop,
            &request,
            self.config.thresholds.monster_type,
        )?;
        let monster_type = match_monster_type_with(&raw, &self.config.type_match);
        log(&format!("  Type: {:?}", monster_type));
        Ok(monster_type)
    }

    fn read_description(&self, crop: &RgbaImage) -> Result<String> {
        let raw = self.read_confident(
            Zone::Description,
            crop,
            &OcrRequest::block(),
            self.config.thresholds.description,
        )?;
        clean_description(&raw)
    }

    fn read_atk_def(&self, crop: &RgbaImage) -> Result<(Option<u32>, Option<u32>)> {
        let enhanced = enhance_text_zone(Zone::AtkDef, crop);
        let raw = self
            .engine
            .recognize_text(&enhanced, &OcrRequest::single_line())
            .context("OCR failed on atkdef zone")?;
        let fixed = fix_atkdef_labels(raw.trim());
        log(&format!("  ATK/DEF text: {:?}", fixed));
        extract_atk_def_numbers(&fixed)
    }
}

/// Keeps ASCII letters, digits, `-` and `_`; anything else becomes `_`.
fn sanitize_file_stem(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "card".to_string()
    } else {
        cleaned
    }
}

/// Writes the raw crops as `<image stem>_<zone>.png`.
fn save_debug_crops(dir: &Path, image_filename: &str, regions: &RegionSet) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create debug directory {}", dir.display()))?;

    let stem = sanitize_file_stem(image_filename);
    for (zone, crop) in regions.iter() {
        let path = dir.join(format!("{}_{}.png", stem, zone.tag()));
        crop.save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
    }
    log(&format!("Saved debug crops to {}", dir.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;
    use crate::ocr::RecognizedWord;
    use anyhow::anyhow;
    use image::{GrayImage, ImageBuffer, Rgba};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Answers each zone from a script, keyed on the request shape.
    #[derive(Default)]
    struct FakeOcrEngine {
        name: Vec<RecognizedWord>,
        monster_type: Vec<RecognizedWord>,
        description: Vec<RecognizedWord>,
        atkdef: String,
        fail: bool,
        requests: Mutex<Vec<String>>,
    }

    impl OcrEngine for FakeOcrEngine {
        fn recognize_words(&self, _img: &GrayImage, request: &OcrRequest) -> Result<Vec<RecognizedWord>> {
            if self.fail {
                return Err(anyhow!("engine unavailable"));
            }
            self.requests.lock().unwrap().push(request.config_string());
            Ok(match (request.page_seg_mode, request.whitelist.is_some()) {
                (7, false) => self.name.clone(),
                (7, true) => self.monster_type.clone(),
                _ => self.description.clone(),
            })
        }

        fn recognize_text(&self, _img: &GrayImage, request: &OcrRequest) -> Result<String> {
            if self.fail {
                return Err(anyhow!("engine unavailable"));
            }
            self.requests.lock().unwrap().push(request.config_string());
            Ok(self.atkdef.clone())
        }
    }

    fn words(items: &[(&str, i32)]) -> Vec<RecognizedWord> {
        items
            .iter()
            .map(|(t, c)| RecognizedWord::new(*t, *c))
            .collect()
    }

    fn card_image() -> RgbaImage {
        ImageBuffer::from_fn(100, 150, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            Rgba([v, 255 - v, v / 2, 255])
        })
    }

    fn classifier(label: &str) -> AttributeClassifier {
        let icon: RgbaImage = ImageBuffer::from_fn(16, 16, |x, _| Rgba([(x * 16) as u8, 0, 0, 255]));
        AttributeClassifier::from_images(vec![(label.to_string(), icon)]).unwrap()
    }

    fn monster_engine() -> FakeOcrEngine {
        FakeOcrEngine {
            name: words(&[("8LUE-EYES", 90), ("WH1TE", 80), ("DRAG0N", 88), ("~~", 12)]),
            monster_type: words(&[("[DRAG0N]", 70)]),
            description: words(&[
                ("This", 90),
                ("card", 88),
                ("X", 80),
                ("can't", 20),
                ("be", 70),
                ("destroyed.", 75),
                ("|", 60),
            ]),
            atkdef: " ALK/3000 DFF/2500\n".to_string(),
            ..FakeOcrEngine::default()
        }
    }

    #[test]
    fn test_extract_monster_card() {
        let extractor = CardExtractor::new(ExtractorConfig::default(), monster_engine(), classifier("LIGHT"));
        let record = extractor.extract_image(&card_image(), "blue_eyes.png").unwrap();

        assert_eq!(
            record,
            CardRecord {
                name: "Blue-eyes White Dragon".to_string(),
                card_type: CardType::Monster,
                monster_type: "DRAGON".to_string(),
                attribute: Some("LIGHT".to_string()),
                description: "This card be destroyed.".to_string(),
                attack: Some(3000),
                defense: Some(2500),
                image_filename: "blue_eyes.png".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_uses_zone_requests() {
        let extractor = CardExtractor::new(ExtractorConfig::default(), monster_engine(), classifier("DARK"));
        extractor.extract_image(&card_image(), "card.png").unwrap();

        let requests = extractor.engine.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                "--oem 3 --psm 7".to_string(),
                format!("--oem 3 --psm 7 -c tessedit_char_whitelist={}", TYPE_WHITELIST),
                "--oem 3 --psm 6".to_string(),
                "--oem 3 --psm 7".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_spell_card_without_stats() {
        let engine = FakeOcrEngine {
            name: words(&[("DARK", 95), ("H0LE", 91)]),
            description: words(&[("Destroy", 80), ("all", 80), ("monsters.", 80)]),
            atkdef: String::new(),
            ..FakeOcrEngine::default()
        };
        let extractor = CardExtractor::new(ExtractorConfig::default(), engine, classifier("SPELL"));
        let record = extractor.extract_image(&card_image(), "dark_hole.jpg").unwrap();

        assert_eq!(record.name, "Dark Hole");
        assert_eq!(record.card_type, CardType::Spell);
        assert_eq!(record.monster_type, "");
        assert_eq!(record.attack, None);
        assert_eq!(record.defense, None);
    }

    #[test]
    fn test_low_confidence_fields_are_empty() {
        let engine = FakeOcrEngine {
            name: words(&[("NOISE", 10)]),
            monster_type: words(&[("[WARRIOR]", 44)]),
            description: words(&[("blurry", 44)]),
            atkdef: "ATK:? DEF:?".to_string(),
            ..FakeOcrEngine::default()
        };
        let extractor = CardExtractor::new(ExtractorConfig::default(), engine, classifier("DARK"));
        let record = extractor.extract_image(&card_image(), "card.png").unwrap();

        assert_eq!(record.name, "");
        assert_eq!(record.monster_type, "");
        assert_eq!(record.description, "");
        assert_eq!(record.card_type, CardType::Unknown);
    }

    #[test]
    fn test_engine_failure_propagates() {
        let engine = FakeOcrEngine {
            fail: true,
            ..FakeOcrEngine::default()
        };
        let extractor = CardExtractor::new(ExtractorConfig::default(), engine, classifier("DARK"));
        assert!(extractor.extract_image(&card_image(), "card.png").is_err());
    }

    #[test]
    fn test_empty_image_is_error() {
        let extractor = CardExtractor::new(ExtractorConfig::default(), monster_engine(), classifier("DARK"));
        assert!(extractor.extract_image(&RgbaImage::new(0, 10), "empty.png").is_err());
    }

    #[test]
    fn test_extract_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blue_eyes.png");
        card_image().save(&path).unwrap();

        let extractor = CardExtractor::new(ExtractorConfig::default(), monster_engine(), classifier("LIGHT"));
        let record = extractor.extract(&path).unwrap();
        assert_eq!(record.image_filename, "blue_eyes.png");

        assert!(extractor.extract(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_debug_crops_are_saved() {
        let dir = tempdir().unwrap();
        let debug_dir = dir.path().join("debug");
        let config = ExtractorConfig {
            debug_dir: Some(debug_dir.clone()),
            ..ExtractorConfig::default()
        };

        let extractor = CardExtractor::new(config, monster_engine(), classifier("LIGHT"));
        extractor.extract_image(&card_image(), "my card #1.png").unwrap();

        for zone in Zone::ALL {
            let path = debug_dir.join(format!("my_card__1_{}.png", zone.tag()));
            assert!(path.exists(), "missing {}", path.display());
        }
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("blue eyes.png"), "blue_eyes");
        assert_eq!(sanitize_file_stem("card-01_a.jpg"), "card-01_a");
        assert_eq!(sanitize_file_stem(""), "card");
    }
}
