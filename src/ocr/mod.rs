pub mod engine;
pub mod filter;
pub mod setup;

pub use engine::{parse_tsv_words, OcrEngine, OcrRequest, RecognizedWord, TesseractEngine};
pub use filter::join_confident_words;
pub use setup::{ensure_tesseract, TesseractPaths};
