//! Card Scan
//!
//! Extracts a structured record (name, type, attribute, ATK/DEF, description)
//! from a photographed trading card. The card is cut into fixed zones, each
//! zone is enhanced for legibility, read with Tesseract (or matched against
//! reference icons for the attribute), and the noisy text is corrected into
//! canonical values.

pub mod attribute;
pub mod batch;
pub mod card;
pub mod config;
pub mod enhance;
pub mod fields;
pub mod ocr;
pub mod paths;
pub mod pipeline;
pub mod region;

pub use card::{CardRecord, CardType};
pub use config::ExtractorConfig;
pub use pipeline::CardExtractor;

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Sets the file that `log` appends to in addition to stderr.
/// Only the first call has any effect.
pub fn init_log_file(path: PathBuf) {
    let _ = LOG_FILE.set(path);
}

/// Logs a message to stderr (and the log file, if set) with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    eprint!("{}", line);
    if let Some(log_path) = LOG_FILE.get() {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
