use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use crate::config::OcrSettings;

/// A single word from OCR with its confidence (0-100, -1 when unknown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: i32,
}

impl RecognizedWord {
    pub fn new(text: impl Into<String>, confidence: i32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// How a zone should be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrRequest {
    /// Tesseract page segmentation mode (7 = single line, 6 = block)
    pub page_seg_mode: u8,
    /// Restricts recognition to these characters
    pub whitelist: Option<String>,
}

impl OcrRequest {
    pub fn single_line() -> Self {
        Self {
            page_seg_mode: 7,
            whitelist: None,
        }
    }

    pub fn block() -> Self {
        Self {
            page_seg_mode: 6,
            whitelist: None,
        }
    }

    pub fn with_whitelist(mut self, chars: &str) -> Self {
        self.whitelist = Some(chars.to_string());
        self
    }

    /// Engine arguments, always using the default LSTM engine mode.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--oem".to_string(),
            "3".to_string(),
            "--psm".to_string(),
            self.page_seg_mode.to_string(),
        ];
        if let Some(chars) = &self.whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", chars));
        }
        args
    }

    /// The arguments as a single configuration string, for logging.
    pub fn config_string(&self) -> String {
        self.args().join(" ")
    }
}

/// Boundary to the OCR engine.
///
/// Implementations must be usable from several threads at once so that
/// independent cards can be processed in parallel.
pub trait OcrEngine: Send + Sync {
    /// Recognizes words in reading order with per-word confidence.
    fn recognize_words(&self, img: &GrayImage, request: &OcrRequest) -> Result<Vec<RecognizedWord>>;

    /// Recognizes the whole image as raw text, without confidences.
    fn recognize_text(&self, img: &GrayImage, request: &OcrRequest) -> Result<String>;
}

/// Runs the Tesseract executable on temporary PNG files.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
    timeout: Option<Duration>,
}

impl TesseractEngine {
    pub fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            tessdata_dir: None,
            language: "eng".to_string(),
            timeout: None,
        }
    }

    pub fn with_tessdata_dir(mut self, dir: PathBuf) -> Self {
        self.tessdata_dir = Some(dir);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Locates Tesseract according to the settings.
    ///
    /// A missing tessdata directory is not an error unless one was
    /// configured explicitly; Tesseract then falls back to its own default.
    pub fn from_settings(settings: &OcrSettings) -> Result<Self> {
        let executable = find_tesseract_executable(settings.tesseract_path.as_deref())?;
        let mut engine = Self::new(executable).with_language(&settings.language);

        match find_tessdata_dir(settings.tessdata_dir.as_deref(), &settings.language) {
            Ok(dir) => engine = engine.with_tessdata_dir(dir),
            Err(e) if settings.tessdata_dir.is_some() => return Err(e),
            Err(_) => {}
        }

        if settings.timeout_ms > 0 {
            engine = engine.with_timeout(Duration::from_millis(settings.timeout_ms));
        }

        Ok(engine)
    }

    /// Writes the image to a temp file and runs Tesseract with the given
    /// output base and trailing config name (e.g. `tsv`). Returns the
    /// output file's contents.
    fn run(&self, img: &GrayImage, request: &OcrRequest, output_kind: Option<&str>) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        // Tesseract appends the extension to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut cmd = Command::new(&self.executable);
        cmd.arg(temp_input.path()).arg(&output_base);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l").arg(&self.language).args(request.args());
        if let Some(kind) = output_kind {
            cmd.arg(kind);
        }

        let mut child = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to launch {}", self.executable.display()))?;

        // stderr is drained while the child runs; a full pipe would block it
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let status = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child.wait()?,
        };

        if !status.success() {
            let stderr = stderr_reader
                .and_then(|reader| reader.join().ok())
                .unwrap_or_default();
            return Err(anyhow!(
                "Tesseract failed ({}): {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            ));
        }

        let extension = output_kind.unwrap_or("txt");
        let result_path = format!("{}.{}", output_base, extension);
        let content = std::fs::read_to_string(&result_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;

        let _ = std::fs::remove_file(&result_path);

        Ok(content)
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_words(&self, img: &GrayImage, request: &OcrRequest) -> Result<Vec<RecognizedWord>> {
        let tsv = self.run(img, request, Some("tsv"))?;
        Ok(parse_tsv_words(&tsv))
    }

    fn recognize_text(&self, img: &GrayImage, request: &OcrRequest) -> Result<String> {
        self.run(img, request, None)
    }
}

/// Polls the child until it exits, killing it once `timeout` has passed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("Tesseract timed out after {}ms", timeout.as_millis()));
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Parses Tesseract TSV output into words in reading order.
///
/// Only word-level rows (level 5) with non-blank text are kept. A
/// confidence that does not parse becomes -1.
pub fn parse_tsv_words(tsv: &str) -> Vec<RecognizedWord> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let confidence = fields[10]
            .trim()
            .parse::<f32>()
            .map(|c| c as i32)
            .unwrap_or(-1);

        words.push(RecognizedWord::new(text, confidence));
    }

    words
}
