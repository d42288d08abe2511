//! CSV output for batch runs.
//!
//! Rows are appended one at a time, reopening the file for each write, so
//! cards already extracted survive a crash later in the batch.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use super::queue::CardWorkItem;
use crate::card::CardRecord;

pub const CSV_HEADER: &str =
    "index,timestamp,image_filename,name,card_type,monster_type,attribute,attack,defense,description";

/// Creates the file with a header, unless it already has content.
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        if BufReader::new(file).lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Quotes a field if it contains a separator, quote or line break.
fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Appends one extracted card.
pub fn append_to_csv(path: &Path, work_item: &CardWorkItem, record: &CardRecord) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    let fields = [
        work_item.index.to_string(),
        work_item.queued_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        record.image_filename.clone(),
        record.name.clone(),
        record.card_type.to_string(),
        record.monster_type.clone(),
        optional(record.attribute.as_deref()),
        optional(record.attack),
        optional(record.defense),
        record.description.clone(),
    ];
    let line = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",");

    writeln!(file, "{}", line).context("Failed to write CSV row")?;
    Ok(())
}
