//! Work queue feeding card paths to the extraction workers.
//!
//! Uses a std::sync::mpsc channel. The batch runner sends every path up
//! front and drops the sender; workers share the receiver and stop once it
//! reports the channel closed.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

/// One card image waiting to be extracted.
#[derive(Debug, Clone)]
pub struct CardWorkItem {
    /// Path to the card image
    pub path: PathBuf,
    /// Position in the input list (0-based)
    pub index: usize,
    /// When the item was queued
    pub queued_at: DateTime<Local>,
}

impl CardWorkItem {
    pub fn new(path: PathBuf, index: usize) -> Self {
        Self {
            path,
            index,
            queued_at: Local::now(),
        }
    }
}

/// Creates an unbounded work queue, returned as (sender, receiver).
pub fn create_work_queue() -> (Sender<CardWorkItem>, Receiver<CardWorkItem>) {
    channel()
}
