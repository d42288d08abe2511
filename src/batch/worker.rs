//! Parallel extraction over many card images.
//!
//! Every card is independent, so the batch is spread over a pool of worker
//! threads sharing one extractor. Each worker pulls items from the shared
//! queue until it closes and sends one outcome per item back to the
//! runner, which writes the CSV and restores input order.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use super::csv_writer::{append_to_csv, init_csv};
use super::queue::{create_work_queue, CardWorkItem};
use crate::card::CardRecord;
use crate::log;
use crate::ocr::OcrEngine;
use crate::pipeline::CardExtractor;

/// The result of extracting one queued card.
#[derive(Debug)]
pub struct CardOutcome {
    pub item: CardWorkItem,
    pub result: Result<CardRecord>,
}

/// Runs the worker loop until the queue is closed.
///
/// A card that fails is reported as a failed outcome; the worker moves on
/// to the next item.
pub fn run_card_worker<E: OcrEngine>(
    worker_id: usize,
    receiver: Arc<Mutex<Receiver<CardWorkItem>>>,
    extractor: Arc<CardExtractor<E>>,
    results: Sender<CardOutcome>,
) {
    log(&format!("Worker {} started", worker_id));

    loop {
        let next = match receiver.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => {
                log(&format!("Worker {}: queue lock poisoned, exiting", worker_id));
                break;
            }
        };

        let Ok(item) = next else {
            break;
        };

        log(&format!(
            "Worker {}: processing #{} ({})",
            worker_id,
            item.index,
            item.path.display()
        ));

        let result = extractor.extract(&item.path);
        if let Err(e) = &result {
            log(&format!(
                "Worker {}: extraction failed for {}: {:#}",
                worker_id,
                item.path.display(),
                e
            ));
        }

        if results.send(CardOutcome { item, result }).is_err() {
            log(&format!("Worker {}: result channel closed, exiting", worker_id));
            break;
        }
    }

    log(&format!("Worker {} finished", worker_id));
}

/// Extracts every path with `jobs` worker threads.
///
/// Outcomes come back in input order. When `csv_path` is set each
/// successful card is appended to it as soon as it completes.
pub fn process_batch<E: OcrEngine + 'static>(
    extractor: Arc<CardExtractor<E>>,
    paths: &[PathBuf],
    jobs: usize,
    csv_path: Option<&Path>,
) -> Result<Vec<CardOutcome>> {
    if let Some(csv) = csv_path {
        init_csv(csv)?;
    }

    let (work_sender, work_receiver) = create_work_queue();
    for (index, path) in paths.iter().enumerate() {
        work_sender.send(CardWorkItem::new(path.clone(), index))?;
    }
    drop(work_sender);

    let jobs = jobs.clamp(1, paths.len().max(1));
    log(&format!("Processing {} cards with {} workers", paths.len(), jobs));

    let work_receiver = Arc::new(Mutex::new(work_receiver));
    let (result_sender, result_receiver) = channel();

    let handles: Vec<_> = (0..jobs)
        .map(|worker_id| {
            let receiver = Arc::clone(&work_receiver);
            let extractor = Arc::clone(&extractor);
            let results = result_sender.clone();
            thread::spawn(move || run_card_worker(worker_id, receiver, extractor, results))
        })
        .collect();
    drop(result_sender);

    let mut outcomes = Vec::with_capacity(paths.len());
    for outcome in result_receiver {
        if let (Some(csv), Ok(record)) = (csv_path, &outcome.result) {
            if let Err(e) = append_to_csv(csv, &outcome.item, record) {
                log(&format!(
                    "Failed to write CSV row for {}: {}",
                    outcome.item.path.display(),
                    e
                ));
            }
        }
        outcomes.push(outcome);
    }

    for handle in handles {
        if handle.join().is_err() {
            log("A worker thread panicked");
        }
    }

    outcomes.sort_by_key(|o| o.item.index);

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    log(&format!(
        "Batch complete: {} extracted, {} failed",
        outcomes.len() - failed,
        failed
    ));

    Ok(outcomes)
}
