//! Batch extraction: a work queue, a pool of workers and CSV output.

pub mod csv_writer;
pub mod queue;
pub mod worker;

pub use csv_writer::{append_to_csv, init_csv, CSV_HEADER};
pub use queue::{create_work_queue, CardWorkItem};
pub use worker::{process_batch, run_card_worker, CardOutcome};
