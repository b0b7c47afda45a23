//! Batch processing: a fixed pool of threads running the pipeline over a
//! queue of screenshots.

pub mod queue;
pub mod upload_worker;

pub use queue::{create_outcome_queue, create_work_queue, UploadItem, UploadOutcome};
pub use upload_worker::start_workers;
