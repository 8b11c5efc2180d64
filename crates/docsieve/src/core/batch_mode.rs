//! Task-local batch mode flag.
//!
//! Extractors that hold a native lock run on a blocking thread in single-document
//! mode. Inside a batch they are submitted to the adaptive worker pool instead,
//! so the pool's memory-aware sizing bounds how many run at once.

use std::cell::Cell;
use tokio::task_local;

task_local! {
    static BATCH_MODE: Cell<bool>;
}

/// Whether the current task runs inside [`with_batch_mode`].
pub fn is_batch_mode() -> bool {
    BATCH_MODE.try_with(|cell| cell.get()).unwrap_or(false)
}

/// Run `future` with batch mode enabled.
pub async fn with_batch_mode<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    BATCH_MODE.scope(Cell::new(true), future).await
}
