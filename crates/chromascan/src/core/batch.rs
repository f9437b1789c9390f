//! Concurrent batch processing.
//!
//! Images are processed as tokio tasks bounded by a semaphore; the CPU-bound pipeline runs
//! on the blocking pool. A failing image becomes a `failed` item and never aborts the rest
//! of the batch. Items come back in input order.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::bridge::validate_and_bridge;
use crate::core::pipeline::Pipeline;
use crate::error::{ChromascanError, Result};
use crate::image::RawImage;
use crate::types::{BatchError, BatchItem, BatchOutcome, ProcessingResult};

/// Global Tokio runtime for the synchronous batch wrapper.
///
/// Built on first use and shared by every call. Runtime creation only fails when the
/// process is out of threads or memory.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

impl Pipeline {
    /// Process, validate and bridge many images concurrently.
    ///
    /// Concurrency is capped by `batch.max_concurrent` (default `num_cpus * 2`). With
    /// `batch.timeout_ms` set, an image that takes longer is reported as a `Timeout`
    /// failure; its recognition keeps running in the background and holds its concurrency
    /// slot until it finishes.
    ///
    /// # Errors
    ///
    /// Only `Io` errors abort the batch. Everything else is reported per image.
    #[tracing::instrument(skip_all, fields(batch_size = images.len()))]
    pub async fn batch_process(&self, images: Vec<RawImage>) -> Result<Vec<BatchItem>> {
        if images.is_empty() {
            return Ok(vec![]);
        }

        let max_concurrent = self.batch_config().max_concurrent.unwrap_or_else(|| num_cpus::get() * 2);
        let timeout_ms = self.batch_config().timeout_ms;
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let pipeline = Arc::new(self.clone());

        let mut tasks = JoinSet::new();

        for (index, raw) in images.into_iter().enumerate() {
            let pipeline = Arc::clone(&pipeline);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(permit) => run_one(pipeline, raw, timeout_ms, permit).await,
                    Err(e) => Err(ChromascanError::Other(format!("Batch semaphore closed: {}", e))),
                };
                (index, result)
            });
        }

        let mut items: Vec<Option<BatchItem>> = vec![None; tasks.len()];

        while let Some(task_result) = tasks.join_next().await {
            match task_result {
                Ok((index, Ok(result))) => {
                    let outcome = bridge_outcome(result, &pipeline);
                    items[index] = Some(BatchItem { index, outcome });
                }
                Ok((index, Err(e))) => {
                    // I/O errors abort the whole batch
                    if matches!(e, ChromascanError::Io(_)) {
                        return Err(e);
                    }
                    tracing::warn!(index, error = %e, "Image failed");
                    items[index] = Some(BatchItem {
                        index,
                        outcome: BatchOutcome::Failed {
                            error: BatchError::from(&e),
                        },
                    });
                }
                Err(join_err) => {
                    return Err(ChromascanError::Other(format!("Task panicked: {}", join_err)));
                }
            }
        }

        let items: Vec<BatchItem> = items.into_iter().flatten().collect();
        tracing::info!(
            accepted = items.iter().filter(|i| i.outcome.status() == "accepted").count(),
            rejected = items.iter().filter(|i| i.outcome.status() == "rejected").count(),
            failed = items.iter().filter(|i| i.outcome.status() == "failed").count(),
            "Batch complete"
        );
        Ok(items)
    }

    /// Read image files and batch-process them.
    pub async fn batch_process_files(&self, paths: Vec<impl AsRef<Path>>) -> Result<Vec<BatchItem>> {
        let images = paths.iter().map(RawImage::from_path).collect::<Result<Vec<_>>>()?;
        self.batch_process(images).await
    }

    /// Synchronous wrapper for [`Pipeline::batch_process`].
    ///
    /// Must not be called from inside a Tokio runtime.
    pub fn batch_process_sync(&self, images: Vec<RawImage>) -> Result<Vec<BatchItem>> {
        GLOBAL_RUNTIME.block_on(self.batch_process(images))
    }
}

/// The permit moves into the blocking closure so it is released only when processing
/// actually ends, not when the wait times out.
async fn run_one(
    pipeline: Arc<Pipeline>,
    raw: RawImage,
    timeout_ms: Option<u64>,
    permit: OwnedSemaphorePermit,
) -> Result<ProcessingResult> {
    let work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let options = pipeline.preprocessing().clone();
        pipeline.process(raw, &options)
    });

    let joined = match timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), work)
            .await
            .map_err(|_| ChromascanError::Timeout { timeout_ms: ms })?,
        None => work.await,
    };

    joined.map_err(|e| ChromascanError::Other(format!("Processing task failed: {}", e)))?
}

fn bridge_outcome(result: ProcessingResult, pipeline: &Pipeline) -> BatchOutcome {
    let bridged = validate_and_bridge(&result, pipeline.policy());
    match bridged.request {
        Some(request) => BatchOutcome::Accepted {
            result: Box::new(result),
            request: Box::new(request),
        },
        None => BatchOutcome::Rejected {
            result: Box::new(result),
            validation: bridged.validation,
        },
    }
}
