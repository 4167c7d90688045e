//! Fixed-size worker pool that runs one task per partition and joins them all

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{Result, ThumbgenError};
use crate::parallel::{FailureReport, ImageFailure, Partition, TaskResult, WorkerTask};
use crate::processing::ImageProcessor;

/// A task either reports its result or the panic that ended it
type TaskOutcome = std::result::Result<TaskResult, (usize, String)>;

/// Runs partitions on a pool of exactly `thread_count` workers
///
/// Each call to [`execute`](Self::execute) builds a fresh pool and joins every
/// worker thread before returning, whatever the outcome.
#[derive(Debug)]
pub struct ExecutionEngine {
    thread_count: usize,
    processor: ImageProcessor,
    live_workers: AtomicUsize,
}

impl ExecutionEngine {
    pub fn new(thread_count: usize, processor: ImageProcessor) -> Result<Self> {
        if thread_count == 0 {
            return Err(ThumbgenError::config("Thread count must be at least 1"));
        }

        Ok(Self {
            thread_count,
            processor,
            live_workers: AtomicUsize::new(0),
        })
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Number of worker threads currently alive
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// Run every partition and block until all of them have reported
    pub fn execute(&self, partitions: Vec<Partition>) -> Result<ExecutionSummary> {
        self.execute_with(partitions, |partition| {
            WorkerTask::new(partition, &self.processor).run()
        })
    }

    /// Drive `run_task` once per partition on a fresh pool
    fn execute_with<F>(&self, partitions: Vec<Partition>, run_task: F) -> Result<ExecutionSummary>
    where
        F: Fn(Partition) -> TaskResult + Sync,
    {
        if partitions.is_empty() {
            debug!("No partitions to execute");
            return Ok(ExecutionSummary::default());
        }

        let submitted = partitions.len();
        info!(
            "Submitting {} partitions to a pool of {} workers",
            submitted, self.thread_count
        );

        let start_time = Instant::now();
        let (sender, receiver) = crossbeam::channel::unbounded::<TaskOutcome>();
        let run_task = &run_task;
        let live_workers = &self.live_workers;

        // The scoped build joins every pool thread before it returns, on the
        // success path and when a task panicked alike.
        let pool_result = ThreadPoolBuilder::new()
            .num_threads(self.thread_count)
            .thread_name(|i| format!("thumbgen-worker-{}", i))
            .build_scoped(
                |thread| {
                    live_workers.fetch_add(1, Ordering::SeqCst);
                    thread.run();
                    live_workers.fetch_sub(1, Ordering::SeqCst);
                },
                |pool| {
                    pool.scope(|scope| {
                        for partition in partitions {
                            let sender = sender.clone();
                            scope.spawn(move |_| {
                                let index = partition.index();
                                let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_task(partition)))
                                    .map_err(|payload| (index, panic_message(payload.as_ref())));
                                // The receiver outlives the pool, so this cannot fail
                                let _ = sender.send(outcome);
                            });
                        }
                    });
                },
            );
        drop(sender);
        let elapsed = start_time.elapsed();

        pool_result.map_err(|e| {
            ThumbgenError::interrupted(format!("Failed to create worker pool: {}", e))
        })?;

        let mut results = Vec::with_capacity(submitted);
        let mut faults = Vec::new();
        for outcome in receiver.try_iter() {
            match outcome {
                Ok(result) => results.push(result),
                Err((index, message)) => faults.push(format!("partition {}: {}", index, message)),
            }
        }

        if !faults.is_empty() {
            error!("Worker tasks faulted: {}", faults.join("; "));
            return Err(ThumbgenError::interrupted(format!(
                "{} of {} worker tasks faulted: {}",
                faults.len(),
                submitted,
                faults.join("; ")
            )));
        }

        if results.len() != submitted {
            return Err(ThumbgenError::interrupted(format!(
                "Only {} of {} partitions reported a result",
                results.len(),
                submitted
            )));
        }

        results.sort_by_key(|result| result.partition_index);
        let summary = ExecutionSummary::from_results(results, elapsed);

        info!(
            "Execution completed in {:.2}s: {} attempted, {} succeeded, {} failed",
            summary.elapsed.as_secs_f64(),
            summary.attempted,
            summary.succeeded,
            summary.failed
        );

        Ok(summary)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Aggregate outcome of one run
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    pub partitions: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// Per-partition results in partition order
    pub task_results: Vec<TaskResult>,
}

impl ExecutionSummary {
    pub fn from_results(task_results: Vec<TaskResult>, elapsed: Duration) -> Self {
        let attempted = task_results.iter().map(|r| r.attempted).sum();
        let succeeded = task_results.iter().map(|r| r.succeeded).sum();
        let failed = task_results.iter().map(TaskResult::failed).sum();

        Self {
            partitions: task_results.len(),
            attempted,
            succeeded,
            failed,
            elapsed,
            task_results,
        }
    }

    /// True when no image failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImageFailure> {
        self.task_results.iter().flat_map(|r| r.failures.iter())
    }

    pub fn report(&self) -> SummaryReport {
        SummaryReport {
            partitions: self.partitions,
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed: self.failed,
            elapsed_secs: self.elapsed.as_secs_f64(),
            partition_sizes: self.task_results.iter().map(|r| r.attempted).collect(),
            failures: self.failures().map(FailureReport::from).collect(),
        }
    }
}

/// JSON-friendly form of [`ExecutionSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub partitions: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
    pub partition_sizes: Vec<usize>,
    pub failures: Vec<FailureReport>,
}
