//! Multi-threaded back-end of the analysis

use crate::{
    event::Record,
    node::NodeError,
    pipeline::{Pipeline, RoutingSummary},
    scheduling::{process_batch, EVENT_BATCH_SIZE},
};

use std::sync::Mutex;

/// Push records through the pipeline in multi-threaded mode
///
/// Each batch of records is handled by a separate rayon task.
///
pub fn run_pipeline_impl(
    pipeline: &Pipeline,
    records: &mut [Record],
) -> Result<RoutingSummary, NodeError> {
    // We know in advance how many batches of records we will process
    let num_batches = records.len() / EVENT_BATCH_SIZE
        + if records.len() % EVENT_BATCH_SIZE == 0 {
            0
        } else {
            1
        };
    if num_batches == 0 {
        return Ok(RoutingSummary::new());
    }
    let accumulator = ReproducibleAccumulator::new(num_batches);

    // This function is a synchronization scope: it will only return
    // once all inner tasks have been executed
    rayon::scope(|scope| {
        for (batch_id, batch) in records.chunks_mut(EVENT_BATCH_SIZE).enumerate() {
            let accumulator_ref = &accumulator;
            scope.spawn(move |_| {
                accumulator_ref.set_task_result(batch_id, process_batch(pipeline, batch));
            });
        }
    });

    accumulator.get_merged_result()
}

/// Batch-ordered accumulation of routing summaries
struct ReproducibleAccumulator {
    /// Storage for the outcome of parallel tasks
    results: Box<[Mutex<Option<Result<RoutingSummary, NodeError>>>]>,
}
//
impl ReproducibleAccumulator {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        assert!(num_tasks > 0, "There should be at least one task");
        Self {
            results: (0..num_tasks)
                .map(|_| Mutex::new(None))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Record the outcome of the n-th task
    fn set_task_result(&self, task_id: usize, result: Result<RoutingSummary, NodeError>) {
        let mut lock = self.results[task_id]
            .lock()
            .expect("Mutex data should be valid");
        assert!(lock.is_none(), "Tasks should not report results twice");
        *lock = Some(result);
    }

    /// Merge the summaries in batch order, stopping at the first error
    fn get_merged_result(self) -> Result<RoutingSummary, NodeError> {
        let mut merged = RoutingSummary::new();
        for entry in self.results.into_vec() {
            let result = entry
                .into_inner()
                .expect("Mutex data should be valid")
                .expect("Result should be ready");
            merged.merge(result?);
        }
        Ok(merged)
    }
}
