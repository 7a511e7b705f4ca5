//! Sequential back-end of the analysis

use crate::{
    event::Record,
    node::NodeError,
    pipeline::{Pipeline, RoutingSummary},
    scheduling::{process_batch, EVENT_BATCH_SIZE},
};

/// Push records through the pipeline in sequential mode
///
/// We use batched logic even in sequential mode, in order to behave like
/// multi-threaded runs.
///
pub fn run_pipeline_impl(
    pipeline: &Pipeline,
    records: &mut [Record],
) -> Result<RoutingSummary, NodeError> {
    let mut summary = RoutingSummary::new();
    for batch in records.chunks_mut(EVENT_BATCH_SIZE) {
        summary.merge(process_batch(pipeline, batch)?);
    }
    Ok(summary)
}
