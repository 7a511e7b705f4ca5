//! This module takes care of scheduling the analysis work, encapsulating use
//! of multiple threads

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{
    event::Record,
    node::NodeError,
    pipeline::{Pipeline, RoutingSummary},
};

/// Size of the record batches
///
/// Records are grouped in batches of a certain size, each of which gets its
/// own routing summary. Summaries are merged in batch order, so that
/// sequential and parallel runs report identically.
///
const EVENT_BATCH_SIZE: usize = 1_000;

/// Push records through a pipeline in the manner that was configured at
/// build time
///
/// Processing stops at the first execution error of the earliest failing
/// batch. Records of other batches may have been processed by then.
///
pub fn run_pipeline(
    pipeline: &Pipeline,
    records: &mut [Record],
) -> Result<RoutingSummary, NodeError> {
    // ...in sequential mode
    #[cfg(not(feature = "multi-threading"))]
    {
        sequential::run_pipeline_impl(pipeline, records)
    }

    // ...in multi-threaded mode
    #[cfg(feature = "multi-threading")]
    {
        multi_threading::run_pipeline_impl(pipeline, records)
    }
}

/// Push a batch of records through a pipeline
fn process_batch(
    pipeline: &Pipeline,
    batch: &mut [Record],
) -> Result<RoutingSummary, NodeError> {
    let mut summary = RoutingSummary::new();
    for record in batch {
        pipeline.run(record, &mut summary)?;
    }
    Ok(summary)
}

// The backend under test is the one selected at build time, so these tests
// should also be run with `--features multi-threading`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::{Event, InformationChunk, Particle, View},
        jet_selection::{JetSelection, CHARGED_MULTIPLICITY, N_CONSTITUENTS},
        momentum::from_pt_eta_phi_m,
    };

    fn record(index: usize) -> Record {
        if index % 5 == 4 {
            return Record::from(InformationChunk::default());
        }
        let view = (0..index % 5).fold(View::new("Reconstructed"), |view, i| {
            view.with(
                Particle::new("Jet", from_pt_eta_phi_m(50., 0.5, i as _, 5.))
                    .with(N_CONSTITUENTS, 4)
                    .with(CHARGED_MULTIPLICITY, 2),
            )
        });
        Record::from(Event::new().with_view(view))
    }

    fn pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.add_node(JetSelection::new("jets"));
        pipeline.configure_all().unwrap();
        pipeline
    }

    #[test]
    fn batches_match_record_by_record_processing() {
        let pipeline = pipeline();
        let num_records = 3 * EVENT_BATCH_SIZE + 17;
        let mut records = (0..num_records).map(record).collect::<Vec<_>>();
        let summary = run_pipeline(&pipeline, &mut records).unwrap();

        let mut expected_records = (0..num_records).map(record).collect::<Vec<_>>();
        let mut expected = RoutingSummary::new();
        for record in &mut expected_records {
            pipeline.run(record, &mut expected).unwrap();
        }
        assert_eq!(summary, expected);
        assert_eq!(records, expected_records);
        assert_eq!(summary.rejected(), num_records / 5);
        assert_eq!(summary.arrivals("jets", "3 Jets"), (num_records + 1) / 5);
    }

    #[test]
    fn no_records() {
        let summary = run_pipeline(&pipeline(), &mut []).unwrap();
        assert_eq!(summary, RoutingSummary::new());
    }

    #[test]
    fn errors_in_later_batches_are_reported() {
        let pipeline = pipeline();
        let mut records = (0..2 * EVENT_BATCH_SIZE).map(record).collect::<Vec<_>>();
        let faulty = View::new("Reconstructed")
            .with(Particle::new("Jet", from_pt_eta_phi_m(50., 0.5, 0., 5.)));
        records[EVENT_BATCH_SIZE + 3] = Record::from(Event::new().with_view(faulty));
        let err = run_pipeline(&pipeline, &mut records).unwrap_err();
        assert_eq!(err.node(), "jets");
    }
}
