//! Parallel runs over independent event ranges.

use cutflow_core::errors::{AnaError, ErrorInfo};
use rayon::prelude::*;

use crate::manager::Manager;
use crate::report::CutflowReport;
use crate::source::EventSource;

/// Runs independent event ranges in parallel and merges their cut-flows.
///
/// Each shard gets its own pipeline from `factory(shard_index)`; within a
/// shard records keep their storage order. Reports are merged in shard order,
/// and the first failing shard (by index) is returned as the error.
pub fn run_sharded<S, F>(sources: Vec<S>, factory: F) -> Result<CutflowReport, AnaError>
where
    S: EventSource + Send,
    F: Fn(usize) -> Result<Manager, AnaError> + Sync,
{
    if sources.is_empty() {
        return Err(AnaError::Config(ErrorInfo::new(
            "no_shards",
            "sharded run needs at least one source",
        )));
    }
    let shards = sources.len();
    let results: Vec<Result<CutflowReport, AnaError>> = sources
        .into_par_iter()
        .enumerate()
        .map(|(index, mut source)| {
            let mut manager = factory(index)?;
            manager
                .run(&mut source)
                .map_err(|err| err.with_context("shard", index))
        })
        .collect();

    let mut merged: Option<CutflowReport> = None;
    for result in results {
        let report = result?;
        match merged.as_mut() {
            Some(total) => total.merge(&report)?,
            None => merged = Some(report),
        }
    }
    let merged = merged.ok_or_else(|| AnaError::config("no_shards", "no shard produced a report"))?;
    tracing::info!(
        shards,
        events_read = merged.events_read,
        events_passed = merged.events_passed,
        "sharded run merged"
    );
    Ok(merged)
}
