//! Cut-flow report: per-stage accounting rows, the log table and shard merging.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::DataOrigin;
use cutflow_core::provenance::RunProvenance;

use crate::serde::write_json_atomic;
use crate::stage::{RunStatus, StageKind};

/// Accounting row of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRow {
    /// Position in the pipeline.
    pub index: usize,
    /// Stage name or label.
    pub name: String,
    /// Cut or histogrammer.
    pub kind: StageKind,
    /// Events that reached the stage.
    pub reached: u64,
    /// Events that left the stage with a pass verdict.
    pub survivors: u64,
    /// Rejections per category code.
    #[serde(default)]
    pub rejections: BTreeMap<String, u64>,
    /// Entries recorded by a histogrammer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<u64>,
}

impl StageRow {
    /// Fraction of all read events that survive this stage.
    pub fn efficiency(&self, events_read: u64) -> f64 {
        if events_read == 0 {
            0.0
        } else {
            self.survivors as f64 / events_read as f64
        }
    }
}

/// Cut-flow accounting of one run (or of several merged shards).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutflowReport {
    /// Sample name.
    pub sample: String,
    /// Declared data origin.
    pub origin: DataOrigin,
    /// How the run ended.
    pub status: RunStatus,
    /// Whether the stream ended on an undecodable record.
    pub truncated: bool,
    /// Records pulled from the source.
    pub events_read: u64,
    /// Records that passed every stage.
    pub events_passed: u64,
    /// One row per stage in registration order.
    pub rows: Vec<StageRow>,
    /// Provenance metadata describing the run.
    pub provenance: RunProvenance,
}

impl CutflowReport {
    /// Events read followed by the survivor count after each stage.
    pub fn population(&self) -> Vec<u64> {
        std::iter::once(self.events_read)
            .chain(self.rows.iter().map(|row| row.survivors))
            .collect()
    }

    /// Row by stage name (first match).
    pub fn row(&self, name: &str) -> Option<&StageRow> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Fixed-width summary table written to the run log.
    pub fn render_table(&self) -> String {
        let width = self
            .rows
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(0)
            .max("stage".len());
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Cut-flow summary for sample `{}` ({}, {}{})",
            self.sample,
            self.origin,
            self.status,
            if self.truncated { ", truncated" } else { "" }
        );
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {:<5}  {:>10}  {:>10}  {:>8}  rejections",
            "#", "stage", "kind", "reached", "passed", "eff(%)"
        );
        for row in &self.rows {
            let rejections = row
                .rejections
                .iter()
                .map(|(category, count)| format!("{category}={count}"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                out,
                "{:>4}  {:<width$}  {:<5}  {:>10}  {:>10}  {:>8.2}  {}",
                row.index,
                row.name,
                row.kind.to_string(),
                row.reached,
                row.survivors,
                100.0 * row.efficiency(self.events_read),
                rejections
            );
        }
        let _ = writeln!(
            out,
            "events read: {}, events passed: {}",
            self.events_read, self.events_passed
        );
        out
    }

    /// Adds the counters of another report over the same pipeline.
    pub fn merge(&mut self, other: &CutflowReport) -> Result<(), AnaError> {
        let same_shape = self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.name == b.name && a.kind == b.kind);
        if !same_shape || self.origin != other.origin {
            return Err(AnaError::Config(
                ErrorInfo::new("report_shape", "reports describe different pipelines")
                    .with_context("left_stages", self.rows.len())
                    .with_context("right_stages", other.rows.len()),
            ));
        }
        for (row, extra) in self.rows.iter_mut().zip(&other.rows) {
            row.reached += extra.reached;
            row.survivors += extra.survivors;
            for (category, count) in &extra.rejections {
                *row.rejections.entry(category.clone()).or_default() += count;
            }
            row.entries = match (row.entries, extra.entries) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
        }
        self.events_read += other.events_read;
        self.events_passed += other.events_passed;
        self.truncated |= other.truncated;
        if other.status == RunStatus::Aborted {
            self.status = RunStatus::Aborted;
        }
        Ok(())
    }

    /// Writes the report as canonical JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), AnaError> {
        write_json_atomic(path, self)
    }
}
