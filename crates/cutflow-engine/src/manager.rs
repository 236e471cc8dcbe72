//! Pipeline ownership, the event loop and cut-flow accounting.

use std::collections::BTreeMap;

use chrono::Utc;
use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::EventRecord;
use cutflow_core::provenance::RunProvenance;
use tracing::{debug, info, warn};

use crate::hash::short_hash;
use crate::report::{CutflowReport, StageRow};
use crate::runlog::RunLog;
use crate::source::{EventSource, SourceConfig, SourceError};
use crate::stage::{RunStatus, Stage, Verdict};

/// Ordered chain of stages with its accounting.
///
/// A manager runs exactly once. Every stage is finalized exactly once at the
/// end of the run, whatever the reason the loop ended.
#[derive(Debug)]
pub struct Manager {
    stages: Vec<Stage>,
    reached: Vec<u64>,
    survivors: Vec<u64>,
    rejections: Vec<BTreeMap<String, u64>>,
    events_read: u64,
    events_passed: u64,
    log: RunLog,
    debug: bool,
    has_run: bool,
    provenance: RunProvenance,
}

impl Manager {
    /// Empty pipeline writing its summary to `log`.
    pub fn new(log: RunLog) -> Self {
        Self {
            stages: Vec::new(),
            reached: Vec::new(),
            survivors: Vec::new(),
            rejections: Vec::new(),
            events_read: 0,
            events_passed: 0,
            log,
            debug: false,
            has_run: false,
            provenance: RunProvenance::default(),
        }
    }

    /// Enables one trace line per event and stage verdict.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Provenance copied into the report.
    pub fn with_provenance(mut self, provenance: RunProvenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Appends a stage to the end of the chain.
    pub fn add(&mut self, stage: Stage) -> Result<(), AnaError> {
        if self.has_run {
            return Err(AnaError::Config(
                ErrorInfo::new("pipeline_frozen", "stages cannot be added after the run")
                    .with_context("stage", stage.name()),
            ));
        }
        self.stages.push(stage);
        self.reached.push(0);
        self.survivors.push(0);
        self.rejections.push(BTreeMap::new());
        Ok(())
    }

    /// Stages in registration order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stage names in registration order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true when no stage is registered.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The run log, e.g. to read back an in-memory summary.
    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Pulls every record from `source` through the chain.
    ///
    /// Undecodable records end the loop gracefully and flag the report as
    /// truncated. Origin mismatches and stage failures abort the loop; they are
    /// returned after the finalize sweep and the summary have been written.
    pub fn run(&mut self, source: &mut dyn EventSource) -> Result<CutflowReport, AnaError> {
        if self.has_run {
            return Err(AnaError::config(
                "pipeline_reused",
                "a pipeline can only be run once",
            ));
        }
        self.has_run = true;
        let config = source.config().clone();
        info!(
            sample = %config.sample,
            origin = %config.origin,
            stages = self.stages.len(),
            max_events = ?config.max_events,
            "starting run"
        );

        let mut truncated = false;
        let outcome = self
            .write_header(&config)
            .and_then(|()| self.event_loop(source, &config, &mut truncated));
        let status = if outcome.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Aborted
        };
        let finalized = self.finalize_all(status);
        let report = self.build_report(&config, status, truncated);
        let logged = self
            .log
            .write_str(&report.render_table())
            .and_then(|()| self.log.flush());

        outcome?;
        finalized?;
        logged?;
        info!(
            sample = %report.sample,
            events_read = report.events_read,
            events_passed = report.events_passed,
            truncated = report.truncated,
            "run finished"
        );
        Ok(report)
    }

    fn write_header(&mut self, config: &SourceConfig) -> Result<(), AnaError> {
        let mut header = format!(
            "sample: {}\norigin: {}\nmax events: {}\n",
            config.sample,
            config.origin,
            config
                .max_events
                .map_or_else(|| "unbounded".to_string(), |cap| cap.to_string())
        );
        if !self.provenance.mode.is_empty() {
            header.push_str(&format!("vary cuts: {}\n", self.provenance.mode));
        }
        if !self.provenance.config_hash.is_empty() {
            header.push_str(&format!(
                "cut table: {}\n",
                short_hash(&self.provenance.config_hash)
            ));
        }
        header.push_str(&format!("stages: {}\n\n", self.stage_names().join(", ")));
        self.log.write_str(&header)
    }

    fn event_loop(
        &mut self,
        source: &mut dyn EventSource,
        config: &SourceConfig,
        truncated: &mut bool,
    ) -> Result<(), AnaError> {
        while source.has_next() {
            let record = match source.advance() {
                Ok(record) => record,
                Err(SourceError::EndOfStream) => break,
                Err(SourceError::Malformed(info)) => {
                    warn!(
                        sample = %config.sample,
                        events_read = self.events_read,
                        error = %info,
                        "stopping at malformed record"
                    );
                    *truncated = true;
                    break;
                }
            };
            if record.origin != config.origin {
                return Err(AnaError::Config(
                    ErrorInfo::new("origin_mismatch", "record origin differs from the job")
                        .with_context("event", record.id)
                        .with_context("declared", config.origin)
                        .with_context("record", record.origin)
                        .with_hint("check the is-mc argument against the sample"),
                ));
            }
            self.events_read += 1;
            self.process_event(&record)?;
        }
        Ok(())
    }

    fn process_event(&mut self, record: &EventRecord) -> Result<(), AnaError> {
        for (idx, stage) in self.stages.iter_mut().enumerate() {
            self.reached[idx] += 1;
            let verdict = stage.process(record).map_err(|err| {
                err.with_context("stage", stage.name())
                    .with_context("event", record.id)
            })?;
            if self.debug {
                debug!(
                    event = %record.id,
                    stage = stage.name(),
                    verdict = ?verdict,
                    "stage verdict"
                );
            }
            match verdict {
                Verdict::Pass => self.survivors[idx] += 1,
                Verdict::Reject(reason) => {
                    *self.rejections[idx]
                        .entry(reason.category().to_string())
                        .or_default() += 1;
                    return Ok(());
                }
            }
        }
        self.events_passed += 1;
        Ok(())
    }

    fn finalize_all(&mut self, status: RunStatus) -> Result<(), AnaError> {
        let mut first_error = None;
        for stage in &mut self.stages {
            if let Err(err) = stage.finalize(status) {
                warn!(stage = stage.name(), error = %err, "finalize failed");
                first_error.get_or_insert(err.with_context("stage", stage.name()));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn build_report(
        &self,
        config: &SourceConfig,
        status: RunStatus,
        truncated: bool,
    ) -> CutflowReport {
        let rows = self
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| StageRow {
                index,
                name: stage.name().to_string(),
                kind: stage.kind(),
                reached: self.reached[index],
                survivors: self.survivors[index],
                rejections: self.rejections[index].clone(),
                entries: stage.snapshot().map(|set| set.entries),
            })
            .collect();
        let mut provenance = self.provenance.clone();
        if provenance.sample.is_empty() {
            provenance.sample = config.sample.clone();
        }
        provenance.created_at = Utc::now().to_rfc3339();
        provenance
            .tool_versions
            .entry("cutflow-engine".to_string())
            .or_insert_with(|| env!("CARGO_PKG_VERSION").to_string());
        CutflowReport {
            sample: config.sample.clone(),
            origin: config.origin,
            status,
            truncated,
            events_read: self.events_read,
            events_passed: self.events_passed,
            rows,
            provenance,
        }
    }
}
