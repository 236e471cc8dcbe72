//! Stage contract shared by cuts and histogrammers.

use std::fmt;

use cutflow_core::errors::AnaError;
use cutflow_core::event::EventRecord;
use serde::{Deserialize, Serialize};

use crate::histo::HistogramSet;

/// How the run ended when the finalize sweep is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The event loop ran to the end of the stream or the event cap.
    Completed,
    /// A stage or configuration failure ended the loop early.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Stable category explaining why a cut rejected an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RejectReason {
    category: &'static str,
}

impl RejectReason {
    /// Creates a reason from a static category code such as `leading-jet-pt`.
    pub const fn new(category: &'static str) -> Self {
        Self { category }
    }

    /// Category code used in rejection tallies.
    pub fn category(&self) -> &'static str {
        self.category
    }
}

/// Outcome of evaluating one stage on one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The event continues to the next stage.
    Pass,
    /// The event stops here.
    Reject(RejectReason),
}

impl Verdict {
    /// Rejection with a static category code.
    pub const fn reject(category: &'static str) -> Self {
        Verdict::Reject(RejectReason::new(category))
    }

    /// Returns true when the event continues.
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Selection stage that may stop an event.
pub trait Cut: Send {
    /// Stable name used in the accounting table.
    fn name(&self) -> &str;

    /// Decides whether the event continues down the chain.
    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError>;

    /// Called exactly once at the end of the run.
    fn finalize(&mut self, _status: RunStatus) -> Result<(), AnaError> {
        Ok(())
    }
}

/// Accumulating stage that never rejects.
pub trait Histogrammer: Send {
    /// Stable label, also the artefact name suffix.
    fn label(&self) -> &str;

    /// Fills the distributions from one event.
    fn observe(&mut self, record: &EventRecord) -> Result<(), AnaError>;

    /// Number of events observed so far.
    fn entries(&self) -> u64;

    /// Current distributions.
    fn snapshot(&self) -> &HistogramSet;

    /// Called exactly once at the end of the run; publishes on completion.
    fn finalize(&mut self, status: RunStatus) -> Result<(), AnaError>;
}

/// Kind of a stage as shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// Selection stage.
    Cut,
    /// Histogramming stage.
    Histogrammer,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Cut => write!(f, "cut"),
            StageKind::Histogrammer => write!(f, "histo"),
        }
    }
}

/// One element of a pipeline.
pub enum Stage {
    /// Selection stage.
    Cut(Box<dyn Cut>),
    /// Histogramming stage.
    Histogrammer(Box<dyn Histogrammer>),
}

impl Stage {
    /// Wraps a cut.
    pub fn cut(cut: impl Cut + 'static) -> Self {
        Stage::Cut(Box::new(cut))
    }

    /// Wraps a histogrammer.
    pub fn histogrammer(histogrammer: impl Histogrammer + 'static) -> Self {
        Stage::Histogrammer(Box::new(histogrammer))
    }

    /// Name of the cut or label of the histogrammer.
    pub fn name(&self) -> &str {
        match self {
            Stage::Cut(cut) => cut.name(),
            Stage::Histogrammer(histogrammer) => histogrammer.label(),
        }
    }

    /// Kind of the stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Cut(_) => StageKind::Cut,
            Stage::Histogrammer(_) => StageKind::Histogrammer,
        }
    }

    /// Runs the stage on one event; histogrammers always pass.
    pub fn process(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        match self {
            Stage::Cut(cut) => cut.evaluate(record),
            Stage::Histogrammer(histogrammer) => {
                histogrammer.observe(record)?;
                Ok(Verdict::Pass)
            }
        }
    }

    /// Finalizes the stage.
    pub fn finalize(&mut self, status: RunStatus) -> Result<(), AnaError> {
        match self {
            Stage::Cut(cut) => cut.finalize(status),
            Stage::Histogrammer(histogrammer) => histogrammer.finalize(status),
        }
    }

    /// Histogram snapshot for histogrammer stages.
    pub fn snapshot(&self) -> Option<&HistogramSet> {
        match self {
            Stage::Cut(_) => None,
            Stage::Histogrammer(histogrammer) => Some(histogrammer.snapshot()),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
