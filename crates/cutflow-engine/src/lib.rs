#![deny(missing_docs)]
#![doc = "Cut-flow analysis engine: an ordered chain of selection and histogramming stages applied to collision events, with per-stage accounting and mode-dependent pipeline construction."]

/// Mode-dependent pipeline construction.
pub mod builder;
/// Cut table configuration.
pub mod config;
/// Event selection cuts.
pub mod cuts;
/// Canonical hashing helpers.
pub mod hash;
/// Histograms and histogramming stages.
pub mod histo;
/// Pipeline ownership and the event loop.
pub mod manager;
/// Cut-flow report assembly.
pub mod report;
/// Per-run text log.
pub mod runlog;
/// Canonical JSON and YAML serde helpers.
pub mod serde;
/// Parallel runs over independent event ranges.
pub mod shard;
/// Event sources.
pub mod source;
/// Stage contract.
pub mod stage;

pub use builder::{LabelAllocator, PipelineBuilder, VaryMode};
pub use config::{load_cut_table, CutTable, LadderKind};
pub use cuts::{
    AbnormalEvent, AbnormalEventCut, DeltaPhiCut, FlagCut, FlagVector, GenParticlePtCut,
    JetMultiplicityCut, LeadingJetCut, LeptonFlavour, LeptonVetoCut, NoiseCleanCut,
    NoiseCleanParams, PhiObject, TauMultiplicityCut, Window,
};
pub use histo::{ArtifactLayout, Histogram, HistogramFamily, HistogramSet, HistogramStage};
pub use manager::Manager;
pub use report::{CutflowReport, StageRow};
pub use runlog::RunLog;
pub use shard::run_sharded;
pub use source::{
    EventSource, JsonLinesSource, MemorySource, SourceConfig, SourceError, SyntheticSource,
};
pub use stage::{Cut, Histogrammer, RejectReason, RunStatus, Stage, StageKind, Verdict};
