//! Mode-dependent composition of the analysis pipeline.

use std::fmt;
use std::str::FromStr;

use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::provenance::RunProvenance;
use serde::{Deserialize, Serialize};

use crate::config::{CutTable, FlagSpec, LadderKind};
use crate::cuts::{
    AbnormalEventCut, DeltaPhiCut, FlagCut, GenParticlePtCut, JetMultiplicityCut, LeadingJetCut,
    LeptonFlavour, LeptonVetoCut, NoiseCleanCut, TauMultiplicityCut,
};
use crate::histo::{ArtifactLayout, HistogramFamily, HistogramStage};
use crate::manager::Manager;
use crate::runlog::RunLog;
use crate::stage::Stage;

/// Which thresholds are tightened along the variation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaryMode {
    /// Generator boson pt (the MET proxy) only.
    Met,
    /// Leading-jet pt only.
    Jet,
    /// Both, applied in lock-step.
    Both,
}

impl VaryMode {
    /// Interprets a free-form token by looking for `met` and `jet` in any case.
    pub fn from_token(token: &str) -> Result<Self, AnaError> {
        let lowered = token.to_ascii_lowercase();
        match (lowered.contains("met"), lowered.contains("jet")) {
            (true, true) => Ok(VaryMode::Both),
            (true, false) => Ok(VaryMode::Met),
            (false, true) => Ok(VaryMode::Jet),
            (false, false) => Err(AnaError::Usage(
                ErrorInfo::new("vary_token", "cut variation token names neither met nor jet")
                    .with_context("token", token)
                    .with_hint("use one of jet, met, jetmet"),
            )),
        }
    }

    /// Returns true when the generator boson threshold follows the ladder.
    pub fn varies_met(self) -> bool {
        matches!(self, VaryMode::Met | VaryMode::Both)
    }

    /// Returns true when the leading-jet threshold follows the ladder.
    pub fn varies_jet(self) -> bool {
        matches!(self, VaryMode::Jet | VaryMode::Both)
    }
}

impl FromStr for VaryMode {
    type Err = AnaError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Self::from_token(token)
    }
}

impl fmt::Display for VaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaryMode::Met => write!(f, "met"),
            VaryMode::Jet => write!(f, "jet"),
            VaryMode::Both => write!(f, "both"),
        }
    }
}

/// Hands out sequential histogrammer labels per family.
#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    matching: usize,
    boson: usize,
    lepton: usize,
}

impl LabelAllocator {
    /// Next unused label of `family`.
    pub fn next(&mut self, family: HistogramFamily) -> String {
        let counter = match family {
            HistogramFamily::DataMcMatching => &mut self.matching,
            HistogramFamily::BosonAnalysis => &mut self.boson,
            HistogramFamily::LeptonSource => &mut self.lepton,
        };
        let index = *counter;
        *counter += 1;
        match (family, index) {
            (HistogramFamily::LeptonSource, 0) => family.prefix().to_string(),
            (HistogramFamily::LeptonSource, _) => format!("{}_{index}", family.prefix()),
            _ => format!("{}{index}", family.prefix()),
        }
    }
}

/// Builds the analysis pipeline for one variation mode.
#[derive(Debug)]
pub struct PipelineBuilder<'a> {
    table: &'a CutTable,
    mode: VaryMode,
    artifacts: Option<ArtifactLayout>,
    log: Option<RunLog>,
    debug: bool,
}

impl<'a> PipelineBuilder<'a> {
    /// Builder over a cut table.
    pub fn new(table: &'a CutTable, mode: VaryMode) -> Self {
        Self {
            table,
            mode,
            artifacts: None,
            log: None,
            debug: false,
        }
    }

    /// Publishes histogram artefacts under `layout`.
    pub fn with_artifacts(mut self, layout: ArtifactLayout) -> Self {
        self.artifacts = Some(layout);
        self
    }

    /// Run log receiving the header and summary; discarded when unset.
    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Enables the per-event debug trace.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validates the table and assembles the stage chain.
    pub fn build(self) -> Result<Manager, AnaError> {
        let table = self.table;
        table.validate()?;
        let provenance = RunProvenance::new(
            self.artifacts
                .as_ref()
                .map(|layout| layout.sample.clone())
                .unwrap_or_default(),
            table.config_hash()?,
            self.mode.to_string(),
        )
        .with_tool("cutflow-engine", env!("CARGO_PKG_VERSION"));
        let mut chain = Chain {
            manager: Manager::new(self.log.unwrap_or_else(RunLog::discard))
                .with_debug(self.debug)
                .with_provenance(provenance),
            labels: LabelAllocator::default(),
            artifacts: self.artifacts,
        };

        for flag in &table.flags {
            chain.flag(flag)?;
        }
        chain.stage(Stage::cut(AbnormalEventCut::new(&table.abnormal_events)))?;
        chain.histo(HistogramFamily::DataMcMatching)?;

        chain.stage(Stage::cut(GenParticlePtCut::new(
            table.boson.pdg_id,
            table.boson.pt_min,
        )))?;
        chain.histo(HistogramFamily::DataMcMatching)?;

        chain.stage(Stage::cut(NoiseCleanCut::new(table.noise_clean)))?;
        for flag in &table.noise_filters {
            chain.flag(flag)?;
        }
        chain.histo(HistogramFamily::DataMcMatching)?;
        chain.histo(HistogramFamily::BosonAnalysis)?;

        chain.stage(Stage::cut(leading_jet(table, table.leading_jet.pt_min)))?;
        chain.histo(HistogramFamily::DataMcMatching)?;

        let njet = &table.jet_multiplicity;
        chain.stage(Stage::cut(JetMultiplicityCut::new(
            njet.jet_pt_min,
            njet.jet_eta_max,
            njet.min,
            njet.max,
        )))?;
        chain.histo(HistogramFamily::DataMcMatching)?;

        let dphi = &table.delta_phi;
        chain.stage(Stage::cut(DeltaPhiCut::new(dphi.first, dphi.second, dphi.min)))?;
        chain.histo(HistogramFamily::LeptonSource)?;
        chain.histo(HistogramFamily::DataMcMatching)?;
        chain.histo(HistogramFamily::BosonAnalysis)?;

        if let Some(veto) = &table.muon_veto {
            chain.stage(Stage::cut(LeptonVetoCut::new(
                LeptonFlavour::Muon,
                veto.pt_min,
                veto.eta_max,
            )))?;
        }
        chain.histo(HistogramFamily::DataMcMatching)?;
        if let Some(veto) = &table.electron_veto {
            chain.stage(Stage::cut(LeptonVetoCut::new(
                LeptonFlavour::Electron,
                veto.pt_min,
                veto.eta_max,
            )))?;
        }
        chain.histo(HistogramFamily::DataMcMatching)?;

        let taus = &table.taus;
        chain.stage(Stage::cut(TauMultiplicityCut::new(
            taus.pt_min,
            taus.eta_max,
            taus.min,
            taus.max,
        )))?;
        chain.histo(HistogramFamily::DataMcMatching)?;
        chain.histo(HistogramFamily::BosonAnalysis)?;

        for step in 0..table.steps() {
            if self.mode.varies_met() {
                let threshold = ladder_threshold(table, LadderKind::Met, step)?;
                let cut = GenParticlePtCut::new(table.boson.pdg_id, threshold).at_step(step);
                chain.stage(Stage::cut(cut))?;
            }
            if self.mode.varies_jet() {
                let threshold = ladder_threshold(table, LadderKind::Jet, step)?;
                chain.stage(Stage::cut(leading_jet(table, threshold).at_step(step)))?;
            }
            chain.histo(HistogramFamily::DataMcMatching)?;
            chain.histo(HistogramFamily::BosonAnalysis)?;
        }

        tracing::debug!(mode = %self.mode, stages = chain.manager.len(), "pipeline built");
        Ok(chain.manager)
    }
}

fn leading_jet(table: &CutTable, pt_min: f64) -> LeadingJetCut {
    let spec = &table.leading_jet;
    LeadingJetCut::new(pt_min, spec.eta_max, spec.chf, spec.nhf)
}

fn ladder_threshold(table: &CutTable, kind: LadderKind, step: usize) -> Result<f64, AnaError> {
    table.threshold(kind, step).ok_or_else(|| {
        AnaError::Config(
            ErrorInfo::new("ladder_shape", "ladder step out of range").with_context("step", step),
        )
    })
}

struct Chain {
    manager: Manager,
    labels: LabelAllocator,
    artifacts: Option<ArtifactLayout>,
}

impl Chain {
    fn stage(&mut self, stage: Stage) -> Result<(), AnaError> {
        self.manager.add(stage)
    }

    fn flag(&mut self, flag: &FlagSpec) -> Result<(), AnaError> {
        self.stage(Stage::cut(FlagCut::new(flag.vector, flag.index)))
    }

    fn histo(&mut self, family: HistogramFamily) -> Result<(), AnaError> {
        let mut stage = HistogramStage::new(family, self.labels.next(family));
        if let Some(layout) = &self.artifacts {
            stage = stage.with_artifacts(layout);
        }
        self.stage(Stage::histogrammer(stage))
    }
}
