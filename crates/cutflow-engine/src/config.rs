//! Cut table: every threshold the analysis pipeline uses, loadable from YAML.

use std::fs;
use std::path::Path;

use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::MetSlot;
use serde::{Deserialize, Serialize};

use crate::cuts::{AbnormalEvent, FlagVector, NoiseCleanParams, PhiObject, Window};
use crate::hash::stable_hash_string;
use crate::serde::{from_yaml_slice, to_yaml_string};

/// One trigger or quality bit requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSpec {
    /// Vector holding the bit.
    pub vector: FlagVector,
    /// Bit position.
    pub index: usize,
}

impl FlagSpec {
    const fn trigger(index: usize) -> Self {
        Self {
            vector: FlagVector::Trigger,
            index,
        }
    }

    const fn noise(index: usize) -> Self {
        Self {
            vector: FlagVector::Noise,
            index,
        }
    }
}

/// Generator boson momentum requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BosonSpec {
    /// PDG identifier matched on its absolute value.
    #[serde(default = "BosonSpec::default_pdg_id")]
    pub pdg_id: i32,
    /// Minimum boson pt in GeV.
    #[serde(default = "BosonSpec::default_pt_min")]
    pub pt_min: f64,
}

impl BosonSpec {
    fn default_pdg_id() -> i32 {
        23
    }
    fn default_pt_min() -> f64 {
        250.0
    }
}

impl Default for BosonSpec {
    fn default() -> Self {
        Self {
            pdg_id: Self::default_pdg_id(),
            pt_min: Self::default_pt_min(),
        }
    }
}

/// Leading-jet requirement; the pt threshold is replaced along the jet ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadingJetSpec {
    /// Minimum pt in GeV.
    pub pt_min: f64,
    /// Maximum `|eta|`.
    pub eta_max: f64,
    /// Charged hadron fraction window.
    pub chf: Window,
    /// Neutral hadron fraction window.
    pub nhf: Window,
}

impl Default for LeadingJetSpec {
    fn default() -> Self {
        Self {
            pt_min: 110.0,
            eta_max: 2.4,
            chf: Window::new(0.02, 0.98),
            nhf: Window::new(0.02, 0.98),
        }
    }
}

/// Jet multiplicity requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetMultiplicitySpec {
    /// Minimum pt of a counted jet.
    pub jet_pt_min: f64,
    /// Maximum `|eta|` of a counted jet.
    pub jet_eta_max: f64,
    /// Minimum number of jets.
    pub min: usize,
    /// Inclusive maximum number of jets.
    pub max: Option<usize>,
}

impl Default for JetMultiplicitySpec {
    fn default() -> Self {
        Self {
            jet_pt_min: 30.0,
            jet_eta_max: 4.5,
            min: 1,
            max: Some(3),
        }
    }
}

/// Azimuthal separation requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaPhiSpec {
    /// First object.
    pub first: PhiObject,
    /// Second object.
    pub second: PhiObject,
    /// Separation must be strictly above this value.
    pub min: f64,
}

impl Default for DeltaPhiSpec {
    fn default() -> Self {
        Self {
            first: PhiObject::LeadingJet,
            second: PhiObject::Met(MetSlot::PfType1),
            min: 2.5,
        }
    }
}

/// Lepton veto thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeptonVetoSpec {
    /// Minimum pt of a vetoed lepton.
    pub pt_min: f64,
    /// Maximum `|eta|` of a vetoed lepton.
    pub eta_max: f64,
}

impl Default for LeptonVetoSpec {
    fn default() -> Self {
        Self {
            pt_min: 10.0,
            eta_max: 66.0,
        }
    }
}

/// Identified tau multiplicity window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TauSpec {
    /// Minimum tau pt.
    pub pt_min: f64,
    /// Maximum tau `|eta|`.
    pub eta_max: f64,
    /// Minimum count.
    pub min: usize,
    /// Maximum count.
    pub max: usize,
}

impl Default for TauSpec {
    fn default() -> Self {
        Self {
            pt_min: 20.0,
            eta_max: 2.3,
            min: 1,
            max: 1,
        }
    }
}

/// Which threshold ladder to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LadderKind {
    /// Generator boson pt thresholds.
    Met,
    /// Leading-jet pt thresholds.
    Jet,
}

/// Tightening thresholds applied after the common selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    /// Generator boson pt thresholds in GeV.
    #[serde(default = "Ladder::default_steps")]
    pub met: Vec<f64>,
    /// Leading-jet pt thresholds in GeV.
    #[serde(default = "Ladder::default_steps")]
    pub jet: Vec<f64>,
}

impl Ladder {
    fn default_steps() -> Vec<f64> {
        (0..7).map(|step| 250.0 + 50.0 * f64::from(step)).collect()
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self {
            met: Self::default_steps(),
            jet: Self::default_steps(),
        }
    }
}

/// Complete threshold table of the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutTable {
    /// Primary vertex and trigger bits required first.
    #[serde(default = "CutTable::default_flags")]
    pub flags: Vec<FlagSpec>,
    /// Excluded `(run, event)` pairs.
    #[serde(default)]
    pub abnormal_events: Vec<AbnormalEvent>,
    /// Common generator boson cut.
    #[serde(default)]
    pub boson: BosonSpec,
    /// Calorimeter noise cleaning.
    #[serde(default = "CutTable::default_noise_clean")]
    pub noise_clean: NoiseCleanParams,
    /// Optional noise filter bits applied after noise cleaning.
    #[serde(default)]
    pub noise_filters: Vec<FlagSpec>,
    /// Common leading-jet cut.
    #[serde(default)]
    pub leading_jet: LeadingJetSpec,
    /// Jet multiplicity window.
    #[serde(default)]
    pub jet_multiplicity: JetMultiplicitySpec,
    /// Azimuthal separation cut.
    #[serde(default)]
    pub delta_phi: DeltaPhiSpec,
    /// Optional muon veto.
    #[serde(default)]
    pub muon_veto: Option<LeptonVetoSpec>,
    /// Optional electron veto.
    #[serde(default)]
    pub electron_veto: Option<LeptonVetoSpec>,
    /// Tau multiplicity window.
    #[serde(default)]
    pub taus: TauSpec,
    /// Variation ladders.
    #[serde(default)]
    pub ladder: Ladder,
}

impl Default for CutTable {
    fn default() -> Self {
        Self {
            flags: Self::default_flags(),
            abnormal_events: Vec::new(),
            boson: BosonSpec::default(),
            noise_clean: Self::default_noise_clean(),
            noise_filters: Vec::new(),
            leading_jet: LeadingJetSpec::default(),
            jet_multiplicity: JetMultiplicitySpec::default(),
            delta_phi: DeltaPhiSpec::default(),
            muon_veto: None,
            electron_veto: None,
            taus: TauSpec::default(),
            ladder: Ladder::default(),
        }
    }
}

impl CutTable {
    fn default_flags() -> Vec<FlagSpec> {
        vec![FlagSpec::trigger(0), FlagSpec::trigger(1)]
    }

    fn default_noise_clean() -> NoiseCleanParams {
        NoiseCleanParams {
            nemf_max: 0.95,
            nhf_max: 0.98,
            jets: 1,
            chf_min: 0.01,
            cemf_max: 0.99,
        }
    }

    /// Standard event-cleaning filter bits (scraping, HBHE, halo, lasers,
    /// dead cells, tracking failures, bad supercrystals, tracking POG).
    pub fn standard_noise_filters() -> Vec<FlagSpec> {
        [2, 3, 4, 6, 7, 8, 9, 11, 12, 13]
            .into_iter()
            .map(FlagSpec::noise)
            .collect()
    }

    /// Number of ladder steps.
    pub fn steps(&self) -> usize {
        self.ladder.met.len()
    }

    /// Threshold of `kind` at ladder position `step`.
    pub fn threshold(&self, kind: LadderKind, step: usize) -> Option<f64> {
        let ladder = match kind {
            LadderKind::Met => &self.ladder.met,
            LadderKind::Jet => &self.ladder.jet,
        };
        ladder.get(step).copied()
    }

    /// Checks the table for inconsistencies before any event is read.
    pub fn validate(&self) -> Result<(), AnaError> {
        if self.ladder.met.is_empty() || self.ladder.met.len() != self.ladder.jet.len() {
            return Err(AnaError::Config(
                ErrorInfo::new("ladder_shape", "ladders must be non-empty and of equal length")
                    .with_context("met_steps", self.ladder.met.len())
                    .with_context("jet_steps", self.ladder.jet.len()),
            ));
        }
        let thresholds = self
            .ladder
            .met
            .iter()
            .chain(&self.ladder.jet)
            .chain([
                &self.boson.pt_min,
                &self.leading_jet.pt_min,
                &self.leading_jet.eta_max,
                &self.delta_phi.min,
                &self.taus.pt_min,
            ]);
        for value in thresholds {
            if !value.is_finite() || *value < 0.0 {
                return Err(AnaError::Config(
                    ErrorInfo::new("threshold", "thresholds must be finite and non-negative")
                        .with_context("value", value),
                ));
            }
        }
        for (name, window) in [("chf", &self.leading_jet.chf), ("nhf", &self.leading_jet.nhf)] {
            if !window.is_ordered() {
                return Err(AnaError::Config(
                    ErrorInfo::new("window_order", "window minimum exceeds its maximum")
                        .with_context("window", name),
                ));
            }
        }
        if self.taus.min > self.taus.max {
            return Err(AnaError::Config(
                ErrorInfo::new("window_order", "tau window minimum exceeds its maximum")
                    .with_context("window", "taus"),
            ));
        }
        if let Some(max) = self.jet_multiplicity.max {
            if self.jet_multiplicity.min > max {
                return Err(AnaError::Config(
                    ErrorInfo::new("window_order", "jet multiplicity minimum exceeds its maximum")
                        .with_context("window", "jet_multiplicity"),
                ));
            }
        }
        Ok(())
    }

    /// Canonical content hash recorded in run provenance.
    pub fn config_hash(&self) -> Result<String, AnaError> {
        stable_hash_string(self)
    }

    /// Canonical YAML representation of the table.
    pub fn to_yaml_string(&self) -> Result<String, AnaError> {
        to_yaml_string(self)
    }
}

/// Loads and validates a cut table from a YAML file.
pub fn load_cut_table<P: AsRef<Path>>(path: P) -> Result<CutTable, AnaError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        AnaError::Io(
            ErrorInfo::new("cut_table_read", err.to_string())
                .with_context("path", path.display()),
        )
    })?;
    let table: CutTable = from_yaml_slice(&bytes)
        .map_err(|err| AnaError::Config(err.info().clone().with_context("path", path.display())))?;
    table.validate()?;
    Ok(table)
}
