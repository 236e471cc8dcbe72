//! Catalogue of event selection cuts.
//!
//! Every cut is independent of the others and can be composed in any order.
//! Thresholds are fixed at construction; rejections carry a category code
//! that the manager tallies per stage.

use std::collections::HashSet;

use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::{EventRecord, Jet, Lepton, MetSlot};
use cutflow_core::kinematics::{abs_eta_within, delta_phi};
use serde::{Deserialize, Serialize};

use crate::stage::{Cut, Verdict};

/// Closed interval `[min, max]` on a real-valued quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Inclusive lower edge.
    pub min: f64,
    /// Inclusive upper edge.
    pub max: f64,
}

impl Window {
    /// Creates a window.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true when `value` lies inside the window.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Returns true when the edges are ordered.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// Bit vector a [`FlagCut`] reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagVector {
    /// Trigger decision bits.
    Trigger,
    /// Noise and quality filter bits.
    Noise,
}

/// Requires one trigger or quality bit to be set.
#[derive(Debug, Clone)]
pub struct FlagCut {
    name: String,
    vector: FlagVector,
    index: usize,
}

impl FlagCut {
    /// Cut on bit `index` of the selected vector.
    pub fn new(vector: FlagVector, index: usize) -> Self {
        let prefix = match vector {
            FlagVector::Trigger => "trigger_flag",
            FlagVector::Noise => "noise_flag",
        };
        Self {
            name: format!("{prefix}_{index}"),
            vector,
            index,
        }
    }
}

impl Cut for FlagCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let bits = match self.vector {
            FlagVector::Trigger => &record.triggers,
            FlagVector::Noise => &record.noise_flags,
        };
        let bit = bits.get(self.index).copied().ok_or_else(|| {
            AnaError::Stage(
                ErrorInfo::new("flag_index", "flag index beyond the event's flag vector")
                    .with_context("stage", &self.name)
                    .with_context("index", self.index)
                    .with_context("len", bits.len())
                    .with_context("event", record.id),
            )
        })?;
        Ok(match (bit, self.vector) {
            (1, _) => Verdict::Pass,
            (_, FlagVector::Trigger) => Verdict::reject("trigger-flag"),
            (_, FlagVector::Noise) => Verdict::reject("noise-flag"),
        })
    }
}

/// `(run, event)` pair excluded from the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbnormalEvent {
    /// Run number.
    pub run: u32,
    /// Event number.
    pub event: u64,
}

/// Rejects events listed as abnormal.
#[derive(Debug, Clone)]
pub struct AbnormalEventCut {
    excluded: HashSet<(u32, u64)>,
}

impl AbnormalEventCut {
    /// Cut excluding exactly the listed `(run, event)` pairs.
    pub fn new<'a>(events: impl IntoIterator<Item = &'a AbnormalEvent>) -> Self {
        Self {
            excluded: events
                .into_iter()
                .map(|entry| (entry.run, entry.event))
                .collect(),
        }
    }

    /// Number of excluded pairs.
    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    /// Returns true when nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }
}

impl Cut for AbnormalEventCut {
    fn name(&self) -> &str {
        "abnormal_events"
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        if self.excluded.contains(&(record.id.run, record.id.event)) {
            Ok(Verdict::reject("abnormal-event"))
        } else {
            Ok(Verdict::Pass)
        }
    }
}

/// Generator-level boson momentum requirement; a no-op on real data.
#[derive(Debug, Clone)]
pub struct GenParticlePtCut {
    name: String,
    pdg_id: i32,
    threshold: f64,
}

impl GenParticlePtCut {
    /// Requires a generator particle with `|pdg_id|` and `pt >= threshold`.
    pub fn new(pdg_id: i32, threshold: f64) -> Self {
        Self {
            name: format!("gen_pt_{}_{threshold}", pdg_id.abs()),
            pdg_id: pdg_id.abs(),
            threshold,
        }
    }

    /// Threshold in GeV.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Suffixes the name with the variation ladder step.
    pub fn at_step(mut self, step: usize) -> Self {
        self.name = format!("{}_step{step}", self.name);
        self
    }
}

impl Cut for GenParticlePtCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        if !record.origin.is_simulation() {
            return Ok(Verdict::Pass);
        }
        let found = record
            .gen_particles
            .iter()
            .any(|particle| particle.pdg_id.abs() == self.pdg_id && particle.pt >= self.threshold);
        if found {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::reject("gen-boson-pt"))
        }
    }
}

/// Kinematic and energy-fraction requirements on the highest-pt jet.
#[derive(Debug, Clone)]
pub struct LeadingJetCut {
    name: String,
    pt_min: f64,
    eta_max: f64,
    chf: Window,
    nhf: Window,
}

impl LeadingJetCut {
    /// Leading jet with `pt >= pt_min`, `|eta| <= eta_max` and fractions in the windows.
    pub fn new(pt_min: f64, eta_max: f64, chf: Window, nhf: Window) -> Self {
        Self {
            name: format!("leading_jet_{pt_min}"),
            pt_min,
            eta_max,
            chf,
            nhf,
        }
    }

    /// Minimum leading-jet pt in GeV.
    pub fn pt_min(&self) -> f64 {
        self.pt_min
    }

    /// Suffixes the name with the variation ladder step.
    pub fn at_step(mut self, step: usize) -> Self {
        self.name = format!("{}_step{step}", self.name);
        self
    }
}

impl Cut for LeadingJetCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let Some(jet) = record.leading_jet() else {
            return Ok(Verdict::reject("no-jet"));
        };
        let verdict = if jet.pt < self.pt_min {
            Verdict::reject("leading-jet-pt")
        } else if !abs_eta_within(jet.eta, self.eta_max) {
            Verdict::reject("leading-jet-eta")
        } else if !self.chf.contains(jet.chf) {
            Verdict::reject("leading-jet-chf")
        } else if !self.nhf.contains(jet.nhf) {
            Verdict::reject("leading-jet-nhf")
        } else {
            Verdict::Pass
        };
        Ok(verdict)
    }
}

/// Bounds on the number of qualifying jets.
#[derive(Debug, Clone)]
pub struct JetMultiplicityCut {
    jet_pt_min: f64,
    jet_eta_max: f64,
    min: usize,
    max: Option<usize>,
}

impl JetMultiplicityCut {
    /// Counts jets with `pt >= jet_pt_min` and `|eta| <= jet_eta_max`.
    pub fn new(jet_pt_min: f64, jet_eta_max: f64, min: usize, max: Option<usize>) -> Self {
        Self {
            jet_pt_min,
            jet_eta_max,
            min,
            max,
        }
    }

    fn qualifying(&self, jet: &Jet) -> bool {
        jet.pt >= self.jet_pt_min && abs_eta_within(jet.eta, self.jet_eta_max)
    }
}

impl Cut for JetMultiplicityCut {
    fn name(&self) -> &str {
        "jet_multiplicity"
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let count = record.jets.iter().filter(|jet| self.qualifying(jet)).count();
        if count < self.min {
            return Ok(Verdict::reject("jet-multiplicity-low"));
        }
        match self.max {
            Some(max) if count > max => Ok(Verdict::reject("jet-multiplicity-high")),
            _ => Ok(Verdict::Pass),
        }
    }
}

/// Physics object whose azimuth enters a [`DeltaPhiCut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "slot")]
pub enum PhiObject {
    /// Highest-pt jet.
    LeadingJet,
    /// Second highest-pt jet.
    SubleadingJet,
    /// Missing energy in the given slot.
    Met(MetSlot),
}

impl PhiObject {
    /// Azimuth of the object, if the event has it.
    pub fn phi(&self, record: &EventRecord) -> Option<f64> {
        match self {
            PhiObject::LeadingJet => record.leading_jet().map(|jet| jet.phi),
            PhiObject::SubleadingJet => record.subleading_jet().map(|jet| jet.phi),
            PhiObject::Met(slot) => record.met(*slot).map(|met| met.phi),
        }
    }
}

/// Minimum azimuthal separation between two objects.
#[derive(Debug, Clone)]
pub struct DeltaPhiCut {
    first: PhiObject,
    second: PhiObject,
    min: f64,
}

impl DeltaPhiCut {
    /// Passes when the separation is strictly above `min`.
    pub fn new(first: PhiObject, second: PhiObject, min: f64) -> Self {
        Self { first, second, min }
    }
}

impl Cut for DeltaPhiCut {
    fn name(&self) -> &str {
        "delta_phi"
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let (Some(a), Some(b)) = (self.first.phi(record), self.second.phi(record)) else {
            return Ok(Verdict::Pass);
        };
        if delta_phi(a, b) > self.min {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::reject("delta-phi"))
        }
    }
}

/// Window on the number of identified hadronic taus.
#[derive(Debug, Clone)]
pub struct TauMultiplicityCut {
    pt_min: f64,
    eta_max: f64,
    min: usize,
    max: usize,
}

impl TauMultiplicityCut {
    /// Counts taus passing decay-mode finding with `pt >= pt_min`, `|eta| <= eta_max`.
    pub fn new(pt_min: f64, eta_max: f64, min: usize, max: usize) -> Self {
        Self {
            pt_min,
            eta_max,
            min,
            max,
        }
    }
}

impl Cut for TauMultiplicityCut {
    fn name(&self) -> &str {
        "tau_multiplicity"
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let count = record
            .taus
            .iter()
            .filter(|tau| {
                tau.decay_mode_finding
                    && tau.pt >= self.pt_min
                    && abs_eta_within(tau.eta, self.eta_max)
            })
            .count();
        if count < self.min || count > self.max {
            Ok(Verdict::reject("tau-multiplicity"))
        } else {
            Ok(Verdict::Pass)
        }
    }
}

/// Energy-fraction thresholds for calorimeter noise cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseCleanParams {
    /// Maximum neutral EM fraction.
    pub nemf_max: f64,
    /// Maximum neutral hadron fraction.
    pub nhf_max: f64,
    /// Number of leading jets checked.
    pub jets: usize,
    /// Minimum charged hadron fraction.
    pub chf_min: f64,
    /// Maximum charged EM fraction.
    pub cemf_max: f64,
}

/// Rejects events whose leading jets look like calorimeter noise.
#[derive(Debug, Clone)]
pub struct NoiseCleanCut {
    params: NoiseCleanParams,
}

impl NoiseCleanCut {
    /// Cut applying the given thresholds.
    pub fn new(params: NoiseCleanParams) -> Self {
        Self { params }
    }

    fn check(&self, jet: &Jet) -> Option<&'static str> {
        let p = &self.params;
        if jet.nemf > p.nemf_max {
            Some("noise-nemf")
        } else if jet.nhf > p.nhf_max {
            Some("noise-nhf")
        } else if jet.chf < p.chf_min {
            Some("noise-chf")
        } else if jet.cemf > p.cemf_max {
            Some("noise-cemf")
        } else {
            None
        }
    }
}

impl Cut for NoiseCleanCut {
    fn name(&self) -> &str {
        "noise_clean"
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let failure = record
            .jets_by_pt()
            .into_iter()
            .take(self.params.jets)
            .find_map(|jet| self.check(jet));
        Ok(failure.map_or(Verdict::Pass, Verdict::reject))
    }
}

/// Lepton flavour vetoed by a [`LeptonVetoCut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeptonFlavour {
    /// Particle-flow muons.
    Muon,
    /// Particle-flow electrons.
    Electron,
}

/// Rejects events with a lepton above threshold.
#[derive(Debug, Clone)]
pub struct LeptonVetoCut {
    flavour: LeptonFlavour,
    pt_min: f64,
    eta_max: f64,
}

impl LeptonVetoCut {
    /// Vetoes leptons with `pt >= pt_min` and `|eta| <= eta_max`.
    pub fn new(flavour: LeptonFlavour, pt_min: f64, eta_max: f64) -> Self {
        Self {
            flavour,
            pt_min,
            eta_max,
        }
    }

    fn vetoed(&self, lepton: &Lepton) -> bool {
        lepton.pt >= self.pt_min && abs_eta_within(lepton.eta, self.eta_max)
    }
}

impl Cut for LeptonVetoCut {
    fn name(&self) -> &str {
        match self.flavour {
            LeptonFlavour::Muon => "muon_veto",
            LeptonFlavour::Electron => "electron_veto",
        }
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        let (leptons, category) = match self.flavour {
            LeptonFlavour::Muon => (&record.muons, "muon-veto"),
            LeptonFlavour::Electron => (&record.electrons, "electron-veto"),
        };
        if leptons.iter().any(|lepton| self.vetoed(lepton)) {
            Ok(Verdict::reject(category))
        } else {
            Ok(Verdict::Pass)
        }
    }
}
