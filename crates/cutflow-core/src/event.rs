//! Flat per-event record consumed by the analysis pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bounded::Bounded;

/// Maximum number of reconstructed jets stored per event.
pub const MAX_JETS: usize = 30;
/// Maximum number of muons or electrons stored per event.
pub const MAX_LEPTONS: usize = 30;
/// Maximum number of hadronic tau candidates stored per event.
pub const MAX_TAUS: usize = 50;
/// Maximum number of photons stored per event.
pub const MAX_PHOTONS: usize = 30;
/// Number of missing transverse energy slots.
pub const MAX_MET: usize = 40;
/// Maximum number of generator particles stored per event.
pub const MAX_GEN_PARTICLES: usize = 1000;
/// Maximum number of reconstructed vertices stored per event.
pub const MAX_VERTICES: usize = 200;

/// Whether a record comes from real collisions or from simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataOrigin {
    /// Recorded collision data (command line flag `0`).
    Data,
    /// Monte Carlo simulation with generator truth (command line flag `1`).
    Simulation,
}

impl DataOrigin {
    /// Maps the numeric `isMC` flag onto an origin.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(DataOrigin::Data),
            1 => Some(DataOrigin::Simulation),
            _ => None,
        }
    }

    /// Returns true for simulated records.
    pub fn is_simulation(self) -> bool {
        matches!(self, DataOrigin::Simulation)
    }
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Data => write!(f, "data"),
            DataOrigin::Simulation => write!(f, "simulation"),
        }
    }
}

/// Run, luminosity block and event number of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Run number.
    pub run: u32,
    /// Luminosity section.
    #[serde(default)]
    pub lumi: u32,
    /// Event number within the run.
    pub event: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
    }
}

/// Particle-flow jet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    /// Transverse momentum in GeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Energy in GeV.
    #[serde(default)]
    pub energy: f64,
    /// Charged hadron energy fraction.
    #[serde(default)]
    pub chf: f64,
    /// Neutral hadron energy fraction.
    #[serde(default)]
    pub nhf: f64,
    /// Charged electromagnetic energy fraction.
    #[serde(default)]
    pub cemf: f64,
    /// Neutral electromagnetic energy fraction.
    #[serde(default)]
    pub nemf: f64,
    /// Loose jet identification decision.
    #[serde(default)]
    pub loose_id: bool,
}

/// Muon or electron candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lepton {
    /// Transverse momentum in GeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Electric charge.
    #[serde(default)]
    pub charge: i8,
    /// Relative particle-flow isolation.
    #[serde(default)]
    pub isolation: f64,
}

/// Hadronic tau candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tau {
    /// Transverse momentum in GeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Electric charge.
    #[serde(default)]
    pub charge: i8,
    /// Decay-mode-finding discriminator.
    #[serde(default)]
    pub decay_mode_finding: bool,
}

/// Photon candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photon {
    /// Transverse momentum in GeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
}

/// One missing transverse energy flavour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Met {
    /// Magnitude in GeV.
    pub pt: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Scalar sum of transverse energy.
    #[serde(default)]
    pub sum_et: f64,
}

/// Fixed slot enumeration of the missing energy correction variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetSlot {
    /// Calorimeter MET with default corrections.
    Calo,
    /// Calorimeter MET without corrections.
    CaloUncorrNone,
    /// Calorimeter MET with all corrections removed.
    CaloUncorrAll,
    /// Calorimeter MET without jet energy scale corrections.
    CaloUncorrJes,
    /// Calorimeter MET without muon corrections.
    CaloUncorrMuon,
    /// Calorimeter MET without tau corrections.
    CaloUncorrTau,
    /// Generator-level MET.
    Gen,
    /// Particle-flow MET with type-1 corrections.
    PfType1,
    /// Raw particle-flow MET.
    PfRaw,
}

impl MetSlot {
    /// Position of the slot in the MET collection.
    pub fn index(self) -> usize {
        match self {
            MetSlot::Calo => 0,
            MetSlot::CaloUncorrNone => 1,
            MetSlot::CaloUncorrAll => 2,
            MetSlot::CaloUncorrJes => 3,
            MetSlot::CaloUncorrMuon => 4,
            MetSlot::CaloUncorrTau => 5,
            MetSlot::Gen => 6,
            MetSlot::PfType1 => 10,
            MetSlot::PfRaw => 11,
        }
    }
}

/// Generator-level particle (simulation only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenParticle {
    /// PDG particle identifier.
    pub pdg_id: i32,
    /// Generator status code.
    #[serde(default)]
    pub status: i32,
    /// Index of the mother particle in the same collection.
    #[serde(default)]
    pub mother: Option<usize>,
    /// Transverse momentum in GeV.
    pub pt: f64,
    /// Pseudorapidity.
    #[serde(default)]
    pub eta: f64,
    /// Azimuthal angle.
    #[serde(default)]
    pub phi: f64,
    /// Mass in GeV.
    #[serde(default)]
    pub mass: f64,
}

/// Reconstructed primary vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Vertex {
    /// Transverse x position in cm.
    pub x: f64,
    /// Transverse y position in cm.
    pub y: f64,
    /// Longitudinal position in cm.
    pub z: f64,
    /// Number of degrees of freedom of the fit.
    #[serde(default)]
    pub ndof: f64,
    /// Whether the vertex is the fake beam-spot fallback.
    #[serde(default)]
    pub is_fake: bool,
}

/// Derived quantities of one collision event.
///
/// Records are produced by an event source, read-only for the pipeline and
/// dropped once the stage chain has finished with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifiers.
    pub id: EventId,
    /// Data origin of the record.
    pub origin: DataOrigin,
    /// Reconstructed jets, by convention in descending pt.
    #[serde(default)]
    pub jets: Bounded<Jet, MAX_JETS>,
    /// Muon candidates.
    #[serde(default)]
    pub muons: Bounded<Lepton, MAX_LEPTONS>,
    /// Electron candidates.
    #[serde(default)]
    pub electrons: Bounded<Lepton, MAX_LEPTONS>,
    /// Hadronic tau candidates.
    #[serde(default)]
    pub taus: Bounded<Tau, MAX_TAUS>,
    /// Photon candidates.
    #[serde(default)]
    pub photons: Bounded<Photon, MAX_PHOTONS>,
    /// Missing energy variants indexed by [`MetSlot::index`].
    #[serde(default)]
    pub met: Bounded<Met, MAX_MET>,
    /// Generator particles, empty for real data.
    #[serde(default)]
    pub gen_particles: Bounded<GenParticle, MAX_GEN_PARTICLES>,
    /// Trigger decision bits.
    #[serde(default)]
    pub triggers: Vec<u8>,
    /// Noise and quality filter bits.
    #[serde(default)]
    pub noise_flags: Vec<u8>,
    /// Reconstructed vertices.
    #[serde(default)]
    pub vertices: Bounded<Vertex, MAX_VERTICES>,
}

impl EventRecord {
    /// Creates an empty record with the given identifiers and origin.
    pub fn new(run: u32, event: u64, origin: DataOrigin) -> Self {
        Self {
            id: EventId {
                run,
                lumi: 0,
                event,
            },
            origin,
            jets: Bounded::new(),
            muons: Bounded::new(),
            electrons: Bounded::new(),
            taus: Bounded::new(),
            photons: Bounded::new(),
            met: Bounded::new(),
            gen_particles: Bounded::new(),
            triggers: Vec::new(),
            noise_flags: Vec::new(),
            vertices: Bounded::new(),
        }
    }

    /// Jets in descending pt; equal-pt jets keep their storage order.
    pub fn jets_by_pt(&self) -> Vec<&Jet> {
        let mut ordered: Vec<&Jet> = self.jets.iter().collect();
        ordered.sort_by(|a, b| b.pt.total_cmp(&a.pt));
        ordered
    }

    /// Highest-pt jet of the event.
    pub fn leading_jet(&self) -> Option<&Jet> {
        self.jets_by_pt().first().copied()
    }

    /// Second highest-pt jet of the event.
    pub fn subleading_jet(&self) -> Option<&Jet> {
        self.jets_by_pt().get(1).copied()
    }

    /// Missing energy stored in the requested slot.
    pub fn met(&self, slot: MetSlot) -> Option<&Met> {
        self.met.get(slot.index())
    }

    /// Highest-pt generator particle with the given absolute PDG identifier.
    pub fn gen_boson(&self, pdg_id: i32) -> Option<&GenParticle> {
        self.gen_particles
            .iter()
            .filter(|particle| particle.pdg_id.abs() == pdg_id.abs())
            .max_by(|a, b| a.pt.total_cmp(&b.pt))
    }
}
