#![deny(missing_docs)]
#![doc = "Event data model, error taxonomy and kinematics helpers shared by the cut-flow engine and its command line front end."]

pub mod bounded;
pub mod errors;
pub mod event;
pub mod kinematics;
pub mod provenance;
pub mod rng;

pub use bounded::Bounded;
pub use errors::{AnaError, ErrorInfo};
pub use event::{
    DataOrigin, EventId, EventRecord, GenParticle, Jet, Lepton, Met, MetSlot, Photon, Tau, Vertex,
    MAX_GEN_PARTICLES, MAX_JETS, MAX_LEPTONS, MAX_MET, MAX_PHOTONS, MAX_TAUS, MAX_VERTICES,
};
pub use kinematics::delta_phi;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
