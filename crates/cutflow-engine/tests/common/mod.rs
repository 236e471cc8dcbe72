#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use cutflow_core::bounded::Bounded;
use cutflow_core::errors::AnaError;
use cutflow_core::event::{DataOrigin, EventId, EventRecord, GenParticle, Jet, Met, Tau};
use cutflow_engine::histo::HistogramSet;
use cutflow_engine::source::{MemorySource, SourceConfig};
use cutflow_engine::stage::{Cut, Histogrammer, RunStatus, Verdict};

pub fn jet(pt: f64, eta: f64, phi: f64) -> Jet {
    Jet {
        pt,
        eta,
        phi,
        energy: pt * 1.2,
        chf: 0.5,
        nhf: 0.2,
        cemf: 0.1,
        nemf: 0.2,
        loose_id: true,
    }
}

pub fn tau(pt: f64) -> Tau {
    Tau {
        pt,
        eta: 0.5,
        phi: 0.0,
        charge: -1,
        decay_mode_finding: true,
    }
}

pub fn boson(pdg_id: i32, pt: f64) -> GenParticle {
    GenParticle {
        pdg_id,
        status: 3,
        mother: None,
        pt,
        eta: 0.3,
        phi: 0.0,
        mass: 91.19,
    }
}

/// Record with all trigger and noise bits set.
pub fn record(run: u32, event: u64, origin: DataOrigin) -> EventRecord {
    let mut record = EventRecord::new(run, event, origin);
    record.triggers = vec![1, 1];
    record.noise_flags = vec![1; 14];
    record
}

pub fn with_jets(mut record: EventRecord, jets: Vec<Jet>) -> EventRecord {
    record.jets = Bounded::from_vec(jets).expect("jets fit");
    record
}

pub fn with_taus(mut record: EventRecord, taus: Vec<Tau>) -> EventRecord {
    record.taus = Bounded::from_vec(taus).expect("taus fit");
    record
}

/// MET collection with the PF type-1 slot at the given azimuth.
pub fn with_pf_met(mut record: EventRecord, pt: f64, phi: f64) -> EventRecord {
    let mut met = vec![Met::default(); 12];
    met[10] = Met {
        pt,
        phi,
        sum_et: pt * 4.0,
    };
    record.met = Bounded::from_vec(met).expect("met fits");
    record
}

/// Ten events: seven with a hard leading jet, five of those with exactly one tau.
pub fn scenario_records() -> Vec<EventRecord> {
    (1..=10u64)
        .map(|event| {
            let pt = if event <= 7 { 150.0 } else { 80.0 };
            let base = with_jets(record(1, event, DataOrigin::Data), vec![jet(pt, 0.5, 0.1)]);
            let taus = if event <= 5 { vec![tau(30.0)] } else { Vec::new() };
            with_taus(base, taus)
        })
        .collect()
}

pub fn memory_source(origin: DataOrigin, records: Vec<EventRecord>) -> MemorySource {
    MemorySource::new(SourceConfig::new("test_sample", origin), records)
}

/// Histogrammer recording the ids it observes and the finalize statuses it gets.
pub struct Recorder {
    label: String,
    set: HistogramSet,
    pub seen: Arc<Mutex<Vec<EventId>>>,
    pub finalized: Arc<Mutex<Vec<RunStatus>>>,
}

impl Recorder {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            set: HistogramSet::default(),
            seen: Arc::new(Mutex::new(Vec::new())),
            finalized: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Histogrammer for Recorder {
    fn label(&self) -> &str {
        &self.label
    }

    fn observe(&mut self, record: &EventRecord) -> Result<(), AnaError> {
        self.set.entries += 1;
        self.seen.lock().expect("lock").push(record.id);
        Ok(())
    }

    fn entries(&self) -> u64 {
        self.set.entries
    }

    fn snapshot(&self) -> &HistogramSet {
        &self.set
    }

    fn finalize(&mut self, status: RunStatus) -> Result<(), AnaError> {
        self.finalized.lock().expect("lock").push(status);
        Ok(())
    }
}

/// Rejects events whose number has bit `bit` set.
pub struct BitCut {
    name: String,
    bit: u32,
}

impl BitCut {
    pub fn new(bit: u32) -> Self {
        Self {
            name: format!("bit_{bit}"),
            bit,
        }
    }

    pub fn passes(bit: u32, event: u64) -> bool {
        (event >> bit) & 1 == 0
    }
}

impl Cut for BitCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        if Self::passes(self.bit, record.id.event) {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::reject("bit-set"))
        }
    }
}

/// Fails when it sees the given event number, and can fail at finalize.
pub struct FailingCut {
    pub fail_on: Option<u64>,
    pub fail_finalize: bool,
    pub finalized: Arc<Mutex<Vec<RunStatus>>>,
}

impl FailingCut {
    pub fn on_event(event: u64) -> Self {
        Self {
            fail_on: Some(event),
            fail_finalize: false,
            finalized: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn at_finalize() -> Self {
        Self {
            fail_on: None,
            fail_finalize: true,
            finalized: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Cut for FailingCut {
    fn name(&self) -> &str {
        "failing"
    }

    fn evaluate(&mut self, record: &EventRecord) -> Result<Verdict, AnaError> {
        if self.fail_on == Some(record.id.event) {
            return Err(AnaError::stage("probe_failure", "requested failure"));
        }
        Ok(Verdict::Pass)
    }

    fn finalize(&mut self, status: RunStatus) -> Result<(), AnaError> {
        self.finalized.lock().expect("lock").push(status);
        if self.fail_finalize {
            return Err(AnaError::stage("probe_finalize", "requested finalize failure"));
        }
        Ok(())
    }
}
