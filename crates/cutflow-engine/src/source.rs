//! Sequential event sources feeding the manager.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use cutflow_core::bounded::Bounded;
use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::{
    DataOrigin, EventRecord, GenParticle, Jet, Lepton, Met, Tau, Vertex, MAX_MET,
};
use cutflow_core::rng::RngHandle;
use thiserror::Error;

use crate::serde::from_json_slice;

/// Identity of the sample being read and the limits of the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Sample name, used for log and artefact file names.
    pub sample: String,
    /// Maximum number of records to deliver; `None` means unbounded.
    pub max_events: Option<u64>,
    /// Declared data origin of every record in the sample.
    pub origin: DataOrigin,
}

impl SourceConfig {
    /// Unbounded configuration.
    pub fn new(sample: impl Into<String>, origin: DataOrigin) -> Self {
        Self {
            sample: sample.into(),
            max_events: None,
            origin,
        }
    }

    /// Configuration from a command line cap where non-positive means unbounded.
    pub fn from_cli_cap(sample: impl Into<String>, cap: i64, origin: DataOrigin) -> Self {
        Self::new(sample, origin).with_max_events(u64::try_from(cap).ok().filter(|cap| *cap > 0))
    }

    /// Sets the event cap.
    pub fn with_max_events(mut self, max_events: Option<u64>) -> Self {
        self.max_events = max_events;
        self
    }

    fn allows(&self, delivered: u64) -> bool {
        self.max_events.map_or(true, |cap| delivered < cap)
    }
}

/// Reasons a source stops delivering records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// No more records, or the cap was reached.
    #[error("end of stream")]
    EndOfStream,
    /// The next record could not be decoded.
    #[error("malformed record: {0}")]
    Malformed(ErrorInfo),
}

/// Sequential reader of event records.
///
/// Records are delivered in storage order, never twice, and never more than
/// the configured cap.
pub trait EventSource {
    /// Sample identity and limits.
    fn config(&self) -> &SourceConfig;

    /// Returns true when [`EventSource::advance`] may yield another record.
    fn has_next(&mut self) -> bool;

    /// Delivers the next record.
    fn advance(&mut self) -> Result<EventRecord, SourceError>;
}

/// Source over records held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    config: SourceConfig,
    records: std::vec::IntoIter<EventRecord>,
    delivered: u64,
}

impl MemorySource {
    /// Source delivering `records` in order.
    pub fn new(config: SourceConfig, records: Vec<EventRecord>) -> Self {
        Self {
            config,
            records: records.into_iter(),
            delivered: 0,
        }
    }
}

impl EventSource for MemorySource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn has_next(&mut self) -> bool {
        self.config.allows(self.delivered) && !self.records.as_slice().is_empty()
    }

    fn advance(&mut self) -> Result<EventRecord, SourceError> {
        if !self.config.allows(self.delivered) {
            return Err(SourceError::EndOfStream);
        }
        let record = self.records.next().ok_or(SourceError::EndOfStream)?;
        self.delivered += 1;
        Ok(record)
    }
}

/// Source reading one JSON encoded record per line.
pub struct JsonLinesSource<R = BufReader<File>> {
    config: SourceConfig,
    reader: R,
    pending: Option<Result<String, String>>,
    line: u64,
    delivered: u64,
    exhausted: bool,
}

impl JsonLinesSource<BufReader<File>> {
    /// Opens a `.jsonl` file.
    pub fn open(path: &Path, config: SourceConfig) -> Result<Self, AnaError> {
        let file = File::open(path).map_err(|err| {
            AnaError::Io(
                ErrorInfo::new("source_open", err.to_string())
                    .with_context("path", path.display())
                    .with_hint("pass --input or --synthetic to choose the event source"),
            )
        })?;
        Ok(Self::from_reader(BufReader::new(file), config))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Source over any buffered reader.
    pub fn from_reader(reader: R, config: SourceConfig) -> Self {
        Self {
            config,
            reader,
            pending: None,
            line: 0,
            delivered: 0,
            exhausted: false,
        }
    }

    fn fill_pending(&mut self) {
        while self.pending.is_none() && !self.exhausted {
            let mut buf = String::new();
            match self.reader.read_line(&mut buf) {
                Ok(0) => self.exhausted = true,
                Ok(_) => {
                    self.line += 1;
                    if !buf.trim().is_empty() {
                        self.pending = Some(Ok(buf));
                    }
                }
                Err(err) => {
                    self.line += 1;
                    self.exhausted = true;
                    self.pending = Some(Err(err.to_string()));
                }
            }
        }
    }
}

impl<R: BufRead> EventSource for JsonLinesSource<R> {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn has_next(&mut self) -> bool {
        if !self.config.allows(self.delivered) {
            return false;
        }
        self.fill_pending();
        self.pending.is_some()
    }

    fn advance(&mut self) -> Result<EventRecord, SourceError> {
        if !self.config.allows(self.delivered) {
            return Err(SourceError::EndOfStream);
        }
        self.fill_pending();
        let text = match self.pending.take() {
            None => return Err(SourceError::EndOfStream),
            Some(Ok(text)) => text,
            Some(Err(message)) => {
                return Err(SourceError::Malformed(
                    ErrorInfo::new("source_read", message).with_context("line", self.line),
                ))
            }
        };
        let record: EventRecord = from_json_slice(text.trim().as_bytes()).map_err(|err| {
            SourceError::Malformed(
                ErrorInfo::new("malformed_record", err.info().message.clone())
                    .with_context("line", self.line),
            )
        })?;
        self.delivered += 1;
        Ok(record)
    }
}

/// Deterministic generator of plausible collision events.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SourceConfig,
    rng: RngHandle,
    events: u64,
    first_event: u64,
    delivered: u64,
}

impl SyntheticSource {
    /// Generates `events` records from `seed`.
    pub fn new(config: SourceConfig, seed: u64, events: u64) -> Self {
        Self {
            config,
            rng: RngHandle::from_seed(seed),
            events,
            first_event: 1,
            delivered: 0,
        }
    }

    /// Generates the `shard`-th independent block of `events` records.
    pub fn for_shard(config: SourceConfig, seed: u64, shard: u64, events: u64) -> Self {
        Self {
            config,
            rng: RngHandle::for_substream(seed, shard),
            events,
            first_event: shard * events + 1,
            delivered: 0,
        }
    }

    fn generate(&mut self) -> Result<EventRecord, AnaError> {
        let origin = self.config.origin;
        let rng = &mut self.rng;
        let mut record = EventRecord::new(1, self.first_event + self.delivered, origin);
        record.id.lumi = (record.id.event / 100) as u32 + 1;

        let mut jets: Vec<Jet> = (0..rng.count(0, 5))
            .map(|_| {
                let pt = rng.falling(30.0, 120.0);
                let chf = rng.uniform(0.0, 1.0);
                let nhf = rng.uniform(0.0, 1.0 - chf);
                let cemf = rng.uniform(0.0, 0.2);
                Jet {
                    pt,
                    eta: rng.uniform(-3.0, 3.0),
                    phi: rng.uniform(-PI, PI),
                    energy: pt * rng.uniform(1.0, 3.0),
                    chf,
                    nhf,
                    cemf,
                    nemf: (1.0 - chf - nhf - cemf).max(0.0),
                    loose_id: rng.chance(0.95),
                }
            })
            .collect();
        jets.sort_by(|a, b| b.pt.total_cmp(&a.pt));
        record.jets = Bounded::from_vec(jets)?;

        let lepton = |rng: &mut RngHandle| Lepton {
            pt: rng.falling(5.0, 25.0),
            eta: rng.uniform(-2.5, 2.5),
            phi: rng.uniform(-PI, PI),
            charge: if rng.chance(0.5) { 1 } else { -1 },
            isolation: rng.uniform(0.0, 0.5),
        };
        let muons = (0..rng.count(0, 1)).map(|_| lepton(rng)).collect();
        record.muons = Bounded::from_vec(muons)?;
        let electrons = (0..rng.count(0, 1)).map(|_| lepton(rng)).collect();
        record.electrons = Bounded::from_vec(electrons)?;

        let taus = (0..rng.count(0, 2))
            .map(|_| Tau {
                pt: rng.falling(15.0, 30.0),
                eta: rng.uniform(-2.5, 2.5),
                phi: rng.uniform(-PI, PI),
                charge: if rng.chance(0.5) { 1 } else { -1 },
                decay_mode_finding: rng.chance(0.7),
            })
            .collect();
        record.taus = Bounded::from_vec(taus)?;

        let recoil_phi = rng.uniform(-PI, PI);
        let met = (0..12.min(MAX_MET))
            .map(|_| {
                let pt = rng.falling(20.0, 150.0);
                Met {
                    pt,
                    phi: recoil_phi + rng.uniform(-0.3, 0.3),
                    sum_et: pt * rng.uniform(3.0, 8.0),
                }
            })
            .collect();
        record.met = Bounded::from_vec(met)?;

        if origin.is_simulation() {
            let boson = GenParticle {
                pdg_id: 23,
                status: 3,
                mother: None,
                pt: rng.falling(100.0, 200.0),
                eta: rng.uniform(-2.5, 2.5),
                phi: recoil_phi,
                mass: 91.19,
            };
            record.gen_particles.push(boson)?;
        }

        record.triggers = (0..2).map(|_| u8::from(rng.chance(0.95))).collect();
        record.noise_flags = (0..14).map(|_| u8::from(rng.chance(0.98))).collect();
        let vertices = (0..rng.count(1, 30))
            .map(|idx| Vertex {
                x: rng.uniform(-0.01, 0.01),
                y: rng.uniform(-0.01, 0.01),
                z: rng.uniform(-15.0, 15.0),
                ndof: rng.uniform(4.0, 200.0),
                is_fake: idx == 0 && rng.chance(0.01),
            })
            .collect();
        record.vertices = Bounded::from_vec(vertices)?;
        Ok(record)
    }
}

impl EventSource for SyntheticSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn has_next(&mut self) -> bool {
        self.delivered < self.events && self.config.allows(self.delivered)
    }

    fn advance(&mut self) -> Result<EventRecord, SourceError> {
        if !self.has_next() {
            return Err(SourceError::EndOfStream);
        }
        let record = self
            .generate()
            .map_err(|err| SourceError::Malformed(err.info().clone()))?;
        self.delivered += 1;
        Ok(record)
    }
}
