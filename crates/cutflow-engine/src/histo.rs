//! Histogram primitives and the histogramming stage family.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::PathBuf;

use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::{EventRecord, MetSlot};
use cutflow_core::kinematics::delta_phi;
use serde::{Deserialize, Serialize};

use crate::serde::write_json_atomic;
use crate::stage::{Histogrammer, RunStatus};

/// Fixed-binning histogram with underflow and overflow counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges, `bins + 1` values; left edge inclusive, right edge exclusive.
    pub edges: Vec<f64>,
    /// Counts recorded per bin.
    pub counts: Vec<u64>,
    /// Fills below the first edge.
    pub underflow: u64,
    /// Fills at or above the last edge, and non-numbers.
    pub overflow: u64,
    /// Total number of fills.
    pub entries: u64,
}

impl Histogram {
    /// Creates `bins` uniform bins spanning `[low, high)`.
    pub fn uniform(bins: usize, low: f64, high: f64) -> Self {
        let bins = bins.max(1);
        let step = (high - low) / bins as f64;
        let edges = (0..=bins).map(|idx| low + idx as f64 * step).collect();
        Self {
            edges,
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
            entries: 0,
        }
    }

    /// Lower edge of the range.
    pub fn low(&self) -> f64 {
        self.edges.first().copied().unwrap_or(0.0)
    }

    /// Upper edge of the range.
    pub fn high(&self) -> f64 {
        self.edges.last().copied().unwrap_or(0.0)
    }

    /// Records one value.
    pub fn fill(&mut self, value: f64) {
        self.entries += 1;
        let (low, high) = (self.low(), self.high());
        if value.is_nan() || value >= high {
            self.overflow += 1;
            return;
        }
        if value < low {
            self.underflow += 1;
            return;
        }
        let bins = self.counts.len();
        let position = ((value - low) / (high - low) * bins as f64).floor() as usize;
        self.counts[position.min(bins - 1)] += 1;
    }

    /// Sum of in-range bin counts.
    pub fn integral(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Adds the contents of another histogram with identical binning.
    pub fn merge(&mut self, other: &Histogram) -> Result<(), AnaError> {
        if self.edges != other.edges {
            return Err(AnaError::Stage(
                ErrorInfo::new("histogram_binning", "cannot merge histograms with different edges")
                    .with_context("bins", self.counts.len())
                    .with_context("other_bins", other.counts.len()),
            ));
        }
        for (count, extra) in self.counts.iter_mut().zip(&other.counts) {
            *count += extra;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }
}

/// Histogrammer flavours, each filling its own set of distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistogramFamily {
    /// Data/simulation comparison of jet, MET and vertex observables.
    DataMcMatching,
    /// Generator boson and recoil observables.
    BosonAnalysis,
    /// Lepton and tau content of the surviving events.
    LeptonSource,
}

impl HistogramFamily {
    /// Label prefix used by the sequential label allocator.
    pub fn prefix(self) -> &'static str {
        match self {
            HistogramFamily::DataMcMatching => "AnaZ_",
            HistogramFamily::BosonAnalysis => "ZAnalysis_",
            HistogramFamily::LeptonSource => "hWSourceAnalysis",
        }
    }

    fn book(self) -> BTreeMap<String, Histogram> {
        let specs: &[(&str, usize, f64, f64)] = match self {
            HistogramFamily::DataMcMatching => &[
                ("jet1_pt", 50, 0.0, 1000.0),
                ("jet2_pt", 50, 0.0, 1000.0),
                ("jet1_eta", 50, -5.0, 5.0),
                ("jet1_phi", 36, -PI, PI),
                ("n_jets", 15, 0.0, 15.0),
                ("met_pt", 50, 0.0, 1000.0),
                ("met_phi", 36, -PI, PI),
                ("n_vertices", 50, 0.0, 50.0),
                ("n_taus", 10, 0.0, 10.0),
                ("dphi_j1_j2", 32, 0.0, PI),
            ],
            HistogramFamily::BosonAnalysis => &[
                ("boson_pt", 50, 0.0, 1000.0),
                ("boson_eta", 50, -5.0, 5.0),
                ("boson_pt_over_met", 50, 0.0, 5.0),
                ("recoil_pt", 50, 0.0, 1000.0),
            ],
            HistogramFamily::LeptonSource => &[
                ("n_muons", 10, 0.0, 10.0),
                ("n_electrons", 10, 0.0, 10.0),
                ("n_taus", 10, 0.0, 10.0),
                ("lepton1_pt", 50, 0.0, 500.0),
            ],
        };
        specs
            .iter()
            .map(|(name, bins, low, high)| {
                (name.to_string(), Histogram::uniform(*bins, *low, *high))
            })
            .collect()
    }

    fn fill(self, set: &mut HistogramSet, record: &EventRecord) -> Result<(), AnaError> {
        let met = record.met(MetSlot::PfType1);
        match self {
            HistogramFamily::DataMcMatching => {
                let jet1 = record.leading_jet();
                let jet2 = record.subleading_jet();
                if let Some(jet) = jet1 {
                    set.fill("jet1_pt", jet.pt)?;
                    set.fill("jet1_eta", jet.eta)?;
                    set.fill("jet1_phi", jet.phi)?;
                }
                if let Some(jet) = jet2 {
                    set.fill("jet2_pt", jet.pt)?;
                }
                if let (Some(a), Some(b)) = (jet1, jet2) {
                    set.fill("dphi_j1_j2", delta_phi(a.phi, b.phi))?;
                }
                set.fill("n_jets", record.jets.count() as f64)?;
                if let Some(met) = met {
                    set.fill("met_pt", met.pt)?;
                    set.fill("met_phi", met.phi)?;
                }
                set.fill("n_vertices", record.vertices.count() as f64)?;
                set.fill("n_taus", record.taus.count() as f64)?;
            }
            HistogramFamily::BosonAnalysis => {
                if let Some(met) = met {
                    set.fill("recoil_pt", met.pt)?;
                }
                let boson = record.gen_boson(23).or_else(|| record.gen_boson(24));
                if let Some(boson) = boson.filter(|_| record.origin.is_simulation()) {
                    set.fill("boson_pt", boson.pt)?;
                    set.fill("boson_eta", boson.eta)?;
                    if let Some(met) = met.filter(|met| met.pt > 0.0) {
                        set.fill("boson_pt_over_met", boson.pt / met.pt)?;
                    }
                }
            }
            HistogramFamily::LeptonSource => {
                set.fill("n_muons", record.muons.count() as f64)?;
                set.fill("n_electrons", record.electrons.count() as f64)?;
                set.fill("n_taus", record.taus.count() as f64)?;
                let leading = record
                    .muons
                    .iter()
                    .chain(record.electrons.iter())
                    .map(|lepton| lepton.pt)
                    .fold(None, |best: Option<f64>, pt| Some(best.map_or(pt, |b| b.max(pt))));
                if let Some(pt) = leading {
                    set.fill("lepton1_pt", pt)?;
                }
            }
        }
        Ok(())
    }
}

/// Named distributions produced by one histogramming stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistogramSet {
    /// Number of events observed.
    pub entries: u64,
    /// Distributions keyed by observable name.
    pub histograms: BTreeMap<String, Histogram>,
}

impl HistogramSet {
    /// Set booked with the distributions of a family.
    pub fn booked(family: HistogramFamily) -> Self {
        Self {
            entries: 0,
            histograms: family.book(),
        }
    }

    /// Fills one named distribution.
    pub fn fill(&mut self, name: &str, value: f64) -> Result<(), AnaError> {
        let histogram = self.histograms.get_mut(name).ok_or_else(|| {
            AnaError::Stage(
                ErrorInfo::new("unknown_histogram", "histogram was not booked")
                    .with_context("name", name),
            )
        })?;
        histogram.fill(value);
        Ok(())
    }

    /// Distribution by name.
    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    /// Adds another set with the same booking.
    pub fn merge(&mut self, other: &HistogramSet) -> Result<(), AnaError> {
        for (name, histogram) in &other.histograms {
            match self.histograms.get_mut(name) {
                Some(existing) => existing.merge(histogram)?,
                None => {
                    self.histograms.insert(name.clone(), histogram.clone());
                }
            }
        }
        self.entries += other.entries;
        Ok(())
    }
}

/// Where histogram artefacts of one run are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    /// Output directory.
    pub dir: PathBuf,
    /// Sample name used as file prefix.
    pub sample: String,
}

impl ArtifactLayout {
    /// Layout writing `<dir>/<sample>_<label>.json`.
    pub fn new(dir: impl Into<PathBuf>, sample: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            sample: sample.into(),
        }
    }

    /// Artefact path for a stage label.
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}_{label}.json", self.sample))
    }
}

/// Histogramming stage of one [`HistogramFamily`].
#[derive(Debug, Clone)]
pub struct HistogramStage {
    label: String,
    family: HistogramFamily,
    set: HistogramSet,
    artifact: Option<PathBuf>,
    finalized: bool,
}

impl HistogramStage {
    /// Stage with the given label that publishes nothing.
    pub fn new(family: HistogramFamily, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            family,
            set: HistogramSet::booked(family),
            artifact: None,
            finalized: false,
        }
    }

    /// Publishes the snapshot under `layout` when the run completes.
    pub fn with_artifacts(mut self, layout: &ArtifactLayout) -> Self {
        self.artifact = Some(layout.path_for(&self.label));
        self
    }
}

impl Histogrammer for HistogramStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn observe(&mut self, record: &EventRecord) -> Result<(), AnaError> {
        self.set.entries += 1;
        self.family.fill(&mut self.set, record)
    }

    fn entries(&self) -> u64 {
        self.set.entries
    }

    fn snapshot(&self) -> &HistogramSet {
        &self.set
    }

    fn finalize(&mut self, status: RunStatus) -> Result<(), AnaError> {
        if self.finalized {
            return Err(AnaError::Stage(
                ErrorInfo::new("finalize_twice", "histogrammer finalized more than once")
                    .with_context("stage", &self.label),
            ));
        }
        self.finalized = true;
        match (status, &self.artifact) {
            (RunStatus::Completed, Some(path)) => {
                write_json_atomic(path, &self.set)?;
                tracing::debug!(
                    stage = %self.label,
                    path = %path.display(),
                    "histogram artefact written"
                );
            }
            _ => {
                tracing::debug!(stage = %self.label, %status, "histogram artefact not published");
            }
        }
        Ok(())
    }
}
