use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use audec::auto_decompress;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::{compress_writer, Compression};
use crate::cutflow::Cutflow;
use crate::traits::Record;

/// Uniform histogram binning
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Axis {
    pub nbins: usize,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "str::is_empty")]
    pub label: Cow<'static, str>,
}

impl Axis {
    pub const fn new(nbins: usize, min: f64, max: f64) -> Self {
        Self {
            nbins,
            min,
            max,
            label: Cow::Borrowed(""),
        }
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Cow::Borrowed(label);
        self
    }

    /// Bin width
    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.nbins as f64
    }

    /// Bin index including underflow (0) and overflow (`nbins + 1`)
    ///
    /// NaN ends up in the overflow bin.
    pub fn bin(&self, x: f64) -> usize {
        if x < self.min {
            0
        } else if x < self.max {
            let bin = ((x - self.min) / self.width()) as usize;
            1 + bin.min(self.nbins - 1)
        } else {
            self.nbins + 1
        }
    }

    /// Index of the bin containing `x`, not counting the underflow bin
    ///
    /// Returns `None` if `x` is outside the axis range.
    pub fn inner_bin(&self, x: f64) -> Option<usize> {
        match self.bin(x) {
            0 => None,
            bin if bin > self.nbins => None,
            bin => Some(bin - 1),
        }
    }

    fn same_binning(&self, other: &Axis) -> bool {
        self.nbins == other.nbins && self.min == other.min && self.max == other.max
    }
}

/// Weighted one-dimensional histogram with under- and overflow
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct H1 {
    pub axis: Axis,
    pub entries: u64,
    /// Sum of weights per bin, starting with the underflow
    pub sumw: Vec<f64>,
    /// Sum of squared weights per bin
    pub sumw2: Vec<f64>,
}

impl H1 {
    pub fn new(axis: Axis) -> Self {
        let nbins = axis.nbins + 2;
        Self {
            axis,
            entries: 0,
            sumw: vec![0.; nbins],
            sumw2: vec![0.; nbins],
        }
    }

    pub fn fill(&mut self, x: f64, weight: f64) {
        let bin = self.axis.bin(x);
        self.entries += 1;
        self.sumw[bin] += weight;
        self.sumw2[bin] += weight * weight;
    }

    /// Sum of weights in the bin containing `x`
    pub fn content_at(&self, x: f64) -> f64 {
        self.sumw[self.axis.bin(x)]
    }

    /// Sum of all weights, including under- and overflow
    pub fn integral(&self) -> f64 {
        self.sumw.iter().sum()
    }

    fn merge(&mut self, other: &H1) -> bool {
        if !self.axis.same_binning(&other.axis) {
            return false;
        }
        self.entries += other.entries;
        add_assign(&mut self.sumw, &other.sumw);
        add_assign(&mut self.sumw2, &other.sumw2);
        true
    }
}

/// Weighted two-dimensional histogram with under- and overflow
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct H2 {
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub entries: u64,
    /// Sum of weights, row-major in x
    pub sumw: Vec<f64>,
    pub sumw2: Vec<f64>,
}

impl H2 {
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        let nbins = (x_axis.nbins + 2) * (y_axis.nbins + 2);
        Self {
            x_axis,
            y_axis,
            entries: 0,
            sumw: vec![0.; nbins],
            sumw2: vec![0.; nbins],
        }
    }

    fn index(&self, x: f64, y: f64) -> usize {
        self.x_axis.bin(x) * (self.y_axis.nbins + 2) + self.y_axis.bin(y)
    }

    pub fn fill(&mut self, x: f64, y: f64, weight: f64) {
        let idx = self.index(x, y);
        self.entries += 1;
        self.sumw[idx] += weight;
        self.sumw2[idx] += weight * weight;
    }

    pub fn content_at(&self, x: f64, y: f64) -> f64 {
        self.sumw[self.index(x, y)]
    }

    fn merge(&mut self, other: &H2) -> bool {
        if !self.x_axis.same_binning(&other.x_axis)
            || !self.y_axis.same_binning(&other.y_axis)
        {
            return false;
        }
        self.entries += other.entries;
        add_assign(&mut self.sumw, &other.sumw);
        add_assign(&mut self.sumw2, &other.sumw2);
        true
    }
}

fn add_assign(lhs: &mut [f64], rhs: &[f64]) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l += r;
    }
}

/// Bookkeeping per simulated or data sample
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq)]
pub struct SampleMetadata {
    pub is_simulation: bool,
    /// Number of processed events
    pub events: u64,
    /// Sum of generator weights of all processed events
    pub sum_mc_weights: f64,
}

/// Histograms, cutflow and sample metadata of one analysis run
///
/// Histograms are booked on their first fill. Later fills of the same
/// path keep the binning of the first one.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct HistogramStore {
    #[serde(skip, default = "unit_weight")]
    weight: f64,
    pub cutflow: Cutflow,
    pub h1: BTreeMap<String, H1>,
    pub h2: BTreeMap<String, H2>,
    /// Sample metadata by channel number
    pub metadata: BTreeMap<u32, SampleMetadata>,
}

fn unit_weight() -> f64 {
    1.
}

impl Default for HistogramStore {
    fn default() -> Self {
        Self {
            weight: 1.,
            cutflow: Cutflow::new(),
            h1: BTreeMap::new(),
            h2: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }
}

impl HistogramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn h1(&self, path: &str) -> Option<&H1> {
        self.h1.get(path)
    }

    pub fn h2(&self, path: &str) -> Option<&H2> {
        self.h2.get(path)
    }

    /// Add an event of the given sample to the metadata
    pub fn count_sample_event(
        &mut self,
        channel: u32,
        is_simulation: bool,
        mc_weight: f64,
    ) -> Result<(), MetadataMismatch> {
        let entry = self.metadata.entry(channel).or_insert(SampleMetadata {
            is_simulation,
            ..Default::default()
        });
        if entry.is_simulation != is_simulation {
            return Err(MetadataMismatch { channel });
        }
        entry.events += 1;
        entry.sum_mc_weights += mc_weight;
        Ok(())
    }

    /// Add the contents of another store
    ///
    /// Histograms that only exist in `other` are copied. Histograms with
    /// inconsistent binning are an error.
    pub fn merge(&mut self, other: HistogramStore) -> Result<(), MergeError> {
        self.cutflow.merge(&other.cutflow);
        for (path, hist) in other.h1 {
            match self.h1.get_mut(&path) {
                Some(mine) => {
                    if !mine.merge(&hist) {
                        return Err(MergeError::Binning(path));
                    }
                }
                None => {
                    self.h1.insert(path, hist);
                }
            }
        }
        for (path, hist) in other.h2 {
            match self.h2.get_mut(&path) {
                Some(mine) => {
                    if !mine.merge(&hist) {
                        return Err(MergeError::Binning(path));
                    }
                }
                None => {
                    self.h2.insert(path, hist);
                }
            }
        }
        for (channel, meta) in other.metadata {
            let entry = self.metadata.entry(channel).or_insert(SampleMetadata {
                is_simulation: meta.is_simulation,
                ..Default::default()
            });
            if entry.is_simulation != meta.is_simulation {
                return Err(MetadataMismatch { channel }.into());
            }
            entry.events += meta.events;
            entry.sum_mc_weights += meta.sum_mc_weights;
        }
        Ok(())
    }

    /// Write as YAML
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        compression: Option<Compression>,
    ) -> Result<(), StoreIoError> {
        let path = path.as_ref();
        debug!("Writing histograms to {path:?}");
        let file = File::create(path)?;
        let mut writer = compress_writer(file, compression)?;
        serde_yaml::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a store written with [HistogramStore::write]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreIoError> {
        let file = File::open(path)?;
        let reader = auto_decompress(BufReader::new(file));
        Ok(serde_yaml::from_reader(reader)?)
    }
}

impl Record for HistogramStore {
    fn passed(&mut self, cut: &str) {
        self.cutflow.passed(cut, self.weight);
    }

    fn fill1(&mut self, path: &str, axis: Axis, x: f64) {
        let weight = self.weight;
        let hist = self
            .h1
            .entry(path.to_owned())
            .or_insert_with(|| H1::new(axis.clone()));
        if !hist.axis.same_binning(&axis) {
            warn!("Inconsistent binning for histogram {path}");
        }
        hist.fill(x, weight);
    }

    fn fill2(&mut self, path: &str, x_axis: Axis, y_axis: Axis, x: f64, y: f64) {
        let weight = self.weight;
        let hist = self
            .h2
            .entry(path.to_owned())
            .or_insert_with(|| H2::new(x_axis, y_axis));
        hist.fill(x, y, weight);
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn mul_weight(&mut self, factor: f64) {
        self.weight *= factor;
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn sample_event(
        &mut self,
        channel: u32,
        is_simulation: bool,
        mc_weight: f64,
    ) -> Result<(), MetadataMismatch> {
        self.count_sample_event(channel, is_simulation, mc_weight)
    }
}

/// The same channel was seen both as simulation and as data
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("Channel {channel} appears both as simulation and as data")]
pub struct MetadataMismatch {
    pub channel: u32,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Inconsistent binning for histogram {0}")]
    Binning(String),
    #[error(transparent)]
    Metadata(#[from] MetadataMismatch),
}

#[derive(Debug, Error)]
pub enum StoreIoError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to (de)serialise histograms: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXIS: Axis = Axis::new(4, 0., 2.);

    #[test]
    fn bins() {
        assert_eq!(AXIS.bin(-0.1), 0);
        assert_eq!(AXIS.bin(0.), 1);
        assert_eq!(AXIS.bin(0.49), 1);
        assert_eq!(AXIS.bin(0.5), 2);
        assert_eq!(AXIS.bin(1.99), 4);
        assert_eq!(AXIS.bin(2.), 5);
        assert_eq!(AXIS.bin(f64::NAN), 5);
        assert_eq!(AXIS.inner_bin(1.2), Some(2));
        assert_eq!(AXIS.inner_bin(2.), None);
        assert_eq!(AXIS.inner_bin(-1.), None);
    }

    #[test]
    fn weighted_fills() {
        let mut store = HistogramStore::new();
        store.set_weight(2.);
        store.fill1("x", AXIS, 0.7);
        store.mul_weight(0.5);
        store.fill1("x", AXIS, 0.8);
        store.fill1("x", AXIS, 5.);
        store.fill2("xy", AXIS, AXIS, 0.1, 1.9);
        store.passed("Total");
        let h = store.h1("x").unwrap();
        assert_eq!(h.entries, 3);
        assert_eq!(h.content_at(0.75), 3.);
        assert_eq!(h.sumw2[2], 5.);
        assert_eq!(h.content_at(10.), 1.);
        assert_eq!(h.integral(), 4.);
        assert_eq!(store.h2("xy").unwrap().content_at(0.2, 1.8), 1.);
        assert_eq!(store.cutflow.get("Total").unwrap().weighted, 1.);
    }

    #[test]
    fn merge_stores() {
        let mut a = HistogramStore::new();
        a.fill1("x", AXIS, 0.1);
        a.passed("Total");
        a.count_sample_event(105802, true, 0.5).unwrap();
        let mut b = HistogramStore::new();
        b.fill1("x", AXIS, 0.1);
        b.fill1("y", AXIS, 1.1);
        b.passed("Total");
        b.count_sample_event(105802, true, 1.5).unwrap();
        a.merge(b).unwrap();
        assert_eq!(a.h1("x").unwrap().content_at(0.1), 2.);
        assert_eq!(a.h1("y").unwrap().entries, 1);
        assert_eq!(a.cutflow.get("Total").unwrap().passed, 2);
        let meta = a.metadata[&105802];
        assert_eq!(meta.events, 2);
        assert_eq!(meta.sum_mc_weights, 2.);

        let mut c = HistogramStore::new();
        c.fill1("x", Axis::new(8, 0., 2.), 0.1);
        assert!(matches!(a.merge(c), Err(MergeError::Binning(_))));
    }

    #[test]
    fn metadata_mismatch() {
        let mut store = HistogramStore::new();
        store.count_sample_event(0, false, 1.).unwrap();
        assert_eq!(
            store.count_sample_event(0, true, 1.),
            Err(MetadataMismatch { channel: 0 })
        );
        let mut other = HistogramStore::new();
        other.count_sample_event(0, true, 1.).unwrap();
        assert!(matches!(
            store.merge(other),
            Err(MergeError::Metadata(MetadataMismatch { channel: 0 }))
        ));
    }

    #[test]
    fn write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hists.yaml.gz");
        let mut store = HistogramStore::new();
        store.fill1("sel_mgg", Axis::new(7000, 0., 7e6), 500e3);
        store.passed("Total");
        store.write(&path, Some(Compression::Gzip(6))).unwrap();
        let read = HistogramStore::from_file(&path).unwrap();
        assert_eq!(read, store);
        assert_eq!(read.weight(), 1.);
    }
}
