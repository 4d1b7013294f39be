use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use audec::auto_decompress;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::ScaleFactor;

/// Scale factor for unconverted photons with fudged shower shapes in
/// the forward region 1.81 < |η| < 2.37
///
/// Obtained by comparing fudged simulation to an extrapolation from
/// electrons.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ForwardFudgeScaleFactor {}

impl ForwardFudgeScaleFactor {
    fn unconverted_factor(pt_gev: f64) -> f64 {
        const BINS: [(f64, f64); 5] =
            [(25., 0.86), (30., 0.89), (35., 0.94), (40., 0.92), (45., 0.98)];
        BINS.iter()
            .find(|(upper, _)| pt_gev < *upper)
            .map(|(_, sf)| *sf)
            .unwrap_or(0.97)
    }
}

impl ScaleFactor for ForwardFudgeScaleFactor {
    fn scale_factor(&self, eta: f64, et: f64, is_converted: bool) -> (f64, f64) {
        let aeta = eta.abs();
        if !is_converted && 1.81 < aeta && aeta < 2.37 {
            (Self::unconverted_factor(et / 1e3), 0.)
        } else {
            (1., 0.)
        }
    }
}

/// Selects one table of binned scale factors
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ScaleFactorKey {
    /// Identification menu or trigger
    pub set: u32,
    /// Transverse energy range of the probes used in the measurement
    pub range: u32,
    /// Data and simulation release
    pub release: u32,
    /// Whether the dependence on transverse energy is corrected for
    pub et_correction: bool,
}

/// Scale factors in bins of pseudorapidity and transverse energy
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ScaleFactorTable {
    #[serde(flatten)]
    pub key: ScaleFactorKey,
    pub eta_edges: Vec<f64>,
    pub et_edges: Vec<f64>,
    /// Scale factors indexed by η bin, then E_T bin
    pub values: Vec<Vec<f64>>,
    /// Uncertainties with the same layout as `values`
    pub errors: Vec<Vec<f64>>,
}

/// Scale factors from a table selected by [ScaleFactorKey]
///
/// Outside the tabulated range the scale factor is one with zero
/// uncertainty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinnedScaleFactors {
    table: ScaleFactorTable,
}

impl BinnedScaleFactors {
    pub fn new(
        tables: Vec<ScaleFactorTable>,
        key: ScaleFactorKey,
    ) -> Result<Self, ScaleFactorError> {
        let table = tables
            .into_iter()
            .find(|t| t.key == key)
            .ok_or(ScaleFactorError::NoTable(key))?;
        let neta = table.eta_edges.len().saturating_sub(1);
        let net = table.et_edges.len().saturating_sub(1);
        let shape_ok = |v: &[Vec<f64>]| {
            v.len() == neta && v.iter().all(|row| row.len() == net)
        };
        let edges_sorted = |edges: &[f64]| edges.windows(2).all(|w| w[0] < w[1]);
        if !shape_ok(&table.values)
            || !shape_ok(&table.errors)
            || !edges_sorted(&table.eta_edges)
            || !edges_sorted(&table.et_edges)
        {
            return Err(ScaleFactorError::Malformed(key));
        }
        Ok(Self { table })
    }

    /// Read tables from a YAML file and select the one matching `key`
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        key: ScaleFactorKey,
    ) -> Result<Self, ScaleFactorError> {
        let path = path.as_ref();
        debug!("Reading scale factors from {path:?}");
        let file = File::open(path)?;
        let reader = auto_decompress(BufReader::new(file));
        let tables: Vec<ScaleFactorTable> = serde_yaml::from_reader(reader)?;
        Self::new(tables, key)
    }
}

fn find_bin(edges: &[f64], x: f64) -> Option<usize> {
    let pos = edges.partition_point(|edge| *edge <= x);
    if pos == 0 || pos == edges.len() {
        None
    } else {
        Some(pos - 1)
    }
}

impl ScaleFactor for BinnedScaleFactors {
    fn scale_factor(&self, eta: f64, et: f64, _is_converted: bool) -> (f64, f64) {
        let table = &self.table;
        let (Some(eta_bin), Some(et_bin)) = (
            find_bin(&table.eta_edges, eta),
            find_bin(&table.et_edges, et),
        ) else {
            return (1., 0.);
        };
        (table.values[eta_bin][et_bin], table.errors[eta_bin][et_bin])
    }
}

#[derive(Debug, Error)]
pub enum ScaleFactorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse scale factor tables: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("No scale factor table for {0:?}")]
    NoTable(ScaleFactorKey),
    #[error("Inconsistent binning in scale factor table {0:?}")]
    Malformed(ScaleFactorKey),
}
