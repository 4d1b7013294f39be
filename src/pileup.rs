use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use audec::auto_decompress;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::{compress_writer, Compression};
use crate::histogram::Axis;
use crate::traits::PileupReweight;

/// Binning of the average number of interactions per bunch crossing
pub const MU_AXIS: Axis = Axis::new(50, 0., 25.);

/// No pileup reweighting
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoPileupReweighting {}

impl PileupReweight for NoPileupReweighting {
    fn combined_weight(&mut self, _seed: u64, _run: u32, _channel: u32, _mu: f64) -> f64 {
        1.
    }
}

/// Distributions of the average number of interactions per crossing
///
/// Simulation profiles are kept per (run, channel). Data profiles use
/// channel 0.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PileupProfile {
    pub axis: Axis,
    pub profiles: BTreeMap<String, Vec<f64>>,
}

impl Default for PileupProfile {
    fn default() -> Self {
        Self::new(MU_AXIS)
    }
}

fn profile_key(run: u32, channel: u32) -> String {
    format!("{run}/{channel}")
}

impl PileupProfile {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            profiles: BTreeMap::new(),
        }
    }

    /// Add `weight` at the given `mu`
    ///
    /// Values outside the axis range are ignored.
    pub fn fill(&mut self, run: u32, channel: u32, weight: f64, mu: f64) {
        let nbins = self.axis.nbins;
        let Some(bin) = self.axis.inner_bin(mu) else {
            return;
        };
        let profile = self
            .profiles
            .entry(profile_key(run, channel))
            .or_insert_with(|| vec![0.; nbins]);
        profile[bin] += weight;
    }

    /// Fraction of the total weight of a profile in the bin containing `mu`
    pub fn fraction(&self, run: u32, channel: u32, mu: f64) -> Option<f64> {
        let profile = self.profiles.get(&profile_key(run, channel))?;
        let bin = self.axis.inner_bin(mu)?;
        let total: f64 = profile.iter().sum();
        if total == 0. {
            return None;
        }
        Some(profile[bin] / total)
    }

    /// Check that every profile has one entry per bin
    pub fn validate(&self) -> Result<(), PileupError> {
        let nbins = self.axis.nbins;
        for (key, profile) in &self.profiles {
            if profile.len() != nbins {
                return Err(PileupError::BinCount {
                    key: key.clone(),
                    expected: nbins,
                    found: profile.len(),
                });
            }
        }
        Ok(())
    }

    /// Add all profiles of `other`
    pub fn merge(&mut self, other: PileupProfile) -> Result<(), PileupError> {
        if self.axis != other.axis {
            return Err(PileupError::AxisMismatch(self.axis.clone(), other.axis));
        }
        other.validate()?;
        for (key, profile) in other.profiles {
            match self.profiles.get_mut(&key) {
                Some(mine) => {
                    for (m, o) in mine.iter_mut().zip(profile) {
                        *m += o;
                    }
                }
                None => {
                    self.profiles.insert(key, profile);
                }
            }
        }
        Ok(())
    }

    /// Read a profile from a (possibly compressed) YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PileupError> {
        let path = path.as_ref();
        debug!("Reading pileup profile from {path:?}");
        let file = File::open(path)?;
        let reader = auto_decompress(BufReader::new(file));
        let profile: PileupProfile = serde_yaml::from_reader(reader)?;
        profile.validate()?;
        info!("Read {} pileup profiles from {path:?}", profile.profiles.len());
        Ok(profile)
    }

    /// Write the profile as YAML
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        compression: Option<Compression>,
    ) -> Result<(), PileupError> {
        let file = File::create(path)?;
        let mut writer = compress_writer(file, compression)?;
        serde_yaml::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Reweight simulation to the data distribution of the average number
/// of interactions per crossing
///
/// The weight is the ratio of the data fraction to the simulation
/// fraction in the bin containing μ. Events in bins without simulation
/// or without data get weight zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileReweighting {
    mc: PileupProfile,
    data: PileupProfile,
}

/// Channel number under which data profiles are stored
pub const DATA_CHANNEL: u32 = 0;

impl ProfileReweighting {
    pub fn new(mc: PileupProfile, data: PileupProfile) -> Result<Self, PileupError> {
        if mc.axis != data.axis {
            return Err(PileupError::AxisMismatch(mc.axis, data.axis));
        }
        mc.validate()?;
        data.validate()?;
        Ok(Self { mc, data })
    }

    fn data_fraction(&self, mu: f64) -> Option<f64> {
        let bin = self.data.axis.inner_bin(mu)?;
        let mut in_bin = 0.;
        let mut total = 0.;
        for profile in self.data.profiles.values() {
            in_bin += profile[bin];
            total += profile.iter().sum::<f64>();
        }
        if total == 0. {
            None
        } else {
            Some(in_bin / total)
        }
    }
}

impl PileupReweight for ProfileReweighting {
    fn combined_weight(&mut self, _seed: u64, run: u32, channel: u32, mu: f64) -> f64 {
        let mc = match self.mc.fraction(run, channel, mu) {
            Some(f) if f > 0. => f,
            _ => return 0.,
        };
        self.data_fraction(mu).unwrap_or(0.) / mc
    }
}

#[derive(Debug, Error)]
pub enum PileupError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to (de)serialise pileup profile: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Binning of simulation ({0:?}) and data ({1:?}) pileup profiles differs")]
    AxisMismatch(Axis, Axis),
    #[error("Pileup profile {key} has {found} bins instead of {expected}")]
    BinCount {
        key: String,
        expected: usize,
        found: usize,
    },
}
