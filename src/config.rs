use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use audec::auto_decompress;
use log::info;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::calibration::CalibrationConstants;
use crate::event_list::EventList;
use crate::grl::NoGrl;
use crate::kfactor::KFactorVariant;
use crate::pileup::{PileupError, PileupProfile, ProfileReweighting};
use crate::processor::ProcessorKind;
use crate::scale_factor::{BinnedScaleFactors, ScaleFactorError, ScaleFactorKey};
use crate::traits::GoodRunsList;

/// Systematic variations
#[derive(
    Deserialize,
    Serialize,
    Copy,
    Clone,
    Debug,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Hash,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Systematic {
    /// No pileup reweighting
    Noprw,
}

/// Resolved analysis settings
///
/// The good runs list and exclusion list are shared between workers.
#[derive(Clone, TypedBuilder)]
pub struct Configuration {
    #[builder(default)]
    pub processor: ProcessorKind,
    #[builder(default = Arc::new(NoGrl {}) as Arc<dyn GoodRunsList + Send + Sync>)]
    pub grl: Arc<dyn GoodRunsList + Send + Sync>,
    /// Events vetoed by the `!ee` cut
    #[builder(default)]
    pub excluded_events: Option<Arc<EventList>>,
    #[builder(default)]
    pub do_pileup_reweighting: bool,
    #[builder(default)]
    pub do_sf_reweighting: bool,
    /// Only accept photons matched to the hard process in simulation
    #[builder(default)]
    pub require_mc_match: bool,
    /// Drop photons below 20 GeV in the filter
    #[builder(default)]
    pub filter_reco_photons: bool,
    /// Apply the transverse momentum window of sliced samples
    #[builder(default)]
    pub apply_pt_slice: bool,
    #[builder(default)]
    pub kfactor: KFactorVariant,
    #[builder(default)]
    pub systematic: Option<Systematic>,
    #[builder(default)]
    pub calibration: CalibrationSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Configuration {
    /// Whether simulated events get the pileup weight
    pub fn reweight_pileup(&self) -> bool {
        self.do_pileup_reweighting && self.systematic != Some(Systematic::Noprw)
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("processor", &self.processor)
            .field(
                "excluded_events",
                &self.excluded_events.as_ref().map(|l| l.len()),
            )
            .field("do_pileup_reweighting", &self.do_pileup_reweighting)
            .field("do_sf_reweighting", &self.do_sf_reweighting)
            .field("require_mc_match", &self.require_mc_match)
            .field("filter_reco_photons", &self.filter_reco_photons)
            .field("apply_pt_slice", &self.apply_pt_slice)
            .field("kfactor", &self.kfactor)
            .field("systematic", &self.systematic)
            .finish_non_exhaustive()
    }
}

/// Inputs for constructing the calibration services of a worker
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationSettings {
    pub constants: CalibrationConstants,
    pub pileup: Option<ProfileReweighting>,
    /// Scale factors replacing the forward fudge factors
    pub scale_factors: Option<BinnedScaleFactors>,
}

/// Files with calibration inputs
#[derive(Clone, Debug, Default)]
pub struct CalibrationFiles {
    /// YAML file with [CalibrationConstants]
    pub constants: Option<PathBuf>,
    /// Pileup profiles of the simulated samples
    pub pileup_mc: Option<PathBuf>,
    /// Pileup profiles of data
    pub pileup_data: Option<PathBuf>,
    /// Scale factor tables
    pub scale_factors: Option<PathBuf>,
    /// Scale factor table to use
    pub scale_factor_key: ScaleFactorKey,
}

impl CalibrationSettings {
    /// Read all given calibration inputs
    ///
    /// Pileup profiles have to be given for both simulation and data or
    /// not at all.
    pub fn from_files(files: &CalibrationFiles) -> Result<Self, ConfigError> {
        let constants = match &files.constants {
            Some(path) => read_constants(path)?,
            None => CalibrationConstants::default(),
        };
        let pileup = match (&files.pileup_mc, &files.pileup_data) {
            (Some(mc), Some(data)) => Some(ProfileReweighting::new(
                PileupProfile::from_file(mc)?,
                PileupProfile::from_file(data)?,
            )?),
            (None, None) => None,
            _ => return Err(ConfigError::IncompletePileup),
        };
        let scale_factors = files
            .scale_factors
            .as_ref()
            .map(|path| BinnedScaleFactors::from_file(path, files.scale_factor_key))
            .transpose()?;
        Ok(Self {
            constants,
            pileup,
            scale_factors,
        })
    }
}

fn read_constants(path: &Path) -> Result<CalibrationConstants, ConfigError> {
    let file = File::open(path)
        .map_err(|err| ConfigError::IoError(path.to_owned(), err))?;
    let constants = serde_yaml::from_reader(auto_decompress(BufReader::new(file)))
        .map_err(|err| ConfigError::Constants(path.to_owned(), err))?;
    info!("Read calibration constants from {path:?}");
    Ok(constants)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open {0:?}: {1}")]
    IoError(PathBuf, std::io::Error),
    #[error("Failed to read calibration constants from {0:?}: {1}")]
    Constants(PathBuf, serde_yaml::Error),
    #[error("Pileup reweighting needs both simulation and data profiles")]
    IncompletePileup,
    #[error("Failed to load pileup profiles: {0}")]
    Pileup(#[from] PileupError),
    #[error("Failed to load scale factors: {0}")]
    ScaleFactors(#[from] ScaleFactorError),
}
