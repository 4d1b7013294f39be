use crate::config::CalibrationSettings;
use crate::corrections::{DetectorRegion, IsolationInput, PhotonId, ShowerShapes};
use crate::pileup::NoPileupReweighting;
use crate::scale_factor::ForwardFudgeScaleFactor;
use crate::traits::{
    EnergyRescale, IsolationCorrect, PhotonIdentify, PileupReweight,
    ScaleFactor, ShowerFudge,
};

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

/// All calibration services needed to correct photons and weight events
pub struct Calibrations {
    pub rescaler: Box<dyn EnergyRescale + Send>,
    pub fudge: Box<dyn ShowerFudge + Send>,
    pub identification: Box<dyn PhotonIdentify + Send>,
    pub isolation: Box<dyn IsolationCorrect + Send>,
    pub pileup: Box<dyn PileupReweight + Send>,
    pub scale_factor: Box<dyn ScaleFactor + Send>,
}

impl Default for Calibrations {
    fn default() -> Self {
        Self::new(&CalibrationSettings::default())
    }
}

impl Calibrations {
    /// Services for one worker
    pub fn new(settings: &CalibrationSettings) -> Self {
        let constants = &settings.constants;
        let pileup: Box<dyn PileupReweight + Send> = match &settings.pileup {
            Some(prw) => Box::new(prw.clone()),
            None => Box::new(NoPileupReweighting {}),
        };
        let scale_factor: Box<dyn ScaleFactor + Send> =
            match &settings.scale_factors {
                Some(sf) => Box::new(sf.clone()),
                None => Box::new(ForwardFudgeScaleFactor {}),
            };
        Self {
            rescaler: Box::new(GaussianRescaler::new(constants)),
            fudge: Box::new(NoFudge {}),
            identification: Box::new(RecordedPhotonId {}),
            isolation: Box::new(LeakageCorrectedIsolation::new(constants)),
            pileup,
            scale_factor,
        }
    }
}

/// Numeric calibration constants
///
/// These can be read from a YAML file. Missing entries take their
/// default values.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CalibrationConstants {
    /// Relative smearing of simulated photon energies for |η| < 1.37
    pub barrel_constant_term: f64,
    /// Relative smearing of simulated photon energies for |η| ≥ 1.37
    pub endcap_constant_term: f64,
    /// Energy scale corrections α in bins of cluster η, applied as E/(1+α)
    pub energy_scale: Vec<EtaBinValue>,
    /// Fraction of the photon transverse energy leaking into the
    /// isolation cone for unconverted photons, in bins of |η|
    pub leakage_unconverted: Vec<EtaBinValue>,
    /// Same as `leakage_unconverted`, for converted photons
    pub leakage_converted: Vec<EtaBinValue>,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            barrel_constant_term: 0.011,
            endcap_constant_term: 0.018,
            energy_scale: Vec::new(),
            leakage_unconverted: Vec::new(),
            leakage_converted: Vec::new(),
        }
    }
}

/// A value valid in the pseudorapidity range [`eta_low`, `eta_high`)
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq)]
pub struct EtaBinValue {
    pub eta_low: f64,
    pub eta_high: f64,
    pub value: f64,
}

/// Look up the value for `eta` in bins sorted by their lower edge
pub(crate) fn eta_bin_value(bins: &[EtaBinValue], eta: f64) -> Option<f64> {
    let pos = bins.partition_point(|b| b.eta_low <= eta);
    let bin = bins.get(pos.checked_sub(1)?)?;
    (eta < bin.eta_high).then_some(bin.value)
}

const CRACK_START: f64 = 1.37;

/// Gaussian energy smearing and binned energy scale corrections
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianRescaler {
    barrel_constant_term: f64,
    endcap_constant_term: f64,
    energy_scale: Vec<EtaBinValue>,
}

impl GaussianRescaler {
    pub fn new(constants: &CalibrationConstants) -> Self {
        let mut energy_scale = constants.energy_scale.clone();
        energy_scale.sort_by(|a, b| a.eta_low.total_cmp(&b.eta_low));
        Self {
            barrel_constant_term: constants.barrel_constant_term,
            endcap_constant_term: constants.endcap_constant_term,
            energy_scale,
        }
    }
}

impl EnergyRescale for GaussianRescaler {
    fn smearing_factor(&mut self, seed: u64, cl_eta: f64, _cl_e: f64) -> f64 {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let sigma = if cl_eta.abs() < CRACK_START {
            self.barrel_constant_term
        } else {
            self.endcap_constant_term
        };
        let z: f64 = rng.sample(StandardNormal);
        1. + sigma * z
    }

    fn energy_correction(
        &self,
        cl_eta: f64,
        _cl_phi: f64,
        cl_e: f64,
        _et: f64,
        _region: DetectorRegion,
    ) -> f64 {
        match eta_bin_value(&self.energy_scale, cl_eta) {
            Some(alpha) => cl_e / (1. + alpha),
            None => cl_e,
        }
    }
}

/// Leave shower shapes unchanged
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoFudge {}

impl ShowerFudge for NoFudge {
    fn fudge(
        &self,
        _et: f64,
        _eta2: f64,
        _is_conv: bool,
        _preselection: u32,
        _shapes: &mut ShowerShapes,
    ) {
    }
}

/// Keep the identification decision written by the producer
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RecordedPhotonId {}

impl PhotonIdentify for RecordedPhotonId {
    fn identify(
        &self,
        _et: f64,
        _eta2: f64,
        _shapes: &ShowerShapes,
        _is_conv: bool,
        recorded: PhotonId,
    ) -> PhotonId {
        recorded
    }
}

/// Ambient-energy corrected isolation with photon leakage subtracted
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeakageCorrectedIsolation {
    unconverted: Vec<EtaBinValue>,
    converted: Vec<EtaBinValue>,
}

impl LeakageCorrectedIsolation {
    pub fn new(constants: &CalibrationConstants) -> Self {
        let sorted = |bins: &[EtaBinValue]| {
            let mut bins = bins.to_vec();
            bins.sort_by(|a, b| a.eta_low.total_cmp(&b.eta_low));
            bins
        };
        Self {
            unconverted: sorted(&constants.leakage_unconverted),
            converted: sorted(&constants.leakage_converted),
        }
    }
}

impl IsolationCorrect for LeakageCorrectedIsolation {
    fn corrected_isolation(&self, input: &IsolationInput) -> f64 {
        let bins = if input.is_conv {
            &self.converted
        } else {
            &self.unconverted
        };
        let et = input.energy / input.etas2.cosh();
        let leakage = eta_bin_value(bins, input.etas2.abs()).unwrap_or(0.);
        input.etcone40_ed_corrected - leakage * et
    }
}
