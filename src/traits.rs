use crate::corrections::{DetectorRegion, IsolationInput, PhotonId, ShowerShapes};
use crate::event::Event;
use crate::histogram::{Axis, MetadataMismatch};

/// Photon energy scale (data) and resolution (simulation) corrections
pub trait EnergyRescale {
    /// Multiplicative smearing factor for simulated photons
    ///
    /// The same `seed` has to reproduce the same factor.
    fn smearing_factor(&mut self, seed: u64, cl_eta: f64, cl_e: f64) -> f64;

    /// Corrected energy for photons in data
    fn energy_correction(
        &self,
        cl_eta: f64,
        cl_phi: f64,
        cl_e: f64,
        et: f64,
        region: DetectorRegion,
    ) -> f64;
}

/// Shift simulated shower shapes to match data
pub trait ShowerFudge {
    fn fudge(
        &self,
        et: f64,
        eta2: f64,
        is_conv: bool,
        preselection: u32,
        shapes: &mut ShowerShapes,
    );
}

/// Photon identification from shower shapes
pub trait PhotonIdentify {
    /// `recorded` is the identification written by the producer
    fn identify(
        &self,
        et: f64,
        eta2: f64,
        shapes: &ShowerShapes,
        is_conv: bool,
        recorded: PhotonId,
    ) -> PhotonId;
}

/// Correct calorimeter isolation for leakage and ambient energy
pub trait IsolationCorrect {
    fn corrected_isolation(&self, input: &IsolationInput) -> f64;
}

/// Reweight simulation to the pileup conditions in data
pub trait PileupReweight {
    fn combined_weight(&mut self, seed: u64, run: u32, channel: u32, mu: f64) -> f64;
}

/// Data/simulation efficiency scale factors
pub trait ScaleFactor {
    /// Scale factor and its uncertainty
    fn scale_factor(&self, eta: f64, et: f64, is_converted: bool) -> (f64, f64);
}

/// Certified luminosity blocks
pub trait GoodRunsList {
    fn pass(&self, run: u32, lumi_block: u32) -> bool;
}

/// Sink for cutflow counters and histograms
///
/// All fills are weighted with the current event weight.
pub trait Record {
    /// Count the current event as having passed the named cut
    fn passed(&mut self, cut: &str);

    fn fill1(&mut self, path: &str, axis: Axis, x: f64);

    fn fill2(&mut self, path: &str, x_axis: Axis, y_axis: Axis, x: f64, y: f64);

    fn set_weight(&mut self, weight: f64);

    fn mul_weight(&mut self, factor: f64);

    fn weight(&self) -> f64;

    /// Account for an event of the given sample in the end-of-run metadata
    fn sample_event(
        &mut self,
        channel: u32,
        is_simulation: bool,
        mc_weight: f64,
    ) -> Result<(), MetadataMismatch>;
}

/// Process one event at a time
pub trait ProcessEvent {
    type Output;
    type Error;

    fn process(&mut self, event: &Event) -> Result<Self::Output, Self::Error>;
}

/// Progress indicator
pub trait Progress {
    /// Advance progress by `i`
    fn inc(&self, i: u64);
    /// Finish progress
    fn finish(&self);
}
