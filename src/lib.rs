//! `diphoton` selects diphoton candidate events for resonance searches
//! in proton-proton collisions.
//!
//! Each reconstructed event passes through an ordered sequence of gates:
//! trigger, good runs list, primary vertex, photon object cuts, data
//! quality, an exclusion list, and a cut on the diphoton invariant mass.
//! Photon energies, shower shapes, identification, and isolation are
//! corrected before the selection. Simulated events are weighted with
//! generator weights, pileup weights, k-factors, and identification
//! scale factors. The result is a cutflow together with weighted
//! histograms.
//!
//! # How to use
//!
//! Build a [config::Configuration], then feed events from a
//! [reader::EventReader] to an [analysis::Analysis]. The collected
//! [histogram::HistogramStore] can be merged with those of other
//! workers and written to a file.
//!
//! ## Most relevant modules
//!
//! - [analysis] contains the selection and lists the gates
//! - [corrections] for photon calibration
//! - [truth] for hard-process photons and reco-truth matching
//! - [sample] for the classification of simulated samples
//! - [filter] for slimming events
//! - [reader] and [writer] for event input and output

/// The diphoton event selection
pub mod analysis;
/// Calibration services and constants
pub mod calibration;
/// Output compression
pub mod compression;
/// Analysis settings
pub mod config;
/// Photon corrections
pub mod corrections;
/// Ordered cut counters
pub mod cutflow;
/// Input event format
pub mod event;
/// Event exclusion lists
pub mod event_list;
/// Event slimming
pub mod filter;
/// Four-vector class
pub mod four_vector;
/// Calorimeter geometry and vertex-corrected kinematics
pub mod geometry;
/// Good runs lists
pub mod grl;
/// Weighted histograms and sample metadata
pub mod histogram;
/// SM diphoton k-factors
pub mod kfactor;
/// Pileup profiles and reweighting
pub mod pileup;
/// Selecting the event processor
pub mod processor;
/// Progress bar
pub mod progress_bar;
/// Event reader
pub mod reader;
/// Sample classification
pub mod sample;
/// Identification scale factors
pub mod scale_factor;
/// Photon object cuts
pub mod selection;
/// Common traits
pub mod traits;
/// Hard-process photons and truth matching
pub mod truth;
/// Event writer
pub mod writer;

mod parsing;

use lazy_static::lazy_static;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
lazy_static! {
    pub static ref VERSION_MAJOR: u32 =
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or_default();
    pub static ref VERSION_MINOR: u32 =
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or_default();
    pub static ref VERSION_PATCH: u32 =
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or_default();
}
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
