use crate::four_vector::FourVector;

use particle_id::{sm_elementary_particles::photon, ParticleID};
use serde::{Deserialize, Serialize};

/// PDG id of the Randall-Sundrum graviton
pub const PDGID_GRAVITON: i32 = 5000039;

/// Index value marking an unset cross reference
pub const NO_INDEX: i32 = -1;

/// Reconstructed collision event
///
/// Events are read-only inputs to the analysis. Derived quantities are
/// always computed into separate records.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Event {
    pub run_number: u32,
    pub mc_channel_number: u32,
    pub event_number: u32,
    pub lumi_block: u32,
    pub is_simulation: bool,
    /// Generator weight, only meaningful for simulation
    pub mc_event_weight: f64,
    /// Calorimeter data-quality error code
    pub lar_error: u32,
    pub actual_interactions: f64,
    pub average_interactions: f64,
    pub trigger: Trigger,
    pub photons: Vec<Photon>,
    pub truth_particles: Vec<TruthParticle>,
    pub ef_photons: Vec<EfPhoton>,
    pub primary_vertices: Vec<Vertex>,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            run_number: 0,
            mc_channel_number: 0,
            event_number: 0,
            lumi_block: 0,
            is_simulation: false,
            mc_event_weight: 1.,
            lar_error: 0,
            actual_interactions: 0.,
            average_interactions: 0.,
            trigger: Trigger::default(),
            photons: Vec::new(),
            truth_particles: Vec::new(),
            ef_photons: Vec::new(),
            primary_vertices: Vec::new(),
        }
    }
}

fn no_index() -> i32 {
    NO_INDEX
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// The truth particle at the position `index` refers to
    ///
    /// Negative indices and indices pointing beyond the (possibly
    /// skimmed) truth record yield `None`.
    pub fn truth_particle(&self, index: i32) -> Option<&TruthParticle> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.truth_particles.get(idx))
    }

    /// The truth particle with the given barcode
    pub fn truth_particle_by_barcode(&self, barcode: i32) -> Option<&TruthParticle> {
        self.truth_particles.iter().find(|p| p.barcode == barcode)
    }
}

/// Trigger decisions
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[serde(default)]
pub struct Trigger {
    /// Event filter diphoton trigger with 20 GeV thresholds
    pub ef_2g20_loose: bool,
}

/// Primary vertex
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Vertex {
    /// Position along the beam axis in mm
    pub z: f64,
    pub ntracks: u32,
}

/// Trigger-level photon
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct EfPhoton {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub e: f64,
}

/// Reconstructed photon candidate as written by the producer
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Photon {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    /// Pseudorapidity in the first calorimeter sampling
    pub etas1: f64,
    /// Pseudorapidity in the second calorimeter sampling
    pub etas2: f64,
    /// Pseudorapidity in the presampler
    pub etap: f64,

    pub cl_e: f64,
    pub cl_eta: f64,
    pub cl_phi: f64,
    pub cl_pt: f64,

    pub is_conv: bool,
    /// Object quality bits
    pub oq: u32,

    pub etcone40: f64,
    pub etcone40_ed_corrected: f64,

    pub ethad: f64,
    pub ethad1: f64,
    pub emaxs1: f64,
    pub emax2: f64,
    pub emins1: f64,
    pub e277: f64,
    pub reta: f64,
    pub rphi: f64,
    pub weta2: f64,
    pub f1: f64,
    pub fside: f64,
    pub wstot: f64,
    pub ws3: f64,

    // derived shower shapes, not always written by the producer
    pub rhad: Option<f64>,
    pub rhad1: Option<f64>,
    pub deltae: Option<f64>,
    pub eratio: Option<f64>,

    pub isem: u32,
    pub loose: bool,
    pub tight: bool,

    #[serde(default = "no_index")]
    pub truth_index: i32,
    pub truth_matched: bool,
    #[serde(default = "no_index")]
    pub ef_index: i32,
    /// Position in the original event before any filtering
    pub original_index: Option<u32>,
}

impl Default for Photon {
    fn default() -> Self {
        Self {
            pt: 0.,
            eta: 0.,
            phi: 0.,
            etas1: 0.,
            etas2: 0.,
            etap: 0.,
            cl_e: 0.,
            cl_eta: 0.,
            cl_phi: 0.,
            cl_pt: 0.,
            is_conv: false,
            oq: 0,
            etcone40: 0.,
            etcone40_ed_corrected: 0.,
            ethad: 0.,
            ethad1: 0.,
            emaxs1: 0.,
            emax2: 0.,
            emins1: 0.,
            e277: 0.,
            reta: 0.,
            rphi: 0.,
            weta2: 0.,
            f1: 0.,
            fside: 0.,
            wstot: 0.,
            ws3: 0.,
            rhad: None,
            rhad1: None,
            deltae: None,
            eratio: None,
            isem: 0,
            loose: false,
            tight: false,
            truth_index: NO_INDEX,
            truth_matched: false,
            ef_index: NO_INDEX,
            original_index: None,
        }
    }
}

/// Generator-level particle
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct TruthParticle {
    pub pdg_id: ParticleID,
    #[serde(default)]
    pub is_hard_process: bool,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    #[serde(default)]
    pub m: f64,
    #[serde(default)]
    pub barcode: i32,
    /// Barcodes of the parent particles
    #[serde(default)]
    pub parents: Vec<i32>,
}

impl TruthParticle {
    pub fn new(pdg_id: ParticleID, pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        Self {
            pdg_id,
            is_hard_process: false,
            pt,
            eta,
            phi,
            m,
            barcode: 0,
            parents: Vec::new(),
        }
    }

    /// A massless photon
    pub fn photon(pt: f64, eta: f64, phi: f64) -> Self {
        Self::new(photon, pt, eta, phi, 0.)
    }

    pub fn hard_process(mut self, is_hard_process: bool) -> Self {
        self.is_hard_process = is_hard_process;
        self
    }

    pub fn barcode(mut self, barcode: i32) -> Self {
        self.barcode = barcode;
        self
    }

    pub fn parents(mut self, parents: Vec<i32>) -> Self {
        self.parents = parents;
        self
    }

    pub fn is_graviton(&self) -> bool {
        self.pdg_id.id() == PDGID_GRAVITON
    }

    /// Photon from the simulated hard process
    pub fn is_hard_process_photon(&self) -> bool {
        self.is_hard_process && self.pdg_id == photon
    }

    pub fn momentum(&self) -> FourVector {
        FourVector::from_pt_eta_phi_m(self.pt, self.eta, self.phi, self.m)
    }
}
