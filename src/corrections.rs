//! Photon candidate corrections
//!
//! Corrections are applied in the following order:
//!
//! 1. Energy scale correction (data) or energy smearing (simulation)
//! 2. Shower shape fudge factors (simulation)
//! 3. Identification from the fudged shower shapes (simulation)
//! 4. Leakage and ambient energy corrected isolation
//!
//! The persisted [Photon] is never modified. All corrected quantities
//! live in a [CorrectedPhoton], which can only be obtained from
//! [compute_corrections].
use crate::calibration::Calibrations;
use crate::event::{Event, Photon};

use serde::{Deserialize, Serialize};
use strum::Display;

/// Offset of the random seed for photon energy smearing
pub const SMEARING_SEED_OFFSET: u64 = 1771561;

/// Preselection category used for shower shape fudging
pub const FUDGE_PRESELECTION: u32 = 8;

/// Isolation cone size in units of 0.01 in ΔR
pub const ISOLATION_CONE: u32 = 40;

/// Maximum corrected isolation energy of isolated photons
pub const MAX_ISOLATION: f64 = 5e3;

/// Calorimeter region hint for the energy scale correction
#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq, Hash)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DetectorRegion {
    #[default]
    Photon,
}

/// Shower shape variables used for photon identification
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq)]
pub struct ShowerShapes {
    pub rhad: f64,
    pub rhad1: f64,
    pub e277: f64,
    pub reta: f64,
    pub rphi: f64,
    pub weta2: f64,
    pub f1: f64,
    pub fside: f64,
    pub wstot: f64,
    pub ws3: f64,
    pub deltae: f64,
    pub eratio: f64,
}

/// Shower shapes derived from the raw calorimeter quantities
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DerivedShowerShapes {
    pub rhad: f64,
    pub rhad1: f64,
    pub deltae: f64,
    pub eratio: f64,
}

/// Result of the photon identification
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct PhotonId {
    pub isem: u32,
    pub loose: bool,
    pub tight: bool,
}

/// Input to the isolation correction
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct IsolationInput {
    pub etcone40: f64,
    pub etcone40_ed_corrected: f64,
    pub energy: f64,
    pub etas2: f64,
    pub etap: f64,
    pub cl_eta: f64,
    pub cone_size: u32,
    pub is_mc: bool,
    pub is_conv: bool,
}

/// Derived shower shapes, keeping the values written by the producer
/// where they exist
pub fn derived_shower_shapes(ph: &Photon) -> DerivedShowerShapes {
    let et = ph.cl_e / ph.etas2.cosh();
    let strip_sum = ph.emaxs1 + ph.emax2;
    let eratio = if strip_sum.abs() > 0. {
        (ph.emaxs1 - ph.emax2) / strip_sum
    } else {
        0.
    };
    DerivedShowerShapes {
        rhad: ph.rhad.unwrap_or(ph.ethad / et),
        rhad1: ph.rhad1.unwrap_or(ph.ethad1 / et),
        deltae: ph.deltae.unwrap_or(ph.emax2 - ph.emins1),
        eratio: ph.eratio.unwrap_or(eratio),
    }
}

/// A copy of the photon with all derived shower shapes filled in
pub fn with_derived_shower_shapes(ph: &Photon) -> Photon {
    let derived = derived_shower_shapes(ph);
    Photon {
        rhad: Some(derived.rhad),
        rhad1: Some(derived.rhad1),
        deltae: Some(derived.deltae),
        eratio: Some(derived.eratio),
        ..ph.clone()
    }
}

/// Photon candidate with corrections applied for the current event
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectedPhoton<'a> {
    raw: &'a Photon,
    original_index: usize,
    e: f64,
    pt: f64,
    id: PhotonId,
    isolation: f64,
}

/// Apply all corrections to a photon candidate
///
/// `original_index` is the position of the photon in the unfiltered
/// event and determines the random seed for the energy smearing.
pub fn compute_corrections<'a>(
    photon: &'a Photon,
    event: &Event,
    original_index: usize,
    calib: &mut Calibrations,
) -> CorrectedPhoton<'a> {
    let derived = derived_shower_shapes(photon);
    let mut shapes = ShowerShapes {
        rhad: derived.rhad,
        rhad1: derived.rhad1,
        e277: photon.e277,
        reta: photon.reta,
        rphi: photon.rphi,
        weta2: photon.weta2,
        f1: photon.f1,
        fside: photon.fside,
        wstot: photon.wstot,
        ws3: photon.ws3,
        deltae: derived.deltae,
        eratio: derived.eratio,
    };
    let mut id = PhotonId {
        isem: photon.isem,
        loose: photon.loose,
        tight: photon.tight,
    };
    let is_mc = event.is_simulation;

    let e = if is_mc {
        let seed = SMEARING_SEED_OFFSET
            + u64::from(event.event_number)
            + 10 * original_index as u64;
        let factor = calib
            .rescaler
            .smearing_factor(seed, photon.cl_eta, photon.cl_e);
        photon.cl_e * factor
    } else {
        calib.rescaler.energy_correction(
            photon.cl_eta,
            photon.cl_phi,
            photon.cl_e,
            photon.cl_e / photon.cl_eta.cosh(),
            DetectorRegion::Photon,
        )
    };

    let pt = e / photon.etas2.cosh();
    shapes.rhad = photon.ethad / pt;
    shapes.rhad1 = photon.ethad1 / pt;

    if is_mc {
        calib.fudge.fudge(
            pt,
            photon.etas2,
            photon.is_conv,
            FUDGE_PRESELECTION,
            &mut shapes,
        );
        id = calib
            .identification
            .identify(pt, photon.etas2, &shapes, photon.is_conv, id);
    }

    let isolation = calib.isolation.corrected_isolation(&IsolationInput {
        etcone40: photon.etcone40,
        etcone40_ed_corrected: photon.etcone40_ed_corrected,
        energy: e,
        etas2: photon.etas2,
        etap: photon.etap,
        cl_eta: photon.cl_eta,
        cone_size: ISOLATION_CONE,
        is_mc,
        is_conv: photon.is_conv,
    });

    CorrectedPhoton {
        raw: photon,
        original_index,
        e,
        pt,
        id,
        isolation,
    }
}

impl<'a> CorrectedPhoton<'a> {
    /// The photon as written by the producer
    pub fn raw(&self) -> &'a Photon {
        self.raw
    }

    pub fn original_index(&self) -> usize {
        self.original_index
    }

    /// Corrected energy
    pub fn e(&self) -> f64 {
        self.e
    }

    /// Corrected transverse momentum
    pub fn pt(&self) -> f64 {
        self.pt
    }

    pub fn loose(&self) -> bool {
        self.id.loose
    }

    pub fn tight(&self) -> bool {
        self.id.tight
    }

    /// Corrected isolation energy
    pub fn isolation(&self) -> f64 {
        self.isolation
    }

    pub fn is_isolated(&self) -> bool {
        self.isolation < MAX_ISOLATION
    }

    /// Identification scale factor for this photon
    pub fn scale_factor<S: crate::traits::ScaleFactor + ?Sized>(&self, sf: &S) -> f64 {
        let raw = self.raw;
        sf.scale_factor(raw.etas2, raw.cl_pt, raw.is_conv).0
    }
}
