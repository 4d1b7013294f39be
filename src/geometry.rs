//! Calorimeter geometry and vertex-corrected diphoton mass
//!
//! Photon directions are measured in the first sampling layer of the
//! electromagnetic calorimeter assuming the photon originates from the
//! detector centre. Here the direction is recomputed for the actual
//! primary vertex position along the beam axis.
use crate::four_vector::FourVector;

/// Boundary between barrel and endcap in |η| of the first sampling
pub const BARREL_ENDCAP_ETA: f64 = 1.5;

/// Energy, first-sampling pseudorapidity and azimuth of a photon
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct PhotonKinematics {
    /// Energy
    pub e: f64,
    /// Pseudorapidity in the first calorimeter sampling
    pub eta_s1: f64,
    /// Azimuthal angle
    pub phi: f64,
}

/// Radius (barrel) or signed z position (endcap) in millimetres of the
/// first calorimeter sampling at the given pseudorapidity
///
/// This is a polynomial fit to the calorimeter description. No guarding
/// against pathological input is done.
pub fn layer_one_radius_or_z(eta_s1: f64) -> f64 {
    let aeta = eta_s1.abs();
    if aeta < BARREL_ENDCAP_ETA {
        if aeta < 0.8 {
            1558.859292 - 4.990838 * aeta - 21.144279 * aeta * aeta
        } else {
            1522.775373 + 27.970192 * aeta - 21.104108 * aeta * aeta
        }
    } else {
        let z = 3790.671754;
        if eta_s1 < 0. {
            -z
        } else {
            z
        }
    }
}

/// Pseudorapidity of a photon seen from a vertex at `vertex_z`
pub fn corrected_eta(eta_s1: f64, vertex_z: f64) -> f64 {
    let (r, z) = if eta_s1.abs() < BARREL_ENDCAP_ETA {
        let r = layer_one_radius_or_z(eta_s1);
        (r, r * eta_s1.sinh())
    } else {
        let z = layer_one_radius_or_z(eta_s1);
        (z / eta_s1.sinh(), z)
    };
    ((z - vertex_z) / r).asinh()
}

/// Four-momentum of a massless photon originating from `vertex_z`
pub fn corrected_momentum(photon: &PhotonKinematics, vertex_z: f64) -> FourVector {
    let eta = corrected_eta(photon.eta_s1, vertex_z);
    let pt = photon.e / eta.cosh();
    FourVector::from_pt_eta_phi_e(pt, eta, photon.phi, photon.e)
}

/// Invariant mass of two photons originating from `vertex_z`
pub fn corrected_invariant_mass(
    lead: &PhotonKinematics,
    sublead: &PhotonKinematics,
    vertex_z: f64,
) -> f64 {
    let p1 = corrected_momentum(lead, vertex_z);
    let p2 = corrected_momentum(sublead, vertex_z);
    (p1 + p2).m()
}
