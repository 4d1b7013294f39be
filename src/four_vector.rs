use serde::{Deserialize, Serialize};

/// A basic four-vector
///
/// The zero component is the energy/time component. The remainder are
/// the spatial components.
///
/// Components are plain `f64`: degenerate detector geometry is allowed
/// to produce NaN or infinite momenta, which then simply fail later
/// numeric comparisons.
#[derive(Deserialize, Serialize, PartialEq, PartialOrd, Debug, Clone, Copy, Default)]
pub struct FourVector {
    p: [f64; 4],
}

impl FourVector {
    /// Construct a new four-vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a four-vector from transverse momentum,
    /// pseudorapidity, azimuthal angle and energy
    pub fn from_pt_eta_phi_e(pt: f64, eta: f64, phi: f64, e: f64) -> Self {
        [e, pt * phi.cos(), pt * phi.sin(), pt * eta.sinh()].into()
    }

    /// Construct a four-vector from transverse momentum,
    /// pseudorapidity, azimuthal angle and invariant mass
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let pz = pt * eta.sinh();
        let e = (pt * pt + pz * pz + m * m).sqrt();
        [e, pt * phi.cos(), pt * phi.sin(), pz].into()
    }

    /// The energy component
    pub fn e(&self) -> f64 {
        self.p[0]
    }

    /// The spatial norm \sqrt{\sum v_i^2} with i = 1,2,3
    pub fn spatial_norm(&self) -> f64 {
        self.spatial_norm_sq().sqrt()
    }

    /// The square \sum v_i^2 with i = 1,2,3 of the spatial norm
    pub fn spatial_norm_sq(&self) -> f64 {
        self.p.iter().skip(1).map(|e| *e * *e).sum()
    }

    /// The scalar transverse momentum
    pub fn pt(&self) -> f64 {
        self.p[1].hypot(self.p[2])
    }

    /// The pseudorapidity
    pub fn eta(&self) -> f64 {
        (self.p[3] / self.pt()).asinh()
    }

    /// The azimuthal angle
    pub fn phi(&self) -> f64 {
        self.p[2].atan2(self.p[1])
    }

    const fn len() -> usize {
        4
    }

    /// The invariant mass \sqrt{v_0^2 - \sum v_i^2} with i = 1,2,3
    ///
    /// For space-like vectors this is `-\sqrt{-m^2}`.
    pub fn m(&self) -> f64 {
        let m_sq = self.m_sq();
        if m_sq < 0. {
            -(-m_sq).sqrt()
        } else {
            m_sq.sqrt()
        }
    }

    /// The invariant mass square v_0^2 - \sum v_i^2 with i = 1,2,3
    pub fn m_sq(&self) -> f64 {
        self.p[0] * self.p[0] - self.spatial_norm_sq()
    }
}

/// Cosine of the polar decay angle of a pair in the Collins-Soper frame
pub fn cos_theta_star(v1: &FourVector, v2: &FourVector) -> f64 {
    use std::f64::consts::FRAC_1_SQRT_2;
    let plus = |v: &FourVector| FRAC_1_SQRT_2 * (v[0] + v[3]);
    let minus = |v: &FourVector| FRAC_1_SQRT_2 * (v[0] - v[3]);
    let sum = *v1 + *v2;
    let m = sum.m();
    let pt = sum.pt();
    let cos = 2. * (plus(v1) * minus(v2) - minus(v1) * plus(v2))
        / (m * (m * m + pt * pt).sqrt());
    if sum[3] < 0. {
        -cos
    } else {
        cos
    }
}

/// Absolute cosine of the decay angle of a massless pair, estimated
/// from the pseudorapidity difference alone
pub fn abs_cos_theta_star_from_eta(eta1: f64, eta2: f64) -> f64 {
    ((eta1 - eta2) / 2.).tanh().abs()
}

impl std::convert::From<[f64; 4]> for FourVector {
    fn from(p: [f64; 4]) -> FourVector {
        FourVector { p }
    }
}

impl std::ops::Index<usize> for FourVector {
    type Output = f64;

    fn index(&self, i: usize) -> &Self::Output {
        &self.p[i]
    }
}

impl std::ops::AddAssign for FourVector {
    fn add_assign(&mut self, rhs: FourVector) {
        for i in 0..Self::len() {
            self.p[i] += rhs[i]
        }
    }
}

impl std::ops::SubAssign for FourVector {
    fn sub_assign(&mut self, rhs: FourVector) {
        for i in 0..Self::len() {
            self.p[i] -= rhs[i]
        }
    }
}

impl std::ops::Add for FourVector {
    type Output = Self;

    fn add(mut self, rhs: FourVector) -> Self::Output {
        self += rhs;
        self
    }
}

impl std::ops::Sub for FourVector {
    type Output = Self;

    fn sub(mut self, rhs: FourVector) -> Self::Output {
        self -= rhs;
        self
    }
}
