use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::histogram::Axis;

/// Systematic variation of the SM diphoton k-factor
#[derive(
    Deserialize,
    Serialize,
    Copy,
    Clone,
    Debug,
    Default,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Hash,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KFactorVariant {
    #[default]
    Nominal,
    /// Nominal plus one standard deviation
    Up,
    /// Nominal minus one standard deviation
    Down,
    /// Always one
    Off,
}

/// Binning of the k-factor curve in GeV
const KFACTOR_AXIS: Axis = Axis::new(13, 0., 1300.);

/// NLO/LO k-factor for SM diphoton production vs. true diphoton mass
///
/// DIPHOX NLO with MSTW2008 PDFs and a 7 GeV isolation cut. The first
/// entry is the underflow, the last the overflow.
const KFACTOR: [(f64, f64); 15] = [
    (0.77524548769, 0.193811371922),
    (0.77524548769, 0.193811371922),
    (1.61900544167, 0.404751360416),
    (1.64430201054, 0.411075502634),
    (1.49268329144, 0.373170822859),
    (1.44546496868, 0.36136624217),
    (1.31024003029, 0.327560007572),
    (1.28618884087, 0.321547210217),
    (1.16020214558, 0.290050536394),
    (1.09157836437, 0.272894591093),
    (1.06538069248, 0.26634517312),
    (1.01491463184, 0.253728657961),
    (0.994816064835, 0.248704016209),
    (0.977248132229, 0.244312033057),
    (1., 0.20),
];

/// k-factor and its uncertainty for the given true mass in MeV
pub fn kfactor(true_mass: f64) -> (f64, f64) {
    KFACTOR[KFACTOR_AXIS.bin(true_mass / 1e3)]
}

/// Event weight for the given true mass in MeV
pub fn weight(true_mass: f64, variant: KFactorVariant) -> f64 {
    let (k, err) = kfactor(true_mass);
    match variant {
        KFactorVariant::Nominal => k,
        KFactorVariant::Up => k + err,
        KFactorVariant::Down => k - err,
        KFactorVariant::Off => 1.,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn bins() {
        assert_eq!(kfactor(50e3).0, 0.77524548769);
        assert_eq!(kfactor(150e3).0, 1.61900544167);
        assert_eq!(kfactor(1250e3).0, 0.977248132229);
        assert_eq!(kfactor(2000e3), (1., 0.20));
        // no true mass
        assert_eq!(kfactor(-999.).0, 0.77524548769);
    }

    #[test]
    fn variants() {
        let m = 450e3;
        assert_eq!(weight(m, KFactorVariant::Nominal), 1.44546496868);
        assert_eq!(weight(m, KFactorVariant::Up), 1.44546496868 + 0.36136624217);
        assert_eq!(weight(m, KFactorVariant::Down), 1.44546496868 - 0.36136624217);
        assert_eq!(weight(m, KFactorVariant::Off), 1.);
        assert_eq!(KFactorVariant::from_str("down"), Ok(KFactorVariant::Down));
        assert_eq!(KFactorVariant::Up.to_string(), "up");
    }
}
