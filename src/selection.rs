//! Object-level photon cuts
//!
//! Each cut removes the failing candidates. An event survives a cut if
//! at least two candidates remain. The survivors are then ordered by
//! corrected transverse momentum and the first two form the diphoton
//! pair.
use crate::corrections::CorrectedPhoton;

/// Object quality bits marking bad calorimeter cells in the cluster
pub const OQ_BAD_BITS: u32 = 0x85a6;
/// Object quality bit for out-of-time clusters
pub const LARBITS_OUTOFTIME_CLUSTER: u32 = 1 << 26;
/// Object quality bit requesting the photon cleaning criteria
pub const LARBITS_PHOTON_CLEANING: u32 = 1 << 27;

/// Minimum corrected transverse momentum
pub const MIN_PT: f64 = 25e3;
/// Start of the barrel-endcap crack in |η|
pub const CRACK_LOW: f64 = 1.37;
/// End of the barrel-endcap crack in |η|
pub const CRACK_HIGH: f64 = 1.52;
/// Maximum |η|
pub const MAX_ETA: f64 = 2.37;

/// A named cut on individual photons
#[derive(Copy, Clone)]
pub struct ObjectCut {
    pub name: &'static str,
    /// Whether the photon fails the cut
    pub rejects: fn(&CorrectedPhoton) -> bool,
    /// Reject the event outright if the current diphoton pair fails
    pub leading_pair_must_pass: bool,
}

impl std::fmt::Debug for ObjectCut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCut")
            .field("name", &self.name)
            .field("leading_pair_must_pass", &self.leading_pair_must_pass)
            .finish()
    }
}

fn low_pt(ph: &CorrectedPhoton) -> bool {
    ph.pt() <= MIN_PT
}

fn bad_eta(ph: &CorrectedPhoton) -> bool {
    let aeta = ph.raw().etas2.abs();
    (CRACK_LOW..=CRACK_HIGH).contains(&aeta) || aeta >= MAX_ETA
}

fn bad_oq(ph: &CorrectedPhoton) -> bool {
    ph.raw().oq & OQ_BAD_BITS != 0
}

fn unclean(ph: &CorrectedPhoton) -> bool {
    let raw = ph.raw();
    raw.oq & LARBITS_PHOTON_CLEANING != 0
        && (raw.reta > 0.98
            || raw.rphi > 1.0
            || raw.oq & LARBITS_OUTOFTIME_CLUSTER != 0)
}

fn not_loose(ph: &CorrectedPhoton) -> bool {
    !ph.loose()
}

fn not_tight(ph: &CorrectedPhoton) -> bool {
    !ph.tight()
}

fn not_isolated(ph: &CorrectedPhoton) -> bool {
    !ph.is_isolated()
}

/// Cuts before the preselection checkpoint
pub const PRESELECTION_CUTS: [ObjectCut; 5] = [
    ObjectCut {
        name: "4_pt",
        rejects: low_pt,
        leading_pair_must_pass: false,
    },
    ObjectCut {
        name: "5_eta",
        rejects: bad_eta,
        leading_pair_must_pass: false,
    },
    ObjectCut {
        name: "6_oq",
        rejects: bad_oq,
        leading_pair_must_pass: false,
    },
    ObjectCut {
        name: "7_phclean",
        rejects: unclean,
        leading_pair_must_pass: false,
    },
    ObjectCut {
        name: "8_loose",
        rejects: not_loose,
        leading_pair_must_pass: false,
    },
];

/// Identification and isolation cuts after the preselection
pub const FINAL_CUTS: [ObjectCut; 2] = [
    ObjectCut {
        name: "9_tight",
        rejects: not_tight,
        leading_pair_must_pass: true,
    },
    ObjectCut {
        name: "10_iso",
        rejects: not_isolated,
        leading_pair_must_pass: true,
    },
];

/// Photon candidates surviving the cuts so far
///
/// Candidates are referred to by their position in the list of
/// corrected photons of the event.
#[derive(Clone, Debug)]
pub struct Candidates<'p, 'e> {
    photons: &'p [CorrectedPhoton<'e>],
    selected: Vec<usize>,
}

impl<'p, 'e> Candidates<'p, 'e> {
    /// All photons, ordered by corrected transverse momentum
    pub fn new(photons: &'p [CorrectedPhoton<'e>]) -> Self {
        let mut res = Self {
            photons,
            selected: (0..photons.len()).collect(),
        };
        res.sort();
        res
    }

    fn sort(&mut self) {
        let photons = self.photons;
        self.selected
            .sort_by(|&a, &b| photons[b].pt().total_cmp(&photons[a].pt()));
    }

    /// Positions of the surviving candidates
    #[cfg(test)]
    fn indices(&self) -> &[usize] {
        &self.selected
    }

    /// The candidate with the highest corrected transverse momentum
    pub fn lead(&self) -> Option<&CorrectedPhoton<'e>> {
        self.selected.first().map(|&idx| &self.photons[idx])
    }

    /// The candidate with the second-highest corrected transverse momentum
    pub fn sublead(&self) -> Option<&CorrectedPhoton<'e>> {
        self.selected.get(1).map(|&idx| &self.photons[idx])
    }

    /// Apply a cut
    ///
    /// Returns whether the event survives, i.e. at least two candidates
    /// are left. If the event does not survive, the candidates are in an
    /// unspecified state.
    pub fn apply(&mut self, cut: &ObjectCut) -> bool {
        if cut.leading_pair_must_pass {
            let (Some(lead), Some(sublead)) = (self.lead(), self.sublead()) else {
                return false;
            };
            if (cut.rejects)(lead) || (cut.rejects)(sublead) {
                return false;
            }
        }
        let photons = self.photons;
        self.selected.retain(|&idx| !(cut.rejects)(&photons[idx]));
        if self.selected.len() < 2 {
            return false;
        }
        self.sort();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibrations;
    use crate::corrections::compute_corrections;
    use crate::event::{Event, Photon};

    fn photon(cl_e: f64, etas2: f64) -> Photon {
        Photon {
            cl_e,
            etas2,
            loose: true,
            tight: true,
            ..Default::default()
        }
    }

    fn corrected<'a>(event: &Event, photons: &'a [Photon]) -> Vec<CorrectedPhoton<'a>> {
        let mut calib = Calibrations::default();
        photons
            .iter()
            .enumerate()
            .map(|(idx, ph)| compute_corrections(ph, event, idx, &mut calib))
            .collect()
    }

    #[test]
    fn pt_cut_leaves_two() {
        let event = Event::new();
        let photons = vec![photon(30e3, 0.), photon(20e3, 0.), photon(60e3, 0.)];
        let corrected = corrected(&event, &photons);
        let mut cands = Candidates::new(&corrected);
        assert_eq!(cands.indices(), &[2, 0, 1]);
        assert!(cands.apply(&PRESELECTION_CUTS[0]));
        assert_eq!(cands.indices().len(), 2);
        assert_eq!(cands.lead().unwrap().pt(), 60e3);
        assert_eq!(cands.sublead().unwrap().pt(), 30e3);
        assert_eq!(cands.indices(), &[2, 0]);
    }

    #[test]
    fn fewer_than_two_survivors() {
        let event = Event::new();
        let photons = vec![photon(30e3, 0.), photon(20e3, 0.), photon(25e3, 0.)];
        let corrected = corrected(&event, &photons);
        let mut cands = Candidates::new(&corrected);
        assert!(!cands.apply(&PRESELECTION_CUTS[0]));
    }

    #[test]
    fn eta_cut() {
        let event = Event::new();
        let photons = vec![
            photon(100e3, 1.37),
            photon(100e3, -1.45),
            photon(100e3, 1.52),
            photon(100e3, 2.37),
            photon(100e3, -1.53),
            photon(100e3, 2.36),
            photon(100e3, 0.),
        ];
        let corrected = corrected(&event, &photons);
        let rejected: Vec<_> = corrected.iter().map(bad_eta).collect();
        assert_eq!(rejected, [true, true, true, true, false, false, false]);
    }

    #[test]
    fn quality_cuts() {
        let event = Event::new();
        let mut clean = photon(100e3, 0.);
        clean.reta = 0.99;
        clean.rphi = 0.9;
        let mut unclean_reta = clean.clone();
        unclean_reta.oq = LARBITS_PHOTON_CLEANING;
        let mut out_of_time = photon(100e3, 0.);
        out_of_time.oq = LARBITS_PHOTON_CLEANING | LARBITS_OUTOFTIME_CLUSTER;
        let mut bad = photon(100e3, 0.);
        bad.oq = 0x2;
        let photons = vec![clean, unclean_reta, out_of_time, bad];
        let corrected = corrected(&event, &photons);
        let oq: Vec<_> = corrected.iter().map(bad_oq).collect();
        assert_eq!(oq, [false, false, false, true]);
        let cleaning: Vec<_> = corrected.iter().map(unclean).collect();
        assert_eq!(cleaning, [false, true, true, false]);
    }

    #[test]
    fn leading_pair_must_pass() {
        let event = Event::new();
        let mut not_tight = photon(80e3, 0.);
        not_tight.tight = false;
        let photons = vec![photon(100e3, 0.), not_tight, photon(60e3, 0.), photon(50e3, 0.)];
        let corrected = corrected(&event, &photons);
        let mut cands = Candidates::new(&corrected);
        assert!(!cands.apply(&FINAL_CUTS[0]));

        // without the requirement the non-tight photon is simply removed
        let mut cands = Candidates::new(&corrected);
        let relaxed = ObjectCut {
            leading_pair_must_pass: false,
            ..FINAL_CUTS[0]
        };
        assert!(cands.apply(&relaxed));
        assert_eq!(cands.indices(), &[0, 2, 3]);
    }
}
