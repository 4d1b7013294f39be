use crate::corrections::CorrectedPhoton;
use crate::event::{Event, TruthParticle};

use log::debug;
use particle_id::sm_elementary_particles::gluon;

/// True mass when neither a resonance nor two hard-process photons exist
pub const NO_TRUE_MASS: f64 = -999.;

/// A truth particle together with its position in the truth record
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TruthRef<'a> {
    pub index: usize,
    pub particle: &'a TruthParticle,
}

/// The two leading hard-process photons
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HardProcessPair<'a> {
    pub lead: TruthRef<'a>,
    pub sublead: TruthRef<'a>,
}

/// Select the two hard-process photons with the largest transverse momenta
pub fn select_hard_process_photons(event: &Event) -> Option<HardProcessPair<'_>> {
    let mut photons: Vec<_> = event
        .truth_particles
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_hard_process_photon())
        .map(|(index, particle)| TruthRef { index, particle })
        .collect();
    if photons.len() < 2 {
        return None;
    }
    photons.sort_by(|a, b| b.particle.pt.total_cmp(&a.particle.pt));
    Some(HardProcessPair {
        lead: photons[0],
        sublead: photons[1],
    })
}

/// The first resonance in the truth record
pub fn resonance(event: &Event) -> Option<&TruthParticle> {
    event.truth_particles.iter().find(|p| p.is_graviton())
}

/// True invariant mass of the diphoton system
///
/// This is the resonance mass if there is one, otherwise the mass of the
/// hard-process photon pair, otherwise [NO_TRUE_MASS].
pub fn true_diphoton_mass(event: &Event, pair: Option<&HardProcessPair>) -> f64 {
    if let Some(resonance) = resonance(event) {
        return resonance.m;
    }
    match pair {
        Some(pair) => {
            (pair.lead.particle.momentum() + pair.sublead.particle.momentum()).m()
        }
        None => NO_TRUE_MASS,
    }
}

/// Reconstructed photons matched to the hard-process photons
///
/// The entries are positions in the list of corrected photons.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RecoMatch {
    pub lead: Option<usize>,
    pub sublead: Option<usize>,
}

impl RecoMatch {
    pub fn both(&self) -> bool {
        self.lead.is_some() && self.sublead.is_some()
    }

}

/// Match reconstructed photons to the hard-process photons
///
/// Among the photons pointing to a truth photon, the one with the
/// corrected transverse momentum closest to the truth value wins.
/// Candidates are scanned in order of decreasing raw transverse
/// momentum, so ties go to the harder photon. Truth indices outside the
/// truth record are skimmed photons and never match.
pub fn match_reco_to_truth(
    event: &Event,
    candidates: &[CorrectedPhoton],
    pair: &HardProcessPair,
) -> RecoMatch {
    let ntruth = event.truth_particles.len();
    let mut best: [Option<(usize, f64)>; 2] = [None, None];
    let targets = [pair.lead, pair.sublead];
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| candidates[b].raw().pt.total_cmp(&candidates[a].raw().pt));
    for idx in order {
        let ph = &candidates[idx];
        let truth_index = ph.raw().truth_index;
        let Ok(truth_index) = usize::try_from(truth_index) else {
            continue;
        };
        if truth_index >= ntruth {
            debug!(
                "Event {}: truth index {truth_index} of photon {idx} points beyond the {ntruth} truth particles",
                event.event_number
            );
            continue;
        }
        for (target, best) in targets.iter().zip(best.iter_mut()) {
            if target.index != truth_index {
                continue;
            }
            let dist = (ph.pt() - target.particle.pt).abs();
            match best {
                Some((_, best_dist)) if dist >= *best_dist => {}
                _ => *best = Some((idx, dist)),
            }
        }
    }
    RecoMatch {
        lead: best[0].map(|(idx, _)| idx),
        sublead: best[1].map(|(idx, _)| idx),
    }
}

/// Whether the resonance was produced from gluons
///
/// Undecided if there is no resonance or it has fewer than two parents.
pub fn gluon_origin(event: &Event) -> Option<bool> {
    let resonance = resonance(event)?;
    if resonance.parents.len() < 2 {
        return None;
    }
    let from_gluons = resonance.parents.iter().any(|&barcode| {
        event
            .truth_particle_by_barcode(barcode)
            .map(|p| p.pdg_id == gluon)
            .unwrap_or(false)
    });
    Some(from_gluons)
}
