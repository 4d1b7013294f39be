//! Slim events for later analysis passes
//!
//! The filter optionally drops soft reconstructed photons and then keeps
//! only the truth particles and trigger records that are still of
//! interest. Cross references of the surviving photons are renumbered
//! to the pruned lists.
use std::collections::HashSet;
use std::convert::Infallible;

use log::trace;

use crate::event::{Event, Photon, TruthParticle, NO_INDEX};
use crate::traits::ProcessEvent;

/// Minimum transverse momentum of kept reconstructed photons
pub const MIN_PHOTON_PT: f64 = 20e3;
/// Truth particles above this transverse momentum are always kept
pub const MIN_TRUTH_PT: f64 = 20e3;

fn interesting(particle: &TruthParticle) -> bool {
    particle.is_graviton() || particle.is_hard_process_photon() || particle.pt > MIN_TRUTH_PT
}

/// Map from old positions to new positions of the retained entries
fn renumber(keep: impl IntoIterator<Item = bool>) -> Vec<i32> {
    let mut next = 0;
    keep.into_iter()
        .map(|keep| {
            if keep {
                next += 1;
                next - 1
            } else {
                NO_INDEX
            }
        })
        .collect()
}

/// Rewrite an index with the given map
fn remap(index: i32, map: &[i32]) -> i32 {
    usize::try_from(index)
        .ok()
        .and_then(|idx| map.get(idx).copied())
        .unwrap_or(NO_INDEX)
}

/// Return a pruned copy of `event`
///
/// With `filter_reco_photons`, reconstructed photons below
/// [MIN_PHOTON_PT] are dropped and only truth references of
/// `truth_matched` photons count towards keeping truth particles.
/// Kept photons remember their position in the input event.
///
/// A truth particle is kept if a kept photon refers to it, if it is
/// interesting (graviton, hard-process photon, or above [MIN_TRUTH_PT]),
/// or if it is a parent of an interesting particle. A trigger record is
/// kept if a kept photon refers to it. All indices of the kept photons
/// point to the same records as before, or are unset if the record was
/// dropped.
pub fn prune_event(event: &Event, filter_reco_photons: bool) -> Event {
    let photons: Vec<Photon> = if filter_reco_photons {
        event
            .photons
            .iter()
            .enumerate()
            .filter(|(_, ph)| ph.pt >= MIN_PHOTON_PT)
            .map(|(idx, ph)| Photon {
                original_index: Some(idx as u32),
                ..ph.clone()
            })
            .collect()
    } else {
        event.photons.clone()
    };

    let referenced_truth: HashSet<i32> = photons
        .iter()
        .filter(|ph| !filter_reco_photons || ph.truth_matched)
        .map(|ph| ph.truth_index)
        .filter(|&idx| idx != NO_INDEX)
        .collect();
    let referenced_ef: HashSet<i32> = photons
        .iter()
        .map(|ph| ph.ef_index)
        .filter(|&idx| idx != NO_INDEX)
        .collect();

    let interesting_parents: HashSet<i32> = event
        .truth_particles
        .iter()
        .filter(|p| interesting(p))
        .flat_map(|p| p.parents.iter().copied())
        .collect();

    let keep_truth: Vec<bool> = event
        .truth_particles
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            referenced_truth.contains(&(idx as i32))
                || interesting(p)
                || interesting_parents.contains(&p.barcode)
        })
        .collect();
    let truth_map = renumber(keep_truth.iter().copied());
    let ef_map = renumber(
        (0..event.ef_photons.len()).map(|idx| referenced_ef.contains(&(idx as i32))),
    );

    let truth_particles = event
        .truth_particles
        .iter()
        .zip(&keep_truth)
        .filter_map(|(p, &keep)| keep.then(|| p.clone()))
        .collect();
    let ef_photons = event
        .ef_photons
        .iter()
        .zip(&ef_map)
        .filter_map(|(ef, &idx)| (idx != NO_INDEX).then_some(*ef))
        .collect();

    let photons = photons
        .into_iter()
        .map(|ph| Photon {
            truth_index: remap(ph.truth_index, &truth_map),
            ef_index: remap(ph.ef_index, &ef_map),
            ..ph
        })
        .collect();

    Event {
        photons,
        truth_particles,
        ef_photons,
        ..event.clone()
    }
}

/// Event processor writing out pruned events
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Filter {
    filter_reco_photons: bool,
    nevents: u64,
}

impl Filter {
    pub fn new(filter_reco_photons: bool) -> Self {
        Self {
            filter_reco_photons,
            nevents: 0,
        }
    }

    /// Number of processed events
    pub fn nevents(&self) -> u64 {
        self.nevents
    }
}

impl ProcessEvent for Filter {
    type Output = Event;
    type Error = Infallible;

    fn process(&mut self, event: &Event) -> Result<Self::Output, Self::Error> {
        self.nevents += 1;
        let pruned = prune_event(event, self.filter_reco_photons);
        trace!(
            "Event {}: kept {}/{} photons, {}/{} truth particles",
            event.event_number,
            pruned.photons.len(),
            event.photons.len(),
            pruned.truth_particles.len(),
            event.truth_particles.len()
        );
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EfPhoton, PDGID_GRAVITON};
    use particle_id::{sm_elementary_particles::gluon, ParticleID};

    fn photon(pt: f64, truth_index: i32, truth_matched: bool, ef_index: i32) -> Photon {
        Photon {
            pt,
            truth_index,
            truth_matched,
            ef_index,
            ..Default::default()
        }
    }

    fn ef(pt: f64) -> EfPhoton {
        EfPhoton {
            pt,
            ..Default::default()
        }
    }

    fn event() -> Event {
        Event {
            event_number: 7,
            truth_particles: vec![
                // 0: soft, referenced by the soft photon only
                TruthParticle::photon(5e3, 0., 0.),
                // 1: parent of the graviton
                TruthParticle::new(gluon, 1e3, 0., 0., 0.).barcode(11),
                // 2: soft, referenced by a hard unmatched photon
                TruthParticle::photon(3e3, 0., 0.).barcode(12),
                // 3: interesting
                TruthParticle::new(ParticleID::new(PDGID_GRAVITON), 0., 0., 0., 1e6)
                    .barcode(13)
                    .parents(vec![11]),
                // 4: soft, referenced by a matched hard photon
                TruthParticle::photon(8e3, 0., 0.).barcode(14),
                // 5: dropped
                TruthParticle::photon(1e3, 0., 0.).barcode(15),
            ],
            ef_photons: vec![ef(10e3), ef(30e3), ef(50e3)],
            photons: vec![
                photon(10e3, 0, true, 0),
                photon(40e3, 2, false, 2),
                photon(60e3, 4, true, 2),
                photon(50e3, 3, true, NO_INDEX),
            ],
            ..Default::default()
        }
    }

    fn assert_integrity(before: &Event, after: &Event) {
        for ph in &after.photons {
            let orig = &before.photons[ph.original_index.unwrap_or(0) as usize];
            if ph.truth_index != NO_INDEX {
                assert_eq!(
                    after.truth_particle(ph.truth_index),
                    before.truth_particle(orig.truth_index)
                );
            }
            if ph.ef_index != NO_INDEX {
                assert_eq!(
                    after.ef_photons[ph.ef_index as usize],
                    before.ef_photons[orig.ef_index as usize]
                );
            }
        }
    }

    #[test]
    fn filter_reco_photons() {
        let event = event();
        let pruned = prune_event(&event, true);
        let original: Vec<_> = pruned.photons.iter().map(|ph| ph.original_index).collect();
        assert_eq!(original, [Some(1), Some(2), Some(3)]);
        let barcodes: Vec<_> = pruned.truth_particles.iter().map(|p| p.barcode).collect();
        assert_eq!(barcodes, [11, 13, 14]);
        let truth: Vec<_> = pruned.photons.iter().map(|ph| ph.truth_index).collect();
        assert_eq!(truth, [NO_INDEX, 2, 1]);
        // both remaining references point to the same trigger record
        let ef_indices: Vec<_> = pruned.photons.iter().map(|ph| ph.ef_index).collect();
        assert_eq!(ef_indices, [0, 0, NO_INDEX]);
        assert_eq!(pruned.ef_photons, [ef(50e3)]);
        assert_eq!(pruned.event_number, 7);
        assert_integrity(&event, &pruned);
    }

    #[test]
    fn keep_all_photons() {
        let event = event();
        let pruned = prune_event(&event, false);
        assert_eq!(pruned.photons.len(), 4);
        assert!(pruned.photons.iter().all(|ph| ph.original_index.is_none()));
        let barcodes: Vec<_> = pruned.truth_particles.iter().map(|p| p.barcode).collect();
        assert_eq!(barcodes, [0, 11, 12, 13, 14]);
        let truth: Vec<_> = pruned.photons.iter().map(|ph| ph.truth_index).collect();
        assert_eq!(truth, [0, 2, 4, 3]);
        let ef_indices: Vec<_> = pruned.photons.iter().map(|ph| ph.ef_index).collect();
        assert_eq!(ef_indices, [0, 1, 1, NO_INDEX]);
        assert_eq!(pruned.ef_photons, [ef(10e3), ef(50e3)]);
        for (before, after) in event.photons.iter().zip(&pruned.photons) {
            if after.truth_index != NO_INDEX {
                assert_eq!(
                    pruned.truth_particle(after.truth_index),
                    event.truth_particle(before.truth_index)
                );
            }
        }
    }

    #[test]
    fn dangling_references_are_unset() {
        let mut event = event();
        event.photons[1].truth_index = 17;
        event.photons[2].ef_index = 5;
        let pruned = prune_event(&event, false);
        assert_eq!(pruned.photons[1].truth_index, NO_INDEX);
        assert_eq!(pruned.photons[2].ef_index, NO_INDEX);
    }

    #[test]
    fn processor() {
        let mut filter = Filter::new(true);
        let event = event();
        let pruned = filter.process(&event).unwrap();
        assert_eq!(pruned, prune_event(&event, true));
        assert_eq!(filter.nevents(), 1);
    }
}
