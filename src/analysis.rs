//! The diphoton event selection
//!
//! Each event walks through an ordered sequence of gates and stops at
//! the first one it fails. Every passed gate is counted in the cutflow
//! with the current event weight. The weight starts at one and, for
//! simulation, is multiplied by the generator weight, the pileup weight,
//! the SM diphoton k-factor, and after the preselection the photon
//! identification scale factors.
//!
//! Events count as simulation for all truth-related steps if they have
//! truth particles. The `is_simulation` flag of the event decides about
//! the corrections and the good runs list.
use log::{debug, trace, warn};
use thiserror::Error;

use crate::calibration::Calibrations;
use crate::config::Configuration;
use crate::corrections::{compute_corrections, CorrectedPhoton};
use crate::event::Event;
use crate::four_vector::{abs_cos_theta_star_from_eta, cos_theta_star, FourVector};
use crate::geometry::{corrected_invariant_mass, corrected_momentum, PhotonKinematics};
use crate::histogram::{Axis, HistogramStore, MetadataMismatch};
use crate::kfactor;
use crate::sample::{SampleClassifier, SampleContext};
use crate::selection::{Candidates, ObjectCut, FINAL_CUTS, PRESELECTION_CUTS};
use crate::traits::{ProcessEvent, Record};
use crate::truth::{
    gluon_origin, match_reco_to_truth, select_hard_process_photons,
    true_diphoton_mass, HardProcessPair, RecoMatch,
};

pub const TOTAL: &str = "Total";
pub const PT_SLICE: &str = "pt_slice";
pub const MASS_WINDOW: &str = "mass_window";
pub const HARD_PROCESS: &str = "Hardproc 2γ";
pub const TRIGGER: &str = "2g20_loose";
pub const GRL: &str = "GRL";
pub const PRIMARY_VERTEX: &str = "PV";
pub const RECO: &str = "Reco 2γ";
pub const PRESELECTION: &str = "preselection";
pub const LAR_OK: &str = "LarOK";
pub const NOT_EXCLUDED: &str = "!ee";
pub const MASS_CUT: &str = "mgg140";

/// Minimum number of tracks of a good primary vertex
pub const MIN_VERTEX_TRACKS: u32 = 3;
/// Maximum accepted calorimeter error code
pub const MAX_LAR_ERROR: u32 = 1;
/// Minimum reconstructed diphoton mass
pub const MIN_MGG: f64 = 140e3;

const MGG_AXIS: Axis = Axis::new(7000, 0., 7e6);
const PT_AXIS: Axis = Axis::new(3000, 0., 3e6);
const ETA_AXIS: Axis = Axis::new(100, -2.5, 2.5);
const MU_AXIS: Axis = Axis::new(120, 0., 30.);
const PILEUP_WEIGHT_AXIS: Axis = Axis::new(100, 0., 2.);
const CTS_AXIS: Axis = Axis::new(100, -1., 1.);
const ABS_CTS_AXIS: Axis = Axis::new(100, 0., 1.);

/// Result of processing a single event
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ProcessOutcome {
    /// The event passed all gates
    Selected,
    /// The event failed the named gate
    Rejected(&'static str),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Metadata(#[from] MetadataMismatch),
}

/// Generator-level information of the current event
#[derive(Copy, Clone, Debug)]
struct Truth<'a> {
    is_mc: bool,
    pair: Option<HardProcessPair<'a>>,
    true_mgg: f64,
}

/// Event selection with cutflow and histogram bookkeeping
pub struct Analysis<R = HistogramStore> {
    config: Configuration,
    calib: Calibrations,
    classifier: SampleClassifier,
    store: R,
}

impl Analysis<HistogramStore> {
    pub fn new(config: Configuration) -> Self {
        let calib = Calibrations::new(&config.calibration);
        Self::with_calibrations(config, calib, HistogramStore::new())
    }
}

impl<R: Record> Analysis<R> {
    pub fn with_calibrations(config: Configuration, calib: Calibrations, store: R) -> Self {
        Self {
            config,
            calib,
            classifier: SampleClassifier::new(),
            store,
        }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn into_store(self) -> R {
        self.store
    }

    /// Number of times the (run, channel) pair changed
    pub fn sample_changes(&self) -> usize {
        self.classifier.changes()
    }

    pub fn process_event(&mut self, event: &Event) -> Result<ProcessOutcome, AnalysisError> {
        let outcome = self.select(event)?;
        if let ProcessOutcome::Rejected(gate) = outcome {
            trace!(
                "Event {} in run {} rejected by {gate}",
                event.event_number,
                event.run_number
            );
        }
        Ok(outcome)
    }

    fn select(&mut self, event: &Event) -> Result<ProcessOutcome, AnalysisError> {
        use ProcessOutcome::*;

        let ctx = *self.classifier.context_for(event);
        let is_mc = !event.truth_particles.is_empty();

        self.store.set_weight(1.);
        let mc_event_weight = finite_weight("generator", event.mc_event_weight, event);
        self.store.sample_event(
            event.mc_channel_number,
            event.is_simulation,
            mc_event_weight,
        )?;

        let pair = if is_mc {
            select_hard_process_photons(event)
        } else {
            None
        };
        let truth = Truth {
            is_mc,
            pair,
            true_mgg: true_diphoton_mass(event, pair.as_ref()),
        };

        let photons: Vec<_> = event
            .photons
            .iter()
            .enumerate()
            .map(|(pos, ph)| {
                let idx = ph.original_index.map(|i| i as usize).unwrap_or(pos);
                compute_corrections(ph, event, idx, &mut self.calib)
            })
            .collect();
        let matched = match &pair {
            Some(pair) => match_reco_to_truth(event, &photons, pair),
            None => RecoMatch::default(),
        };

        self.apply_event_weights(event, mc_event_weight, &ctx, &truth);

        self.store.passed(TOTAL);

        if is_mc && self.config.apply_pt_slice {
            if let (Some(window), Some(pair)) = (ctx.pt_slice, &pair) {
                if !window.contains(pair.lead.particle.pt) {
                    return Ok(Rejected(PT_SLICE));
                }
            }
        }
        if is_mc {
            if let Some(window) = ctx.mass_slice {
                if !window.contains(truth.true_mgg) {
                    return Ok(Rejected(MASS_WINDOW));
                }
            }
        }
        if is_mc && self.config.require_mc_match && pair.is_none() {
            return Ok(Rejected(HARD_PROCESS));
        }
        self.store.passed(HARD_PROCESS);
        self.eff_plot("0_total", false, &truth);

        if !event.trigger.ef_2g20_loose {
            return Ok(Rejected(TRIGGER));
        }
        self.store.passed(TRIGGER);
        self.eff_plot("1_trigger", false, &truth);

        if !event.is_simulation && !self.config.grl.pass(event.run_number, event.lumi_block) {
            return Ok(Rejected(GRL));
        }
        self.store.passed(GRL);

        let good_vertex = event
            .primary_vertices
            .iter()
            .any(|v| v.ntracks >= MIN_VERTEX_TRACKS);
        if !good_vertex {
            return Ok(Rejected(PRIMARY_VERTEX));
        }
        self.store.passed(PRIMARY_VERTEX);
        self.eff_plot("2_pv", true, &truth);

        if event.photons.len() < 2 {
            return Ok(Rejected(RECO));
        }
        if is_mc && self.config.require_mc_match && !matched.both() {
            return Ok(Rejected(RECO));
        }
        self.store.passed(RECO);
        self.eff_plot("3_reco", true, &truth);
        self.store.fill1("actualintperxing", MU_AXIS.with_label("μ"), event.actual_interactions);
        self.store.fill1("averageintperxing", MU_AXIS.with_label("μ"), event.average_interactions);

        let mut candidates = Candidates::new(&photons);
        for cut in &PRESELECTION_CUTS {
            if !self.object_cut(cut, &mut candidates, &photons, &matched, &truth) {
                return Ok(Rejected(cut.name));
            }
        }

        if is_mc && self.config.do_sf_reweighting {
            if let (Some(lead), Some(sublead)) = (candidates.lead(), candidates.sublead()) {
                let sf = &*self.calib.scale_factor;
                let weight = lead.scale_factor(sf) * sublead.scale_factor(sf);
                self.store
                    .mul_weight(finite_weight("scale factor", weight, event));
            }
        }
        self.store.passed(PRESELECTION);

        for cut in &FINAL_CUTS {
            if !self.object_cut(cut, &mut candidates, &photons, &matched, &truth) {
                return Ok(Rejected(cut.name));
            }
        }

        let (Some(lead), Some(sublead)) = (candidates.lead(), candidates.sublead()) else {
            return Ok(Rejected(FINAL_CUTS[FINAL_CUTS.len() - 1].name));
        };
        let vertex_z = event.primary_vertices.first().map(|v| v.z).unwrap_or_default();
        let lead = kinematics(lead);
        let sublead = kinematics(sublead);
        let mgg = corrected_invariant_mass(&lead, &sublead, vertex_z);

        self.store.fill1("sel_reco_mgg", MGG_AXIS, mgg);
        if is_mc {
            self.resolution_plots(mgg, truth.true_mgg);
        }

        if event.lar_error > MAX_LAR_ERROR {
            return Ok(Rejected(LAR_OK));
        }
        self.store.passed(LAR_OK);

        if let Some(excluded) = &self.config.excluded_events {
            if excluded.present(event.run_number, event.event_number) {
                debug!(
                    "Vetoing event {} in run {}",
                    event.event_number, event.run_number
                );
                return Ok(Rejected(NOT_EXCLUDED));
            }
        }
        self.store.passed(NOT_EXCLUDED);

        if mgg < MIN_MGG {
            return Ok(Rejected(MASS_CUT));
        }
        self.store.passed(MASS_CUT);
        self.eff_plot("11_mass", true, &truth);

        self.final_plots(event, &ctx, &lead, &sublead, vertex_z, mgg, truth.true_mgg);
        Ok(Selected)
    }

    fn apply_event_weights(
        &mut self,
        event: &Event,
        mc_event_weight: f64,
        ctx: &SampleContext,
        truth: &Truth,
    ) {
        let mut pileup_weight = 1.;
        if truth.is_mc && self.config.reweight_pileup() {
            let weight = self.calib.pileup.combined_weight(
                u64::from(event.event_number) + 1,
                event.run_number,
                event.mc_channel_number,
                event.average_interactions,
            );
            pileup_weight = finite_weight("pileup", weight, event);
        }
        self.store.fill1("pileup_weight", PILEUP_WEIGHT_AXIS, pileup_weight);

        if truth.is_mc {
            self.store.mul_weight(mc_event_weight);
            self.store.mul_weight(pileup_weight);
            if ctx.is_sm_diphoton {
                let k = kfactor::weight(truth.true_mgg, self.config.kfactor);
                self.store.mul_weight(k);
            }
        }
    }

    /// Apply an object cut and do the bookkeeping
    ///
    /// Returns whether the event survives.
    fn object_cut(
        &mut self,
        cut: &ObjectCut,
        candidates: &mut Candidates,
        photons: &[CorrectedPhoton],
        matched: &RecoMatch,
        truth: &Truth,
    ) -> bool {
        if !candidates.apply(cut) {
            return false;
        }
        if truth.is_mc {
            if self.config.require_mc_match {
                let matched_fails = [matched.lead, matched.sublead]
                    .into_iter()
                    .flatten()
                    .any(|idx| (cut.rejects)(&photons[idx]));
                if matched_fails {
                    return false;
                }
            }
            self.eff_plot(cut.name, true, truth);
        }
        self.store.passed(cut.name);
        true
    }

    /// Efficiency histograms as functions of true quantities
    ///
    /// The true mass histogram is always filled. The hard-process photon
    /// histograms only if requested and available.
    fn eff_plot(&mut self, name: &str, with_photons: bool, truth: &Truth) {
        self.store
            .fill1(&format!("eff/true_mgg/{name}"), MGG_AXIS, truth.true_mgg);
        if !with_photons || !truth.is_mc {
            return;
        }
        let Some(pair) = truth.pair else {
            return;
        };
        for (label, ph) in [("lead", pair.lead), ("sublead", pair.sublead)] {
            let ph = ph.particle;
            self.store
                .fill1(&format!("eff/true_{label}/pt/{name}"), PT_AXIS, ph.pt);
            self.store
                .fill1(&format!("eff/true_{label}/eta/{name}"), ETA_AXIS, ph.eta);
        }
    }

    fn resolution_plots(&mut self, mgg: f64, true_mgg: f64) {
        let true_axis = Axis::new(70, 0., 7e6).with_label("m_gg (true)");
        self.store.fill1("sel_true_mgg", MGG_AXIS, true_mgg);
        self.store.fill2(
            "sel_true_v_reco_mgg",
            true_axis.clone(),
            Axis::new(70, 0., 7e6).with_label("m_gg (reco)"),
            true_mgg,
            mgg,
        );
        self.store.fill2(
            "sel_true_v_reco_mgg_limited",
            Axis::new(400, 0., 2e6).with_label("m_gg (true)"),
            Axis::new(400, 0., 2e6).with_label("m_gg (reco)"),
            true_mgg,
            mgg,
        );
        self.store.fill2(
            "sel_true_v_recores_mgg",
            true_axis.clone(),
            Axis::new(200, -100e3, 100e3).with_label("m_gg (reco) - m_gg (true)"),
            true_mgg,
            mgg - true_mgg,
        );
        self.store.fill2(
            "sel_true_v_recoresrel_mgg",
            true_axis,
            Axis::new(400, -0.1, 0.1)
                .with_label("(m_gg (reco) - m_gg (true)) / m_gg (true)"),
            true_mgg,
            (mgg - true_mgg) / true_mgg,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn final_plots(
        &mut self,
        event: &Event,
        ctx: &SampleContext,
        lead: &PhotonKinematics,
        sublead: &PhotonKinematics,
        vertex_z: f64,
        mgg: f64,
        true_mgg: f64,
    ) {
        let p1 = corrected_momentum(lead, vertex_z);
        let p2 = corrected_momentum(sublead, vertex_z);
        self.plot_diphoton("sel_", &p1, &p2, mgg);

        let Some(resonance) = ctx.resonance else {
            return;
        };
        let mut dirs = vec![format!("resonance/{}/", resonance.dirname)];
        match gluon_origin(event) {
            Some(true) => dirs.push(format!("resonance/{}/gg/", resonance.dirname)),
            Some(false) => dirs.push(format!("resonance/{}/qq/", resonance.dirname)),
            None => {}
        }
        for dir in dirs {
            self.plot_diphoton(&dir, &p1, &p2, mgg);
            self.store
                .fill1(&format!("{dir}true_mgg"), MGG_AXIS, true_mgg);
            self.store.fill1(
                &format!("{dir}mgg_minus_true"),
                Axis::new(200, -100e3, 100e3),
                mgg - true_mgg,
            );
        }
    }

    fn plot_diphoton(
        &mut self,
        prefix: &str,
        p1: &FourVector,
        p2: &FourVector,
        mgg: f64,
    ) {
        let s = &mut self.store;
        s.fill1(&format!("{prefix}mgg"), MGG_AXIS, mgg);
        s.fill1(&format!("{prefix}lead_pt"), PT_AXIS, p1.pt());
        s.fill1(&format!("{prefix}sublead_pt"), PT_AXIS, p2.pt());
        s.fill1(&format!("{prefix}lead_eta"), ETA_AXIS, p1.eta());
        s.fill1(&format!("{prefix}sublead_eta"), ETA_AXIS, p2.eta());
        s.fill1(&format!("{prefix}cts"), CTS_AXIS, cos_theta_star(p1, p2));
        s.fill1(
            &format!("{prefix}abs_cts_eta"),
            ABS_CTS_AXIS,
            abs_cos_theta_star_from_eta(p1.eta(), p2.eta()),
        );
    }
}

/// Replace a non-finite weight factor by zero
///
/// The event is still counted, but does not contribute to any weighted
/// sum.
fn finite_weight(kind: &str, weight: f64, event: &Event) -> f64 {
    if weight.is_finite() {
        weight
    } else {
        warn!(
            "Event {} in run {}: {kind} weight {weight} set to zero",
            event.event_number, event.run_number
        );
        0.
    }
}

fn kinematics(ph: &CorrectedPhoton) -> PhotonKinematics {
    PhotonKinematics {
        e: ph.e(),
        eta_s1: ph.raw().etas1,
        phi: ph.raw().phi,
    }
}

impl<R: Record> ProcessEvent for Analysis<R> {
    type Output = ProcessOutcome;
    type Error = AnalysisError;

    fn process(&mut self, event: &Event) -> Result<Self::Output, Self::Error> {
        self.process_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Photon, TruthParticle, Vertex};
    use crate::event_list::EventList;
    use crate::traits::PileupReweight;

    use std::f64::consts::PI;
    use std::sync::Arc;

    const CUTS: [&str; 17] = [
        TOTAL,
        HARD_PROCESS,
        TRIGGER,
        GRL,
        PRIMARY_VERTEX,
        RECO,
        "4_pt",
        "5_eta",
        "6_oq",
        "7_phclean",
        "8_loose",
        PRESELECTION,
        "9_tight",
        "10_iso",
        LAR_OK,
        NOT_EXCLUDED,
        MASS_CUT,
    ];

    fn photon(cl_e: f64, phi: f64, truth_index: i32) -> Photon {
        Photon {
            pt: cl_e,
            phi,
            cl_e,
            cl_pt: cl_e,
            cl_phi: phi,
            loose: true,
            tight: true,
            truth_index,
            ..Default::default()
        }
    }

    fn data_event(event_number: u32) -> Event {
        Event {
            run_number: 180164,
            event_number,
            lumi_block: 42,
            trigger: crate::event::Trigger { ef_2g20_loose: true },
            primary_vertices: vec![Vertex { z: 0., ntracks: 12 }],
            photons: vec![photon(300e3, 0., -1), photon(250e3, PI, -1)],
            ..Default::default()
        }
    }

    fn mc_event(event_number: u32, channel: u32) -> Event {
        Event {
            mc_channel_number: channel,
            is_simulation: true,
            mc_event_weight: 0.5,
            truth_particles: vec![
                TruthParticle::photon(325e3, 0., 0.).hard_process(true),
                TruthParticle::photon(325e3, 0., PI).hard_process(true),
            ],
            photons: vec![photon(325e3, 0., 0), photon(325e3, PI, 1)],
            ..data_event(event_number)
        }
    }

    /// Pileup reweighting that must never be used for data
    struct FixedPileup(f64);

    impl PileupReweight for FixedPileup {
        fn combined_weight(&mut self, _seed: u64, _run: u32, _channel: u32, _mu: f64) -> f64 {
            self.0
        }
    }

    fn analysis(config: Configuration) -> Analysis {
        let mut calib = Calibrations::new(&config.calibration);
        calib.pileup = Box::new(FixedPileup(2.));
        Analysis::with_calibrations(config, calib, HistogramStore::new())
    }

    fn assert_funnel(store: &HistogramStore) {
        let counts: Vec<_> = store.cutflow.iter().map(|(_, c)| c.passed).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{counts:?}");
    }

    #[test]
    fn data_event_passes_everything_with_unit_weight() {
        let config = Configuration::builder()
            .do_pileup_reweighting(true)
            .do_sf_reweighting(true)
            .build();
        let mut ana = analysis(config);
        let outcome = ana.process_event(&data_event(1)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Selected);
        let store = ana.store();
        assert_eq!(store.weight(), 1.0);
        let names: Vec<_> = store.cutflow.iter().map(|(name, _)| name).collect();
        assert_eq!(names, CUTS);
        for (_, counts) in store.cutflow.iter() {
            assert_eq!(counts.passed, 1);
            assert_eq!(counts.weighted, 1.);
        }
        assert_eq!(store.h1("pileup_weight").unwrap().content_at(1.), 1.);
        assert_eq!(store.h1("sel_mgg").unwrap().entries, 1);
        // no truth plots for data
        assert!(store.h1("eff/true_lead/pt/2_pv").is_none());
        assert_eq!(store.h1("eff/true_mgg/0_total").unwrap().entries, 1);
        assert!(store.h1("sel_true_mgg").is_none());
    }

    #[test]
    fn funnel() {
        let mut ana = analysis(Configuration::default());
        let mut no_trigger = data_event(2);
        no_trigger.trigger.ef_2g20_loose = false;
        let mut no_vertex = data_event(3);
        no_vertex.primary_vertices[0].ntracks = 2;
        let mut one_photon = data_event(4);
        one_photon.photons.pop();
        let mut low_mass = data_event(5);
        low_mass.photons = vec![photon(60e3, 0., -1), photon(50e3, 1., -1)];
        let mut lar_error = data_event(6);
        lar_error.lar_error = 2;
        let expected = [
            (data_event(1), ProcessOutcome::Selected),
            (no_trigger, ProcessOutcome::Rejected(TRIGGER)),
            (no_vertex, ProcessOutcome::Rejected(PRIMARY_VERTEX)),
            (one_photon, ProcessOutcome::Rejected(RECO)),
            (low_mass, ProcessOutcome::Rejected(MASS_CUT)),
            (lar_error, ProcessOutcome::Rejected(LAR_OK)),
        ];
        for (event, outcome) in expected {
            assert_eq!(ana.process_event(&event).unwrap(), outcome);
        }
        let store = ana.store();
        assert_funnel(store);
        assert_eq!(store.cutflow.get(TOTAL).unwrap().passed, 6);
        assert_eq!(store.cutflow.get(PRIMARY_VERTEX).unwrap().passed, 4);
        assert_eq!(store.cutflow.get(NOT_EXCLUDED).unwrap().passed, 2);
        assert_eq!(store.cutflow.get(MASS_CUT).unwrap().passed, 1);
        assert_eq!(store.h1("sel_reco_mgg").unwrap().entries, 3);
        assert_eq!(ana.sample_changes(), 1);
    }

    #[test]
    fn pt_cut_keeps_two_of_three() {
        let mut ana = analysis(Configuration::default());
        let mut event = data_event(1);
        event.photons.insert(1, photon(20e3, 2., -1));
        assert_eq!(ana.process_event(&event).unwrap(), ProcessOutcome::Selected);
        let store = ana.store();
        assert_eq!(store.cutflow.get("4_pt").unwrap().passed, 1);
        assert_eq!(store.h1("sel_lead_pt").unwrap().integral(), 1.);
        assert!(store.cutflow.get(MASS_CUT).is_some());
    }

    #[test]
    fn simulation_weights() {
        // SM diphoton sample with a true mass of 650 GeV
        let mut ana = analysis(Configuration::default());
        let outcome = ana.process_event(&mc_event(1, 119584)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Selected);
        let store = ana.store();
        let expected = 0.5 * 1.28618884087;
        assert!((store.weight() - expected).abs() < 1e-12);
        assert_eq!(store.cutflow.get(TOTAL).unwrap().weighted, expected);
        assert_eq!(store.h1("eff/true_lead/pt/2_pv").unwrap().content_at(325e3), expected);
        assert_eq!(store.h1("eff/true_sublead/eta/11_mass").unwrap().entries, 1);
        assert_eq!(store.h1("sel_true_mgg").unwrap().integral(), expected);
        assert_eq!(store.h2("sel_true_v_reco_mgg").unwrap().entries, 1);
        assert_eq!(store.metadata[&119584].sum_mc_weights, 0.5);
    }

    #[test]
    fn pileup_weight_for_simulation() {
        let config = Configuration::builder().do_pileup_reweighting(true).build();
        let mut ana = analysis(config);
        ana.process_event(&mc_event(1, 105802)).unwrap();
        assert_eq!(ana.store().cutflow.get(TOTAL).unwrap().weighted, 1.);
        assert_eq!(ana.store().h1("pileup_weight").unwrap().content_at(2.), 1.);

        let config = Configuration::builder()
            .do_pileup_reweighting(true)
            .systematic(Some(crate::config::Systematic::Noprw))
            .build();
        let mut ana = analysis(config);
        ana.process_event(&mc_event(1, 105802)).unwrap();
        assert_eq!(ana.store().cutflow.get(TOTAL).unwrap().weighted, 0.5);
    }

    #[test]
    fn mass_window() {
        let mut ana = analysis(Configuration::default());
        let outcome = ana.process_event(&mc_event(1, 145606)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Rejected(MASS_WINDOW));
        assert_eq!(ana.store().cutflow.len(), 1);
    }

    #[test]
    fn pt_slice_only_when_enabled() {
        // leading hard-process photon at 325 GeV is outside [20, 45) GeV
        let mut ana = analysis(Configuration::default());
        let outcome = ana.process_event(&mc_event(1, 105802)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Selected);

        let config = Configuration::builder().apply_pt_slice(true).build();
        let mut ana = analysis(config);
        let outcome = ana.process_event(&mc_event(1, 105802)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Rejected(PT_SLICE));
    }

    #[test]
    fn matched_photons_must_pass() {
        let mut event = mc_event(1, 105802);
        event.photons = vec![
            photon(300e3, 0., 0),
            photon(20e3, PI, 1),
            photon(280e3, PI, -1),
        ];
        let mut ana = analysis(Configuration::default());
        assert_eq!(ana.process_event(&event).unwrap(), ProcessOutcome::Selected);

        let config = Configuration::builder().require_mc_match(true).build();
        let mut ana = analysis(config);
        assert_eq!(
            ana.process_event(&event).unwrap(),
            ProcessOutcome::Rejected("4_pt")
        );

        event.photons[1].truth_index = -1;
        assert_eq!(
            ana.process_event(&event).unwrap(),
            ProcessOutcome::Rejected(RECO)
        );
        event.truth_particles.pop();
        assert_eq!(
            ana.process_event(&event).unwrap(),
            ProcessOutcome::Rejected(HARD_PROCESS)
        );
    }

    #[test]
    fn excluded_events() {
        let list = EventList::from_reader("180164 2 42\n".as_bytes()).unwrap();
        let config = Configuration::builder()
            .excluded_events(Some(Arc::new(list)))
            .build();
        let mut ana = analysis(config);
        assert_eq!(ana.process_event(&data_event(1)).unwrap(), ProcessOutcome::Selected);
        assert_eq!(
            ana.process_event(&data_event(2)).unwrap(),
            ProcessOutcome::Rejected(NOT_EXCLUDED)
        );
    }

    #[test]
    fn tight_required_for_leading_pair() {
        let mut event = data_event(1);
        event.photons[1].tight = false;
        event.photons.push(photon(100e3, 2., -1));
        let mut ana = analysis(Configuration::default());
        assert_eq!(
            ana.process_event(&event).unwrap(),
            ProcessOutcome::Rejected("9_tight")
        );
        assert_eq!(ana.store().cutflow.get(PRESELECTION).unwrap().passed, 1);
        assert!(ana.store().cutflow.get("9_tight").is_none());
    }

    #[test]
    fn conflicting_metadata() {
        let mut ana = analysis(Configuration::default());
        let mut event = data_event(1);
        ana.process_event(&event).unwrap();
        event.is_simulation = true;
        assert!(matches!(
            ana.process_event(&event),
            Err(AnalysisError::Metadata(MetadataMismatch { channel: 0 }))
        ));
    }

    #[test]
    fn non_finite_weights_count_with_zero_weight() {
        let mut event = mc_event(1, 105802);
        event.mc_event_weight = f64::NAN;
        let mut ana = analysis(Configuration::default());
        assert_eq!(ana.process_event(&event).unwrap(), ProcessOutcome::Selected);
        let store = ana.store();
        for (_, counts) in store.cutflow.iter() {
            assert_eq!(counts.passed, 1);
            assert_eq!(counts.weighted, 0.);
        }
        assert_eq!(store.metadata[&105802].events, 1);
        assert_eq!(store.metadata[&105802].sum_mc_weights, 0.);

        let config = Configuration::builder().do_pileup_reweighting(true).build();
        let mut calib = Calibrations::new(&config.calibration);
        calib.pileup = Box::new(FixedPileup(f64::INFINITY));
        let mut ana = Analysis::with_calibrations(config, calib, HistogramStore::new());
        let outcome = ana.process_event(&mc_event(2, 105802)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Selected);
        assert_eq!(ana.store().cutflow.get(MASS_CUT).unwrap().weighted, 0.);
        assert_eq!(ana.store().h1("pileup_weight").unwrap().content_at(0.), 1.);
    }

    #[test]
    fn scale_factors_after_preselection() {
        // both photons unconverted in the forward region above 45 GeV
        let mut event = mc_event(1, 105802);
        event.photons[0].etas2 = 2.0;
        event.photons[1].etas2 = -1.9;
        let config = Configuration::builder().do_sf_reweighting(true).build();
        let mut ana = analysis(config);
        assert_eq!(ana.process_event(&event).unwrap(), ProcessOutcome::Selected);
        let cutflow = &ana.store().cutflow;
        let expected = 0.5 * (0.97 * 0.97);
        for cut in [TOTAL, RECO, "8_loose"] {
            assert_eq!(cutflow.get(cut).unwrap().weighted, 0.5, "{cut}");
        }
        for cut in [PRESELECTION, "9_tight", "10_iso", MASS_CUT] {
            let weighted = cutflow.get(cut).unwrap().weighted.raw();
            assert!((weighted - expected).abs() < 1e-12, "{cut}: {weighted}");
        }

        // switched off
        let mut ana = analysis(Configuration::default());
        ana.process_event(&event).unwrap();
        assert_eq!(ana.store().cutflow.get(MASS_CUT).unwrap().weighted, 0.5);
    }

    fn graviton_event(channel: u32) -> Event {
        use crate::event::PDGID_GRAVITON;
        use particle_id::{sm_elementary_particles::gluon, ParticleID};

        let mut event = mc_event(1, channel);
        event.truth_particles.extend([
            TruthParticle::new(gluon, 0., 0., 0., 0.).barcode(1),
            TruthParticle::new(gluon, 0., 0., 0., 0.).barcode(2),
            TruthParticle::new(ParticleID::new(PDGID_GRAVITON), 0., 0., 0., 500e3)
                .barcode(3)
                .parents(vec![1, 2]),
        ]);
        event
    }

    #[test]
    fn resonance_plots() {
        let mut ana = analysis(Configuration::default());
        let outcome = ana.process_event(&graviton_event(158300)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Selected);
        let store = ana.store();
        for dir in ["resonance/RS_G_m500_k001/", "resonance/RS_G_m500_k001/gg/"] {
            assert_eq!(store.h1(&format!("{dir}mgg")).unwrap().entries, 1, "{dir}");
            assert_eq!(store.h1(&format!("{dir}true_mgg")).unwrap().entries, 1, "{dir}");
        }
        assert!(store.h1("resonance/RS_G_m500_k001/qq/mgg").is_none());
    }

    #[test]
    fn no_resonance_plots_for_other_samples() {
        let mut ana = analysis(Configuration::default());
        let outcome = ana.process_event(&graviton_event(105802)).unwrap();
        assert_eq!(outcome, ProcessOutcome::Selected);
        let store = ana.store();
        assert_eq!(store.h1("sel_mgg").unwrap().entries, 1);
        assert!(store.h1.keys().all(|path| !path.starts_with("resonance/")));
    }
}
