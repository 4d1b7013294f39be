//! Static per-sample information
//!
//! All tables are keyed by the simulation channel number. Lookups are
//! total: channels without an entry get the defaults (no slice window,
//! no resonance, not the SM diphoton sample).
use std::collections::HashMap;

use lazy_static::lazy_static;
use log::info;

use crate::event::Event;

/// Half-open interval [`low`, `high`)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Window {
    pub low: f64,
    pub high: f64,
}

impl Window {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Whether `x` is inside the window
    ///
    /// NaN is never outside.
    pub fn contains(&self, x: f64) -> bool {
        !(x < self.low || x >= self.high)
    }
}

const OPEN_END: f64 = f64::INFINITY;

/// Slices in the transverse momentum of the leading hard-process photon
///
/// Jet-faking (JF), photon+jet and direct photon (DP) samples.
const PT_SLICES: [(&[u32], Window); 6] = [
    (&[105802, 108087, 115802], Window::new(20e3, 45e3)),
    (&[105807, 108081, 115803], Window::new(45e3, 85e3)),
    (&[105814, 108082, 115804], Window::new(85e3, 150e3)),
    (&[105815, 108083, 115809], Window::new(150e3, 260e3)),
    (&[105812, 108084, 115810], Window::new(260e3, 550e3)),
    (&[119075, 119079, 119077], Window::new(550e3, OPEN_END)),
];

/// Slices in the true diphoton mass
const MASS_SLICES: [(u32, Window); 3] = [
    (119584, Window::new(0., 800e3)),
    (145606, Window::new(800e3, 1500e3)),
    (145607, Window::new(1500e3, OPEN_END)),
];

/// Inclusive SM diphoton samples that get the k-factor reweighting
const SM_DIPHOTON: [u32; 3] = [119584, 145606, 145607];

pub fn pt_slice(channel: u32) -> Option<Window> {
    PT_SLICES
        .iter()
        .find(|(channels, _)| channels.contains(&channel))
        .map(|(_, window)| *window)
}

pub fn mass_slice(channel: u32) -> Option<Window> {
    MASS_SLICES
        .iter()
        .find(|(c, _)| *c == channel)
        .map(|(_, window)| *window)
}

pub fn is_sm_diphoton(channel: u32) -> bool {
    SM_DIPHOTON.contains(&channel)
}

/// Randall-Sundrum graviton signal sample
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResonanceDescriptor {
    pub channel: u32,
    /// Output directory for the resonance plots
    pub dirname: &'static str,
    pub mass: f64,
    /// Coupling k/M̄_Pl
    pub coupling: f64,
    pub width: f64,
    /// Cross section times branching ratio in fb
    pub cross_section: f64,
    /// Number of generated events
    pub nevents: u64,
}

impl ResonanceDescriptor {
    /// Integrated luminosity of the sample in fb⁻¹
    pub fn effective_lumi(&self) -> f64 {
        self.nevents as f64 / self.cross_section
    }
}

const fn res(
    channel: u32,
    dirname: &'static str,
    mass: f64,
    coupling: f64,
    width: f64,
    cross_section: f64,
    nevents: u64,
) -> ResonanceDescriptor {
    ResonanceDescriptor {
        channel,
        dirname,
        mass,
        coupling,
        width,
        cross_section,
        nevents,
    }
}

/// Signal samples, masses and widths in MeV
pub const RESONANCES: [ResonanceDescriptor; 31] = [
    res(158300, "RS_G_m500_k001", 500e3, 0.01, 72., 2.65, 20000),
    res(158301, "RS_G_m700_k001", 700e3, 0.01, 100.8, 0.55, 20000),
    res(158302, "RS_G_m800_k001", 800e3, 0.01, 115.2, 0.27, 20000),
    res(158303, "RS_G_m1000_k001", 1000e3, 0.01, 144., 0.086, 20000),
    res(158304, "RS_G_m1250_k001", 1250e3, 0.01, 180., 0.024, 20000),
    res(158305, "RS_G_m1500_k001", 1500e3, 0.01, 216., 0.0078, 20000),
    res(158306, "RS_G_m1750_k001", 1750e3, 0.01, 252., 0.0028, 20000),
    res(158307, "RS_G_m2000_k001", 2000e3, 0.01, 288., 0.001, 20000),
    res(158308, "RS_G_m2250_k001", 2250e3, 0.01, 324., 0.0004, 20000),
    res(158309, "RS_G_m2500_k001", 2500e3, 0.01, 360., 0.00016, 20000),
    res(158310, "RS_G_m500_k003", 500e3, 0.03, 648., 23.85, 20000),
    res(158311, "RS_G_m750_k003", 750e3, 0.03, 972., 3.6, 20000),
    res(158312, "RS_G_m1000_k003", 1000e3, 0.03, 1296., 0.774, 20000),
    res(158313, "RS_G_m1250_k003", 1250e3, 0.03, 1620., 0.216, 20000),
    res(158314, "RS_G_m1500_k003", 1500e3, 0.03, 1944., 0.0702, 20000),
    res(158315, "RS_G_m1750_k003", 1750e3, 0.03, 2268., 0.0252, 20000),
    res(158316, "RS_G_m2000_k003", 2000e3, 0.03, 2592., 0.009, 20000),
    res(158317, "RS_G_m500_k005", 500e3, 0.05, 1800., 66.25, 20000),
    res(158318, "RS_G_m750_k005", 750e3, 0.05, 2700., 10., 20000),
    res(158319, "RS_G_m1000_k005", 1000e3, 0.05, 3600., 2.15, 20000),
    res(158320, "RS_G_m1250_k005", 1250e3, 0.05, 4500., 0.6, 20000),
    res(158321, "RS_G_m1500_k005", 1500e3, 0.05, 5400., 0.195, 20000),
    res(158322, "RS_G_m1750_k005", 1750e3, 0.05, 6300., 0.07, 20000),
    res(158323, "RS_G_m2000_k005", 2000e3, 0.05, 7200., 0.025, 20000),
    res(158324, "RS_G_m500_k01", 500e3, 0.1, 7200., 265., 20000),
    res(158325, "RS_G_m750_k01", 750e3, 0.1, 10800., 40., 20000),
    res(158326, "RS_G_m1000_k01", 1000e3, 0.1, 14400., 8.6, 20000),
    res(158327, "RS_G_m1250_k01", 1250e3, 0.1, 18000., 2.4, 20000),
    res(158328, "RS_G_m1500_k01", 1500e3, 0.1, 21600., 0.78, 20000),
    res(158329, "RS_G_m1750_k01", 1750e3, 0.1, 25200., 0.28, 20000),
    res(158330, "RS_G_m2000_k01", 2000e3, 0.1, 28800., 0.1, 20000),];

lazy_static! {
    static ref RESONANCE_BY_CHANNEL: HashMap<u32, &'static ResonanceDescriptor> =
        RESONANCES.iter().map(|r| (r.channel, r)).collect();
}

pub fn resonance(channel: u32) -> Option<&'static ResonanceDescriptor> {
    RESONANCE_BY_CHANNEL.get(&channel).copied()
}

/// Information about the sample the current events belong to
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleContext {
    pub run: u32,
    pub channel: u32,
    pub is_simulation: bool,
    pub pt_slice: Option<Window>,
    pub mass_slice: Option<Window>,
    pub resonance: Option<&'static ResonanceDescriptor>,
    pub is_sm_diphoton: bool,
}

impl SampleContext {
    pub fn new(event: &Event) -> Self {
        let channel = event.mc_channel_number;
        Self {
            run: event.run_number,
            channel,
            is_simulation: event.is_simulation,
            pt_slice: pt_slice(channel),
            mass_slice: mass_slice(channel),
            resonance: resonance(channel),
            is_sm_diphoton: is_sm_diphoton(channel),
        }
    }
}

/// Caches the [SampleContext] for consecutive events of the same
/// (run, channel)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleClassifier {
    current: Option<SampleContext>,
    changes: usize,
}

impl SampleClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for the sample of `event`
    ///
    /// The context is only recomputed if the run or channel differs from
    /// the previous event.
    pub fn context_for(&mut self, event: &Event) -> &SampleContext {
        let unchanged = matches!(
            &self.current,
            Some(ctx) if ctx.run == event.run_number
                && ctx.channel == event.mc_channel_number
        );
        if !unchanged {
            let ctx = SampleContext::new(event);
            info!(
                "New sample: run {}, channel {} ({})",
                ctx.run,
                ctx.channel,
                if ctx.is_simulation { "simulation" } else { "data" }
            );
            if let Some(res) = ctx.resonance {
                info!(
                    "Resonance sample {}: m = {} GeV, k = {}",
                    res.dirname,
                    res.mass / 1e3,
                    res.coupling
                );
            }
            self.changes += 1;
            return self.current.insert(ctx);
        }
        self.current.get_or_insert_with(|| SampleContext::new(event))
    }

    /// Number of times the sample changed
    pub fn changes(&self) -> usize {
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(run: u32, channel: u32) -> Event {
        Event {
            run_number: run,
            mc_channel_number: channel,
            is_simulation: true,
            ..Default::default()
        }
    }

    #[test]
    fn windows() {
        let w = Window::new(20e3, 45e3);
        assert!(w.contains(20e3));
        assert!(!w.contains(45e3));
        assert!(!w.contains(19e3));
        assert!(w.contains(f64::NAN));
        assert!(mass_slice(145607).unwrap().contains(5e6));
    }

    #[test]
    fn lookups() {
        assert_eq!(pt_slice(108083), Some(Window::new(150e3, 260e3)));
        assert_eq!(pt_slice(119079), Some(Window::new(550e3, OPEN_END)));
        assert_eq!(pt_slice(119584), None);
        assert_eq!(mass_slice(145606), Some(Window::new(800e3, 1500e3)));
        assert!(is_sm_diphoton(119584));
        assert!(!is_sm_diphoton(105802));
        assert_eq!(resonance(158326).unwrap().mass, 1000e3);
    }

    #[test]
    fn resonance_table() {
        assert_eq!(RESONANCE_BY_CHANNEL.len(), RESONANCES.len());
        for res in RESONANCES.iter() {
            let expected = 1.44 * res.coupling * res.coupling * res.mass;
            assert!((res.width - expected).abs() < 1e-6 * expected);
            assert!(res.effective_lumi() > 0.);
        }
    }

    #[test]
    fn unknown_channel_uses_defaults() {
        // a pT slice channel is no resonance sample
        let ctx = SampleContext::new(&event(180164, 105807));
        assert!(ctx.resonance.is_none());
        assert_eq!(ctx.pt_slice, Some(Window::new(45e3, 85e3)));
        assert_eq!(ctx.mass_slice, None);
        assert!(!ctx.is_sm_diphoton);

        let ctx = SampleContext::new(&event(180164, 145606));
        assert!(ctx.resonance.is_none());
        assert_eq!(ctx.pt_slice, None);
        assert_eq!(ctx.mass_slice, Some(Window::new(800e3, 1500e3)));
        assert!(ctx.is_sm_diphoton);

        let ctx = SampleContext::new(&event(180164, 999999));
        assert_eq!(
            (ctx.resonance, ctx.pt_slice, ctx.mass_slice, ctx.is_sm_diphoton),
            (None, None, None, false)
        );
    }

    #[test]
    fn classify_on_change_only() {
        let mut classifier = SampleClassifier::new();
        classifier.context_for(&event(180164, 105802));
        classifier.context_for(&event(180164, 105802));
        assert_eq!(classifier.changes(), 1);
        let ctx = *classifier.context_for(&event(180164, 158300));
        assert_eq!(ctx.resonance.map(|r| r.dirname), Some("RS_G_m500_k001"));
        classifier.context_for(&event(180165, 158300));
        classifier.context_for(&event(180165, 158300));
        assert_eq!(classifier.changes(), 3);
    }
}
