use std::collections::HashMap;

use noisy_float::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of events passing a cut
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CutCounts {
    /// Number of events
    pub passed: u64,
    /// Sum of event weights
    pub weighted: N64,
}

/// Cumulative pass counters in the order in which cuts were first seen
///
/// The order of existing cuts never changes.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "Vec<(String, CutCounts)>", into = "Vec<(String, CutCounts)>")]
pub struct Cutflow {
    cuts: Vec<(String, CutCounts)>,
    index: HashMap<String, usize>,
}

impl Cutflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an event with the given weight as passing `cut`
    pub fn passed(&mut self, cut: &str, weight: f64) {
        let idx = match self.index.get(cut) {
            Some(&idx) => idx,
            None => {
                self.cuts.push((cut.to_owned(), CutCounts::default()));
                self.index.insert(cut.to_owned(), self.cuts.len() - 1);
                self.cuts.len() - 1
            }
        };
        let counts = &mut self.cuts[idx].1;
        counts.passed += 1;
        counts.weighted += n64(weight);
    }

    /// Counters for the named cut
    pub fn get(&self, cut: &str) -> Option<&CutCounts> {
        self.index.get(cut).map(|&idx| &self.cuts[idx].1)
    }

    /// Iterate over cuts in the order in which they were first seen
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CutCounts)> {
        self.cuts.iter().map(|(name, counts)| (name.as_str(), counts))
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Add the counters of another cutflow
    ///
    /// Cuts unknown so far are appended in the order of `other`.
    pub fn merge(&mut self, other: &Cutflow) {
        for (name, counts) in other.iter() {
            let idx = match self.index.get(name) {
                Some(&idx) => idx,
                None => {
                    self.cuts.push((name.to_owned(), CutCounts::default()));
                    self.index.insert(name.to_owned(), self.cuts.len() - 1);
                    self.cuts.len() - 1
                }
            };
            let mine = &mut self.cuts[idx].1;
            mine.passed += counts.passed;
            mine.weighted += counts.weighted;
        }
    }
}

impl From<Vec<(String, CutCounts)>> for Cutflow {
    fn from(cuts: Vec<(String, CutCounts)>) -> Self {
        let mut cutflow = Cutflow::new();
        for (name, counts) in cuts {
            match cutflow.index.get(&name) {
                Some(&idx) => {
                    let mine = &mut cutflow.cuts[idx].1;
                    mine.passed += counts.passed;
                    mine.weighted += counts.weighted;
                }
                None => {
                    cutflow.index.insert(name.clone(), cutflow.cuts.len());
                    cutflow.cuts.push((name, counts));
                }
            }
        }
        cutflow
    }
}

impl From<Cutflow> for Vec<(String, CutCounts)> {
    fn from(cutflow: Cutflow) -> Self {
        cutflow.cuts
    }
}
