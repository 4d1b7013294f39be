use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::analysis::{Analysis, AnalysisError, ProcessOutcome};
use crate::config::Configuration;
use crate::event::Event;
use crate::filter::Filter;
use crate::histogram::HistogramStore;
use crate::traits::ProcessEvent;

/// Available event processors
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
pub enum ProcessorKind {
    /// The diphoton selection
    #[default]
    Analysis,
    /// Event slimming
    Filter,
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("Unknown processor '{0}', expected 'Analysis' or 'Filter'")]
pub struct UnknownProcessor(pub String);

impl ProcessorKind {
    pub fn from_name(name: &str) -> Result<Self, UnknownProcessor> {
        Self::from_str(name).map_err(|_| UnknownProcessor(name.to_owned()))
    }
}

/// An event processor of either kind
pub enum Processor {
    Analysis(Box<Analysis>),
    Filter(Filter),
}

/// What a [Processor] produces for a single event
#[derive(Clone, Debug, PartialEq)]
pub enum Processed {
    Outcome(ProcessOutcome),
    Event(Box<Event>),
}

impl Processor {
    /// A fresh processor with its own state, as set by `config.processor`
    pub fn new(config: &Configuration) -> Self {
        match config.processor {
            ProcessorKind::Analysis => {
                Self::Analysis(Box::new(Analysis::new(config.clone())))
            }
            ProcessorKind::Filter => {
                Self::Filter(Filter::new(config.filter_reco_photons))
            }
        }
    }

    pub fn kind(&self) -> ProcessorKind {
        match self {
            Self::Analysis(_) => ProcessorKind::Analysis,
            Self::Filter(_) => ProcessorKind::Filter,
        }
    }

    /// The histograms and cutflow collected by an analysis
    pub fn into_store(self) -> Option<HistogramStore> {
        match self {
            Self::Analysis(analysis) => Some(analysis.into_store()),
            Self::Filter(_) => None,
        }
    }
}

impl ProcessEvent for Processor {
    type Output = Processed;
    type Error = AnalysisError;

    fn process(&mut self, event: &Event) -> Result<Self::Output, Self::Error> {
        match self {
            Self::Analysis(analysis) => analysis.process(event).map(Processed::Outcome),
            Self::Filter(filter) => match filter.process(event) {
                Ok(pruned) => Ok(Processed::Event(Box::new(pruned))),
                Err(never) => match never {},
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind() {
        assert_eq!(ProcessorKind::from_name("Analysis"), Ok(ProcessorKind::Analysis));
        assert_eq!(ProcessorKind::from_name("Filter"), Ok(ProcessorKind::Filter));
        assert_eq!(
            ProcessorKind::from_name("Skim"),
            Err(UnknownProcessor("Skim".to_owned()))
        );
        assert_eq!(ProcessorKind::Filter.to_string(), "Filter");
    }

    #[test]
    fn dispatch() {
        let event = Event {
            photons: vec![Default::default()],
            ..Default::default()
        };

        let config = Configuration::default();
        let mut processor = Processor::new(&config);
        assert_eq!(processor.kind(), ProcessorKind::Analysis);
        let res = processor.process(&event).unwrap();
        assert_eq!(res, Processed::Outcome(ProcessOutcome::Rejected("2g20_loose")));
        let store = processor.into_store().unwrap();
        assert_eq!(store.cutflow.get("Total").unwrap().passed, 1);

        let config = Configuration::builder()
            .processor(ProcessorKind::Filter)
            .filter_reco_photons(true)
            .build();
        let mut processor = Processor::new(&config);
        assert_eq!(processor.kind(), ProcessorKind::Filter);
        let Processed::Event(pruned) = processor.process(&event).unwrap() else {
            panic!("filter did not return an event");
        };
        assert!(pruned.photons.is_empty());
        assert!(processor.into_store().is_none());
    }
}
