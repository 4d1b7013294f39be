use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use audec::auto_decompress;
use log::info;
use thiserror::Error;

use crate::parsing::{is_blank, strip_comment, u32_triple};

/// List of events to exclude, e.g. because of data quality problems
///
/// The input format is one whitespace-separated `run event lumi_block`
/// triple per line. Text after `#` is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventList {
    events: HashSet<(u32, u32)>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EventListError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let list = Self::from_reader(auto_decompress(BufReader::new(file)))?;
        info!("Loaded {} events from {path:?}", list.len());
        Ok(list)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EventListError> {
        let mut list = Self::new();
        for (nline, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if is_blank(&line) {
                continue;
            }
            let (_, (run, event, lumi_block)) = u32_triple(strip_comment(&line))
                .map_err(|_| EventListError::Syntax(nline + 1, line.clone()))?;
            if !list.events.insert((run, event)) {
                return Err(EventListError::Duplicate {
                    run,
                    event,
                    lumi_block,
                });
            }
        }
        Ok(list)
    }

    /// Whether the event is in the list
    ///
    /// The luminosity block is not part of the query.
    pub fn present(&self, run: u32, event: u32) -> bool {
        self.events.contains(&(run, event))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum EventListError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Line {0}: expected `run event lumi_block`, found `{1}`")]
    Syntax(usize, String),
    #[error("Duplicate run/event/lumi block: {run} - {event} - {lumi_block}")]
    Duplicate {
        run: u32,
        event: u32,
        lumi_block: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_list() {
        let input = "# run event lb
178044 1234 5
178044 1235 5   # trailing comment

180164 7 100
";
        let list = EventList::from_reader(input.as_bytes()).unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.present(178044, 1235));
        assert!(list.present(180164, 7));
        assert!(!list.present(180164, 1234));
    }

    #[test]
    fn duplicate_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ee_events.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "178044 1234 5").unwrap();
        writeln!(file, "178044 1234 5").unwrap();
        drop(file);
        let err = EventList::from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            EventListError::Duplicate { run: 178044, event: 1234, lumi_block: 5 }
        ));
    }

    #[test]
    fn same_event_in_other_lumi_block_is_a_duplicate() {
        let input = "178044 1234 5\n178044 1234 6\n";
        assert!(matches!(
            EventList::from_reader(input.as_bytes()),
            Err(EventListError::Duplicate { lumi_block: 6, .. })
        ));
    }

    #[test]
    fn syntax_error() {
        let input = "178044 1234 5\n178044 x 6\n";
        assert!(matches!(
            EventList::from_reader(input.as_bytes()),
            Err(EventListError::Syntax(2, _))
        ));
    }
}
