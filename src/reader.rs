use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use audec::auto_decompress;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::event::Event;

/// Reader for a stream of YAML documents, one event per document
///
/// Compressed input is decompressed transparently.
pub struct EventReader {
    documents: serde_yaml::Deserializer<'static>,
    source: Option<PathBuf>,
    nread: usize,
}

impl EventReader {
    /// Read events from the file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CreateError> {
        let path = path.as_ref();
        debug!("Reading events from {path:?}");
        let file = File::open(path)
            .map_err(|err| CreateError::IoError(path.to_owned(), err))?;
        let mut reader = Self::from_reader(auto_decompress(BufReader::new(file)));
        reader.source = Some(path.to_owned());
        Ok(reader)
    }

    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            documents: serde_yaml::Deserializer::from_reader(reader),
            source: None,
            nread: 0,
        }
    }

    /// Number of events read so far
    pub fn nread(&self) -> usize {
        self.nread
    }
}

impl Iterator for EventReader {
    type Item = Result<Event, EventReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let document = self.documents.next()?;
        let res = Event::deserialize(document).map_err(|err| EventReadError {
            path: self.source.clone(),
            event: self.nread,
            err,
        });
        self.nread += 1;
        Some(res)
    }
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Failed to open {0:?}: {1}")]
    IoError(PathBuf, std::io::Error),
}

/// A document in the event stream is not a valid event
#[derive(Debug, Error)]
#[error("Failed to read event {event} from {}: {err}", display_source(.path))]
pub struct EventReadError {
    path: Option<PathBuf>,
    event: usize,
    err: serde_yaml::Error,
}

fn display_source(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("{path:?}"),
        None => "input".to_owned(),
    }
}
