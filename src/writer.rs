use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use log::debug;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::compression::{compress_writer, Compression};
use crate::event::Event;

/// Settings for writing events to a file
#[derive(Clone, Debug, TypedBuilder)]
pub struct FileWriter {
    filename: PathBuf,
    #[builder(default)]
    compression: Option<Compression>,
}

impl FileWriter {
    /// Create the output file
    pub fn create(&self) -> Result<EventWriter<'static>, EventWriteError> {
        debug!("Writing events to {:?}", self.filename);
        let file = File::create(&self.filename)
            .map_err(|err| EventWriteError::CreateErr(self.filename.clone(), err))?;
        let writer = compress_writer(BufWriter::new(file), self.compression)
            .map_err(|err| EventWriteError::CreateErr(self.filename.clone(), err))?;
        Ok(EventWriter::new(writer))
    }
}

/// Writes events as a stream of YAML documents
pub struct EventWriter<'a> {
    writer: Box<dyn Write + 'a>,
    nwritten: usize,
}

impl<'a> EventWriter<'a> {
    pub fn new(writer: Box<dyn Write + 'a>) -> Self {
        Self {
            writer,
            nwritten: 0,
        }
    }

    pub fn write(&mut self, event: &Event) -> Result<(), EventWriteError> {
        self.writer.write_all(b"---\n")?;
        serde_yaml::to_writer(&mut self.writer, event)?;
        self.nwritten += 1;
        Ok(())
    }

    /// Number of events written so far
    pub fn nwritten(&self) -> usize {
        self.nwritten
    }

    /// Flush all output
    ///
    /// Compressed streams are terminated when the writer is dropped.
    pub fn finish(mut self) -> Result<usize, EventWriteError> {
        self.writer.flush()?;
        Ok(self.nwritten)
    }
}

#[derive(Debug, Error)]
pub enum EventWriteError {
    #[error("Failed to create {0:?}: {1}")]
    CreateErr(PathBuf, std::io::Error),
    #[error("Failed to write event: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to serialise event: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Photon, Vertex};
    use crate::reader::EventReader;

    fn events() -> Vec<Event> {
        (0..3)
            .map(|n| Event {
                run_number: 190256,
                event_number: n,
                is_simulation: true,
                mc_event_weight: 0.5,
                primary_vertices: vec![Vertex { z: -3.5, ntracks: 4 }],
                photons: vec![Photon {
                    pt: 42e3,
                    original_index: Some(n),
                    ..Default::default()
                }],
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        for (name, compression) in [
            ("events.yaml", None),
            ("events.yaml.bz2", Some(Compression::Bzip2)),
            ("events.yaml.gz", Some(Compression::Gzip(6))),
        ] {
            let path = dir.path().join(name);
            let mut writer = FileWriter::builder()
                .filename(path.clone())
                .compression(compression)
                .build()
                .create()
                .unwrap();
            for event in events() {
                writer.write(&event).unwrap();
            }
            assert_eq!(writer.finish().unwrap(), 3);
            let read: Vec<_> = EventReader::from_file(&path)
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(read, events());
        }
    }
}
