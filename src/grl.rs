use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use audec::auto_decompress;
use log::info;
use thiserror::Error;

use crate::parsing::{is_blank, strip_comment, u32_triple};
use crate::traits::GoodRunsList;

/// Accept all luminosity blocks
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoGrl {}

impl GoodRunsList for NoGrl {
    fn pass(&self, _run: u32, _lumi_block: u32) -> bool {
        true
    }
}

/// Good runs list read from a text file
///
/// Each line is a `run first_lumi_block last_lumi_block` triple with an
/// inclusive range. A run can appear on several lines.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileGrl {
    ranges: HashMap<u32, Vec<(u32, u32)>>,
}

impl FileGrl {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GrlError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let grl = Self::from_reader(auto_decompress(BufReader::new(file)))?;
        info!(
            "Loaded good runs list {path:?} with {} runs",
            grl.ranges.len()
        );
        Ok(grl)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GrlError> {
        let mut ranges: HashMap<u32, Vec<(u32, u32)>> = HashMap::new();
        for (nline, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if is_blank(&line) {
                continue;
            }
            let (_, (run, first, last)) = u32_triple(strip_comment(&line))
                .map_err(|_| GrlError::Syntax(nline + 1, line.clone()))?;
            if first > last {
                return Err(GrlError::EmptyRange(nline + 1, line));
            }
            ranges.entry(run).or_default().push((first, last));
        }
        Ok(Self { ranges })
    }
}

impl GoodRunsList for FileGrl {
    fn pass(&self, run: u32, lumi_block: u32) -> bool {
        self.ranges
            .get(&run)
            .map(|ranges| {
                ranges
                    .iter()
                    .any(|(first, last)| (*first..=*last).contains(&lumi_block))
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Error)]
pub enum GrlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Line {0}: expected `run first_lumi_block last_lumi_block`, found `{1}`")]
    Syntax(usize, String),
    #[error("Line {0}: empty luminosity block range `{1}`")]
    EmptyRange(usize, String),
}
