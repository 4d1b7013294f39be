use std::io::Write;
use std::str::FromStr;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

const GZIP_DEFAULT_LEVEL: u8 = 6;
const LZ4_DEFAULT_LEVEL: u8 = 0;
const ZSTD_DEFAULT_LEVEL: u8 = 0;

/// Compression format for event and histogram output
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Compression {
    /// The bzip2 format
    Bzip2,
    /// The gzip format with compression level as associated value
    Gzip(u8),
    /// The lz4 format with compression level as associated value
    Lz4(u8),
    /// The zstd format with compression level as associated value
    Zstd(u8),
}

/// Convert into a writer that compresses to the given format
pub fn compress_writer<'a, W: 'a + Write>(
    writer: W,
    compression: Option<Compression>,
) -> Result<Box<dyn Write + 'a>, std::io::Error> {
    match compression {
        Some(Compression::Bzip2) => {
            let encoder = BzEncoder::new(writer, bzip2::Compression::best());
            Ok(Box::new(encoder))
        }
        Some(Compression::Gzip(lvl)) => {
            let encoder =
                GzEncoder::new(writer, flate2::Compression::new(lvl.into()));
            Ok(Box::new(encoder))
        }
        Some(Compression::Lz4(lvl)) => {
            let encoder = lz4::EncoderBuilder::new()
                .auto_flush(true)
                .level(lvl.into())
                .build(writer)?;
            Ok(Box::new(encoder))
        }
        Some(Compression::Zstd(lvl)) => {
            let encoder = zstd::Encoder::new(writer, lvl.into())?;
            Ok(Box::new(encoder.auto_finish()))
        }
        None => Ok(Box::new(writer)),
    }
}

lazy_static! {
    static ref COMPRESSION_RE: Regex =
        Regex::new(r"^(?P<algo>[[:alnum:]]+)(?:_(?P<lvl>\d+))?$")
            .expect("valid compression regex");
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ParseCompressionErr {
    #[error("Unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Level {1} not supported for {0} compression")]
    UnsupportedLevel(String, String),
}

fn level(
    algo: &str,
    lvl: Option<&str>,
    default: u8,
    max: u8,
) -> Result<u8, ParseCompressionErr> {
    let Some(lvl) = lvl else {
        return Ok(default);
    };
    match lvl.parse::<u8>() {
        Ok(l) if l <= max => Ok(l),
        _ => Err(ParseCompressionErr::UnsupportedLevel(
            algo.to_owned(),
            lvl.to_owned(),
        )),
    }
}

impl FromStr for Compression {
    type Err = ParseCompressionErr;

    /// Parse `algorithm[_level]`, e.g. `gz` or `zstd_19`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Compression::*;
        use ParseCompressionErr::*;

        let lower_case = s.to_ascii_lowercase();
        let Some(captures) = COMPRESSION_RE.captures(&lower_case) else {
            return Err(UnknownAlgorithm(s.to_owned()));
        };
        let algo = &captures["algo"];
        let lvl = captures.name("lvl").map(|m| m.as_str());
        match algo {
            "bzip2" | "bz2" => match lvl {
                Some(lvl) => Err(UnsupportedLevel(algo.into(), lvl.into())),
                None => Ok(Bzip2),
            },
            "gzip" | "gz" => level(algo, lvl, GZIP_DEFAULT_LEVEL, 9).map(Gzip),
            "lz4" => level(algo, lvl, LZ4_DEFAULT_LEVEL, 16).map(Lz4),
            "zstd" | "zstandard" => {
                level(algo, lvl, ZSTD_DEFAULT_LEVEL, 19).map(Zstd)
            }
            _ => Err(UnknownAlgorithm(s.to_owned())),
        }
    }
}
