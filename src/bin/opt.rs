use std::path::PathBuf;

use clap::Parser;
use diphoton::compression::Compression;
use diphoton::config::{CalibrationFiles, Systematic};
use diphoton::kfactor::KFactorVariant;
use diphoton::processor::ProcessorKind;
use diphoton::scale_factor::ScaleFactorKey;
use thiserror::Error;

#[derive(Debug, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Output file.
    ///
    /// The analysis writes histograms, cutflow, and sample metadata.
    /// The filter writes the slimmed events.
    #[clap(long, short, value_parser)]
    pub(crate) outfile: PathBuf,

    #[clap(
        long,
        default_value = "Analysis",
        value_parser = ProcessorKind::from_name,
        help = "Event processor.
Possible values are 'Analysis' and 'Filter'."
    )]
    pub(crate) processor: ProcessorKind,

    /// Good runs list with lines `run first_lumi_block last_lumi_block`.
    ///
    /// Without a good runs list all data events pass.
    #[clap(long, value_parser)]
    pub(crate) grl: Option<PathBuf>,

    /// List of events vetoed by the `!ee` cut, one `run event lumi_block` per line.
    #[clap(long, value_parser)]
    pub(crate) ee_event_file: Option<PathBuf>,

    /// Pileup profiles of the simulated samples.
    #[clap(long, value_parser)]
    pub(crate) pileup_mc: Option<PathBuf>,

    /// Pileup profiles of data.
    #[clap(long, value_parser)]
    pub(crate) pileup_data: Option<PathBuf>,

    /// Reweight simulated events to the pileup conditions in data.
    #[clap(long, requires_all = ["pileup_mc", "pileup_data"])]
    pub(crate) rw_pileup: bool,

    /// Weight simulated events with photon identification scale factors.
    #[clap(long)]
    pub(crate) rw_scalefactor: bool,

    /// Binned scale factor tables.
    ///
    /// Without tables, the fudge factors for forward unconverted photons
    /// are used.
    #[clap(long, value_parser)]
    pub(crate) scale_factors: Option<PathBuf>,

    /// Scale factor set.
    #[clap(long, default_value_t)]
    pub(crate) sf_set: u32,

    /// Scale factor probe range.
    #[clap(long, default_value_t)]
    pub(crate) sf_range: u32,

    /// Scale factor release.
    #[clap(long, default_value_t)]
    pub(crate) sf_release: u32,

    /// Use transverse energy corrected scale factors.
    #[clap(long)]
    pub(crate) sf_et_correction: bool,

    /// YAML file with calibration constants.
    #[clap(long, value_parser)]
    pub(crate) calibration: Option<PathBuf>,

    /// Require both photons to be matched to the hard process in simulation.
    #[clap(long)]
    pub(crate) require_mc_match: bool,

    /// Drop reconstructed photons below 20 GeV when filtering.
    #[clap(long)]
    pub(crate) filter_reco_ph: bool,

    /// Apply the leading photon transverse momentum window of sliced samples.
    #[clap(long)]
    pub(crate) apply_pt_slice: bool,

    #[clap(
        long,
        default_value = "nominal",
        help = "Variation of the SM diphoton k-factor.
Possible values are 'nominal', 'up', 'down', 'off'."
    )]
    pub(crate) kfactor: KFactorVariant,

    /// Systematic variation. The only supported value is 'noprw'.
    #[clap(long)]
    pub(crate) systematic: Option<Systematic>,

    #[clap(long,
                help = "Compress output file.
Possible settings are 'bzip2', 'gzip', 'zstd', 'lz4'.
Compression levels can be set with algorithm_level e.g. 'zstd_5'.
Maximum levels are 'gzip_9', 'zstd_19', 'lz4_16'.")]
    pub(crate) compression: Option<Compression>,

    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    pub(crate) loglevel: String,

    #[clap(
        short,
        long,
        default_value_t,
        help = "Number of threads.
If set to 0, a default number of threads is chosen.
The default can be set with the `RAYON_NUM_THREADS` environment
variable."
    )]
    pub(crate) threads: usize,

    /// Input event files.
    #[clap(name = "INFILES", value_parser, required = true)]
    pub(crate) infiles: Vec<PathBuf>,
}

impl Opt {
    pub(crate) fn validate(self) -> Result<Self, ValidationError> {
        if self.pileup_mc.is_some() != self.pileup_data.is_some() {
            return Err(ValidationError::IncompletePileup);
        }
        if self.filter_reco_ph && self.processor != ProcessorKind::Filter {
            return Err(ValidationError::FilterOnly("--filter-reco-ph"));
        }
        Ok(self)
    }

    pub(crate) fn calibration_files(&self) -> CalibrationFiles {
        CalibrationFiles {
            constants: self.calibration.clone(),
            pileup_mc: self.pileup_mc.clone(),
            pileup_data: self.pileup_data.clone(),
            scale_factors: self.scale_factors.clone(),
            scale_factor_key: ScaleFactorKey {
                set: self.sf_set,
                range: self.sf_range,
                release: self.sf_release,
                et_correction: self.sf_et_correction,
            },
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ValidationError {
    #[error("Pileup profiles have to be given for both simulation and data")]
    IncompletePileup,
    #[error("Option {0} requires the Filter processor")]
    FilterOnly(&'static str),
}
