use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use diphoton::{
    compression::Compression,
    pileup::{PileupProfile, DATA_CHANNEL},
    progress_bar::{Progress, ProgressBar},
    reader::EventReader,
    GIT_BRANCH, GIT_REV, VERSION,
};
use env_logger::Env;
use log::{debug, info};
use rayon::prelude::*;

/// Generate pileup profiles for reweighting
#[derive(Debug, Parser)]
#[clap(about, author, version)]
struct Opt {
    /// Output file
    #[clap(long, short, value_parser)]
    outfile: PathBuf,

    #[clap(long,
                help = "Compress output file.
Possible settings are 'bzip2', 'gzip', 'zstd', 'lz4'.
Compression levels can be set with algorithm_level e.g. 'zstd_5'.
Maximum levels are 'gzip_9', 'zstd_19', 'lz4_16'.")]
    compression: Option<Compression>,

    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    loglevel: String,

    #[clap(
        short,
        long,
        default_value_t,
        help = "Number of threads.
If set to 0, a default number of threads is chosen.
The default can be set with the `RAYON_NUM_THREADS` environment
variable."
    )]
    threads: usize,

    /// Input event files
    #[clap(name = "INFILES", value_parser, required = true)]
    infiles: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);

    let env = Env::default().filter_or("DIPHOTON_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()?;

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("diphoton-pileup {VERSION} rev {rev} ({branch})");
    } else {
        info!("diphoton-pileup {VERSION}");
    }
    debug!("settings: {:#?}", opt);

    let progress = ProgressBar::new(opt.infiles.len() as u64, "files processed:");
    let profiles: Vec<_> = opt
        .infiles
        .par_iter()
        .map(|file| {
            let res = fill_profile(file, &progress);
            progress.inc(1);
            res
        })
        .collect::<Result<_>>()?;
    progress.finish();
    info!("Processed {} events", progress.events());

    let mut total = PileupProfile::default();
    for profile in profiles {
        total.merge(profile)?;
    }
    info!(
        "Writing {} pileup profiles to {:?}",
        total.profiles.len(),
        opt.outfile
    );
    total
        .write(&opt.outfile, opt.compression)
        .with_context(|| format!("Failed to write to {:?}", opt.outfile))?;
    info!("done");
    Ok(())
}

fn fill_profile(path: &Path, progress: &ProgressBar) -> Result<PileupProfile> {
    let mut profile = PileupProfile::default();
    let mut reader = EventReader::from_file(path)?;
    for event in &mut reader {
        let event = event?;
        let channel = if event.is_simulation {
            event.mc_channel_number
        } else {
            DATA_CHANNEL
        };
        profile.fill(
            event.run_number,
            channel,
            event.mc_event_weight,
            event.average_interactions,
        );
    }
    progress.add_events(reader.nread() as u64);
    Ok(profile)
}
