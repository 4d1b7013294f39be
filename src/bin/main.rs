mod opt;

use std::path::Path;
use std::sync::Arc;

use crate::opt::Opt;

use anyhow::{bail, Context, Result};
use clap::Parser;
use diphoton::{
    config::{CalibrationSettings, Configuration},
    event::Event,
    event_list::EventList,
    grl::{FileGrl, NoGrl},
    histogram::HistogramStore,
    processor::{Processed, Processor, ProcessorKind},
    progress_bar::{Progress, ProgressBar},
    reader::EventReader,
    traits::{GoodRunsList, ProcessEvent},
    writer::{EventWriter, FileWriter},
    GIT_BRANCH, GIT_REV, VERSION,
};
use env_logger::Env;
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;

/// What processing a single input file yields
enum FileOutput {
    Store(HistogramStore),
    Events(Vec<Event>),
}

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args).validate()?;

    let env = Env::default().filter_or("DIPHOTON_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()?;

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("diphoton {VERSION} rev {rev} ({branch})");
    } else {
        info!("diphoton {VERSION}");
    }

    debug!("settings: {:#?}", opt);

    let config = configuration(&opt)?;
    debug!("configuration: {config:#?}");

    let mut output = Output::new(config.processor, &opt)?;
    // at most one file per thread is held in memory
    let chunk_size = rayon::current_num_threads().max(1);
    let progress = ProgressBar::new(opt.infiles.len() as u64, "files processed:");
    for files in opt.infiles.chunks(chunk_size) {
        let outputs: Vec<_> = files
            .par_iter()
            .map(|file| {
                let res = process_file(file, &config, &progress);
                progress.inc(1);
                res
            })
            .collect::<Result<_>>()?;
        for file_output in outputs {
            output.add(file_output)?;
        }
    }
    progress.finish();
    info!("Processed {} events", progress.events());

    output.finish(&opt)?;
    info!("done");
    Ok(())
}

fn configuration(opt: &Opt) -> Result<Configuration> {
    let grl: Arc<dyn GoodRunsList + Send + Sync> = match &opt.grl {
        Some(path) => Arc::new(
            FileGrl::from_file(path)
                .with_context(|| format!("Failed to load good runs list {path:?}"))?,
        ),
        None => Arc::new(NoGrl {}),
    };
    let excluded_events = opt
        .ee_event_file
        .as_ref()
        .map(|path| {
            EventList::from_file(path)
                .with_context(|| format!("Failed to load event list {path:?}"))
        })
        .transpose()?
        .map(Arc::new);
    let calibration = CalibrationSettings::from_files(&opt.calibration_files())
        .with_context(|| "Failed to load calibration inputs")?;

    Ok(Configuration::builder()
        .processor(opt.processor)
        .grl(grl)
        .excluded_events(excluded_events)
        .do_pileup_reweighting(opt.rw_pileup)
        .do_sf_reweighting(opt.rw_scalefactor)
        .require_mc_match(opt.require_mc_match)
        .filter_reco_photons(opt.filter_reco_ph)
        .apply_pt_slice(opt.apply_pt_slice)
        .kfactor(opt.kfactor)
        .systematic(opt.systematic)
        .calibration(calibration)
        .build())
}

fn process_file(
    path: &Path,
    config: &Configuration,
    progress: &ProgressBar,
) -> Result<FileOutput> {
    let mut processor = Processor::new(config);
    let mut events = Vec::new();
    let mut reader = EventReader::from_file(path)?;
    for event in &mut reader {
        let event = event?;
        match processor
            .process(&event)
            .with_context(|| format!("Failed to process event from {path:?}"))?
        {
            Processed::Event(event) => events.push(*event),
            Processed::Outcome(_) => {}
        }
    }
    progress.add_events(reader.nread() as u64);
    debug!("Finished {path:?}");
    Ok(match processor.into_store() {
        Some(store) => FileOutput::Store(store),
        None => FileOutput::Events(events),
    })
}

/// Where the results of all input files end up
enum Output {
    Histograms(HistogramStore),
    Events(EventWriter<'static>),
}

impl Output {
    fn new(kind: ProcessorKind, opt: &Opt) -> Result<Self> {
        let output = match kind {
            ProcessorKind::Analysis => Self::Histograms(HistogramStore::new()),
            ProcessorKind::Filter => Self::Events(
                FileWriter::builder()
                    .filename(opt.outfile.clone())
                    .compression(opt.compression)
                    .build()
                    .create()?,
            ),
        };
        Ok(output)
    }

    fn add(&mut self, file_output: FileOutput) -> Result<()> {
        match (self, file_output) {
            (Self::Histograms(total), FileOutput::Store(store)) => total.merge(store)?,
            (Self::Events(writer), FileOutput::Events(events)) => {
                for event in &events {
                    writer.write(event)?;
                }
            }
            _ => bail!("Processor output does not match the output file"),
        }
        Ok(())
    }

    fn finish(self, opt: &Opt) -> Result<()> {
        match self {
            Self::Histograms(total) => write_histograms(total, opt),
            Self::Events(writer) => {
                let nwritten = writer.finish()?;
                info!("Wrote {nwritten} events to {:?}", opt.outfile);
                Ok(())
            }
        }
    }
}

fn write_histograms(total: HistogramStore, opt: &Opt) -> Result<()> {
    let cutflow = total
        .cutflow
        .iter()
        .map(|(name, counts)| {
            format!("{name:>14} {:>10} {:>14.3}", counts.passed, counts.weighted)
        })
        .join("\n");
    info!("Cutflow:\n{cutflow}");
    info!("Writing histograms to {:?}", opt.outfile);
    total
        .write(&opt.outfile, opt.compression)
        .with_context(|| format!("Failed to write to {:?}", opt.outfile))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use diphoton::event::Photon;

    fn event(event_number: u32) -> Event {
        Event {
            run_number: 180164,
            event_number,
            photons: vec![Photon {
                pt: 42e3,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn filter_output_is_written_per_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let outfile = dir.path().join("filtered.yaml");
        let args: Vec<std::ffi::OsString> = vec![
            "diphoton".into(),
            "--outfile".into(),
            outfile.clone().into_os_string(),
            "--processor".into(),
            "Filter".into(),
            "events.yaml".into(),
        ];
        let opt = Opt::parse_from(args);
        let mut output = Output::new(ProcessorKind::Filter, &opt).unwrap();
        output
            .add(FileOutput::Events(vec![event(3), event(1)]))
            .unwrap();
        output.add(FileOutput::Events(vec![event(2)])).unwrap();
        assert!(output
            .add(FileOutput::Store(HistogramStore::new()))
            .is_err());
        output.finish(&opt).unwrap();

        let numbers: Vec<_> = EventReader::from_file(&outfile)
            .unwrap()
            .map(|event| event.unwrap().event_number)
            .collect();
        assert_eq!(numbers, [3, 1, 2]);
    }
}
