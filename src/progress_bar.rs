pub use crate::traits::Progress;

use std::sync::atomic::{AtomicU64, Ordering};

use log::LevelFilter;

const TEMPLATE: &str = "{bar:60.cyan/cyan} {prefix} {pos}/{len} [{elapsed}] {msg}";

enum Bar {
    Hidden,
    Terminal(indicatif::ProgressBar),
    Log(logbar::ProgressBar),
}

/// Progress over the input files
///
/// An interactive terminal gets an indicatif bar which also shows the
/// number of processed events, other outputs get a logbar. Nothing is
/// shown unless the log level is exactly `info`. While a bar is shown
/// only warnings and errors are logged.
pub struct ProgressBar {
    bar: Bar,
    events: AtomicU64,
    restore_level: Option<LevelFilter>,
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self {
            bar: Bar::Hidden,
            events: AtomicU64::new(0),
            restore_level: None,
        }
    }
}

impl ProgressBar {
    /// A new progress bar over `nfiles` input files
    pub fn new(nfiles: u64, message: &str) -> Self {
        if log::max_level().to_level() != Some(log::Level::Info) {
            return Self::default();
        }
        let bar = if console::Term::stderr().features().is_attended() {
            let bar = indicatif::ProgressBar::new(nfiles);
            let style = indicatif::ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
            bar.set_style(style);
            bar.set_prefix(message.to_owned());
            Bar::Terminal(bar)
        } else {
            eprintln!("{message}");
            let style = logbar::Style::new().indicator('█');
            Bar::Log(logbar::ProgressBar::with_style(nfiles as usize, style))
        };
        let restore_level = log::max_level();
        log::set_max_level(LevelFilter::Warn);
        Self {
            bar,
            events: AtomicU64::new(0),
            restore_level: Some(restore_level),
        }
    }

    /// Account for `n` more processed events
    pub fn add_events(&self, n: u64) {
        let total = self.events.fetch_add(n, Ordering::Relaxed) + n;
        if let Bar::Terminal(bar) = &self.bar {
            bar.set_message(format!("{total} events"));
        }
    }

    /// Number of events processed so far
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
}

impl Progress for ProgressBar {
    fn inc(&self, i: u64) {
        match &self.bar {
            Bar::Hidden => {}
            Bar::Terminal(bar) => bar.inc(i),
            Bar::Log(bar) => bar.inc(i as usize),
        }
    }

    fn finish(&self) {
        match &self.bar {
            Bar::Hidden => {}
            Bar::Terminal(bar) => bar.finish(),
            Bar::Log(bar) => bar.finish(),
        }
        if let Some(level) = self.restore_level {
            log::set_max_level(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_events_without_display() {
        let progress = ProgressBar::default();
        progress.add_events(3);
        progress.inc(1);
        progress.add_events(4);
        progress.finish();
        assert_eq!(progress.events(), 7);
    }
}
