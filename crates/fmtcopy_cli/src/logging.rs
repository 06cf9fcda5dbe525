use eyre::{Context, Result};
use indicatif::ProgressBar;
use log::{LevelFilter, Log, Metadata, Record};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Logger that clears the progress bar around every record it writes, so log
/// lines never interleave with a half-drawn bar.
pub struct ProgressAwareLogger {
    inner: Box<dyn Log>,
    progress_bar: ProgressBar,
}

impl ProgressAwareLogger {
    pub fn new(inner: Box<dyn Log>, progress_bar: ProgressBar) -> Self {
        Self {
            inner,
            progress_bar,
        }
    }
}

impl Log for ProgressAwareLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.inner.enabled(record.metadata()) {
            self.progress_bar.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install a stderr `TermLogger` for this crate and the engine, wrapped so it
/// cooperates with `progress_bar`.
pub fn init_logging(level: LevelFilter, progress_bar: ProgressBar) -> Result<()> {
    let config = ConfigBuilder::new()
        .add_filter_allow_str("fmtcopy")
        .build();
    let term_logger = TermLogger::new(level, config, TerminalMode::Stderr, ColorChoice::Auto);
    log::set_boxed_logger(Box::new(ProgressAwareLogger::new(term_logger, progress_bar)))
        .wrap_err("failed to initialize logging")?;
    log::set_max_level(level);
    Ok(())
}
