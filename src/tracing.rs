use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use indicatif::ProgressBar;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Sets up the global tracing subscriber.
///
/// Verbose runs log to stderr, suspending `bar` while each line is written so the bar
/// is redrawn below it. Otherwise the log file is truncated and receives every event.
/// `RUST_LOG` overrides the default `info` filter in both modes.
pub fn init_tracing(verbose: bool, logfile: &Path, bar: &ProgressBar) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if verbose {
        builder
            .with_target(false)
            .with_writer(BarWriter { bar: bar.clone() })
            .try_init()
    } else {
        let file = File::create(logfile)
            .with_context(|| format!("opening log file {}", logfile.display()))?;
        builder
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .with_writer(Mutex::new(file))
            .try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

#[derive(Clone)]
struct BarWriter {
    bar: ProgressBar,
}

impl<'a> MakeWriter<'a> for BarWriter {
    type Writer = BarLine;

    fn make_writer(&'a self) -> Self::Writer {
        BarLine {
            bar: self.bar.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted event and prints it with the bar hidden.
struct BarLine {
    bar: ProgressBar,
    buf: Vec<u8>,
}

impl Write for BarLine {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.buf);
        self.bar.suspend(|| {
            let mut err = io::stderr().lock();
            err.write_all(&line)?;
            err.flush()
        })
    }
}

impl Drop for BarLine {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_line_buffers_until_flushed() {
        let writer = BarWriter {
            bar: ProgressBar::hidden(),
        };
        let mut line = writer.make_writer();
        line.write_all(b"INFO Running ID 10...\n").unwrap();
        assert_eq!(line.buf, b"INFO Running ID 10...\n");
        line.flush().unwrap();
        assert!(line.buf.is_empty());
    }
}
