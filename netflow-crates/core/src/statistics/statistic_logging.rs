//! The process-wide sink which statistics are written to.
//!
//! Nothing is written until [`configure_statistic_logging`] installs a [`StatisticOptions`].
//! Every statistic then becomes one line `{prefix} {name}={value}`, and a block of statistics
//! can be closed by a fixed line.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io::Write;
use std::sync::Mutex;
use std::sync::OnceLock;

use convert_case::Case;
use convert_case::Casing;

/// Where statistics go and how their lines look.
pub struct StatisticOptions {
    prefix: &'static str,
    closing_line: Option<&'static str>,
    casing: Option<Case>,
    writer: Box<dyn Write + Send>,
}

impl StatisticOptions {
    /// Writes to stdout, starting every line with `prefix` and keeping names as they are.
    pub fn new(prefix: &'static str) -> Self {
        StatisticOptions {
            prefix,
            closing_line: None,
            casing: None,
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Ends every block of statistics with `closing_line`.
    pub fn with_closing_line(mut self, closing_line: &'static str) -> Self {
        self.closing_line = Some(closing_line);
        self
    }

    /// Converts the names of the statistics to `casing`.
    pub fn with_casing(mut self, casing: Case) -> Self {
        self.casing = Some(casing);
        self
    }

    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    fn format_statistic(&self, name: &str, value: impl Display) -> String {
        match self.casing {
            Some(casing) => format!("{} {}={value}", self.prefix, name.to_case(casing)),
            None => format!("{} {name}={value}", self.prefix),
        }
    }
}

impl Debug for StatisticOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticOptions")
            .field("prefix", &self.prefix)
            .field("closing_line", &self.closing_line)
            .field("casing", &self.casing)
            .finish_non_exhaustive()
    }
}

static SINK: OnceLock<Mutex<StatisticOptions>> = OnceLock::new();

/// Turns on statistic logging.
///
/// The sink can be configured once per process; returns `false` and drops `options` if it
/// already was.
pub fn configure_statistic_logging(options: StatisticOptions) -> bool {
    SINK.set(Mutex::new(options)).is_ok()
}

pub fn should_log_statistics() -> bool {
    SINK.get().is_some()
}

/// Writes `name=value` if statistic logging is configured.
pub fn log_statistic(name: impl Display, value: impl Display) {
    write_to_sink(|options| {
        let line = options.format_statistic(&name.to_string(), value);
        writeln!(options.writer, "{line}")
    });
}

/// Writes the closing line of a block of statistics, if there is one.
pub fn log_statistic_postfix() {
    write_to_sink(|options| match options.closing_line {
        Some(closing_line) => writeln!(options.writer, "{closing_line}"),
        None => Ok(()),
    });
}

fn write_to_sink(write: impl FnOnce(&mut StatisticOptions) -> std::io::Result<()>) {
    let Some(sink) = SINK.get() else {
        return;
    };
    let Ok(mut options) = sink.lock() else {
        return;
    };
    if let Err(error) = write(&mut options) {
        log::warn!("cannot write statistics: {error}");
    }
}
