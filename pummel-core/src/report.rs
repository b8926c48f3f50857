use crate::config::{LatencyUnit, ReportConfig};
use crate::stats::Summary;
use std::fmt;
use std::io::{self, Write};

/// Text rendering of a [`Summary`].
///
/// Fields are printed in a fixed order: total, slowest, fastest, average, requests/sec, speed
/// index, then one line per status code.
pub struct Report<'a> {
    summary: &'a Summary,
    config: &'a ReportConfig,
}

impl<'a> Report<'a> {
    pub fn new(summary: &'a Summary, config: &'a ReportConfig) -> Self {
        Self { summary, config }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;

        writeln!(f, "\nSummary:")?;
        writeln!(f, "  total:\t{} secs", s.total.as_secs_f64())?;
        writeln!(f, "  slowest:\t{} secs", s.slowest_secs())?;
        writeln!(f, "  fastest:\t{} secs", s.fastest_secs())?;
        match self.config.average_unit {
            LatencyUnit::Seconds => writeln!(f, "  average:\t{} secs", s.mean_latency_secs())?,
            LatencyUnit::Nanoseconds => writeln!(f, "  average:\t{} ns", s.mean_latency_nanos)?,
        }
        writeln!(f, "  requests/sec:\t{}", s.requests_per_second)?;
        writeln!(f, "  speed index:\t{}", s.speed_index)?;

        if self.config.status_codes {
            writeln!(f, "\nStatus code distribution:")?;
            for (code, count) in s.status_codes.iter() {
                writeln!(f, "  [{code}]\t{count} responses")?;
            }
        }

        Ok(())
    }
}

impl Summary {
    pub fn report<'a>(&'a self, config: &'a ReportConfig) -> Report<'a> {
        Report::new(self, config)
    }

    /// Write the report to `sink`.
    pub fn write_report<W: Write>(&self, mut sink: W, config: &ReportConfig) -> io::Result<()> {
        write!(sink, "{}", self.report(config))?;
        sink.flush()
    }

    /// Write the report to standard output.
    pub fn print(&self, config: &ReportConfig) -> io::Result<()> {
        self.write_report(io::stdout().lock(), config)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.report(&ReportConfig::default()), f)
    }
}
