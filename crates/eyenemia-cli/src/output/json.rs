//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use eyenemia_core::{ResultOutput, ScreeningReport};

use super::OutputFormat;

/// JSON and JSON Lines output adapter.
///
/// In `jsonl` mode every report is written as it arrives. In `json` mode
/// reports are buffered and emitted as one array by [`JsonOutput::finish`].
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    format: OutputFormat,
    pretty: bool,
    pending: Mutex<Vec<ScreeningReport>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat, pretty: bool) -> Self {
        Self::new(Box::new(io::stdout()), format, pretty)
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
            pretty,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Emits buffered reports (`json` mode) and flushes the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn finish(&self) -> Result<()> {
        if self.format == OutputFormat::Json {
            let reports = std::mem::take(
                &mut *self
                    .pending
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?,
            );
            self.write_array(&reports)?;
        }
        self.flush()
    }

    fn write_array(&self, reports: &[ScreeningReport]) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(reports)?
        } else {
            serde_json::to_string(reports)?
        };
        self.write_line(&json)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    fn write(&self, report: &ScreeningReport) -> Result<()> {
        match self.format {
            OutputFormat::Jsonl => self.write_line(&serde_json::to_string(report)?),
            OutputFormat::Json => {
                self.pending
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?
                    .push(report.clone());
                Ok(())
            }
        }
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eyenemia_core::{QualityVerdict, Verdict, VerdictSummary};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn report(path: &str) -> ScreeningReport {
        let mut report = ScreeningReport::new(path, "2026-01-01T00:00:00Z");
        report.quality = Some(QualityVerdict::accepted(120.0));
        report.verdict = Some(VerdictSummary::from(&Verdict::RegionNotFound));
        report
    }

    #[test]
    fn test_jsonl_writes_each_report_immediately() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Jsonl, false);

        output.write(&report("a.png")).unwrap();
        assert_eq!(buf.contents().lines().count(), 1);
        output.write(&report("b.png")).unwrap();
        output.finish().unwrap();

        let lines: Vec<_> = buf.contents().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["path"], "a.png");
        assert_eq!(first["verdict"]["status"], "region_not_found");
        assert_eq!(first["verdict"]["label"], "Eye Region Not Found");
    }

    #[test]
    fn test_json_buffers_until_finish() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Json, true);

        output.write(&report("a.png")).unwrap();
        output.write(&report("b.png")).unwrap();
        assert!(buf.contents().is_empty());

        output.finish().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&buf.contents()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert!(buf.contents().contains('\n'));
    }

    #[test]
    fn test_json_empty_batch_is_empty_array() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Json, false);
        output.finish().unwrap();
        assert_eq!(buf.contents().trim(), "[]");
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let buf = SharedBuf::default();
        let output = JsonOutput::new(Box::new(buf.clone()), OutputFormat::Jsonl, false);
        output
            .write(&ScreeningReport::new("x.png", "2026-01-01T00:00:00Z"))
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(buf.contents().trim()).unwrap();
        let obj = parsed.as_object().unwrap();
        assert!(obj.contains_key("path"));
        assert!(obj.contains_key("timestamp"));
        assert!(!obj.contains_key("verdict"));
        assert!(!obj.contains_key("error"));
    }
}
