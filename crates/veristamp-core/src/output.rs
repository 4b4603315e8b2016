//! Report output for attested captures.
//!
//! Each pipeline invocation yields one [`AttestationReport`]. Reports are
//! written either as a single JSON array or streamed one per line (JSONL).

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use crate::types::{AttestationReport, FailureKind};

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array holding every report
    Json,
    /// One report object per line
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Whether reports can be emitted as soon as each capture finishes.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::JsonLines)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::JsonLines => f.write_str("jsonl"),
        }
    }
}

/// Writes attestation reports in the configured format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON array format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            written: 0,
        }
    }

    /// Stream one report as a single line.
    ///
    /// Only meaningful for JSONL; a JSON array must be written in one go
    /// with [`write_all`](Self::write_all).
    pub fn write_line(&mut self, report: &AttestationReport) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, report).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.written += 1;
        Ok(())
    }

    /// Write a full batch of reports.
    pub fn write_all(&mut self, reports: &[AttestationReport]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, reports)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, reports).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.written += reports.len();
            }
            OutputFormat::JsonLines => {
                for report in reports {
                    self.write_line(report)?;
                }
            }
        }
        Ok(())
    }

    pub fn reports_written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attested: usize,
    pub saved: usize,
    pub failed: BTreeMap<FailureKind, usize>,
    pub retries: u32,
}

impl BatchSummary {
    pub fn record(&mut self, report: &AttestationReport) {
        self.retries += report.attempts.saturating_sub(1);
        match report.kind {
            None => {
                self.attested += 1;
                if report.output_path.is_some() {
                    self.saved += 1;
                }
            }
            Some(kind) => *self.failed.entry(kind).or_default() += 1,
        }
    }

    pub fn failed_total(&self) -> usize {
        self.failed.values().sum()
    }

    pub fn total(&self) -> usize {
        self.attested + self.failed_total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineResult;
    use std::path::PathBuf;

    fn failed(kind: FailureKind, attempts: u32) -> AttestationReport {
        AttestationReport::from_result(
            PathBuf::from("a.jpg"),
            &PipelineResult::failure(kind, "nope"),
            attempts,
        )
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer
            .write_all(&[failed(FailureKind::Rejected, 1), failed(FailureKind::Transport, 2)])
            .unwrap();
        assert_eq!(writer.reports_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["kind"], "transport");
    }

    #[test]
    fn test_write_jsonl_one_report_per_line() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer.write_line(&failed(FailureKind::Encoding, 1)).unwrap();
        writer.write_line(&failed(FailureKind::Rejected, 1)).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        // Pretty printing never applies to JSONL
        assert!(lines[0].starts_with('{') && lines[0].ends_with('}'));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("ndjson"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("csv"), None);
        assert_eq!(OutputFormat::JsonLines.to_string(), "jsonl");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.record(&failed(FailureKind::Transport, 3));
        summary.record(&failed(FailureKind::Transport, 1));
        summary.record(&failed(FailureKind::Rejected, 1));

        assert_eq!(summary.failed_total(), 3);
        assert_eq!(summary.failed[&FailureKind::Transport], 2);
        assert_eq!(summary.retries, 2);
        assert_eq!(summary.total(), 3);
    }
}
