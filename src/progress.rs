//! Ingest progress reporting.
//!
//! Reports observable progress during `pdfchat ingest` and `/upload` so users
//! see which document is being processed and how many are left. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// What happened to one document in a batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DocumentOutcome {
    /// Extracted, chunked and stored.
    Added { chunks: usize },
    /// Fingerprint already in the registry.
    Skipped,
    /// Text extraction failed.
    Failed,
}

impl DocumentOutcome {
    fn label(&self) -> &'static str {
        match self {
            DocumentOutcome::Added { .. } => "added",
            DocumentOutcome::Skipped => "skipped",
            DocumentOutcome::Failed => "failed",
        }
    }
}

/// A single progress event for an ingestion batch.
#[derive(Clone, Debug)]
pub enum IngestProgressEvent {
    /// Registry loaded; `total` documents are about to be processed.
    Started { total: u64 },
    /// Document `n` of `total` finished.
    Document {
        n: u64,
        total: u64,
        name: String,
        outcome: DocumentOutcome,
    },
}

/// Reports ingest progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingestion pipeline.
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  3 / 12  added  manual.pdf (14 chunks)".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started { total } => {
                format!("ingest  {} documents\n", format_number(*total))
            }
            IngestProgressEvent::Document {
                n,
                total,
                name,
                outcome,
            } => {
                let detail = match outcome {
                    DocumentOutcome::Added { chunks } => format!(" ({} chunks)", chunks),
                    _ => String::new(),
                };
                format!(
                    "ingest  {} / {}  {}  {}{}\n",
                    format_number(*n),
                    format_number(*total),
                    outcome.label(),
                    name,
                    detail
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Started { total } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": total
            }),
            IngestProgressEvent::Document {
                n,
                total,
                name,
                outcome,
            } => {
                let mut obj = serde_json::json!({
                    "event": "progress",
                    "phase": "document",
                    "n": n,
                    "total": total,
                    "document": name,
                    "outcome": outcome.label()
                });
                if let DocumentOutcome::Added { chunks } = outcome {
                    obj["chunks"] = serde_json::json!(chunks);
                }
                obj
            }
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(DocumentOutcome::Added { chunks: 3 }.label(), "added");
        assert_eq!(DocumentOutcome::Skipped.label(), "skipped");
        assert_eq!(DocumentOutcome::Failed.label(), "failed");
    }
}
