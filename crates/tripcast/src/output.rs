// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of command results for a terminal or for scripts.

use std::io::IsTerminal;

use colored::Colorize;
use serde::Serialize;
use tripcast_core::TripcastError;
use tripcast_dispatch::{DispatchSummary, RetrySummary, SingleDispatchResult};
use tripcast_quota::UsageSnapshot;
use tripcast_report::{BatchSummary, DaySummary, RetryHistogram, StatusCounts};

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pretty JSON on stdout.
    Json,
    /// Human-readable lines, colored when `color` is set.
    Human { color: bool },
}

impl OutputMode {
    pub fn detect(json: bool, plain: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human {
                color: !plain && std::io::stdout().is_terminal(),
            }
        }
    }
}

/// Implemented by every result a command can print.
pub trait Render: Serialize {
    fn human(&self, color: bool) -> Vec<String>;
}

/// Prints `value` in the requested mode.
pub fn emit<T: Render>(value: &T, mode: OutputMode) -> Result<(), TripcastError> {
    match mode {
        OutputMode::Json => {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| TripcastError::Internal(format!("failed to encode output: {e}")))?;
            println!("{text}");
        }
        OutputMode::Human { color } => {
            for line in value.human(color) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn paint(text: String, color: bool, style: fn(String) -> colored::ColoredString) -> String {
    if color { style(text).to_string() } else { text }
}

fn green(text: String, color: bool) -> String {
    paint(text, color, |t| t.green())
}

fn red(text: String, color: bool) -> String {
    paint(text, color, |t| t.red())
}

fn yellow(text: String, color: bool) -> String {
    paint(text, color, |t| t.yellow())
}

fn bold(text: String, color: bool) -> String {
    paint(text, color, |t| t.bold())
}

fn counts_line(counts: &StatusCounts, color: bool) -> String {
    format!(
        "  {}  {}  {}  {}",
        green(format!("sent {}", counts.sent), color),
        red(format!("failed {}", counts.failed), color),
        format!("pending {}", counts.pending),
        yellow(
            format!("template required {}", counts.template_required),
            color
        ),
    )
}

impl Render for DispatchSummary {
    fn human(&self, color: bool) -> Vec<String> {
        let mut lines = vec![
            bold(format!("Dispatch {}", self.upload_id), color),
            format!(
                "  {}  {}  {}",
                green(format!("sent {}", self.sent_count), color),
                red(format!("failed {}", self.failed_count), color),
                yellow(
                    format!("template required {}", self.template_required_count),
                    color
                ),
            ),
            format!(
                "  skipped {}  remaining {}",
                self.skipped_count, self.remaining_to_process
            ),
        ];
        if self.limit_reached {
            lines.push(yellow(
                "  daily limit reached; run the dispatch again tomorrow".to_string(),
                color,
            ));
        }
        lines
    }
}

impl Render for SingleDispatchResult {
    fn human(&self, color: bool) -> Vec<String> {
        let line = if self.success {
            green(format!("sent: {}", self.message), color)
        } else {
            red(format!("not sent: {}", self.message), color)
        };
        vec![line]
    }
}

impl Render for RetrySummary {
    fn human(&self, color: bool) -> Vec<String> {
        let mut lines = vec![
            bold(format!("Retry {}", self.upload_id), color),
            format!(
                "  retried {}  {}  {}  {}",
                self.retried_count,
                green(format!("recovered {}", self.recovered_count), color),
                red(format!("still failed {}", self.still_failed_count), color),
                yellow(
                    format!("template required {}", self.template_required_count),
                    color
                ),
            ),
        ];
        if self.excluded_at_ceiling > 0 {
            lines.push(format!(
                "  {} record(s) at the retry ceiling need manual attention",
                self.excluded_at_ceiling
            ));
        }
        if self.limit_reached {
            lines.push(yellow("  daily limit reached".to_string(), color));
        }
        lines
    }
}

impl Render for BatchSummary {
    fn human(&self, color: bool) -> Vec<String> {
        vec![
            bold(
                format!(
                    "Upload {} ({} / bus {}, {})",
                    self.upload_id, self.agency_id, self.bus_id, self.upload_date
                ),
                color,
            ),
            format!("  file {}", self.file_name),
            format!(
                "  {}  {}  pending {}  {}",
                green(format!("sent {}", self.sent_count), color),
                red(format!("failed {}", self.failed_count), color),
                self.pending_count,
                yellow(
                    format!("template required {}", self.template_required_count),
                    color
                ),
            ),
            format!(
                "  {} of {} processed ({:.2}%)",
                self.total - self.pending_count,
                self.total,
                self.progress_percentage
            ),
        ]
    }
}

impl Render for DaySummary {
    fn human(&self, color: bool) -> Vec<String> {
        let mut lines = vec![
            bold(
                format!("{}: {} upload(s)", self.date, self.upload_count),
                color,
            ),
            counts_line(&self.totals, color),
            format!("  progress {:.2}%", self.progress_percentage),
        ];
        for batch in &self.batches {
            lines.push(format!(
                "  - {} {} bus {}: {}/{} sent, {} failed",
                batch.upload_id,
                batch.agency_id,
                batch.bus_id,
                batch.sent_count,
                batch.total,
                batch.failed_count
            ));
        }
        lines
    }
}

impl Render for UsageSnapshot {
    fn human(&self, color: bool) -> Vec<String> {
        let used = format!(
            "{} / {} ({:.2}%)",
            self.sent_today, self.estimated_limit, self.percentage
        );
        let used = if self.remaining == 0 {
            red(used, color)
        } else if self.percentage >= 80.0 {
            yellow(used, color)
        } else {
            green(used, color)
        };
        vec![
            bold(format!("Usage {} [{}]", self.date, self.quota_key), color),
            format!("  sent {used}"),
            format!("  remaining {}", self.remaining),
        ]
    }
}

impl Render for RetryHistogram {
    fn human(&self, color: bool) -> Vec<String> {
        vec![
            bold("Retried records by attempt count".to_string(), color),
            format!("  1: {}", self.one),
            format!("  2: {}", self.two),
            format!("  3: {}", self.three),
            format!("  4+: {}", self.four_plus),
            format!(
                "  {}  {}",
                green(format!("recovered {}", self.recovered), color),
                red(format!("still failed {}", self.still_failed), color),
            ),
        ]
    }
}

/// Result of `ingest`.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub upload_id: String,
    pub stored: usize,
}

impl Render for IngestReport {
    fn human(&self, color: bool) -> Vec<String> {
        vec![green(
            format!("stored {} traveler(s) for upload {}", self.stored, self.upload_id),
            color,
        )]
    }
}

/// Result of `requeue-templates`.
#[derive(Debug, Serialize)]
pub struct RequeueReport {
    pub upload_id: String,
    pub requeued: u64,
}

impl Render for RequeueReport {
    fn human(&self, _color: bool) -> Vec<String> {
        vec![format!(
            "moved {} record(s) of {} back to pending",
            self.requeued, self.upload_id
        )]
    }
}

/// Result of `correct-phone`.
#[derive(Debug, Serialize)]
pub struct PhoneCorrection {
    pub traveler_id: String,
}

impl Render for PhoneCorrection {
    fn human(&self, _color: bool) -> Vec<String> {
        vec![format!("phone of {} updated; it will be retried", self.traveler_id)]
    }
}
