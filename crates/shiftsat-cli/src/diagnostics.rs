//! Rendering of [`ReportItem`]s to the terminal or as JSON.
//!
//! `TerminalEmitter` writes rustc-style lines to a writer (normally stderr);
//! `JsonEmitter` collects items into a serializable array. Both honor
//! `--quiet` (errors only) and compute the process [`ExitCode`] from what
//! they emitted.

use std::io::Write;
use std::process;

use serde::Serialize;
use shiftsat_core::reporter::{ItemCategory, ReportItem};

/// Exit codes for CLI operations: 0 on success, 1 if any error item was
/// emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    pub fn from_error_count(count: usize) -> Self {
        if count > 0 {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ExitCode::Failure)
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

/// Output configuration shared by both emitters.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticConfig {
    /// Suppress violation/passed items; errors are always shown.
    pub quiet: bool,
}

fn category_label(category: ItemCategory) -> &'static str {
    match category {
        ItemCategory::Error => "error",
        ItemCategory::Violation => "violation",
        ItemCategory::Passed => "passed",
    }
}

/// Writes rustc-style diagnostic lines to a writer.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    config: DiagnosticConfig,
    error_count: usize,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, config: DiagnosticConfig) -> Self {
        Self {
            writer,
            config,
            error_count: 0,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_error_count(self.error_count)
    }

    pub fn emit(&mut self, item: &ReportItem) {
        if item.category != ItemCategory::Error && self.config.quiet {
            return;
        }
        if item.category == ItemCategory::Error {
            self.error_count += 1;
        }
        let _ = self.write_item(item);
    }

    fn write_item(&mut self, item: &ReportItem) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{}[{}]: {}",
            category_label(item.category),
            item.kind,
            item.message
        )?;
        if let Some(group) = &item.group {
            writeln!(self.writer, "   = group: {}", group.title)?;
        }
        if let Some(day) = &item.context.day {
            writeln!(self.writer, "   = day: {day}")?;
        }
        if !item.context.time_slots.is_empty() {
            writeln!(
                self.writer,
                "   = time: {}",
                item.context.time_slots.join(", ")
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

/// A single JSON-serializable report item.
#[derive(Debug, Serialize)]
pub struct JsonReportItem {
    pub id: String,
    pub category: String,
    pub kind: String,
    pub message: String,
    pub day: Option<String>,
}

/// Collects [`ReportItem`]s into a JSON-serializable array.
#[derive(Debug, Default)]
pub struct JsonEmitter {
    config: DiagnosticConfig,
    items: Vec<JsonReportItem>,
}

impl JsonEmitter {
    pub fn new(config: DiagnosticConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
        }
    }

    pub fn emit(&mut self, item: &ReportItem) {
        if item.category != ItemCategory::Error && self.config.quiet {
            return;
        }
        self.items.push(JsonReportItem {
            id: item.id.clone(),
            category: category_label(item.category).to_string(),
            kind: item.kind.clone(),
            message: item.message.clone(),
            day: item.context.day.clone(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|i| i.category == "error").count()
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_error_count(self.error_count())
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.items).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftsat_core::reporter::ItemContext;

    fn sample(category: ItemCategory) -> ReportItem {
        ReportItem {
            id: "error:coverage:2024-02-05:_:_:_".into(),
            category,
            kind: "coverage".into(),
            message: "no eligible members".into(),
            group: None,
            context: ItemContext::new().with_day("2024-02-05"),
        }
    }

    #[test]
    fn terminal_emitter_counts_errors_and_sets_failure_exit_code() {
        let mut out = Vec::new();
        let mut emitter = TerminalEmitter::new(&mut out, DiagnosticConfig::default());
        emitter.emit(&sample(ItemCategory::Error));
        assert_eq!(emitter.error_count(), 1);
        assert_eq!(emitter.exit_code(), ExitCode::Failure);
        drop(emitter);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("error[coverage]"));
        assert!(text.contains("day: 2024-02-05"));
    }

    #[test]
    fn quiet_mode_suppresses_passed_items_but_not_errors() {
        let mut out = Vec::new();
        let mut emitter = TerminalEmitter::new(&mut out, DiagnosticConfig { quiet: true });
        emitter.emit(&sample(ItemCategory::Passed));
        emitter.emit(&sample(ItemCategory::Error));
        drop(emitter);
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("passed["));
        assert!(text.contains("error["));
    }

    #[test]
    fn json_emitter_collects_and_reports_error_count() {
        let mut emitter = JsonEmitter::new(DiagnosticConfig::default());
        emitter.emit(&sample(ItemCategory::Violation));
        let value = emitter.to_json_value();
        assert!(value.is_array());
        assert_eq!(emitter.error_count(), 0);
        assert_eq!(emitter.exit_code(), ExitCode::Success);
    }
}
