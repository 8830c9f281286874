//! Diagnostic sinks that receive failure context before a wrapped error propagates.
//!
//! Reporting is fire-and-forget: [`report_safely`] contains panics raised by a sink so a
//! misbehaving sink can never turn one failure into another.

use log::Level;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Maximum number of characters of caller input kept in a context.
pub const SNIPPET_CHARS: usize = 64;

/// Log target used by [`LogSink`]; the logger routes it to `audit.log`.
pub const AUDIT_TARGET: &str = "gpwebpay::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Sign,
    Verify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Sign => "sign",
            Operation::Verify => "verify",
        })
    }
}

/// What was being done, on which input, with which certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticContext {
    pub operation: Operation,
    pub input_snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_snippet: Option<String>,
    /// Thumbprint or file path.
    pub certificate: String,
}

impl DiagnosticContext {
    pub fn new(operation: Operation, input: &str, certificate: impl Into<String>) -> Self {
        DiagnosticContext {
            operation,
            input_snippet: snippet(input),
            signature_snippet: None,
            certificate: certificate.into(),
        }
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature_snippet = Some(snippet(signature));
        self
    }
}

impl fmt::Display for DiagnosticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation={} certificate={} input={:?}",
            self.operation, self.certificate, self.input_snippet
        )?;
        if let Some(sig) = &self.signature_snippet {
            write!(f, " signature={sig:?}")?;
        }
        Ok(())
    }
}

/// Truncates to [`SNIPPET_CHARS`] characters, appending `…` when cut.
pub fn snippet(input: &str) -> String {
    match input.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}…", &input[..idx]),
        None => input.to_string(),
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, level: Level, message: &str, context: &DiagnosticContext);
}

/// Calls the sink, swallowing any panic it raises.
pub fn report_safely(
    sink: &dyn DiagnosticSink,
    level: Level,
    message: &str,
    context: &DiagnosticContext,
) {
    if catch_unwind(AssertUnwindSafe(|| sink.report(level, message, context))).is_err() {
        log::warn!("diagnostic sink panicked while reporting: {message}");
    }
}

/// Discards everything. Default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _level: Level, _message: &str, _context: &DiagnosticContext) {}
}

/// Forwards reports to the `log` facade, context serialized as JSON.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    target: &'static str,
}

impl LogSink {
    pub fn new() -> Self {
        LogSink { target: AUDIT_TARGET }
    }

    pub fn with_target(target: &'static str) -> Self {
        LogSink { target }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for LogSink {
    fn report(&self, level: Level, message: &str, context: &DiagnosticContext) {
        let ctx = serde_json::to_string(context).unwrap_or_else(|_| context.to_string());
        log::log!(target: self.target, level, "{message} {ctx}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub level: Level,
    pub message: String,
    pub context: DiagnosticContext,
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }

    pub fn drain(&self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, level: Level, message: &str, context: &DiagnosticContext) {
        self.records.lock().push(DiagnosticRecord {
            level,
            message: message.to_string(),
            context: context.clone(),
        });
    }
}
