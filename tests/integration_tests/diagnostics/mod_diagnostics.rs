use crate::integration_tests::_support::*;
use gpwebpay_digest::diagnostics::{DiagnosticContext, DiagnosticSink, LogSink, Operation, SNIPPET_CHARS};
use gpwebpay_digest::{DigestError, DigestService, KeySource, KeyStorageFlags};
use log::Level;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingSink(AtomicUsize);

impl DiagnosticSink for CountingSink {
    fn report(&self, _level: Level, _message: &str, _context: &DiagnosticContext) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct PanickingSink;

impl DiagnosticSink for PanickingSink {
    fn report(&self, _level: Level, _message: &str, _context: &DiagnosticContext) {
        panic!("sink failure");
    }
}

#[test]
fn custom_sink_sees_each_wrapped_failure_once() {
    let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
    let svc = DigestService::new(sink.clone());
    let cs = charset("utf-8");
    let _ = svc.verify("%%%", "m", &merchant(), cs);
    let _ = svc.sign_with("m", KeySource::file("/definitely/missing.pem", "", KeyStorageFlags::empty()), cs);
    assert_eq!(sink.0.load(Ordering::SeqCst), 2);
    // Successful calls report nothing.
    svc.sign("m", &merchant(), cs).unwrap();
    assert_eq!(sink.0.load(Ordering::SeqCst), 2);
}

#[test]
fn panicking_sink_does_not_replace_the_error() {
    let svc = DigestService::new(Arc::new(PanickingSink));
    let err = svc.verify("%%%", "m", &merchant(), charset("utf-8")).unwrap_err();
    assert!(matches!(err, DigestError::VerificationFailure { .. }));
}

#[test]
fn long_inputs_are_truncated_in_context() {
    let sink = Arc::new(gpwebpay_digest::MemorySink::new());
    let svc = DigestService::new(sink.clone());
    let long = "ž".repeat(500);
    let _ = svc.verify("%%%", &long, &merchant(), charset("windows-1250"));
    let ctx = &sink.records()[0].context;
    assert_eq!(ctx.input_snippet.chars().count(), SNIPPET_CHARS + 1);
    let err = svc.verify("%%%", &long, &merchant(), charset("windows-1250")).unwrap_err();
    assert!(err.to_string().len() < long.len());
}

#[test]
fn context_display_names_operation_and_certificate() {
    let ctx = DiagnosticContext::new(Operation::Verify, "1400|00", MERCHANT_THUMBPRINT).with_signature("AAAA");
    let s = ctx.to_string();
    assert!(s.starts_with("operation=verify"));
    assert!(s.contains(MERCHANT_THUMBPRINT));
    assert!(s.contains("signature=\"AAAA\""));
}

#[test]
fn log_sink_accepts_reports_without_a_logger() {
    let ctx = DiagnosticContext::new(Operation::Sign, "x", "y");
    LogSink::new().report(Level::Error, "failed", &ctx);
    LogSink::with_target("custom").report(Level::Warn, "failed", &ctx);
}
