//! GP webpay message digests: RSA PKCS#1 v1.5 / SHA-1 signatures over charset-encoded
//! messages, Base64 on the wire.
//!
//! ```no_run
//! use gpwebpay_digest::{Certificate, Charset, DigestService, KeyStorageFlags};
//!
//! gpwebpay_digest::init();
//! let svc = DigestService::default();
//! let cert = Certificate::from_file("merchant.pem", "changeit", KeyStorageFlags::empty())?;
//! let charset = Charset::for_label("windows-1250")?;
//! let digest = svc.sign("1400|00|0|0000000001|1|CZ", &cert, charset)?;
//! assert!(svc.verify(&digest, "1400|00|0|0000000001|1|CZ", &cert, charset)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod certificate;
pub mod charset;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod digest;
pub mod errors;
pub mod logger;
pub mod message;

pub use certificate::{Certificate, KeySource, KeyStorageFlags};
pub use charset::Charset;
pub use config::WebpayConfig;
pub use diagnostics::{DiagnosticContext, DiagnosticSink, LogSink, MemorySink, NoopSink};
pub use digest::DigestService;
pub use errors::{CertificateError, CharsetError, ConfigError, DigestError, FailureCause};
pub use message::DigestInput;

/// Process-wide setup: registers the legacy code pages. Idempotent.
pub fn init() {
    charset::init();
}
