use crate::diagnostics::DiagnosticContext;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::digest::DigestService`].
///
/// `NoPrivateKey` / `NoPublicKey` are raised directly. Every other failure is reported
/// to the diagnostic sink and wrapped into `SigningFailure` / `VerificationFailure`
/// with the original cause kept as `source()`.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("No private key found (certificate: {certificate})")]
    NoPrivateKey { certificate: String },

    #[error("No public key found (certificate: {certificate})")]
    NoPublicKey { certificate: String },

    #[error("Error while signing data ({context})")]
    SigningFailure {
        context: DiagnosticContext,
        #[source]
        source: FailureCause,
    },

    #[error("Error while validating digest ({context})")]
    VerificationFailure {
        context: DiagnosticContext,
        #[source]
        source: FailureCause,
    },
}

impl DigestError {
    /// The wrapped low-level cause, if this is a wrapping failure.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            DigestError::SigningFailure { source, .. }
            | DigestError::VerificationFailure { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Context captured for wrapping failures.
    pub fn context(&self) -> Option<&DiagnosticContext> {
        match self {
            DigestError::SigningFailure { context, .. }
            | DigestError::VerificationFailure { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Low-level causes wrapped by the digest failures.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),
}

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PEM: {0}")]
    Pem(#[from] pem::PemError),

    #[error("DER: {0}")]
    Der(#[from] x509_cert::der::Error),

    #[error("PKCS#8: {0}")]
    Pkcs8(#[from] pkcs8::Error),

    #[error("PKCS#1: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    #[error("SPKI: {0}")]
    Spki(#[from] pkcs8::spki::Error),

    #[error("Cannot decrypt private key (wrong password?): {0}")]
    Decrypt(pkcs8::Error),

    #[error("PKCS#12: {0}")]
    Pkcs12(String),

    #[error("Legacy PEM encryption is not supported for block '{0}'; convert the key to encrypted PKCS#8")]
    LegacyPemEncryption(String),

    #[error("No certificate or private key found")]
    Empty,

    #[error("Private key does not match the certificate public key")]
    KeyMismatch,

    #[error("Conflicting key storage flags: {0}")]
    ConflictingFlags(String),

    #[error("Private key is not exportable")]
    NotExportable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CharsetError {
    #[error("Charset registry not initialized; call charset::init() first")]
    NotInitialized,

    #[error("Unknown charset label: {0}")]
    UnknownLabel(String),

    #[error("Unknown code page: {0}")]
    UnknownCodePage(u16),

    #[error("Character {ch:?} cannot be represented in {charset}")]
    Unmappable { charset: &'static str, ch: char },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Charset: {0}")]
    Charset(#[from] CharsetError),

    #[error("Logging: {0}")]
    Logging(String),
}
