//! GP webpay `DIGEST` signing and verification: RSA PKCS#1 v1.5 over SHA-1.
//!
//! The hash and padding are fixed by the gateway protocol. The message is turned into
//! bytes with the caller's [`Charset`]; signer and verifier must use the same one.

use crate::certificate::{Certificate, KeySource};
use crate::charset::{self, Charset};
use crate::diagnostics::{
    DiagnosticContext, DiagnosticSink, NoopSink, Operation, report_safely,
};
use crate::errors::{DigestError, FailureCause};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::Level;
use rsa::Pkcs1v15Sign;
use rsa::rand_core::OsRng;
use sha1::{Digest, Sha1};
use std::sync::Arc;

/// Signs and verifies messages. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct DigestService {
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for DigestService {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl std::fmt::Debug for DigestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestService").finish_non_exhaustive()
    }
}

impl DigestService {
    /// Registers the legacy code pages (see [`charset::init`]) and keeps `sink` for
    /// failure reports.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        charset::init();
        DigestService { sink }
    }

    /// Signs `message` and returns the Base64 signature.
    ///
    /// # Errors
    /// `NoPrivateKey` if the certificate carries no RSA private key; `SigningFailure` for
    /// RSA failures.
    pub fn sign(
        &self,
        message: &str,
        cert: &Certificate,
        charset: Charset,
    ) -> Result<String, DigestError> {
        let context = || DiagnosticContext::new(Operation::Sign, message, cert.thumbprint());
        let data = charset.encode(message);
        let key = cert.rsa_private_key().ok_or_else(|| DigestError::NoPrivateKey {
            certificate: cert.thumbprint().to_string(),
        })?;
        let hashed = Sha1::digest(&data);
        let signature = key
            .sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha1>(), &hashed)
            .map_err(|e| self.signing_failure(context(), e.into()))?;
        Ok(STANDARD.encode(signature))
    }

    /// Resolves `source` for this call only, then signs.
    pub fn sign_with(
        &self,
        message: &str,
        source: KeySource<'_>,
        charset: Charset,
    ) -> Result<String, DigestError> {
        let cert = source.resolve().map_err(|e| {
            let context = DiagnosticContext::new(Operation::Sign, message, source.describe());
            self.signing_failure(context, e.into())
        })?;
        self.sign(message, &cert, charset)
    }

    /// Checks `signature_base64` against `message`.
    ///
    /// Returns `Ok(false)` when the signature does not match (wrong key, altered message
    /// or signature). ASCII whitespace inside the Base64 text (line wrapping) is ignored;
    /// otherwise malformed Base64 is a `VerificationFailure`, not `false`.
    ///
    /// # Errors
    /// `NoPublicKey` if the certificate has no RSA public key; `VerificationFailure` for
    /// decoding or provider failures.
    pub fn verify(
        &self,
        signature_base64: &str,
        message: &str,
        cert: &Certificate,
        charset: Charset,
    ) -> Result<bool, DigestError> {
        let context = || {
            DiagnosticContext::new(Operation::Verify, message, cert.thumbprint())
                .with_signature(signature_base64)
        };
        let compact: String =
            signature_base64.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let signature = STANDARD
            .decode(compact)
            .map_err(|e| self.verification_failure(context(), e.into()))?;
        let data = charset.encode(message);
        let hashed = Sha1::digest(&data);
        let key = cert.rsa_public_key().ok_or_else(|| DigestError::NoPublicKey {
            certificate: cert.thumbprint().to_string(),
        })?;
        match key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, &signature) {
            Ok(()) => Ok(true),
            Err(rsa::Error::Verification) => {
                log::debug!("signature mismatch for certificate {}", cert.thumbprint());
                Ok(false)
            }
            Err(e) => Err(self.verification_failure(context(), e.into())),
        }
    }

    /// Resolves `source` for this call only, then verifies.
    pub fn verify_with(
        &self,
        signature_base64: &str,
        message: &str,
        source: KeySource<'_>,
        charset: Charset,
    ) -> Result<bool, DigestError> {
        let cert = source.resolve().map_err(|e| {
            let context = DiagnosticContext::new(Operation::Verify, message, source.describe())
                .with_signature(signature_base64);
            self.verification_failure(context, e.into())
        })?;
        self.verify(signature_base64, message, &cert, charset)
    }

    fn signing_failure(&self, context: DiagnosticContext, source: FailureCause) -> DigestError {
        report_safely(
            self.sink.as_ref(),
            Level::Error,
            &format!("Error while signing data: {source}"),
            &context,
        );
        DigestError::SigningFailure { context, source }
    }

    fn verification_failure(
        &self,
        context: DiagnosticContext,
        source: FailureCause,
    ) -> DigestError {
        report_safely(
            self.sink.as_ref(),
            Level::Error,
            &format!("Error while validating digest: {source}"),
            &context,
        );
        DigestError::VerificationFailure { context, source }
    }
}
