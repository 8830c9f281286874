//! Certificate handles and key sources.
//!
//! A [`Certificate`] carries an optional X.509 certificate plus the RSA key material found
//! next to it. File-based sources are resolved per call through [`KeySource::resolve`]
//! and dropped when the call ends; `RsaPrivateKey` zeroizes itself on drop and the raw
//! file bytes are held in [`Zeroizing`] buffers.

use crate::errors::CertificateError;
use bitflags::bitflags;
use p12_keystore::{KeyStore, KeyStoreEntry};
use pkcs8::der::asn1::AnyRef;
use pkcs8::der::{Decode, Encode, Tag, Tagged};
use pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding, ObjectIdentifier, PrivateKeyInfo};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

bitflags! {
    /// Key storage hints, mirroring the platform certificate-store flags.
    ///
    /// They travel with the loaded [`Certificate`]. Only `EXPORTABLE` changes behavior
    /// here (it gates [`Certificate::export_private_key_pem`]); mutually exclusive pairs
    /// are rejected at load time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KeyStorageFlags: u32 {
        const USER_KEY_SET = 0x01;
        const MACHINE_KEY_SET = 0x02;
        const EXPORTABLE = 0x04;
        const USER_PROTECTED = 0x08;
        const PERSIST_KEY_SET = 0x10;
        const EPHEMERAL_KEY_SET = 0x20;
    }
}

impl Default for KeyStorageFlags {
    fn default() -> Self {
        KeyStorageFlags::empty()
    }
}

impl KeyStorageFlags {
    pub fn validate(self) -> Result<Self, CertificateError> {
        if self.contains(Self::USER_KEY_SET | Self::MACHINE_KEY_SET) {
            return Err(CertificateError::ConflictingFlags(
                "USER_KEY_SET and MACHINE_KEY_SET are mutually exclusive".into(),
            ));
        }
        if self.contains(Self::PERSIST_KEY_SET | Self::EPHEMERAL_KEY_SET) {
            return Err(CertificateError::ConflictingFlags(
                "PERSIST_KEY_SET and EPHEMERAL_KEY_SET are mutually exclusive".into(),
            ));
        }
        Ok(self)
    }
}

/// A loaded certificate and/or RSA key pair.
#[derive(Clone)]
pub struct Certificate {
    der: Option<Vec<u8>>,
    subject: Option<String>,
    thumbprint: String,
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
    flags: KeyStorageFlags,
}

impl Certificate {
    /// Loads a PEM bundle, a PKCS#12 (`.pfx`/`.p12`) bundle or a DER certificate from disk.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        password: &str,
        flags: KeyStorageFlags,
    ) -> Result<Self, CertificateError> {
        let path = path.as_ref();
        let bytes = Zeroizing::new(std::fs::read(path).map_err(|source| CertificateError::Io {
            path: path.to_path_buf(),
            source,
        })?);
        let cert = if looks_like_pem(&bytes) {
            Self::from_pem(&bytes, password, flags)?
        } else if looks_like_pkcs12(&bytes) {
            Self::from_pkcs12(&bytes, password, flags)?
        } else {
            Self::from_der_with_flags(&bytes, flags)?
        };
        log::debug!(
            "loaded certificate {} from {} (private key: {})",
            cert.thumbprint,
            path.display(),
            cert.has_private_key()
        );
        Ok(cert)
    }

    /// Parses PEM blocks: `CERTIFICATE`, `ENCRYPTED PRIVATE KEY`, `PRIVATE KEY` and
    /// `RSA PRIVATE KEY`. Other blocks are ignored; non-RSA keys count as absent.
    pub fn from_pem(
        pem_bytes: &[u8],
        password: &str,
        flags: KeyStorageFlags,
    ) -> Result<Self, CertificateError> {
        let flags = flags.validate()?;
        let blocks = pem::parse_many(pem_bytes)?;
        let mut certs: Vec<&[u8]> = Vec::new();
        let mut private_key: Option<RsaPrivateKey> = None;
        for block in &blocks {
            if block.headers().get("Proc-Type").is_some() {
                return Err(CertificateError::LegacyPemEncryption(block.tag().to_string()));
            }
            match block.tag() {
                "CERTIFICATE" => certs.push(block.contents()),
                "ENCRYPTED PRIVATE KEY" if private_key.is_none() => {
                    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(block.contents())?;
                    let document = encrypted
                        .decrypt(password.as_bytes())
                        .map_err(CertificateError::Decrypt)?;
                    private_key = rsa_from_pkcs8(document.as_bytes())?;
                }
                "PRIVATE KEY" if private_key.is_none() => {
                    private_key = rsa_from_pkcs8(block.contents())?;
                }
                "RSA PRIVATE KEY" if private_key.is_none() => {
                    private_key = Some(RsaPrivateKey::from_pkcs1_der(block.contents())?);
                }
                _ => {}
            }
        }
        Self::assemble(certs, private_key, flags)
    }

    /// Parses a PKCS#12 bundle decrypted with `password`. The RSA key is paired with the
    /// bundled certificate holding its public key.
    pub fn from_pkcs12(
        bytes: &[u8],
        password: &str,
        flags: KeyStorageFlags,
    ) -> Result<Self, CertificateError> {
        let flags = flags.validate()?;
        let store = KeyStore::from_pkcs12(bytes, password)
            .map_err(|e| CertificateError::Pkcs12(e.to_string()))?;
        let mut certs: Vec<&[u8]> = Vec::new();
        let mut private_key: Option<RsaPrivateKey> = None;
        for (_alias, entry) in store.entries() {
            match entry {
                KeyStoreEntry::PrivateKeyChain(chain) => {
                    if private_key.is_none() {
                        private_key = rsa_from_pkcs8(chain.key())?;
                    }
                    certs.extend(chain.chain().iter().map(|c| c.as_der()));
                }
                KeyStoreEntry::Certificate(cert) => certs.push(cert.as_der()),
            }
        }
        Self::assemble(certs, private_key, flags)
    }

    /// Pairs a private key with the certificate carrying its public key. Without a key
    /// the first certificate wins; without certificates the key stands alone.
    fn assemble(
        certs: Vec<&[u8]>,
        private_key: Option<RsaPrivateKey>,
        flags: KeyStorageFlags,
    ) -> Result<Self, CertificateError> {
        let Some(key) = private_key else {
            let der = certs.first().ok_or(CertificateError::Empty)?;
            return Self::from_der_with_flags(der, flags);
        };
        if certs.is_empty() {
            return Self::from_private_key(key, flags);
        }
        let public = key.to_public_key();
        for der in certs {
            let mut cert = Self::from_der_with_flags(der, flags)?;
            if cert.public_key.as_ref() == Some(&public) {
                cert.private_key = Some(key);
                return Ok(cert);
            }
        }
        Err(CertificateError::KeyMismatch)
    }

    /// Parses a DER certificate. The handle has no private key.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        Self::from_der_with_flags(der, KeyStorageFlags::empty())
    }

    fn from_der_with_flags(der: &[u8], flags: KeyStorageFlags) -> Result<Self, CertificateError> {
        let flags = flags.validate()?;
        let cert = x509_cert::Certificate::from_der(der)?;
        let tbs = &cert.tbs_certificate;
        let spki = &tbs.subject_public_key_info;
        let public_key = if spki.algorithm.oid == RSA_ENCRYPTION_OID {
            Some(RsaPublicKey::from_public_key_der(&spki.to_der()?)?)
        } else {
            None
        };
        Ok(Certificate {
            der: Some(der.to_vec()),
            subject: Some(tbs.subject.to_string()),
            thumbprint: sha1_hex(der),
            public_key,
            private_key: None,
            flags,
        })
    }

    /// Builds a key-only handle. The thumbprint is the SHA-1 of the public key's SPKI DER.
    pub fn from_private_key(
        key: RsaPrivateKey,
        flags: KeyStorageFlags,
    ) -> Result<Self, CertificateError> {
        let flags = flags.validate()?;
        let public_key = key.to_public_key();
        let spki = public_key.to_public_key_der()?;
        Ok(Certificate {
            der: None,
            subject: None,
            thumbprint: sha1_hex(spki.as_bytes()),
            public_key: Some(public_key),
            private_key: Some(key),
            flags,
        })
    }

    /// Upper-case hex SHA-1 of the certificate DER. Safe to log.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn certificate_der(&self) -> Option<&[u8]> {
        self.der.as_deref()
    }

    pub fn flags(&self) -> KeyStorageFlags {
        self.flags
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn rsa_private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    pub fn rsa_public_key(&self) -> Option<&RsaPublicKey> {
        self.public_key.as_ref()
    }

    /// Copy of this handle without private key material.
    pub fn to_public(&self) -> Certificate {
        Certificate {
            der: self.der.clone(),
            subject: self.subject.clone(),
            thumbprint: self.thumbprint.clone(),
            public_key: self.public_key.clone(),
            private_key: None,
            flags: self.flags,
        }
    }

    /// PKCS#8 PEM of the private key. Requires [`KeyStorageFlags::EXPORTABLE`].
    pub fn export_private_key_pem(&self) -> Result<Zeroizing<String>, CertificateError> {
        if !self.flags.contains(KeyStorageFlags::EXPORTABLE) {
            return Err(CertificateError::NotExportable);
        }
        let key = self.private_key.as_ref().ok_or(CertificateError::Empty)?;
        Ok(key.to_pkcs8_pem(LineEnding::LF)?)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("thumbprint", &self.thumbprint)
            .field("subject", &self.subject)
            .field("has_public_key", &self.public_key.is_some())
            .field("has_private_key", &self.private_key.is_some())
            .field("flags", &self.flags)
            .finish()
    }
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(b"-----BEGIN"))
}

/// PFX starts `SEQUENCE { version INTEGER, ... }`; a certificate starts with a nested
/// `SEQUENCE`.
fn looks_like_pkcs12(bytes: &[u8]) -> bool {
    AnyRef::from_der(bytes)
        .is_ok_and(|any| any.tag() == Tag::Sequence && any.value().first() == Some(&0x02))
}

fn rsa_from_pkcs8(der: &[u8]) -> Result<Option<RsaPrivateKey>, CertificateError> {
    let info = PrivateKeyInfo::try_from(der)?;
    if info.algorithm.oid != RSA_ENCRYPTION_OID {
        return Ok(None);
    }
    Ok(Some(RsaPrivateKey::try_from(info)?))
}

fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(bytes))
}

/// Where a signing or verification call gets its key material from.
#[derive(Clone, Copy)]
pub enum KeySource<'a> {
    /// Caller-owned handle that outlives the call.
    Loaded(&'a Certificate),
    /// Loaded for the duration of the call only.
    File {
        path: &'a Path,
        password: &'a str,
        flags: KeyStorageFlags,
    },
}

impl<'a> KeySource<'a> {
    pub fn file<P: AsRef<Path> + ?Sized>(
        path: &'a P,
        password: &'a str,
        flags: KeyStorageFlags,
    ) -> Self {
        KeySource::File { path: path.as_ref(), password, flags }
    }

    /// Borrowed for `Loaded`, freshly loaded (and dropped by the caller) for `File`.
    pub fn resolve(&self) -> Result<Cow<'a, Certificate>, CertificateError> {
        match *self {
            KeySource::Loaded(cert) => Ok(Cow::Borrowed(cert)),
            KeySource::File { path, password, flags } => {
                Certificate::from_file(path, password, flags).map(Cow::Owned)
            }
        }
    }

    /// Identifier used in diagnostics: thumbprint or file path, never key material.
    pub fn describe(&self) -> String {
        match self {
            KeySource::Loaded(cert) => cert.thumbprint().to_string(),
            KeySource::File { path, .. } => path.display().to_string(),
        }
    }
}

impl<'a> From<&'a Certificate> for KeySource<'a> {
    fn from(cert: &'a Certificate) -> Self {
        KeySource::Loaded(cert)
    }
}

impl fmt::Debug for KeySource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Loaded(cert) => f.debug_tuple("Loaded").field(&cert.thumbprint()).finish(),
            KeySource::File { path, flags, .. } => f
                .debug_struct("File")
                .field("path", path)
                .field("flags", flags)
                .finish_non_exhaustive(),
        }
    }
}
