use crate::certificate::KeyStorageFlags;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Programmatic CLI commands. Defaults (encoding, flags, password) are already
/// resolved by the caller.
pub enum Command {
    Sign {
        message: String,
        key: PathBuf,
        password: Zeroizing<String>,
        encoding: String,
        flags: KeyStorageFlags,
    },
    Verify {
        signature: String,
        message: String,
        cert: PathBuf,
        password: Zeroizing<String>,
        encoding: String,
        flags: KeyStorageFlags,
    },
    Inspect {
        cert: PathBuf,
        password: Zeroizing<String>,
        flags: KeyStorageFlags,
    },
    Encodings,
    DigestInput {
        fields: Vec<String>,
    },
}
