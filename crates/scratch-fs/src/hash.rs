use crate::error::FsError;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the SHA-256 digest of an arbitrary byte slice as lowercase hex.
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize())
}

pub fn hash_str(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

/// Compute the SHA-256 digest of bytes read from `reader`.
pub fn hash_reader(mut reader: impl Read) -> Result<String, FsError> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the SHA-256 digest of a file's contents without reading it into memory at once.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String, FsError> {
    let file = std::fs::File::open(path)?;
    hash_reader(file)
}
