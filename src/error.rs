//! Error types shared by the trust center and the session context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The outer octet stream is not a well-formed BER-TLV object
    #[error("invalid TLV encoding: {0}")]
    InvalidTlv(String),

    /// Key cache already holds a different key under this CHR
    #[error("public key conflict for CHR {chr}")]
    KeyConflict { chr: String },

    /// Key cache holds no key under this CHR
    #[error("no public key cached for CHR {chr}")]
    KeyMissing { chr: String },

    /// Unsupported elliptic curve or malformed point encoding
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Chain builder could not reach the requested root
    #[error("no certificate path to root CAR {car}")]
    NoPath { car: String },

    /// Chain resolution was asked to start from a self-signed root
    #[error("chain resolution called on a self-signed root certificate")]
    LeafIsRoot,

    /// A session operation was attempted after the session died
    #[error("secure messaging session is closed")]
    SessionClosed,

    /// Decipher input did not carry the padding-content indicator
    #[error("decipher input lacks the padding indicator byte")]
    DecipherError,

    /// Deciphered plaintext carries no valid ISO/IEC 7816-4 padding
    #[error("invalid ISO padding in deciphered plaintext")]
    PaddingError,

    /// Session creation with a key length outside {128, 192, 256}
    #[error("invalid AES key length: {0} bits")]
    InvalidKeyLength(usize),

    /// Trust center configuration problem
    #[error("trust center configuration: {0}")]
    Config(String),

    /// A directory the trust center requires does not exist
    #[error("required directory is absent: {0}")]
    DirectoryAbsent(PathBuf),

    /// Filesystem failure on a load or export path
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the OpenSSL primitives
    #[error("crypto backend error: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
}

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
