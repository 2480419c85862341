//! Error kinds shared across the crate. Every failure is fatal to the
//! calling operation; nothing is retried internally.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpfeError {
    /// An input length or matrix shape does not match the parameter set.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A plaintext or function-vector entry lies outside its declared bound.
    #[error("value {value} outside the symmetric bound {bound}")]
    InvalidBound { value: i64, bound: i64 },

    /// The modulus-prime predicate failed: `q` not prime, `q != 1 (mod 2n)`,
    /// or `phi` is not a primitive 2n-th root of unity.
    #[error("invalid modulus prime: {0}")]
    InvalidModulusPrime(String),

    /// The joint correctness/security search ran out of ring dimensions.
    #[error("parameter search exhausted: no safe ring dimension below 2^20")]
    ParameterSearchExhausted,

    /// A recovered plaintext does not fit the declared output width. Either
    /// the ciphertext is corrupted or an input bound was violated upstream.
    #[error("decrypted value does not fit the output range")]
    DecryptionOutOfRange,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("serialization error: {0}")]
    Encoding(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, IpfeError>;
