//! Inner-product functional encryption from ring LWE.
//!
//! A master-secret-key holder issues function keys for integer vectors `y`;
//! a ciphertext encrypting a vector (or matrix) `x` together with such a key
//! reveals exactly the per-row inner products `<x_row, y>` and nothing else
//! about `x`. Two interchangeable modulus representations back the ring
//! arithmetic: an RNS chain of machine-word primes (the performance path)
//! and a single arbitrary-precision prime.

pub mod error;
pub mod io;
pub mod ipfe;
pub mod math;
pub mod sampler;

pub use crate::error::IpfeError;
pub use crate::ipfe::params::Ipfe;
pub use crate::ipfe::scheme::{Ciphertext, FunctionKey, PublicKey, SecretKey};
pub use crate::math::big_ring::BigPrimeRing;
pub use crate::math::chain::PrimeChainRing;
pub use crate::math::ring::CycloRing;
pub use crate::sampler::GaussianSampler;
