//! The operation interface shared by the two modulus representations.
//!
//! The engine is polymorphic over a sealed pair of ring contexts:
//! [`crate::math::chain::PrimeChainRing`] (RNS small-prime chain) and
//! [`crate::math::big_ring::BigPrimeRing`] (single arbitrary-precision
//! prime). Scheme code is generic over this trait and never branches on
//! the variant. Coefficient and evaluation (NTT) representations are
//! distinct associated types; mixing them in an arithmetic op is a type
//! error rather than a runtime bug.

use crate::error::Result;
use crate::sampler::GaussianSampler;
use num_bigint::{BigInt, BigUint};
use rand::{CryptoRng, Rng};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

pub trait CycloRing:
    Sized + Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync
{
    /// Coefficient-domain polynomial.
    type Coeff: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync;
    /// Evaluation-domain (NTT) polynomial.
    type Eval: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync;
    /// A ring scalar reduced into every modulus component.
    type Scalar: Clone + Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Finds a modulus for ring dimension `2^exp` whose product exceeds
    /// `q_min`, and precomputes all tables. `k` is the plaintext modulus
    /// fixing the scale `floor(Q/K)`.
    fn build(exp: u32, q_min: &BigUint, k: u128) -> Result<Self>;

    /// Extra factor this representation applies to the correctness bound
    /// during the parameter search.
    fn q_min_scale(l: usize, by: i64) -> u64;

    fn exp(&self) -> u32;
    /// Ring dimension `n`.
    fn degree(&self) -> usize;
    /// The full modulus `Q`.
    fn modulus(&self) -> &BigUint;
    /// `floor(Q/K)`, the plaintext embedding scale.
    fn plaintext_scale(&self) -> &BigUint;

    fn zero(&self) -> Self::Coeff;

    fn forward(&self, a: &Self::Coeff) -> Self::Eval;
    fn backward(&self, a: &Self::Eval) -> Self::Coeff;

    fn add(&self, a: &Self::Coeff, b: &Self::Coeff) -> Self::Coeff;
    fn sub(&self, a: &Self::Coeff, b: &Self::Coeff) -> Self::Coeff;
    fn add_eval(&self, a: &Self::Eval, b: &Self::Eval) -> Self::Eval;
    /// Pointwise product in the evaluation domain.
    fn mul_eval(&self, a: &Self::Eval, b: &Self::Eval) -> Self::Eval;
    /// Product in `Z_q[X]/(X^n + 1)` via forward/pointwise/backward.
    fn negacyclic_mul(&self, a: &Self::Coeff, b: &Self::Coeff) -> Self::Coeff {
        self.backward(&self.mul_eval(&self.forward(a), &self.forward(b)))
    }

    /// Reduces a signed integer into every modulus component.
    fn scalar(&self, v: i64) -> Self::Scalar;
    /// `acc += s * p`, componentwise.
    fn scalar_mul_add(&self, acc: &mut Self::Coeff, s: &Self::Scalar, p: &Self::Coeff);

    /// The polynomial whose `k`-th coefficient is `xs[k] * floor(Q/K)`;
    /// coefficients past `xs.len()` are zero.
    fn encode_scaled(&self, xs: &[i64]) -> Self::Coeff;

    /// CRT lift with centered recovery into `(-Q/2, Q/2]`.
    fn lift_centered(&self, a: &Self::Coeff) -> Vec<BigInt>;
    /// Floor-mod projection of signed integers into every component.
    fn project(&self, xs: &[BigInt]) -> Self::Coeff;

    /// Every coefficient uniform in `[1, q)` (zero excluded), drawn
    /// directly in the evaluation domain.
    fn sample_uniform_eval<R: Rng + CryptoRng>(&self, rng: &mut R) -> Self::Eval;
    /// A polynomial of discrete-Gaussian coefficients with parameter
    /// `sigma`, replicated into every modulus component.
    fn sample_gaussian<R: Rng + CryptoRng>(
        &self,
        sigma: f64,
        alg: GaussianSampler,
        rng: &mut R,
    ) -> Self::Coeff;

    fn check_coeff(&self, a: &Self::Coeff) -> Result<()>;
    fn check_eval(&self, a: &Self::Eval) -> Result<()>;
}
