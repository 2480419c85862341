//! NTT-friendly primes: `q = 1 (mod 2n)` together with a primitive 2n-th
//! root of unity `phi` (`phi^n = -1`). Candidates are enumerated along the
//! arithmetic progression `c * 2^(exp+1) + 1`; `phi` is obtained by taking
//! `exp` successive square roots of `q - 1`.

use crate::error::{IpfeError, Result};
use crate::math::number_theory::{is_prime, is_prime_big, mod_pow, sqrt_mod, sqrt_mod_big};
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};

/// Upper bound keeping chain primes (and sums of two residues) inside a
/// machine word: all residue arithmetic is u32 with u64 products.
pub const CHAIN_PRIME_LIMIT: u64 = 1 << 31;

/// Default starting point of the chain-prime cursor.
pub const CHAIN_PRIME_START: u64 = 1 << 30;

/// A machine-word NTT-friendly prime for the RNS chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModPrime {
    pub exp: u32,
    pub q: u32,
    pub phi: u32,
}

impl ModPrime {
    /// Validates the modulus predicate: `q` prime, `q = 1 (mod 2n)` and
    /// `phi^n = -1 (mod q)` for `n = 2^exp`.
    pub fn new(exp: u32, q: u32, phi: u32) -> Result<Self> {
        let n = 1u64 << exp;
        let q64 = q as u64;
        if q64 >= CHAIN_PRIME_LIMIT {
            return Err(IpfeError::InvalidModulusPrime(format!(
                "{q} exceeds the machine-word residue limit"
            )));
        }
        if !is_prime(q64) {
            return Err(IpfeError::InvalidModulusPrime(format!("{q} is not prime")));
        }
        if q64 % (2 * n) != 1 {
            return Err(IpfeError::InvalidModulusPrime(format!(
                "{q} != 1 (mod {})",
                2 * n
            )));
        }
        if mod_pow(phi as u64, n, q64) != q64 - 1 {
            return Err(IpfeError::InvalidModulusPrime(format!(
                "{phi}^{n} != -1 (mod {q})"
            )));
        }
        Ok(ModPrime { exp, q, phi })
    }

    pub fn n(&self) -> usize {
        1 << self.exp
    }
}

/// `phi` as `exp` successive square roots of `q - 1`. `None` if a root in
/// the tower fails (the candidate is then rejected).
fn two_adic_phi(exp: u32, q: u64) -> Option<u64> {
    let mut s = q - 1;
    for _ in 0..exp {
        s = sqrt_mod(s, q)?;
    }
    Some(s)
}

fn two_adic_phi_big(exp: u32, q: &BigUint) -> Option<BigUint> {
    let mut s = q - 1u32;
    for _ in 0..exp {
        s = sqrt_mod_big(&s, q)?;
    }
    Some(s)
}

/// The first admissible chain prime at or above `start`, or `None` once the
/// progression leaves the machine-word range.
pub fn next_chain_prime(exp: u32, start: u64) -> Option<ModPrime> {
    let step = 1u64 << (exp + 1);
    let mut q = start.div_ceil(step) * step + 1;
    while q < CHAIN_PRIME_LIMIT {
        if is_prime(q) {
            if let Some(phi) = two_adic_phi(exp, q) {
                if let Ok(p) = ModPrime::new(exp, q as u32, phi as u32) {
                    return Some(p);
                }
            }
        }
        q += step;
    }
    None
}

/// The first admissible big prime at or above `q_min`, with its `phi`.
pub fn find_big_prime(exp: u32, q_min: &BigUint) -> (BigUint, BigUint) {
    let step = BigUint::one() << (exp + 1);
    let mut q = (q_min + &step - 1u32) / &step * &step + 1u32;
    loop {
        if is_prime_big(&q) {
            if let Some(phi) = two_adic_phi_big(exp, &q) {
                return (q, phi);
            }
        }
        q += &step;
    }
}
