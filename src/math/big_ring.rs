//! The single-prime modulus: one NTT-friendly prime whose bit length may
//! exceed a machine word. Polynomials are `n`-element vectors of
//! arbitrary-precision residues; the butterfly schedules mirror the chain
//! variant with `BigUint` arithmetic.

use crate::error::{IpfeError, Result};
use crate::math::mod_prime::find_big_prime;
use crate::math::number_theory::is_prime_big;
use crate::math::ring::CycloRing;
use crate::math::utils::reverse_bits;
use crate::sampler::{sample_gaussian_int, GaussianSampler};
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigPoly {
    pub(crate) coeff: Vec<BigUint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigPolyEval {
    pub(crate) coeff: Vec<BigUint>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BigDesc", into = "BigDesc")]
pub struct BigPrimeRing {
    exp: u32,
    n: usize,
    k: u128,
    q: BigUint,
    phi: BigUint,
    delta: BigUint,
    phi_rev: Vec<BigUint>,
    phi_inv_rev: Vec<BigUint>,
    n_inv: BigUint,
}

#[derive(Serialize, Deserialize)]
struct BigDesc {
    exp: u32,
    k: u128,
    q: BigUint,
    phi: BigUint,
}

impl TryFrom<BigDesc> for BigPrimeRing {
    type Error = IpfeError;

    fn try_from(desc: BigDesc) -> Result<Self> {
        BigPrimeRing::from_prime(desc.exp, desc.q, desc.phi, desc.k)
    }
}

impl From<BigPrimeRing> for BigDesc {
    fn from(ring: BigPrimeRing) -> Self {
        BigDesc {
            exp: ring.exp,
            k: ring.k,
            q: ring.q,
            phi: ring.phi,
        }
    }
}

impl fmt::Debug for BigPrimeRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigPrimeRing")
            .field("exp", &self.exp)
            .field("n", &self.n)
            .field("k", &self.k)
            .field("q_bits", &self.q.bits())
            .finish()
    }
}

fn add_mod(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    let s = a + b;
    if s >= *q {
        s - q
    } else {
        s
    }
}

fn sub_mod(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    if a >= b {
        a - b
    } else {
        a + q - b
    }
}

fn mul_mod(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    a * b % q
}

impl BigPrimeRing {
    /// Assembles the ring from a validated `(q, phi)` pair.
    pub fn from_prime(exp: u32, q: BigUint, phi: BigUint, k: u128) -> Result<Self> {
        let n = 1usize << exp;
        if k < 2 {
            return Err(IpfeError::InvalidBound {
                value: k as i64,
                bound: 2,
            });
        }
        if !is_prime_big(&q) {
            return Err(IpfeError::InvalidModulusPrime(format!("{q} is not prime")));
        }
        let two_n = BigUint::from(2u32 * n as u32);
        if (&q % &two_n) != BigUint::one() {
            return Err(IpfeError::InvalidModulusPrime(format!(
                "{q} != 1 (mod {two_n})"
            )));
        }
        let minus_one = &q - 1u32;
        if phi.modpow(&BigUint::from(n), &q) != minus_one {
            return Err(IpfeError::InvalidModulusPrime(format!(
                "phi^{n} != -1 (mod {q})"
            )));
        }

        let phi_inv = phi.modpow(&(&minus_one - 1u32), &q);
        let mut phi_rev = vec![BigUint::zero(); n];
        let mut phi_inv_rev = vec![BigUint::zero(); n];
        let mut cur_f = BigUint::one();
        let mut cur_b = BigUint::one();
        for i in 0..n {
            phi_rev[reverse_bits(i, exp)] = cur_f.clone();
            phi_inv_rev[reverse_bits(i, exp)] = cur_b.clone();
            cur_f = &cur_f * &phi % &q;
            cur_b = &cur_b * &phi_inv % &q;
        }
        let n_inv = BigUint::from(n).modpow(&(&minus_one - 1u32), &q);
        let delta = &q / BigUint::from(k);

        Ok(BigPrimeRing {
            exp,
            n,
            k,
            q,
            phi,
            delta,
            phi_rev,
            phi_inv_rev,
            n_inv,
        })
    }

    pub fn prime(&self) -> &BigUint {
        &self.q
    }

    fn reduce_i64(&self, v: i64) -> BigUint {
        if v >= 0 {
            BigUint::from(v as u64) % &self.q
        } else {
            let r = BigUint::from(v.unsigned_abs()) % &self.q;
            if r.is_zero() {
                r
            } else {
                &self.q - r
            }
        }
    }

    fn ntt_forward_in_place(&self, values: &mut [BigUint]) {
        let n = self.n;
        let mut t = n;
        let mut m = 1;
        while m < n {
            t /= 2;
            for i in 0..m {
                let s = &self.phi_rev[m + i];
                let j1 = 2 * i * t;
                for j in j1..j1 + t {
                    let u = values[j].clone();
                    let v = mul_mod(&values[j + t], s, &self.q);
                    values[j] = add_mod(&u, &v, &self.q);
                    values[j + t] = sub_mod(&u, &v, &self.q);
                }
            }
            m *= 2;
        }
    }

    fn ntt_backward_in_place(&self, values: &mut [BigUint]) {
        let n = self.n;
        let mut t = 1;
        let mut m = n;
        while m > 1 {
            let h = m / 2;
            let mut j1 = 0;
            for i in 0..h {
                let s = &self.phi_inv_rev[h + i];
                for j in j1..j1 + t {
                    let u = values[j].clone();
                    let v = values[j + t].clone();
                    values[j] = add_mod(&u, &v, &self.q);
                    values[j + t] = mul_mod(&sub_mod(&u, &v, &self.q), s, &self.q);
                }
                j1 += 2 * t;
            }
            t *= 2;
            m = h;
        }
        for v in values.iter_mut() {
            *v = mul_mod(v, &self.n_inv, &self.q);
        }
    }
}

impl CycloRing for BigPrimeRing {
    type Coeff = BigPoly;
    type Eval = BigPolyEval;
    type Scalar = BigUint;

    fn build(exp: u32, q_min: &BigUint, k: u128) -> Result<Self> {
        let (q, phi) = find_big_prime(exp, q_min);
        Self::from_prime(exp, q, phi, k)
    }

    fn q_min_scale(l: usize, by: i64) -> u64 {
        l as u64 * by.unsigned_abs()
    }

    fn exp(&self) -> u32 {
        self.exp
    }

    fn degree(&self) -> usize {
        self.n
    }

    fn modulus(&self) -> &BigUint {
        &self.q
    }

    fn plaintext_scale(&self) -> &BigUint {
        &self.delta
    }

    fn zero(&self) -> BigPoly {
        BigPoly {
            coeff: vec![BigUint::zero(); self.n],
        }
    }

    fn forward(&self, a: &BigPoly) -> BigPolyEval {
        let mut coeff = a.coeff.clone();
        self.ntt_forward_in_place(&mut coeff);
        BigPolyEval { coeff }
    }

    fn backward(&self, a: &BigPolyEval) -> BigPoly {
        let mut coeff = a.coeff.clone();
        self.ntt_backward_in_place(&mut coeff);
        BigPoly { coeff }
    }

    fn add(&self, a: &BigPoly, b: &BigPoly) -> BigPoly {
        BigPoly {
            coeff: a
                .coeff
                .iter()
                .zip(b.coeff.iter())
                .map(|(x, y)| add_mod(x, y, &self.q))
                .collect(),
        }
    }

    fn sub(&self, a: &BigPoly, b: &BigPoly) -> BigPoly {
        BigPoly {
            coeff: a
                .coeff
                .iter()
                .zip(b.coeff.iter())
                .map(|(x, y)| sub_mod(x, y, &self.q))
                .collect(),
        }
    }

    fn add_eval(&self, a: &BigPolyEval, b: &BigPolyEval) -> BigPolyEval {
        BigPolyEval {
            coeff: a
                .coeff
                .iter()
                .zip(b.coeff.iter())
                .map(|(x, y)| add_mod(x, y, &self.q))
                .collect(),
        }
    }

    fn mul_eval(&self, a: &BigPolyEval, b: &BigPolyEval) -> BigPolyEval {
        BigPolyEval {
            coeff: a
                .coeff
                .iter()
                .zip(b.coeff.iter())
                .map(|(x, y)| mul_mod(x, y, &self.q))
                .collect(),
        }
    }

    fn scalar(&self, v: i64) -> BigUint {
        self.reduce_i64(v)
    }

    fn scalar_mul_add(&self, acc: &mut BigPoly, s: &BigUint, p: &BigPoly) {
        for (a, b) in acc.coeff.iter_mut().zip(p.coeff.iter()) {
            *a = (&*a + s * b) % &self.q;
        }
    }

    fn encode_scaled(&self, xs: &[i64]) -> BigPoly {
        let mut out = self.zero();
        for (slot, &x) in out.coeff.iter_mut().zip(xs.iter()) {
            *slot = self.reduce_i64(x) * &self.delta % &self.q;
        }
        out
    }

    fn lift_centered(&self, a: &BigPoly) -> Vec<BigInt> {
        let q_big = BigInt::from(self.q.clone());
        a.coeff
            .iter()
            .map(|c| {
                let x = BigInt::from(c.clone());
                if &x * 2 > q_big {
                    x - &q_big
                } else {
                    x
                }
            })
            .collect()
    }

    fn project(&self, xs: &[BigInt]) -> BigPoly {
        let q_big = BigInt::from(self.q.clone());
        let mut out = self.zero();
        for (slot, x) in out.coeff.iter_mut().zip(xs.iter()) {
            let mut r = x % &q_big;
            if r < BigInt::zero() {
                r += &q_big;
            }
            *slot = r.to_biguint().expect("non-negative remainder");
        }
        out
    }

    fn sample_uniform_eval<R: Rng + CryptoRng>(&self, rng: &mut R) -> BigPolyEval {
        let below = &self.q - 1u32;
        BigPolyEval {
            coeff: (0..self.n)
                .map(|_| rng.gen_biguint_below(&below) + 1u32)
                .collect(),
        }
    }

    fn sample_gaussian<R: Rng + CryptoRng>(
        &self,
        sigma: f64,
        alg: GaussianSampler,
        rng: &mut R,
    ) -> BigPoly {
        BigPoly {
            coeff: (0..self.n)
                .map(|_| self.reduce_i64(sample_gaussian_int(sigma, alg, rng)))
                .collect(),
        }
    }

    fn check_coeff(&self, a: &BigPoly) -> Result<()> {
        if a.coeff.len() != self.n {
            return Err(IpfeError::InvalidDimensions(format!(
                "polynomial of {} coefficients, ring degree is {}",
                a.coeff.len(),
                self.n
            )));
        }
        Ok(())
    }

    fn check_eval(&self, a: &BigPolyEval) -> Result<()> {
        if a.coeff.len() != self.n {
            return Err(IpfeError::InvalidDimensions(format!(
                "polynomial of {} coefficients, ring degree is {}",
                a.coeff.len(),
                self.n
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_ring() -> BigPrimeRing {
        BigPrimeRing::build(3, &(BigUint::from(1u32) << 40), 101).unwrap()
    }

    #[test]
    fn prime_exceeds_the_bound() {
        let ring = test_ring();
        assert!(*ring.prime() > (BigUint::from(1u32) << 40));
        assert_eq!(ring.degree(), 8);
        assert!(((ring.prime() - 1u32) % 16u32).is_zero());
    }

    #[test]
    fn forward_backward_roundtrip() {
        let ring = test_ring();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let a = ring.sample_gaussian(10.0, GaussianSampler::Rounded, &mut rng);
        assert_eq!(ring.backward(&ring.forward(&a)), a);
    }

    #[test]
    fn negacyclic_mul_matches_schoolbook() {
        let ring = test_ring();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let below = ring.prime().clone();
        let a = BigPoly {
            coeff: (0..8).map(|_| rng.gen_biguint_below(&below)).collect(),
        };
        let b = BigPoly {
            coeff: (0..8).map(|_| rng.gen_biguint_below(&below)).collect(),
        };
        let mut expected = vec![BigUint::zero(); 8];
        for i in 0..8 {
            for j in 0..8 {
                let prod = &a.coeff[i] * &b.coeff[j] % &below;
                let k = (i + j) % 8;
                if i + j < 8 {
                    expected[k] = add_mod(&expected[k], &prod, &below);
                } else {
                    expected[k] = sub_mod(&expected[k], &prod, &below);
                }
            }
        }
        assert_eq!(ring.negacyclic_mul(&a, &b).coeff, expected);
    }

    #[test]
    fn project_lift_roundtrip() {
        let ring = test_ring();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let half = ring.prime() >> 1;
        let xs: Vec<BigInt> = (0..8)
            .map(|_| {
                let mag = BigInt::from(rng.gen_biguint_below(&half));
                if rng.gen::<bool>() {
                    mag
                } else {
                    -mag
                }
            })
            .collect();
        assert_eq!(ring.lift_centered(&ring.project(&xs)), xs);
    }

    #[test]
    fn serde_roundtrip_rebuilds_tables() {
        let ring = test_ring();
        let bytes = bincode::serialize(&ring).unwrap();
        let restored: BigPrimeRing = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, ring);
    }
}
