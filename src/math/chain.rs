//! The RNS modulus: a chain of machine-word NTT-friendly primes sharing
//! one ring dimension. Polynomials are contiguous `primes x n` row-major
//! u32 buffers; every componentwise operation walks the rows with that
//! prime's tables. This is the performance path.

use crate::error::{IpfeError, Result};
use crate::math::mod_prime::{next_chain_prime, ModPrime, CHAIN_PRIME_START};
use crate::math::ntt::{add_mod, mul_mod, ntt_neg_backward, ntt_neg_forward, sub_mod};
use crate::math::number_theory::mod_inverse;
use crate::math::ring::CycloRing;
use crate::math::utils::reverse_bits;
use crate::sampler::{sample_gaussian_int, GaussianSampler};
use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficient-domain polynomial: row `j` holds the residues mod `q_j`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrtPoly {
    pub(crate) data: Vec<u32>,
}

/// Evaluation-domain polynomial, same layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrtPolyEval {
    pub(crate) data: Vec<u32>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChainDesc", into = "ChainDesc")]
pub struct PrimeChainRing {
    exp: u32,
    n: usize,
    k: u128,
    primes: Vec<ModPrime>,
    /// Q, the product of the chain.
    q: BigUint,
    /// floor(Q/K).
    delta: BigUint,
    /// Per prime: bit-reversed powers of phi.
    phi_rev: Vec<Vec<u32>>,
    /// Per prime: bit-reversed powers of phi^-1.
    phi_inv_rev: Vec<Vec<u32>>,
    /// Per prime: n^-1.
    n_inv: Vec<u32>,
    /// Per prime: (prod of the earlier primes)^-1; index 0 unused.
    crt_mix: Vec<u32>,
    /// Per prime: floor(Q/K) mod q_j.
    delta_mod: Vec<u32>,
}

/// What actually persists: the prime description. Tables are rebuilt (and
/// the modulus predicate re-checked) on load.
#[derive(Serialize, Deserialize)]
struct ChainDesc {
    exp: u32,
    k: u128,
    primes: Vec<ModPrime>,
}

impl TryFrom<ChainDesc> for PrimeChainRing {
    type Error = IpfeError;

    fn try_from(desc: ChainDesc) -> Result<Self> {
        PrimeChainRing::from_primes(desc.exp, desc.primes, desc.k)
    }
}

impl From<PrimeChainRing> for ChainDesc {
    fn from(ring: PrimeChainRing) -> Self {
        ChainDesc {
            exp: ring.exp,
            k: ring.k,
            primes: ring.primes,
        }
    }
}

impl fmt::Debug for PrimeChainRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimeChainRing")
            .field("exp", &self.exp)
            .field("n", &self.n)
            .field("k", &self.k)
            .field("primes", &self.primes.iter().map(|p| p.q).collect::<Vec<_>>())
            .field("q_bits", &self.q.bits())
            .finish()
    }
}

impl PrimeChainRing {
    /// Assembles the ring from validated primes, recomputing every table.
    pub fn from_primes(exp: u32, mut primes: Vec<ModPrime>, k: u128) -> Result<Self> {
        if primes.is_empty() {
            return Err(IpfeError::InvalidModulusPrime("empty prime chain".into()));
        }
        if k < 2 {
            return Err(IpfeError::InvalidBound {
                value: k as i64,
                bound: 2,
            });
        }
        primes.sort_by_key(|p| p.q);
        let n = 1usize << exp;
        for pair in primes.windows(2) {
            if pair[0].q == pair[1].q {
                return Err(IpfeError::InvalidModulusPrime(format!(
                    "duplicate prime {}",
                    pair[0].q
                )));
            }
        }
        let mut q = BigUint::from(1u32);
        for p in &primes {
            if p.exp != exp {
                return Err(IpfeError::InvalidModulusPrime(format!(
                    "prime {} built for 2^{}, chain uses 2^{exp}",
                    p.q, p.exp
                )));
            }
            ModPrime::new(p.exp, p.q, p.phi)?;
            q *= p.q;
        }
        let delta = &q / BigUint::from(k);

        let mut phi_rev = Vec::with_capacity(primes.len());
        let mut phi_inv_rev = Vec::with_capacity(primes.len());
        let mut n_inv = Vec::with_capacity(primes.len());
        let mut crt_mix = Vec::with_capacity(primes.len());
        let mut delta_mod = Vec::with_capacity(primes.len());
        for (j, p) in primes.iter().enumerate() {
            let qj = p.q as u64;
            let inv_phi = mod_inverse(p.phi as u64, qj);
            let mut fwd = vec![0u32; n];
            let mut bwd = vec![0u32; n];
            let mut cur_f = 1u64;
            let mut cur_b = 1u64;
            for i in 0..n {
                fwd[reverse_bits(i, exp)] = cur_f as u32;
                bwd[reverse_bits(i, exp)] = cur_b as u32;
                cur_f = cur_f * p.phi as u64 % qj;
                cur_b = cur_b * inv_phi % qj;
            }
            phi_rev.push(fwd);
            phi_inv_rev.push(bwd);
            n_inv.push(mod_inverse(n as u64, qj) as u32);

            let mut partial = 1u64;
            for earlier in &primes[..j] {
                partial = partial * (earlier.q as u64 % qj) % qj;
            }
            crt_mix.push(if j == 0 {
                1
            } else {
                mod_inverse(partial, qj) as u32
            });
            delta_mod.push((&delta % qj).to_u64().expect("residue fits u64") as u32);
        }

        Ok(PrimeChainRing {
            exp,
            n,
            k,
            primes,
            q,
            delta,
            phi_rev,
            phi_inv_rev,
            n_inv,
            crt_mix,
            delta_mod,
        })
    }

    pub fn primes(&self) -> &[ModPrime] {
        &self.primes
    }

    fn len(&self) -> usize {
        self.primes.len() * self.n
    }

    fn reduce_i64(v: i64, q: u32) -> u32 {
        v.rem_euclid(q as i64) as u32
    }
}

impl CycloRing for PrimeChainRing {
    type Coeff = CrtPoly;
    type Eval = CrtPolyEval;
    type Scalar = Vec<u32>;

    fn build(exp: u32, q_min: &BigUint, k: u128) -> Result<Self> {
        let mut primes = Vec::new();
        let mut cursor = CHAIN_PRIME_START;
        let mut product = BigUint::from(1u32);
        while product <= *q_min {
            let p = next_chain_prime(exp, cursor).ok_or(IpfeError::ParameterSearchExhausted)?;
            cursor = p.q as u64 + 1;
            product *= p.q;
            primes.push(p);
        }
        Self::from_primes(exp, primes, k)
    }

    fn q_min_scale(_l: usize, _by: i64) -> u64 {
        1
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

    fn zero(&self) -> CrtPoly {
        CrtPoly {
            data: vec![0; self.len()],
        }
    }

    fn forward(&self, a: &CrtPoly) -> CrtPolyEval {
        let mut data = a.data.clone();
        for (j, row) in data.chunks_mut(self.n).enumerate() {
            ntt_neg_forward(row, self.primes[j].q, &self.phi_rev[j]);
        }
        CrtPolyEval { data }
    }

    fn backward(&self, a: &CrtPolyEval) -> CrtPoly {
        let mut data = a.data.clone();
        for (j, row) in data.chunks_mut(self.n).enumerate() {
            ntt_neg_backward(row, self.primes[j].q, &self.phi_inv_rev[j], self.n_inv[j]);
        }
        CrtPoly { data }
    }

    fn add(&self, a: &CrtPoly, b: &CrtPoly) -> CrtPoly {
        CrtPoly {
            data: self.zip_rows(&a.data, &b.data, add_mod),
        }
    }

    fn sub(&self, a: &CrtPoly, b: &CrtPoly) -> CrtPoly {
        CrtPoly {
            data: self.zip_rows(&a.data, &b.data, sub_mod),
        }
    }

    fn add_eval(&self, a: &CrtPolyEval, b: &CrtPolyEval) -> CrtPolyEval {
        CrtPolyEval {
            data: self.zip_rows(&a.data, &b.data, add_mod),
        }
    }

    fn mul_eval(&self, a: &CrtPolyEval, b: &CrtPolyEval) -> CrtPolyEval {
        CrtPolyEval {
            data: self.zip_rows(&a.data, &b.data, mul_mod),
        }
    }

    fn scalar(&self, v: i64) -> Vec<u32> {
        self.primes
            .iter()
            .map(|p| Self::reduce_i64(v, p.q))
            .collect()
    }

    fn scalar_mul_add(&self, acc: &mut CrtPoly, s: &Vec<u32>, p: &CrtPoly) {
        for (j, (acc_row, p_row)) in acc
            .data
            .chunks_mut(self.n)
            .zip(p.data.chunks(self.n))
            .enumerate()
        {
            let q = self.primes[j].q;
            let sj = s[j];
            for (a, &b) in acc_row.iter_mut().zip(p_row.iter()) {
                *a = add_mod(*a, mul_mod(sj, b, q), q);
            }
        }
    }

    fn encode_scaled(&self, xs: &[i64]) -> CrtPoly {
        let mut out = self.zero();
        for (j, row) in out.data.chunks_mut(self.n).enumerate() {
            let q = self.primes[j].q;
            let scale = self.delta_mod[j];
            for (k, &x) in xs.iter().enumerate() {
                row[k] = mul_mod(Self::reduce_i64(x, q), scale, q);
            }
        }
        out
    }

    fn lift_centered(&self, a: &CrtPoly) -> Vec<BigInt> {
        let t = self.primes.len();
        let q_big = BigInt::from(self.q.clone());
        let mut out = Vec::with_capacity(self.n);
        for i in 0..self.n {
            let mut x = BigUint::from(a.data[i]);
            let mut c = BigUint::from(self.primes[0].q);
            for j in 1..t {
                let qj = self.primes[j].q as u64;
                let x_mod = (&x % qj).to_u64().expect("residue fits u64");
                let diff = (a.data[j * self.n + i] as u64 + qj - x_mod) % qj;
                let term = (diff as u128 * self.crt_mix[j] as u128 % qj as u128) as u64;
                x += &c * term;
                c *= qj;
            }
            let x = BigInt::from(x);
            out.push(if &x * 2 > q_big { x - &q_big } else { x });
        }
        out
    }

    fn project(&self, xs: &[BigInt]) -> CrtPoly {
        let mut out = self.zero();
        for (j, row) in out.data.chunks_mut(self.n).enumerate() {
            let q = self.primes[j].q as i64;
            for (slot, x) in row.iter_mut().zip(xs.iter()) {
                let r = (x % q).to_i64().expect("remainder fits i64");
                *slot = r.rem_euclid(q) as u32;
            }
        }
        out
    }

    fn sample_uniform_eval<R: Rng + CryptoRng>(&self, rng: &mut R) -> CrtPolyEval {
        let mut data = Vec::with_capacity(self.len());
        for p in &self.primes {
            for _ in 0..self.n {
                data.push(rng.gen_range(1..p.q));
            }
        }
        CrtPolyEval { data }
    }

    fn sample_gaussian<R: Rng + CryptoRng>(
        &self,
        sigma: f64,
        alg: GaussianSampler,
        rng: &mut R,
    ) -> CrtPoly {
        let mut out = self.zero();
        for i in 0..self.n {
            let z = sample_gaussian_int(sigma, alg, rng);
            for (j, p) in self.primes.iter().enumerate() {
                out.data[j * self.n + i] = Self::reduce_i64(z, p.q);
            }
        }
        out
    }

    fn check_coeff(&self, a: &CrtPoly) -> Result<()> {
        if a.data.len() != self.len() {
            return Err(IpfeError::InvalidDimensions(format!(
                "polynomial of {} residues, modulus expects {}",
                a.data.len(),
                self.len()
            )));
        }
        Ok(())
    }

    fn check_eval(&self, a: &CrtPolyEval) -> Result<()> {
        if a.data.len() != self.len() {
            return Err(IpfeError::InvalidDimensions(format!(
                "polynomial of {} residues, modulus expects {}",
                a.data.len(),
                self.len()
            )));
        }
        Ok(())
    }
}

impl PrimeChainRing {
    fn zip_rows(&self, a: &[u32], b: &[u32], op: fn(u32, u32, u32) -> u32) -> Vec<u32> {
        debug_assert_eq!(a.len(), self.len());
        debug_assert_eq!(b.len(), self.len());
        let mut data = Vec::with_capacity(a.len());
        for (j, (ar, br)) in a.chunks(self.n).zip(b.chunks(self.n)).enumerate() {
            let q = self.primes[j].q;
            data.extend(ar.iter().zip(br.iter()).map(|(&x, &y)| op(x, y, q)));
        }
        data
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::number_theory::mod_pow;
    use num_bigint::RandBigInt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_ring() -> PrimeChainRing {
        // three ~30-bit primes, n = 16
        PrimeChainRing::build(4, &(BigUint::from(1u32) << 70), 1000).unwrap()
    }

    #[test]
    fn build_finds_enough_primes() {
        let ring = test_ring();
        assert_eq!(ring.degree(), 16);
        assert!(ring.primes().len() >= 3);
        assert!(*ring.modulus() > (BigUint::from(1u32) << 70));
        for p in ring.primes() {
            assert_eq!(p.q as u64 % 32, 1);
            assert_eq!(mod_pow(p.phi as u64, 16, p.q as u64), p.q as u64 - 1);
        }
    }

    #[test]
    fn forward_backward_roundtrip() {
        let ring = test_ring();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let a = ring.sample_gaussian(20.0, GaussianSampler::Rounded, &mut rng);
        assert_eq!(ring.backward(&ring.forward(&a)), a);
    }

    #[test]
    fn crt_project_lift_roundtrip() {
        let ring = test_ring();
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let half = ring.modulus() >> 1;
        let xs: Vec<BigInt> = (0..ring.degree())
            .map(|_| {
                let mag = rng.gen_biguint_below(&half);
                let v = BigInt::from(mag);
                if rng.gen::<bool>() {
                    v
                } else {
                    -v
                }
            })
            .collect();
        let lifted = ring.lift_centered(&ring.project(&xs));
        assert_eq!(lifted, xs);
    }

    #[test]
    fn encode_scaled_embeds_by_delta() {
        let ring = test_ring();
        let xs: Vec<i64> = vec![0, 1, -1, 5, -5, 499];
        let lifted = ring.lift_centered(&ring.encode_scaled(&xs));
        let delta = BigInt::from(ring.plaintext_scale().clone());
        for (k, &x) in xs.iter().enumerate() {
            assert_eq!(lifted[k], &delta * x, "slot {k}");
        }
        for v in &lifted[xs.len()..] {
            assert_eq!(*v, BigInt::from(0));
        }
    }

    #[test]
    fn negacyclic_mul_matches_single_prime_schoolbook() {
        // A one-prime chain makes the schoolbook reference exact.
        let p = next_chain_prime(3, CHAIN_PRIME_START).unwrap();
        let ring = PrimeChainRing::from_primes(3, vec![p], 17).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let a = CrtPoly {
            data: (0..8).map(|_| rng.gen_range(0..p.q)).collect(),
        };
        let b = CrtPoly {
            data: (0..8).map(|_| rng.gen_range(0..p.q)).collect(),
        };
        let mut expected = vec![0u32; 8];
        for i in 0..8 {
            for j in 0..8 {
                let prod = mul_mod(a.data[i], b.data[j], p.q);
                let k = (i + j) % 8;
                if i + j < 8 {
                    expected[k] = add_mod(expected[k], prod, p.q);
                } else {
                    expected[k] = sub_mod(expected[k], prod, p.q);
                }
            }
        }
        assert_eq!(ring.negacyclic_mul(&a, &b).data, expected);
    }

    #[test]
    fn uniform_excludes_zero() {
        let ring = test_ring();
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        for _ in 0..50 {
            let a = ring.sample_uniform_eval(&mut rng);
            assert!(a.data.iter().all(|&c| c != 0));
        }
    }

    #[test]
    fn serde_roundtrip_rebuilds_tables() {
        let ring = test_ring();
        let bytes = bincode::serialize(&ring).unwrap();
        let restored: PrimeChainRing = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, ring);
    }

    #[test]
    fn rejects_mismatched_descriptions() {
        let ring = test_ring();
        let mut primes = ring.primes().to_vec();
        primes[0].phi = 1;
        assert!(PrimeChainRing::from_primes(4, primes, 1000).is_err());
    }
}
