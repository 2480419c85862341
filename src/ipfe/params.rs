//! Joint parameter search: grow the ring dimension until the noise-growth
//! (correctness) bound and the primal-lattice-attack predicate both hold.

use crate::error::{IpfeError, Result};
use crate::math::ring::CycloRing;
use crate::math::utils::{ceil_log, log2_big};
use crate::sampler::GaussianSampler;
use log::{debug, info};
use num_bigint::BigUint;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Hard ceiling of the search: ring dimensions stop below `2^20`.
const MAX_EXP: u32 = 20;

/// A complete parameter set plus its ring context. Generic over the
/// modulus representation; serializing persists the prime description and
/// deserializing rebuilds (and re-validates) the tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Ipfe<M: CycloRing> {
    pub sec: u32,
    /// Vector length.
    pub l: usize,
    /// Plaintext coefficient bound.
    pub bx: i64,
    /// Function-vector coefficient bound.
    pub by: i64,
    /// Plaintext modulus `K = 2*l*bx*by + 1`.
    pub k: u128,
    /// Secret-key / public-key noise width.
    pub sigma1: f64,
    /// Encryption-randomness width.
    pub sigma2: f64,
    /// Per-slot encryption-noise width.
    pub sigma3: f64,
    /// Which discrete-Gaussian algorithm the scheme draws from.
    pub noise: GaussianSampler,
    pub ring: M,
}

impl<M: CycloRing> Ipfe<M> {
    /// Searches for parameters supporting inner products of `l`-vectors
    /// bounded by `bx`/`by`, with up to `rows` simultaneously encrypted
    /// rows, at security level `sec`.
    pub fn search(sec: u32, l: usize, rows: usize, bx: i64, by: i64) -> Result<Self> {
        if l == 0 || rows == 0 {
            return Err(IpfeError::InvalidDimensions(
                "vector length and row count must be positive".into(),
            ));
        }
        if bx < 1 {
            return Err(IpfeError::InvalidBound { value: bx, bound: 1 });
        }
        if by < 1 {
            return Err(IpfeError::InvalidBound { value: by, bound: 1 });
        }
        let k = 2 * l as u128 * bx as u128 * by as u128 + 1;
        let sigma = 1.0f64;
        let sigma1 = 2.0 * (l as f64).sqrt() * bx as f64 * sigma;
        let b_bound = (sec as f64 / 0.265).floor() as usize;
        let exp0 = (ceil_log(2, rows as u64) as u32).max(6);

        for exp in exp0..MAX_EXP {
            let n = 1usize << exp;
            let sigma2 =
                2.0f64.sqrt() * ((l + 2) as f64).sqrt() * n as f64 * sigma1 * (sec as f64).sqrt()
                    * sigma;
            let sigma3 = sigma2 * 2.0f64.sqrt();
            let q_min_f = 2.0
                * (2.0 * n as f64 * sec as f64 * sigma1 * sigma2 + (sec as f64).sqrt() * sigma3)
                * k as f64
                * M::q_min_scale(l, by) as f64;
            let q_min =
                BigUint::from_f64(q_min_f.ceil()).ok_or(IpfeError::ParameterSearchExhausted)?;
            let ring = M::build(exp, &q_min, k)?;
            let log2_q = log2_big(ring.modulus());
            debug!(
                "candidate n = 2^{exp}, log2(q_min) = {:.1}, log2(q) = {log2_q:.1}",
                q_min_f.log2()
            );
            if primal_secure(n, log2_q, sigma, b_bound) {
                info!("accepted n = 2^{exp} with a {:.0}-bit modulus", log2_q.ceil());
                return Ok(Ipfe {
                    sec,
                    l,
                    bx,
                    by,
                    k,
                    sigma1,
                    sigma2,
                    sigma3,
                    noise: GaussianSampler::Facct,
                    ring,
                });
            }
            debug!("n = 2^{exp} fails the primal-attack predicate");
        }
        Err(IpfeError::ParameterSearchExhausted)
    }

    /// Ring dimension, the maximum number of simultaneously encrypted rows.
    pub fn degree(&self) -> usize {
        self.ring.degree()
    }
}

/// The primal-attack safety predicate: no admissible block size `b` and
/// sample count `m` give the lattice-reduction distinguisher an advantage.
/// A configuration is rejected as soon as
/// `sigma * sqrt(b) <= delta^(2b-d-1) * q^(m/d)` for some `(b, m)`.
fn primal_secure(n: usize, log2_q: f64, sigma: f64, b_bound: usize) -> bool {
    use std::f64::consts::{E, PI};
    let ln_q = log2_q * std::f64::consts::LN_2;
    for b in 50..=b_bound {
        let bf = b as f64;
        let ln_delta = ((PI * bf).powf(1.0 / bf) * bf / (2.0 * PI * E)).ln() / (2.0 * bf - 2.0);
        let ln_lhs = (sigma * bf.sqrt()).ln();
        let m_lo = if b > n { b - n } else { 1 };
        for m in m_lo..3 * n {
            let d = (n + m) as f64;
            let ln_rhs = (2.0 * bf - d - 1.0) * ln_delta + (m as f64 / d) * ln_q;
            if ln_lhs <= ln_rhs {
                return false;
            }
        }
    }
    true
}
