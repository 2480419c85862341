//! Keys, ciphertexts, and the scheme operations. Everything is generic
//! over the modulus representation; keys are value types validated at the
//! boundary of each operation that consumes them.

use crate::error::{IpfeError, Result};
use crate::ipfe::params::Ipfe;
use crate::math::ring::CycloRing;
use crate::math::utils::div_round_half_even;
use itertools::Itertools;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rand::{CryptoRng, Rng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Master secret key: one Gaussian(sigma1) polynomial per slot,
/// coefficient domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct SecretKey<M: CycloRing> {
    pub(crate) sk: Vec<M::Coeff>,
}

/// Master public key: the shared uniform `a` and per-slot
/// `pk_i = a * NTT(sk_i) + NTT(e_i)`, all in the evaluation domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct PublicKey<M: CycloRing> {
    pub(crate) a: M::Eval,
    pub(crate) pk: Vec<M::Eval>,
}

/// Function key for a vector `y`: `y` reduced into every modulus
/// component, plus `sk_y = sum_j y_j * sk_j` in the coefficient domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct FunctionKey<M: CycloRing> {
    pub(crate) y_enc: Vec<M::Scalar>,
    pub(crate) poly: M::Coeff,
}

/// Ciphertext for `rows` simultaneously encrypted rows, coefficient
/// domain throughout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Ciphertext<M: CycloRing> {
    pub rows: usize,
    pub(crate) c0: M::Coeff,
    pub(crate) cs: Vec<M::Coeff>,
}

impl<M: CycloRing> Ipfe<M> {
    /// Samples the master secret key.
    pub fn keygen<R: Rng + CryptoRng>(&self, rng: &mut R) -> SecretKey<M> {
        SecretKey {
            sk: (0..self.l)
                .map(|_| self.ring.sample_gaussian(self.sigma1, self.noise, rng))
                .collect(),
        }
    }

    /// Derives the master public key from the secret key.
    pub fn public_key_gen<R: Rng + CryptoRng>(
        &self,
        msk: &SecretKey<M>,
        rng: &mut R,
    ) -> Result<PublicKey<M>> {
        self.check_msk(msk)?;
        let a = self.ring.sample_uniform_eval(rng);
        let pk = msk
            .sk
            .iter()
            .map(|sk_i| {
                let e = self.ring.sample_gaussian(self.sigma1, self.noise, rng);
                self.ring.add_eval(
                    &self.ring.mul_eval(&a, &self.ring.forward(sk_i)),
                    &self.ring.forward(&e),
                )
            })
            .collect();
        Ok(PublicKey { a, pk })
    }

    /// Issues the function key for `y`.
    pub fn derive_function_key(&self, msk: &SecretKey<M>, y: &[i64]) -> Result<FunctionKey<M>> {
        self.check_msk(msk)?;
        if y.len() != self.l {
            return Err(IpfeError::InvalidDimensions(format!(
                "function vector of length {}, expected {}",
                y.len(),
                self.l
            )));
        }
        for &v in y {
            if v.abs() > self.by {
                return Err(IpfeError::InvalidBound {
                    value: v,
                    bound: self.by,
                });
            }
        }
        let y_enc = y.iter().map(|&v| self.ring.scalar(v)).collect_vec();
        let mut poly = self.ring.zero();
        for (s, sk_i) in y_enc.iter().zip(msk.sk.iter()) {
            self.ring.scalar_mul_add(&mut poly, s, sk_i);
        }
        Ok(FunctionKey { y_enc, poly })
    }

    /// Encrypts an `m x l` matrix, `m <= n`; every row shares the same
    /// encryption randomness, which is what ties the rows to one
    /// functional decryption.
    pub fn encrypt<R: Rng + CryptoRng>(
        &self,
        mpk: &PublicKey<M>,
        x: &[Vec<i64>],
        rng: &mut R,
    ) -> Result<Ciphertext<M>> {
        self.check_mpk(mpk)?;
        let rows = x.len();
        if rows == 0 || rows > self.ring.degree() {
            return Err(IpfeError::InvalidDimensions(format!(
                "{rows} rows, ring supports 1..={}",
                self.ring.degree()
            )));
        }
        for row in x {
            if row.len() != self.l {
                return Err(IpfeError::InvalidDimensions(format!(
                    "row of length {}, expected {}",
                    row.len(),
                    self.l
                )));
            }
            for &v in row {
                if v.abs() > self.bx {
                    return Err(IpfeError::InvalidBound {
                        value: v,
                        bound: self.bx,
                    });
                }
            }
        }

        let r = self.ring.sample_gaussian(self.sigma2, self.noise, rng);
        let f0 = self.ring.sample_gaussian(self.sigma2, self.noise, rng);
        let r_hat = self.ring.forward(&r);
        let c0 = self
            .ring
            .add(&self.ring.backward(&self.ring.mul_eval(&mpk.a, &r_hat)), &f0);

        let mut col = vec![0i64; rows];
        let mut cs = Vec::with_capacity(self.l);
        for i in 0..self.l {
            let f = self.ring.sample_gaussian(self.sigma3, self.noise, rng);
            for (k, row) in x.iter().enumerate() {
                col[k] = row[i];
            }
            let x_poly = self.ring.encode_scaled(&col);
            let masked = self
                .ring
                .add(&self.ring.backward(&self.ring.mul_eval(&mpk.pk[i], &r_hat)), &f);
            cs.push(self.ring.add(&masked, &x_poly));
        }
        Ok(Ciphertext { rows, c0, cs })
    }

    /// Encrypts a single vector (one row).
    pub fn encrypt_vec<R: Rng + CryptoRng>(
        &self,
        mpk: &PublicKey<M>,
        x: &[i64],
        rng: &mut R,
    ) -> Result<Ciphertext<M>> {
        self.encrypt(mpk, &[x.to_vec()], rng)
    }

    /// Functional decryption: the inner product `<x_row, y>` for each of
    /// the `rows` encrypted rows.
    pub fn decrypt(&self, fk: &FunctionKey<M>, ct: &Ciphertext<M>) -> Result<Vec<BigInt>> {
        self.check_fk(fk)?;
        self.check_ct(ct)?;
        let mut acc = self.ring.zero();
        for (s, c_i) in fk.y_enc.iter().zip(ct.cs.iter()) {
            self.ring.scalar_mul_add(&mut acc, s, c_i);
        }
        let d = self
            .ring
            .sub(&acc, &self.ring.negacyclic_mul(&ct.c0, &fk.poly));
        let lifted = self.ring.lift_centered(&d);
        let delta = self.ring.plaintext_scale();
        Ok(lifted[..ct.rows]
            .iter()
            .map(|v| div_round_half_even(v, delta))
            .collect())
    }

    /// Full recovery of the encrypted matrix with the master secret key.
    pub fn decrypt_all(&self, msk: &SecretKey<M>, ct: &Ciphertext<M>) -> Result<Vec<Vec<i64>>> {
        self.check_msk(msk)?;
        self.check_ct(ct)?;
        let delta = self.ring.plaintext_scale();
        let columns: Vec<Vec<i64>> = ct
            .cs
            .par_iter()
            .zip(msk.sk.par_iter())
            .map(|(c_i, sk_i)| {
                let d = self
                    .ring
                    .sub(c_i, &self.ring.negacyclic_mul(&ct.c0, sk_i));
                self.ring.lift_centered(&d)[..ct.rows]
                    .iter()
                    .map(|v| {
                        div_round_half_even(v, delta)
                            .to_i64()
                            .ok_or(IpfeError::DecryptionOutOfRange)
                    })
                    .collect::<Result<Vec<i64>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let mut out = vec![vec![0i64; self.l]; ct.rows];
        for (i, column) in columns.iter().enumerate() {
            for (k, &v) in column.iter().enumerate() {
                out[k][i] = v;
            }
        }
        Ok(out)
    }

    fn check_msk(&self, msk: &SecretKey<M>) -> Result<()> {
        if msk.sk.len() != self.l {
            return Err(IpfeError::InvalidDimensions(format!(
                "secret key with {} slots, expected {}",
                msk.sk.len(),
                self.l
            )));
        }
        for p in &msk.sk {
            self.ring.check_coeff(p)?;
        }
        Ok(())
    }

    fn check_mpk(&self, mpk: &PublicKey<M>) -> Result<()> {
        if mpk.pk.len() != self.l {
            return Err(IpfeError::InvalidDimensions(format!(
                "public key with {} slots, expected {}",
                mpk.pk.len(),
                self.l
            )));
        }
        self.ring.check_eval(&mpk.a)?;
        for p in &mpk.pk {
            self.ring.check_eval(p)?;
        }
        Ok(())
    }

    fn check_fk(&self, fk: &FunctionKey<M>) -> Result<()> {
        if fk.y_enc.len() != self.l {
            return Err(IpfeError::InvalidDimensions(format!(
                "function key with {} slots, expected {}",
                fk.y_enc.len(),
                self.l
            )));
        }
        self.ring.check_coeff(&fk.poly)
    }

    fn check_ct(&self, ct: &Ciphertext<M>) -> Result<()> {
        if ct.cs.len() != self.l {
            return Err(IpfeError::InvalidDimensions(format!(
                "ciphertext with {} slots, expected {}",
                ct.cs.len(),
                self.l
            )));
        }
        if ct.rows == 0 || ct.rows > self.ring.degree() {
            return Err(IpfeError::InvalidDimensions(format!(
                "{} rows, ring supports 1..={}",
                ct.rows,
                self.ring.degree()
            )));
        }
        self.ring.check_coeff(&ct.c0)?;
        for c in &ct.cs {
            self.ring.check_coeff(c)?;
        }
        Ok(())
    }
}
