//! In-place negacyclic NTT over one residue row. The twiddle tables hold
//! bit-reversed powers of a primitive 2n-th root `phi`, which absorbs the
//! negacyclic twist; no separate pre/post scaling is applied.
//!
//! Forward is Cooley-Tukey decimation-in-time (natural-order input,
//! bit-reversed output); backward is Gentleman-Sande with a trailing
//! `n^-1` scaling. Residues are u32 with u64 products throughout.

#[inline(always)]
pub fn add_mod(a: u32, b: u32, q: u32) -> u32 {
    let s = a + b;
    if s >= q {
        s - q
    } else {
        s
    }
}

#[inline(always)]
pub fn sub_mod(a: u32, b: u32, q: u32) -> u32 {
    if a >= b {
        a - b
    } else {
        a + q - b
    }
}

#[inline(always)]
pub fn mul_mod(a: u32, b: u32, q: u32) -> u32 {
    (a as u64 * b as u64 % q as u64) as u32
}

/// `phi_rev[j]` must hold `phi^bitrev(j)`; `values.len()` is a power of 2.
pub fn ntt_neg_forward(values: &mut [u32], q: u32, phi_rev: &[u32]) {
    let n = values.len();
    debug_assert_eq!(phi_rev.len(), n);
    let mut t = n;
    let mut m = 1;
    while m < n {
        t /= 2;
        for i in 0..m {
            let s = phi_rev[m + i];
            let j1 = 2 * i * t;
            for j in j1..j1 + t {
                let u = values[j];
                let v = mul_mod(values[j + t], s, q);
                values[j] = add_mod(u, v, q);
                values[j + t] = sub_mod(u, v, q);
            }
        }
        m *= 2;
    }
}

/// `phi_inv_rev[j]` must hold `phi^-bitrev(j)`; `n_inv = n^-1 mod q`.
pub fn ntt_neg_backward(values: &mut [u32], q: u32, phi_inv_rev: &[u32], n_inv: u32) {
    let n = values.len();
    debug_assert_eq!(phi_inv_rev.len(), n);
    let mut t = 1;
    let mut m = n;
    while m > 1 {
        let h = m / 2;
        let mut j1 = 0;
        for i in 0..h {
            let s = phi_inv_rev[h + i];
            for j in j1..j1 + t {
                let u = values[j];
                let v = values[j + t];
                values[j] = add_mod(u, v, q);
                values[j + t] = mul_mod(sub_mod(u, v, q), s, q);
            }
            j1 += 2 * t;
        }
        t *= 2;
        m = h;
    }
    for v in values.iter_mut() {
        *v = mul_mod(*v, n_inv, q);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::mod_prime::{next_chain_prime, CHAIN_PRIME_START};
    use crate::math::number_theory::{mod_inverse, mod_pow};
    use crate::math::utils::reverse_bits;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn tables(exp: u32) -> (u32, Vec<u32>, Vec<u32>, u32) {
        let p = next_chain_prime(exp, CHAIN_PRIME_START).unwrap();
        let n = 1usize << exp;
        let q = p.q;
        let phi_inv = mod_inverse(p.phi as u64, q as u64) as u32;
        let mut fwd = vec![0u32; n];
        let mut bwd = vec![0u32; n];
        for j in 0..n {
            let r = reverse_bits(j, exp) as u64;
            fwd[j] = mod_pow(p.phi as u64, r, q as u64) as u32;
            bwd[j] = mod_pow(phi_inv as u64, r, q as u64) as u32;
        }
        let n_inv = mod_inverse(n as u64, q as u64) as u32;
        (q, fwd, bwd, n_inv)
    }

    fn schoolbook_negacyclic(a: &[u32], b: &[u32], q: u32) -> Vec<u32> {
        let n = a.len();
        let mut c = vec![0u32; n];
        for i in 0..n {
            for j in 0..n {
                let prod = mul_mod(a[i], b[j], q);
                let k = (i + j) % n;
                if i + j < n {
                    c[k] = add_mod(c[k], prod, q);
                } else {
                    c[k] = sub_mod(c[k], prod, q);
                }
            }
        }
        c
    }

    #[test]
    fn forward_backward_is_identity() {
        for exp in [3u32, 6, 9] {
            let (q, fwd, bwd, n_inv) = tables(exp);
            let n = 1usize << exp;
            let mut rng = ChaCha20Rng::seed_from_u64(7 + exp as u64);
            let original: Vec<u32> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            let mut values = original.clone();
            ntt_neg_forward(&mut values, q, &fwd);
            assert_ne!(values, original);
            ntt_neg_backward(&mut values, q, &bwd, n_inv);
            assert_eq!(values, original);
        }
    }

    #[test]
    fn pointwise_product_is_negacyclic_convolution() {
        for exp in [3u32, 5] {
            let (q, fwd, bwd, n_inv) = tables(exp);
            let n = 1usize << exp;
            let mut rng = ChaCha20Rng::seed_from_u64(42 + exp as u64);
            let a: Vec<u32> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            let b: Vec<u32> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            let expected = schoolbook_negacyclic(&a, &b, q);

            let mut a_hat = a.clone();
            let mut b_hat = b.clone();
            ntt_neg_forward(&mut a_hat, q, &fwd);
            ntt_neg_forward(&mut b_hat, q, &fwd);
            let mut c: Vec<u32> = a_hat
                .iter()
                .zip(b_hat.iter())
                .map(|(&x, &y)| mul_mod(x, y, q))
                .collect();
            ntt_neg_backward(&mut c, q, &bwd, n_inv);
            assert_eq!(c, expected);
        }
    }

    #[test]
    fn multiplying_by_x_rotates_with_sign() {
        // (x^(n-1)) * x = x^n = -1
        let (q, fwd, bwd, n_inv) = tables(3);
        let n = 8;
        let mut a = vec![0u32; n];
        a[n - 1] = 1;
        let mut b = vec![0u32; n];
        b[1] = 1;
        let mut a_hat = a.clone();
        let mut b_hat = b.clone();
        ntt_neg_forward(&mut a_hat, q, &fwd);
        ntt_neg_forward(&mut b_hat, q, &fwd);
        let mut c: Vec<u32> = a_hat
            .iter()
            .zip(b_hat.iter())
            .map(|(&x, &y)| mul_mod(x, y, q))
            .collect();
        ntt_neg_backward(&mut c, q, &bwd, n_inv);
        let mut expected = vec![0u32; n];
        expected[0] = q - 1;
        assert_eq!(c, expected);
    }
}
