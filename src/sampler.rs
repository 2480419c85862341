//! Integer samplers for the noise distributions.
//!
//! Two discrete-Gaussian algorithms are available: a fast path that rounds
//! a continuous Gaussian (adequate when constant-time execution is not a
//! concern), and the FACCT sampler, which draws a half-line base sample
//! from a fixed CDT, widens it by a uniform offset, and corrects with a
//! Bernoulli(2^a) rejection step evaluated through the bits of an IEEE
//! double.

use rand::{CryptoRng, Rng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Which discrete-Gaussian algorithm key and noise sampling uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GaussianSampler {
    /// Continuous Gaussian rounded half-to-even.
    Rounded,
    /// CDT + Bernoulli(exp) rejection sampler.
    Facct,
}

/// `sqrt(2 ln 2)`: converts a target sigma into the CDT step count `k`.
pub const INV_SIGMA_CDT: f64 = 1.177_410_022_515_474_7;

/// Horner coefficients (highest degree first) approximating `2^x` on [0, 1).
const EXP2_COEFFS: [f64; 10] = [
    1.432_910_037_894_391e-7,
    1.230_394_437_555_541_3e-6,
    1.535_991_421_946_201_2e-5,
    1.539_604_321_053_863_8e-4,
    0.001_333_387_755_250_109_7,
    0.009_618_120_933_175_645,
    0.055_504_109_841_318_25,
    0.240_226_506_876_527_75,
    0.693_147_180_561_933_8,
    1.0,
];

/// Half-line CDT for the base distribution `2^(-x^2)`: little-endian
/// 128-bit thresholds, the top bit of each 64-bit half masked off before
/// comparison.
const CDT: [(u64, u64); 9] = [
    (2200310400551559144, 3327841033070651387),
    (7912151619254726620, 380075531178589176),
    (5167367257772081627, 11604843442081400),
    (5081592746475748971, 90134450315532),
    (6522074513864805092, 175786317361),
    (2579734681240182346, 85801740),
    (8175784047440310133, 10472),
    (2947787991558061753, 0),
    (22489665999543, 0),
];

const MASK63: u64 = (1 << 63) - 1;
const SAMPLE_BITS: u32 = 19;

/// One discrete-Gaussian integer with parameter `sigma`.
pub fn sample_gaussian_int<R: Rng + CryptoRng>(
    sigma: f64,
    alg: GaussianSampler,
    rng: &mut R,
) -> i64 {
    match alg {
        GaussianSampler::Rounded => sample_rounded(sigma, rng),
        GaussianSampler::Facct => sample_facct(sigma, rng),
    }
}

fn sample_rounded<R: Rng + CryptoRng>(sigma: f64, rng: &mut R) -> i64 {
    let normal = Normal::new(0.0, sigma).expect("sigma is positive and finite");
    normal.sample(rng).round_ties_even() as i64
}

/// FACCT: base sample `x` from the CDT, offset `y` uniform in `[0, k)`
/// with `k = round(sigma * sqrt(2 ln 2))`, candidate `r = x*k + y`,
/// accepted with probability `2^(-(2xk + y) * y / k^2)`. The pair
/// `(r == 0, s == +1)` is rejected so zero is not counted twice.
fn sample_facct<R: Rng + CryptoRng>(sigma: f64, rng: &mut R) -> i64 {
    let k = (sigma * INV_SIGMA_CDT).round() as u64;
    let kappa = 1.0 / (k as f64 * k as f64);
    loop {
        let x = cdt_sample(rng);
        let y = rng.gen_range(0..k);
        let positive: bool = rng.gen();
        let r = x * k + y;
        let t = (2 * x * k + y) as u128 * y as u128;
        let a = -(t as f64) * kappa;
        if bernoulli_exp2(a, rng) && (r != 0 || !positive) {
            return if positive { r as i64 } else { -(r as i64) };
        }
    }
}

/// Number of CDT thresholds a fresh double-63-bit draw falls below.
fn cdt_sample<R: Rng + CryptoRng>(rng: &mut R) -> u64 {
    let r_lo = rng.next_u64() & MASK63;
    let r_hi = rng.next_u64() & MASK63;
    let mut x = 0u64;
    for &(c_lo, c_hi) in CDT.iter() {
        let c_lo = c_lo & MASK63;
        let c_hi = c_hi & MASK63;
        // lexicographic (r_hi, r_lo) < (c_hi, c_lo), branch-free
        let borrow = r_lo.wrapping_sub(c_lo) >> 63;
        x += r_hi.wrapping_sub(c_hi + borrow) >> 63;
    }
    x
}

/// Bernoulli with success probability `2^a`, `a <= 0`. The fractional part
/// of `a` goes through the Horner polynomial; the integer part is folded
/// into the IEEE exponent of the result before the two-part comparison
/// against fresh 53- and 19-bit uniforms.
fn bernoulli_exp2<R: Rng + CryptoRng>(a: f64, rng: &mut R) -> bool {
    debug_assert!(a <= 0.0);
    let int_part = a.floor();
    let z = a - int_part;
    let val = EXP2_COEFFS.iter().fold(0.0f64, |acc, &c| acc * z + c);
    if val == 1.0 {
        return true;
    }
    let bits = val.to_bits();
    let mantissa = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
    let exponent = ((bits >> 52) & 0x7ff) as i64 + int_part as i64;
    let r1 = rng.next_u64() >> 11;
    let r2 = rng.next_u64() >> (64 - SAMPLE_BITS);
    if r1 >= mantissa {
        return false;
    }
    let shift = SAMPLE_BITS as i64 + exponent + 1 - 1023;
    if shift >= 64 {
        true
    } else if shift <= 0 {
        false
    } else {
        r2 < (1u64 << shift)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const N: usize = 200_000;

    /// The sigma the FACCT sampler actually realizes for a requested one.
    fn realized_sigma(sigma: f64) -> f64 {
        (sigma * INV_SIGMA_CDT).round() / INV_SIGMA_CDT
    }

    /// Probability of drawing 0 from the discrete Gaussian with
    /// parameter `sigma`.
    fn zero_probability(sigma: f64) -> f64 {
        let reach = (20.0 * sigma).ceil() as i64;
        let mut total = 0.0;
        for z in -reach..=reach {
            total += (-((z * z) as f64) / (2.0 * sigma * sigma)).exp();
        }
        1.0 / total
    }

    fn facct_samples(sigma: f64, seed: u64) -> Vec<i64> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        (0..N)
            .map(|_| sample_gaussian_int(sigma, GaussianSampler::Facct, &mut rng))
            .collect()
    }

    fn mean_and_std(samples: &[i64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / n;
        let var = samples
            .iter()
            .map(|&x| (x as f64 - mean) * (x as f64 - mean))
            .sum::<f64>()
            / n;
        (mean, var.sqrt())
    }

    #[test]
    fn facct_moments() {
        for (sigma, seed) in [(1.0, 1u64), (8.0, 2), (1024.0, 3)] {
            let target = realized_sigma(sigma);
            let samples = facct_samples(sigma, seed);
            let (mean, std) = mean_and_std(&samples);
            let mean_tol = 12.0 * target / (N as f64).sqrt();
            assert!(
                mean.abs() < mean_tol,
                "sigma {sigma}: mean {mean} exceeds {mean_tol}"
            );
            assert!(
                (std / target - 1.0).abs() < 0.02,
                "sigma {sigma}: std {std} vs expected {target}"
            );
        }
    }

    #[test]
    fn facct_zero_frequency() {
        for (sigma, seed) in [(1.0, 11u64), (8.0, 12)] {
            let target = realized_sigma(sigma);
            let p0 = zero_probability(target);
            let samples = facct_samples(sigma, seed);
            let freq = samples.iter().filter(|&&x| x == 0).count() as f64 / N as f64;
            let tol = 12.0 * (p0 * (1.0 - p0) / N as f64).sqrt();
            assert!(
                (freq - p0).abs() < tol,
                "sigma {sigma}: zero frequency {freq} vs predicted {p0}"
            );
        }
    }

    #[test]
    fn facct_support_is_symmetric() {
        let samples = facct_samples(8.0, 21);
        let pos = samples.iter().filter(|&&x| x > 0).count() as f64 / N as f64;
        let neg = samples.iter().filter(|&&x| x < 0).count() as f64 / N as f64;
        assert!((pos - neg).abs() < 0.02, "positive {pos} vs negative {neg}");
    }

    #[test]
    fn rounded_moments() {
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let samples: Vec<i64> = (0..N)
            .map(|_| sample_gaussian_int(8.0, GaussianSampler::Rounded, &mut rng))
            .collect();
        let (mean, std) = mean_and_std(&samples);
        assert!(mean.abs() < 12.0 * 8.0 / (N as f64).sqrt());
        assert!((std / 8.0 - 1.0).abs() < 0.02);
    }

    #[test]
    fn bernoulli_certain_success() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        for _ in 0..100 {
            assert!(bernoulli_exp2(0.0, &mut rng));
        }
    }

    #[test]
    fn bernoulli_matches_probability() {
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        for a in [-0.5f64, -1.5, -3.25] {
            let trials = 100_000;
            let hits = (0..trials).filter(|_| bernoulli_exp2(a, &mut rng)).count();
            let p = 2f64.powf(a);
            let freq = hits as f64 / trials as f64;
            let tol = 12.0 * (p * (1.0 - p) / trials as f64).sqrt();
            assert!(
                (freq - p).abs() < tol.max(0.005),
                "a = {a}: frequency {freq} vs 2^a = {p}"
            );
        }
    }

    #[test]
    fn cdt_base_distribution() {
        // P(x >= 1) under 2^(-x^2) restricted to the half line
        let norm: f64 = (0..6).map(|x| 2f64.powi(-(x * x))).sum();
        let expected = (norm - 1.0) / norm;
        let mut rng = ChaCha20Rng::seed_from_u64(47);
        let hits = (0..N).filter(|_| cdt_sample(&mut rng) >= 1).count();
        let freq = hits as f64 / N as f64;
        assert!(
            (freq - expected).abs() < 0.01,
            "P(x >= 1) = {freq}, expected {expected}"
        );
    }
}
