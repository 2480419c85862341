//! Small integer helpers shared by the NTT tables and the parameter search.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

/// Largest `k` with `base^k <= x`. `x` must be nonzero.
pub const fn floor_log(base: u64, mut x: u64) -> usize {
    let mut result = 0;
    x /= base;
    while x > 0 {
        x /= base;
        result += 1;
    }
    result
}

/// Smallest `k` with `base^k >= x`.
pub const fn ceil_log(base: u64, x: u64) -> usize {
    let mut result = 0;
    let mut pow = 1u64;
    while pow < x {
        pow *= base;
        result += 1;
    }
    result
}

/// Reverse the low `bits` bits of `x`.
pub const fn reverse_bits(x: usize, bits: u32) -> usize {
    (x.reverse_bits()) >> (usize::BITS - bits)
}

/// Approximate `log2` of a big unsigned integer: exact bit length refined
/// by the top 64 bits.
pub fn log2_big(x: &BigUint) -> f64 {
    if x.is_zero() {
        return f64::NEG_INFINITY;
    }
    let bits = x.bits();
    if bits <= 64 {
        let top = x.iter_u64_digits().next().unwrap_or(0);
        return (top as f64).log2();
    }
    let top = (x >> (bits - 64)).iter_u64_digits().next().unwrap_or(0);
    (bits - 64) as f64 + (top as f64).log2()
}

/// `round(v / d)` with ties broken toward the even quotient. `d > 0`.
pub fn div_round_half_even(v: &BigInt, d: &BigUint) -> BigInt {
    let d = BigInt::from(d.clone());
    let mut quot = v / &d;
    let mut rem = v - &quot * &d;
    if rem.sign() == Sign::Minus {
        quot -= 1;
        rem += &d;
    }
    let twice: BigInt = &rem * 2;
    let round_up = match twice.cmp(&d) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => !(&quot % 2i32).is_zero(),
        std::cmp::Ordering::Less => false,
    };
    if round_up {
        quot + 1
    } else {
        quot
    }
}
