//! Modular arithmetic building blocks: exponentiation, inversion,
//! Miller-Rabin primality and Tonelli-Shanks square roots, in both a
//! machine-word and an arbitrary-precision flavor.

use num_bigint::BigUint;
use num_traits::{One, Zero};

const MR_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// `base^exp mod modulus` with 128-bit intermediates.
pub fn mod_pow(base: u64, mut exp: u64, modulus: u64) -> u64 {
    let m = modulus as u128;
    let mut result: u128 = 1;
    let mut b = (base % modulus) as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * b % m;
        }
        b = b * b % m;
        exp >>= 1;
    }
    result as u64
}

/// Inverse of `a` modulo `m` via the extended Euclidean algorithm.
/// `a` and `m` must be coprime.
pub fn mod_inverse(a: u64, m: u64) -> u64 {
    let (mut t, mut new_t): (i128, i128) = (0, 1);
    let (mut r, mut new_r): (i128, i128) = (m as i128, (a % m) as i128);
    while new_r != 0 {
        let q = r / new_r;
        (t, new_t) = (new_t, t - q * new_t);
        (r, new_r) = (new_r, r - q * new_r);
    }
    debug_assert_eq!(r, 1, "mod_inverse of non-coprime arguments");
    t.rem_euclid(m as i128) as u64
}

/// Deterministic Miller-Rabin; the fixed base set is exact for all u64.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in MR_BASES {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = n - 1;
    let mut s = 0u32;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }
    'witness: for a in MR_BASES {
        let mut x = mod_pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..s - 1 {
            x = mod_pow(x, 2, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Tonelli-Shanks: a square root of `a` modulo an odd prime `p`, or `None`
/// if `a` is a non-residue.
pub fn sqrt_mod(a: u64, p: u64) -> Option<u64> {
    let a = a % p;
    if a == 0 {
        return Some(0);
    }
    if mod_pow(a, (p - 1) / 2, p) != 1 {
        return None;
    }
    if p % 4 == 3 {
        return Some(mod_pow(a, (p + 1) / 4, p));
    }
    let mut s = 0u32;
    let mut t = p - 1;
    while t % 2 == 0 {
        t /= 2;
        s += 1;
    }
    let mut z = 2;
    while mod_pow(z, (p - 1) / 2, p) != p - 1 {
        z += 1;
    }
    let mut m = s;
    let mut c = mod_pow(z, t, p);
    let mut u = mod_pow(a, t, p);
    let mut r = mod_pow(a, (t + 1) / 2, p);
    let mul = |x: u64, y: u64| (x as u128 * y as u128 % p as u128) as u64;
    while u != 1 {
        let mut i = 0u32;
        let mut probe = u;
        while probe != 1 {
            probe = mul(probe, probe);
            i += 1;
        }
        let mut b = c;
        for _ in 0..m - i - 1 {
            b = mul(b, b);
        }
        r = mul(r, b);
        c = mul(b, b);
        u = mul(u, c);
        m = i;
    }
    Some(r)
}

/// Miller-Rabin over big integers: exact below 2^64, a 25-base
/// probable-prime test above.
pub fn is_prime_big(n: &BigUint) -> bool {
    if let Some(small) = to_u64(n) {
        return is_prime(small);
    }
    for p in SMALL_PRIMES {
        if (n % p).is_zero() {
            return false;
        }
    }
    let one = BigUint::one();
    let n_minus_1 = n - &one;
    let mut d = n_minus_1.clone();
    let mut s = 0u32;
    while !d.bit(0) {
        d >>= 1;
        s += 1;
    }
    'witness: for a in SMALL_PRIMES {
        let mut x = BigUint::from(a).modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 0..s - 1 {
            x = &x * &x % n;
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Tonelli-Shanks over big integers.
pub fn sqrt_mod_big(a: &BigUint, p: &BigUint) -> Option<BigUint> {
    let a = a % p;
    if a.is_zero() {
        return Some(BigUint::zero());
    }
    let one = BigUint::one();
    let p_minus_1 = p - &one;
    let half = &p_minus_1 >> 1;
    if a.modpow(&half, p) != one {
        return None;
    }
    if (p % 4u32) == BigUint::from(3u32) {
        return Some(a.modpow(&((p + &one) >> 2), p));
    }
    let mut s = 0u32;
    let mut t = p_minus_1.clone();
    while !t.bit(0) {
        t >>= 1;
        s += 1;
    }
    let mut z = BigUint::from(2u32);
    while z.modpow(&half, p) != p_minus_1 {
        z += 1u32;
    }
    let mut m = s;
    let mut c = z.modpow(&t, p);
    let mut u = a.modpow(&t, p);
    let mut r = a.modpow(&((&t + &one) >> 1), p);
    while u != one {
        let mut i = 0u32;
        let mut probe = u.clone();
        while probe != one {
            probe = &probe * &probe % p;
            i += 1;
        }
        let mut b = c.clone();
        for _ in 0..m - i - 1 {
            b = &b * &b % p;
        }
        r = &r * &b % p;
        c = &b * &b % p;
        u = &u * &c % p;
        m = i;
    }
    Some(r)
}

fn to_u64(n: &BigUint) -> Option<u64> {
    if n.bits() <= 64 {
        Some(n.iter_u64_digits().next().unwrap_or(0))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mod_pow() {
        assert_eq!(mod_pow(2, 10, 1_000_000_007), 1024);
        assert_eq!(mod_pow(3, 0, 17), 1);
        assert_eq!(mod_pow(5, 16, 17), 1); // Fermat
    }

    #[test]
    fn test_mod_inverse() {
        for a in 1..17u64 {
            assert_eq!(a * mod_inverse(a, 17) % 17, 1);
        }
        let q = 268_369_921u64;
        let inv = mod_inverse(2048, q);
        assert_eq!(2048 * inv % q, 1);
    }

    #[test]
    fn test_is_prime() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(is_prime(268_369_921));
        assert!(is_prime(249_561_089));
        assert!(!is_prime(561)); // Carmichael
        assert!(!is_prime(268_369_921u64 * 3));
    }

    #[test]
    fn test_sqrt_mod() {
        for p in [17u64, 97, 268_369_921] {
            for x in 1..20u64 {
                let sq = x * x % p;
                let r = sqrt_mod(sq, p).unwrap();
                assert_eq!(r * r % p, sq);
            }
        }
        // 3 is a non-residue mod 7 (squares are 1, 2, 4)
        assert_eq!(sqrt_mod(3, 7), None);
    }

    #[test]
    fn test_is_prime_big() {
        assert!(is_prime_big(&BigUint::from(268_369_921u64)));
        // 2^89 - 1 is a Mersenne prime
        let m89 = (BigUint::from(1u32) << 89) - 1u32;
        assert!(is_prime_big(&m89));
        assert!(!is_prime_big(&(&m89 * 3u32)));
        // 2^67 - 1 = 193707721 * 761838257287
        let m67 = (BigUint::from(1u32) << 67) - 1u32;
        assert!(!is_prime_big(&m67));
    }

    #[test]
    fn test_sqrt_mod_big() {
        let p = (BigUint::from(1u32) << 89) - 1u32;
        for x in 2..12u32 {
            let xb = BigUint::from(x);
            let sq = &xb * &xb % &p;
            let r = sqrt_mod_big(&sq, &p).unwrap();
            assert_eq!(&r * &r % &p, sq);
        }
    }
}
