#![crate_name = "spdz_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the spdz crates: samplers for the secret distributions of
//! the scheme, and primality testing for modulus generation.

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

/// Returns whether p is prime; this function is 100% accurate for 64-bit
/// inputs (deterministic Miller-Rabin base set).
pub fn is_prime(p: u64) -> bool {
    if p < 2 {
        return false;
    }
    for q in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if p % q == 0 {
            return p == q;
        }
    }
    let mut d = p - 1;
    let mut r = 0u32;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }
    let mul_mod = |a: u64, b: u64| ((a as u128 * b as u128) % p as u128) as u64;
    let pow_mod = |mut base: u64, mut exp: u64| {
        let mut acc = 1u64;
        base %= p;
        while exp > 0 {
            if exp & 1 == 1 {
                acc = mul_mod(acc, base);
            }
            base = mul_mod(base, base);
            exp >>= 1;
        }
        acc
    };
    'witness: for a in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        let mut x = pow_mod(a, d);
        if x == 1 || x == p - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x);
            if x == p - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Returns whether p is probably prime (Miller-Rabin with the first twelve
/// prime bases); composites slip through with negligible probability.
pub fn is_prime_big(p: &BigUint) -> bool {
    use num_bigint::BigUint as B;
    let zero = B::default();
    let one = B::from(1u64);
    let two = B::from(2u64);
    if p < &two {
        return false;
    }
    for q in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        let qb = B::from(q);
        if p % &qb == zero {
            return p == &qb;
        }
    }
    let mut d = p - &one;
    let mut r = 0u32;
    while &d % &two == zero {
        d >>= 1;
        r += 1;
    }
    'witness: for a in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        let mut x = B::from(a).modpow(&d, p);
        if x == one || x == p - &one {
            continue;
        }
        for _ in 1..r {
            x = x.modpow(&two, p);
            if x == p - &one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Sample a vector of independent discrete Gaussians with standard deviation
/// `sigma`, rejecting samples of magnitude larger than `bound`.
///
/// Returns an error if sigma is not positive or the bound is smaller than
/// sigma.
pub fn sample_vec_gaussian<R: RngCore + CryptoRng>(
    vector_size: usize,
    sigma: f64,
    bound: i64,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if sigma <= 0.0 {
        return Err("The standard deviation should be positive");
    }
    if (bound as f64) < sigma {
        return Err("The bound should be at least sigma");
    }

    let uniform = |rng: &mut R| (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;

    let mut out = Vec::with_capacity(vector_size);
    while out.len() < vector_size {
        // Box-Muller, rounded to the nearest integer.
        let u1 = uniform(rng).max(f64::MIN_POSITIVE);
        let u2 = uniform(rng);
        let radius = sigma * (-2.0 * u1.ln()).sqrt();
        let (s, c) = (2.0 * std::f64::consts::PI * u2).sin_cos();
        for v in [radius * c, radius * s] {
            let v = v.round() as i64;
            if v.abs() <= bound && out.len() < vector_size {
                out.push(v);
            }
        }
    }
    Ok(out)
}

/// Sample a ternary vector with exactly `hamming_weight` non-zero
/// coefficients, each uniformly in {-1, 1}.
///
/// Returns an error if the Hamming weight exceeds the vector size.
pub fn sample_ternary_hw<R: RngCore + CryptoRng>(
    vector_size: usize,
    hamming_weight: usize,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if hamming_weight > vector_size {
        return Err("The Hamming weight should be at most the vector size");
    }
    let mut out = vec![0i64; vector_size];
    for i in 0..hamming_weight {
        out[i] = if rng.next_u64() & 1 == 1 { 1 } else { -1 };
    }
    // Fisher-Yates over the positions.
    for i in (1..vector_size).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        out.swap(i, j);
    }
    Ok(out)
}

/// Sample a uniform big integer in [0, upper_bound) by masked rejection.
///
/// Returns an error if the underlying generator refuses to produce bytes.
pub fn sample_biguint_below<R: RngCore + CryptoRng>(
    upper_bound: &BigUint,
    rng: &mut R,
) -> Result<BigUint, &'static str> {
    let bits = upper_bound.bits() as usize;
    assert!(bits > 0, "upper bound must be positive");
    let nbytes = bits.div_ceil(8);
    let mask = (BigUint::from(1u64) << bits) - 1u32;
    let mut buf = vec![0u8; nbytes];
    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|_| "the system PRNG refused to produce bytes")?;
        let sample = BigUint::from_bytes_be(&buf) & &mask;
        if &sample < upper_bound {
            return Ok(sample);
        }
    }
}

/// Unbiased empirical variance of a slice of integers.
pub fn variance(values: &[i64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().map(|v| *v as f64).sum::<f64>() / n;
    values.iter().map(|v| (*v as f64 - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use rand::thread_rng;

    #[test]
    fn prime() {
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(is_prime(5));
        assert!(is_prime(65537));
        assert!(is_prime(0xffffffffffc4001));
        assert!(is_prime(0x1fffffffffe00001));

        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(!is_prime(4));
        assert!(!is_prime(65536));
        assert!(!is_prime((1u64 << 32) + 1));
    }

    #[test]
    fn prime_big() {
        // t = 44^16 + 1 and 65624^8 + 1, the preset plaintext moduli.
        let t1: BigUint = BigUint::from(44u64).pow(16) + 1u64;
        let t2: BigUint = BigUint::from(65624u64).pow(8) + 1u64;
        assert!(is_prime_big(&t1));
        assert!(is_prime_big(&t2));
        assert!(is_prime_big(&BigUint::from(65537u64)));
        assert!(!is_prime_big(&(BigUint::from(2u64).pow(128) + 1u64)));
        assert!(!is_prime_big(&BigUint::from(1u64)));
    }

    #[test]
    fn gaussian() {
        let mut rng = thread_rng();
        assert!(sample_vec_gaussian(16, 0.0, 19, &mut rng).is_err());
        assert!(sample_vec_gaussian(16, 3.2, 2, &mut rng).is_err());

        let v = sample_vec_gaussian(1 << 16, 3.2, 19, &mut rng).unwrap();
        assert_eq!(v.len(), 1 << 16);
        assert!(v.iter().all(|vi| vi.abs() <= 19));
        let sd = variance(&v).sqrt();
        assert!((sd - 3.2).abs() < 0.2, "sd = {sd}");
    }

    #[test]
    fn ternary() {
        let mut rng = thread_rng();
        assert!(sample_ternary_hw(16, 17, &mut rng).is_err());

        for hw in [0usize, 1, 64, 256] {
            let v = sample_ternary_hw(256, hw, &mut rng).unwrap();
            assert_eq!(v.iter().filter(|vi| **vi != 0).count(), hw);
            assert!(v.iter().all(|vi| vi.abs() <= 1));
        }
    }

    #[test]
    fn uniform_below() {
        let mut rng = thread_rng();
        let t = BigUint::from(65537u64);
        for _ in 0..100 {
            assert!(sample_biguint_below(&t, &mut rng).unwrap() < t);
        }
        let one = BigUint::from(1u32);
        assert_eq!(
            sample_biguint_below(&one, &mut rng).unwrap(),
            BigUint::default()
        );
    }
}
