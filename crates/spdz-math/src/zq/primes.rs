//! Generation of NTT-friendly primes.

use spdz_util::is_prime;

/// Generate the largest prime strictly smaller than `upper_bound` of the
/// given bit size which is congruent to 1 modulo `modulo`.
///
/// Returns None if no such prime exists.
pub fn generate_prime(num_bits: usize, modulo: u64, upper_bound: u64) -> Option<u64> {
    debug_assert!(num_bits <= 62);
    let lower_bound = 1u64 << (num_bits - 1);
    let mut candidate = upper_bound.saturating_sub(1);
    candidate -= (candidate - 1) % modulo;
    while candidate > lower_bound {
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate -= modulo;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::generate_prime;
    use spdz_util::is_prime;

    #[test]
    fn prime_generation() {
        let p = generate_prime(60, 1 << 14, 1 << 60).unwrap();
        assert!(is_prime(p));
        assert_eq!(p % (1 << 14), 1);
        assert_eq!(p, 0xfffffffffffc001);

        // Successive calls with a decreasing upper bound walk down the chain.
        let p2 = generate_prime(60, 1 << 14, p).unwrap();
        assert!(p2 < p);
        assert!(is_prime(p2));
        assert_eq!(p2 % (1 << 14), 1);
        assert_eq!(p2, 0xffffffffffe8001);

        assert!(generate_prime(10, 1 << 14, 1 << 10).is_none());
    }
}
