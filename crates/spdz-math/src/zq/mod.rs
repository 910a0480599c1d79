#![warn(missing_docs, unused_imports)]

//! Ring operations for odd moduli up to 62 bits.

pub mod primes;

use std::ops::Deref;

use crate::errors::{Error, Result};
use itertools::izip;
use pulp::Arch;
use rand::{distributions::Uniform, prelude::Distribution, CryptoRng, RngCore};

/// Structure encapsulating an odd integer modulus up to 62 bits.
///
/// Beside plain modular arithmetic, the structure implements Montgomery-form
/// operations: `mform(a) = a * 2^64 mod p`, and `mul_mont` computes
/// `a * b * 2^-64 mod p`. Multiplying a Montgomery-form operand by a plain
/// operand therefore yields a plain product, and the product of two
/// Montgomery-form operands stays in Montgomery form.
#[derive(Debug, Clone)]
pub struct Modulus {
    pub(crate) p: u64,
    mont_r2: u64,
    mont_neg_inv: u64,
    distribution: Uniform<u64>,
    arch: Arch,
}

impl Eq for Modulus {}

impl PartialEq for Modulus {
    fn eq(&self, other: &Self) -> bool {
        // All other fields are deterministically derived from p.
        self.p == other.p
    }
}

impl Deref for Modulus {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.p
    }
}

impl Modulus {
    /// Create a modulus from an odd integer of at most 62 bits.
    pub fn new(p: u64) -> Result<Self> {
        if p < 3 || (p >> 62) != 0 || p & 1 == 0 {
            return Err(Error::InvalidModulus(p));
        }
        // -p^-1 mod 2^64 by Newton iteration.
        let mut inv = p;
        for _ in 0..5 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(p.wrapping_mul(inv)));
        }
        debug_assert_eq!(p.wrapping_mul(inv), 1);
        let r = ((1u128 << 64) % (p as u128)) as u64;
        let r2 = ((r as u128 * r as u128) % (p as u128)) as u64;
        Ok(Self {
            p,
            mont_r2: r2,
            mont_neg_inv: inv.wrapping_neg(),
            distribution: Uniform::new(0, p),
            arch: Arch::new(),
        })
    }

    /// The value of the modulus.
    pub const fn modulus(&self) -> u64 {
        self.p
    }

    /// cond ? a - p : a, for a < 2p.
    const fn reduce1(a: u64, p: u64) -> u64 {
        debug_assert!(a < 2 * p);
        let mask = ((a >= p) as u64).wrapping_neg();
        a - (p & mask)
    }

    /// Modular addition of a and b. Aborts if a >= p or b >= p in debug mode.
    #[must_use]
    pub const fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + b, self.p)
    }

    /// Modular subtraction of a and b. Aborts if a >= p or b >= p in debug
    /// mode.
    #[must_use]
    pub const fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + self.p - b, self.p)
    }

    /// Modular negation. Aborts if a >= p in debug mode.
    #[must_use]
    pub const fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1(self.p - a, self.p)
    }

    /// Modular multiplication of plain operands. Not used in hot loops; the
    /// NTT and the pointwise products go through `mul_mont`.
    #[must_use]
    pub const fn mul(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        ((a as u128 * b as u128) % (self.p as u128)) as u64
    }

    /// Montgomery reduction of T < p * 2^64: returns T * 2^-64 mod p.
    const fn redc(&self, t: u128) -> u64 {
        let m = (t as u64).wrapping_mul(self.mont_neg_inv);
        let r = ((t + m as u128 * self.p as u128) >> 64) as u64;
        Self::reduce1(r, self.p)
    }

    /// Montgomery multiplication: a * b * 2^-64 mod p.
    #[must_use]
    pub const fn mul_mont(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        self.redc(a as u128 * b as u128)
    }

    /// Lift a into Montgomery form.
    #[must_use]
    pub const fn mform(&self, a: u64) -> u64 {
        self.mul_mont(a, self.mont_r2)
    }

    /// Take a out of Montgomery form.
    #[must_use]
    pub const fn inv_mform(&self, a: u64) -> u64 {
        self.redc(a as u128)
    }

    /// Modular exponentiation.
    #[must_use]
    pub fn pow(&self, a: u64, mut e: u64) -> u64 {
        let mut base = self.mform(a);
        let mut acc = self.mform(1);
        while e > 0 {
            if e & 1 == 1 {
                acc = self.mul_mont(acc, base);
            }
            base = self.mul_mont(base, base);
            e >>= 1;
        }
        self.inv_mform(acc)
    }

    /// Modular inverse; the modulus must be prime. Returns None for 0.
    #[must_use]
    pub fn inv(&self, a: u64) -> Option<u64> {
        debug_assert!(spdz_util::is_prime(self.p));
        if a == 0 {
            None
        } else {
            Some(self.pow(a, self.p - 2))
        }
    }

    /// Reduce a u64.
    #[must_use]
    pub const fn reduce(&self, a: u64) -> u64 {
        a % self.p
    }

    /// Reduce a u128.
    #[must_use]
    pub const fn reduce_u128(&self, a: u128) -> u64 {
        (a % (self.p as u128)) as u64
    }

    /// Reduce a signed value into [0, p).
    #[must_use]
    pub const fn reduce_i64(&self, a: i64) -> u64 {
        let r = (a % (self.p as i64) + self.p as i64) as u64;
        Self::reduce1(r, self.p)
    }

    /// Centered representative of a in (-p/2, p/2].
    #[must_use]
    pub const fn center(&self, a: u64) -> i64 {
        debug_assert!(a < self.p);
        if a > self.p >> 1 {
            (a as i64).wrapping_sub(self.p as i64)
        } else {
            a as i64
        }
    }

    /// Modular addition of vectors in place.
    pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.add(*ai, *bi))
        })
    }

    /// Modular subtraction of vectors in place.
    pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.sub(*ai, *bi))
        })
    }

    /// Modular negation of a vector in place.
    pub fn neg_vec(&self, a: &mut [u64]) {
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.neg(*ai)))
    }

    /// Montgomery multiplication of vectors in place.
    pub fn mul_mont_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.mul_mont(*ai, *bi))
        })
    }

    /// Montgomery multiply-accumulate: out += a * b * 2^-64, in place.
    pub fn mul_mont_acc_vec(&self, out: &mut [u64], a: &[u64], b: &[u64]) {
        debug_assert!(out.len() == a.len() && a.len() == b.len());
        self.arch.dispatch(|| {
            izip!(out.iter_mut(), a.iter(), b.iter())
                .for_each(|(oi, ai, bi)| *oi = self.add(*oi, self.mul_mont(*ai, *bi)))
        })
    }

    /// Lift a vector into Montgomery form in place.
    pub fn mform_vec(&self, a: &mut [u64]) {
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.mform(*ai)))
    }

    /// Take a vector out of Montgomery form in place.
    pub fn inv_mform_vec(&self, a: &mut [u64]) {
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.inv_mform(*ai)))
    }

    /// Multiplication of a vector by a plain scalar in place. Montgomery-form
    /// vectors stay in Montgomery form.
    pub fn scalar_mul_vec(&self, a: &mut [u64], b: u64) {
        debug_assert!(b < self.p);
        let b_m = self.mform(b);
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.mul_mont(*ai, b_m)))
    }

    /// Sample a vector of uniform elements of [0, p).
    pub fn random_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
        self.distribution.sample_iter(rng).take(size).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Modulus;
    use rand::{thread_rng, RngCore};

    const MODULI: &[u64] = &[3, 1153, 0x3fffffffff901, 0xffffffffffc4001, 0x1fffffffffe00001];

    #[test]
    fn constructor() {
        for p in MODULI {
            assert!(Modulus::new(*p).is_ok());
        }
        assert!(Modulus::new(0).is_err());
        assert!(Modulus::new(1).is_err());
        assert!(Modulus::new(2).is_err());
        assert!(Modulus::new(4).is_err());
        assert!(Modulus::new(1 << 62).is_err());
    }

    #[test]
    fn arithmetic() {
        let mut rng = thread_rng();
        for p in MODULI {
            let q = Modulus::new(*p).unwrap();
            for _ in 0..100 {
                let a = rng.next_u64() % p;
                let b = rng.next_u64() % p;
                assert_eq!(q.add(a, b), (a + b) % p);
                assert_eq!(q.sub(a, b), (a + p - b) % p);
                assert_eq!(q.neg(a), (p - a) % p);
                assert_eq!(q.mul(a, b), ((a as u128 * b as u128) % (*p as u128)) as u64);
            }
        }
    }

    #[test]
    fn montgomery() {
        let mut rng = thread_rng();
        for p in MODULI {
            let q = Modulus::new(*p).unwrap();
            for _ in 0..100 {
                let a = rng.next_u64() % p;
                let b = rng.next_u64() % p;
                assert_eq!(q.inv_mform(q.mform(a)), a);
                // One Montgomery-form operand yields a plain product.
                assert_eq!(q.mul_mont(q.mform(a), b), q.mul(a, b));
                // Two Montgomery-form operands yield a Montgomery product.
                assert_eq!(q.mul_mont(q.mform(a), q.mform(b)), q.mform(q.mul(a, b)));
            }
        }
    }

    #[test]
    fn pow_inv() {
        let q = Modulus::new(1153).unwrap();
        assert_eq!(q.pow(2, 10), 1024 % 1153);
        assert_eq!(q.pow(5, 0), 1);
        assert_eq!(q.inv(0), None);
        for a in 1..1153u64 {
            let ai = q.inv(a).unwrap();
            assert_eq!(q.mul(a, ai), 1);
        }
    }

    #[test]
    fn centered() {
        let q = Modulus::new(1153).unwrap();
        assert_eq!(q.center(0), 0);
        assert_eq!(q.center(576), 576);
        assert_eq!(q.center(577), -576);
        assert_eq!(q.center(1152), -1);
        assert_eq!(q.reduce_i64(-1), 1152);
        assert_eq!(q.reduce_i64(-1153), 0);
        assert_eq!(q.reduce_i64(1154), 1);
    }

    #[test]
    fn vectors() {
        let mut rng = thread_rng();
        for p in MODULI {
            let q = Modulus::new(*p).unwrap();
            let a = q.random_vec(128, &mut rng);
            let b = q.random_vec(128, &mut rng);

            let mut c = a.clone();
            q.add_vec(&mut c, &b);
            for i in 0..128 {
                assert_eq!(c[i], q.add(a[i], b[i]));
            }

            let mut c = a.clone();
            q.mform_vec(&mut c);
            q.mul_mont_vec(&mut c, &b);
            for i in 0..128 {
                assert_eq!(c[i], q.mul(a[i], b[i]));
            }

            let mut c = a.clone();
            q.scalar_mul_vec(&mut c, b[0]);
            for i in 0..128 {
                assert_eq!(c[i], q.mul(a[i], b[0]));
            }
        }
    }
}
