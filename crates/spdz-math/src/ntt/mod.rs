#![warn(missing_docs, unused_imports)]

//! Number-Theoretic Transform in ZZ_q.

use crate::zq::Modulus;
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::iter::successors;

/// Returns whether a modulus p is prime and supports the Ntt of size n.
///
/// Aborts if n is not a power of 2 that is >= 8.
pub fn supports_ntt(p: u64, n: usize) -> bool {
    assert!(n >= 8 && n.is_power_of_two());
    p % ((n as u64) << 1) == 1 && spdz_util::is_prime(p)
}

/// Negacyclic Number-Theoretic Transform operator.
///
/// The twiddle factors are kept in Montgomery form so that the butterflies
/// output plain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NttOperator {
    p: Modulus,
    size: usize,
    omegas: Box<[u64]>,
    zetas_inv: Box<[u64]>,
    size_inv: u64,
}

impl NttOperator {
    /// Create an NTT operator given a modulus for a specific size.
    ///
    /// Returns None if the modulus does not support the NTT for this size.
    #[must_use]
    pub fn new(p: &Modulus, size: usize) -> Option<Self> {
        if !supports_ntt(p.modulus(), size) {
            None
        } else {
            let size_inv = p.inv(size as u64)?;

            let omega = Self::primitive_root(size, p);
            let omega_inv = p.inv(omega)?;

            let powers = successors(Some(1u64), |n| Some(p.mul(*n, omega)))
                .take(size)
                .collect_vec();
            let powers_inv = successors(Some(omega_inv), |n| Some(p.mul(*n, omega_inv)))
                .take(size)
                .collect_vec();

            let (omegas, zetas_inv): (Vec<u64>, Vec<u64>) = (0..size)
                .map(|i| {
                    let j = i.reverse_bits() >> (size.leading_zeros() + 1);
                    (p.mform(powers[j]), p.mform(powers_inv[j]))
                })
                .unzip();

            Some(Self {
                p: p.clone(),
                size,
                omegas: omegas.into_boxed_slice(),
                zetas_inv: zetas_inv.into_boxed_slice(),
                size_inv: p.mform(size_inv),
            })
        }
    }

    /// Compute the forward NTT in place.
    /// Aborts if a is not of the size handled by the operator.
    pub fn forward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.size);

        let mut l = self.size >> 1;
        let mut k = 1;
        while l > 0 {
            for chunk in a.chunks_exact_mut(2 * l) {
                let omega = self.omegas[k];
                k += 1;

                let (left, right) = chunk.split_at_mut(l);
                for (x, y) in left.iter_mut().zip(right.iter_mut()) {
                    self.butterfly(x, y, omega);
                }
            }
            l >>= 1;
        }
    }

    /// Compute the backward NTT in place.
    /// Aborts if a is not of the size handled by the operator.
    pub fn backward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.size);

        let mut k = 0;
        let mut l = 1;
        while l < self.size {
            for chunk in a.chunks_exact_mut(2 * l) {
                let zeta_inv = self.zetas_inv[k];
                k += 1;

                let (left, right) = chunk.split_at_mut(l);
                for (x, y) in left.iter_mut().zip(right.iter_mut()) {
                    self.inv_butterfly(x, y, zeta_inv);
                }
            }
            l <<= 1;
        }

        a.iter_mut()
            .for_each(|ai| *ai = self.p.mul_mont(*ai, self.size_inv));
    }

    /// NTT butterfly: (x, y) -> (x + w*y, x - w*y), w in Montgomery form.
    fn butterfly(&self, x: &mut u64, y: &mut u64, w_mont: u64) {
        let t = self.p.mul_mont(*y, w_mont);
        *y = self.p.sub(*x, t);
        *x = self.p.add(*x, t);
    }

    /// Inverse NTT butterfly: (x, y) -> (x + y, (x - y)*z), z in Montgomery
    /// form.
    fn inv_butterfly(&self, x: &mut u64, y: &mut u64, z_mont: u64) {
        let t = *x;
        *x = self.p.add(t, *y);
        *y = self.p.mul_mont(self.p.sub(t, *y), z_mont);
    }

    /// Returns a 2n-th primitive root modulo p.
    ///
    /// Aborts if p does not support the NTT of size n.
    fn primitive_root(n: usize, p: &Modulus) -> u64 {
        debug_assert!(supports_ntt(p.modulus(), n));

        let lambda = (p.modulus() - 1) / (2 * n as u64);

        let mut rng: ChaCha8Rng = SeedableRng::seed_from_u64(0);
        for _ in 0..100 {
            let mut root = rng.gen_range(0..p.modulus());
            root = p.pow(root, lambda);
            if Self::is_primitive_root(root, 2 * n, p) {
                return root;
            }
        }

        debug_assert!(false, "Couldn't find primitive root");
        0
    }

    /// Returns whether a is an n-th primitive root of unity.
    fn is_primitive_root(a: u64, n: usize, p: &Modulus) -> bool {
        // A primitive n-th root of unity is such that x^n = 1 mod p, and
        // x^(n/2) != 1 mod p.
        p.pow(a, n as u64) == 1 && p.pow(a, (n / 2) as u64) != 1
    }
}
