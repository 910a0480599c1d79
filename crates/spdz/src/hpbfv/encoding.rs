//! Encoder and decoder between messages and plaintext polynomials.
//!
//! A message is a vector of `slots` integers modulo t = beta^(N/s) + 1. The
//! polynomial x^s - beta splits modulo t; writing c for an s-th root of beta
//! and eta for a primitive s-th root of unity, the slot values of a message
//! polynomial M are its evaluations at the roots c * eta^j. Slots are ordered
//! along the orbit of the affine map j -> (1 + 2 * N/s) * j + w (mod s), so
//! that the Galois automorphism x -> x^(1 + 2 * N/s) rotates the slot vector
//! by one position.

use crate::hpbfv::parameters::{round_div, HpbfvParameters};
use crate::hpbfv::{Message, Plaintext};
use crate::{ParametersError, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};
use spdz_math::rq::{traits::TryConvertFrom, Poly, Representation};
use std::fmt::Debug;
use std::sync::Arc;

/// Pre-computed slot structure: the roots of x^s - beta modulo t and the
/// radix-2 transform tables used to evaluate and interpolate at those roots.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SlotTransform {
    t: BigUint,
    slots: usize,
    gap: usize,
    eta_pows: Vec<BigUint>,
    eta_inv_pows: Vec<BigUint>,
    c_pows: Vec<BigUint>,
    c_inv_pows: Vec<BigUint>,
    beta_pows: Vec<BigUint>,
    slots_inv: BigUint,
    orbit: Vec<usize>,
}

impl Debug for SlotTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotTransform")
            .field("t", &self.t)
            .field("slots", &self.slots)
            .finish()
    }
}

/// Inverse of an odd value modulo 2^tau, by Newton iteration.
fn inv_mod_pow2(value: &BigUint, tau: u64) -> BigUint {
    let mask = (BigUint::one() << tau) - 1u64;
    let modulus = BigUint::one() << tau;
    let two = BigUint::from(2u64);
    let mut inv = value & &mask;
    // Each iteration doubles the number of correct bits.
    for _ in 0..(64 - tau.leading_zeros() + 1) {
        let prod = (value * &inv) & &mask;
        let factor = (&modulus + &two - prod) & &mask;
        inv = (inv * factor) & &mask;
    }
    debug_assert!((value * &inv) & &mask == BigUint::one());
    inv
}

impl SlotTransform {
    /// Derive the slot structure for t = beta^gap + 1 with `slots` slots.
    ///
    /// The derivation is deterministic, so that every party rebuilds the
    /// same structure from the parameter literal alone.
    pub(crate) fn new(
        t: &BigUint,
        beta: &BigUint,
        slots: usize,
        gap: usize,
    ) -> Result<Self> {
        let one = BigUint::one();
        let two = BigUint::from(2u64);
        let n = t - &one;
        let tau = n.trailing_zeros().unwrap();
        let mu = &n >> tau;
        let slots_big = BigUint::from(slots as u64);
        let log_slots = slots.trailing_zeros() as u64;
        if tau < log_slots {
            return Err(ParametersError::InvalidSlots(
                "t - 1 has too small a power-of-two part".to_string(),
            )
            .into());
        }

        // Generator of the 2-Sylow subgroup: the first quadratic non-residue
        // raised to the odd part of the group order.
        let mut x = two.clone();
        while x.modpow(&(&n >> 1u32), t).is_one() {
            x += &one;
        }
        let zeta = x.modpow(&mu, t);
        let zeta_inv = zeta.modpow(&(t - &two), t);

        // Split beta into its odd-order and 2-Sylow components.
        let mu_bar = inv_mod_pow2(&mu, tau);
        let b_two = beta.modpow(&((&mu * &mu_bar) % &n), t);
        let b_odd = (beta * b_two.modpow(&(t - &two), t)) % t;

        // Odd part: invert the exponent `slots` modulo the odd group order.
        let inv2 = (&mu + &one) >> 1u32;
        let s_inv_mod_mu = inv2.modpow(&BigUint::from(log_slots), &mu);
        let c_odd = b_odd.modpow(&s_inv_mod_mu, t);

        // 2-Sylow part: Pohlig-Hellman discrete log of b_two base zeta.
        let mut e = BigUint::zero();
        let mut h = b_two.clone();
        for i in 0..tau {
            let probe = h.modpow(&(&one << (tau - 1 - i)), t);
            if !probe.is_one() {
                e |= &one << i;
                h = (&h * zeta_inv.modpow(&(&one << i), t)) % t;
            }
        }
        debug_assert_eq!(zeta.modpow(&e, t), b_two);
        if !(&e % &slots_big).is_zero() {
            return Err(ParametersError::InvalidPlaintextBase(
                "beta has no slots-th root modulo t".to_string(),
            )
            .into());
        }
        let c_two = zeta.modpow(&(&e / &slots_big), t);
        let c = (c_odd * c_two) % t;
        if c.modpow(&slots_big, t) != beta % t {
            return Err(ParametersError::InvalidPlaintextBase(
                "root extraction failed".to_string(),
            )
            .into());
        }

        // A primitive slots-th root of unity.
        let exponent = &n / &slots_big;
        let half = BigUint::from((slots / 2) as u64);
        let mut x = two.clone();
        let eta = loop {
            let y = x.modpow(&exponent, t);
            if !y.modpow(&half, t).is_one() {
                break y;
            }
            x += &one;
        };

        // Orbit of the slot rotation: c^(2 * gap) = eta^w with w odd.
        let c_2d = c.modpow(&BigUint::from((2 * gap) as u64), t);
        let mut w = None;
        let mut acc = one.clone();
        for k in 0..slots {
            if acc == c_2d {
                w = Some(k);
                break;
            }
            acc = (acc * &eta) % t;
        }
        let w = w.filter(|w| w % 2 == 1).ok_or_else(|| {
            crate::Error::from(ParametersError::InvalidSlots(
                "the slot rotation orbit is degenerate".to_string(),
            ))
        })?;

        let mut orbit = Vec::with_capacity(slots);
        let mut j = 0usize;
        for _ in 0..slots {
            orbit.push(j);
            j = ((1 + 2 * gap) * j + w) % slots;
        }
        let mut seen = vec![false; slots];
        orbit.iter().for_each(|j| seen[*j] = true);
        if seen.iter().any(|s| !*s) {
            return Err(ParametersError::InvalidSlots(
                "the slot rotation orbit is not a single cycle".to_string(),
            )
            .into());
        }

        let pow_table = |base: &BigUint| {
            let mut pows = Vec::with_capacity(slots);
            let mut acc = BigUint::one();
            for _ in 0..slots {
                pows.push(acc.clone());
                acc = (acc * base) % t;
            }
            pows
        };
        let eta_inv = eta.modpow(&(t - &two), t);
        let c_inv = c.modpow(&(t - &two), t);
        let beta_pows = {
            let mut pows = Vec::with_capacity(gap);
            let mut acc = BigUint::one();
            for _ in 0..gap {
                pows.push(acc.clone());
                acc = (acc * beta) % t;
            }
            pows
        };

        Ok(Self {
            t: t.clone(),
            slots,
            gap,
            eta_pows: pow_table(&eta),
            eta_inv_pows: pow_table(&eta_inv),
            c_pows: pow_table(&c),
            c_inv_pows: pow_table(&c_inv),
            beta_pows,
            slots_inv: slots_big.modpow(&(t - &two), t),
            orbit,
        })
    }

    /// In-place radix-2 transform: out\[j\] = sum_k in\[k\] * root^(j * k),
    /// with root described by its power table.
    fn fft(&self, a: &mut [BigUint], root_pows: &[BigUint]) {
        let n = a.len();
        let mut j = 0usize;
        for i in 1..n {
            let mut bit = n >> 1;
            while j & bit != 0 {
                j ^= bit;
                bit >>= 1;
            }
            j |= bit;
            if i < j {
                a.swap(i, j);
            }
        }
        let mut length = 2;
        while length <= n {
            let step = n / length;
            let half = length / 2;
            for start in (0..n).step_by(length) {
                for k in 0..half {
                    let w = &root_pows[step * k];
                    let u = a[start + k].clone();
                    let v = (&a[start + k + half] * w) % &self.t;
                    a[start + k] = (&u + &v) % &self.t;
                    a[start + k + half] = (&u + &self.t - &v) % &self.t;
                }
            }
            length <<= 1;
        }
    }

    /// Interpolate the message polynomial taking the given slot values at
    /// the roots, as centered coefficients of degree < slots.
    pub(crate) fn message_to_coeffs(&self, values: &[BigUint]) -> Vec<BigInt> {
        debug_assert_eq!(values.len(), self.slots);
        let mut by_root = vec![BigUint::zero(); self.slots];
        for (i, j) in self.orbit.iter().enumerate() {
            by_root[*j] = &values[i] % &self.t;
        }
        self.fft(&mut by_root, &self.eta_inv_pows);
        let half = &self.t >> 1u32;
        by_root
            .iter()
            .enumerate()
            .map(|(k, p)| {
                let m = (p * &self.slots_inv % &self.t) * &self.c_inv_pows[k] % &self.t;
                if m > half {
                    BigInt::from(m) - BigInt::from(self.t.clone())
                } else {
                    BigInt::from(m)
                }
            })
            .collect()
    }

    /// Evaluate a degree < slots polynomial modulo t at the roots, returning
    /// the slot values.
    pub(crate) fn coeffs_to_message(&self, folded: &[BigUint]) -> Vec<BigUint> {
        debug_assert_eq!(folded.len(), self.slots);
        let mut p: Vec<BigUint> = folded
            .iter()
            .enumerate()
            .map(|(k, f)| (f * &self.c_pows[k]) % &self.t)
            .collect();
        self.fft(&mut p, &self.eta_pows);
        self.orbit.iter().map(|j| p[*j].clone()).collect()
    }

    /// Fold a small integer polynomial of degree < N modulo (x^s - beta, t)
    /// onto coefficients of degree < s.
    pub(crate) fn fold(&self, coeffs: &[BigInt]) -> Vec<BigUint> {
        let mut folded = vec![BigInt::zero(); self.slots];
        for (i, v) in coeffs.iter().enumerate() {
            debug_assert!(i / self.slots < self.gap);
            folded[i % self.slots] += v * BigInt::from(self.beta_pows[i / self.slots].clone());
        }
        let t = BigInt::from(self.t.clone());
        folded
            .into_iter()
            .map(|v| {
                let mut r = v % &t;
                if r.sign() == Sign::Minus {
                    r += &t;
                }
                r.to_biguint().unwrap()
            })
            .collect()
    }
}

/// Encoder of messages into plaintexts.
#[derive(Debug, Clone)]
pub struct Encoder {
    par: Arc<HpbfvParameters>,
}

impl Encoder {
    /// Create an encoder for the given parameters.
    pub fn new(par: &Arc<HpbfvParameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Encode a message into a plaintext polynomial Delta * M.
    pub fn encode(&self, msg: &Message) -> Result<Plaintext> {
        let transform = &self.par.slot_transform;
        let mut coeffs = transform.message_to_coeffs(msg.values());
        coeffs.resize(self.par.degree(), BigInt::zero());
        let mut m = Poly::try_convert_from(
            &coeffs as &[BigInt],
            self.par.ctx_q(),
            Representation::Ntt,
        )?;
        m *= &self.par.delta;
        m.change_representation(Representation::PowerBasis);
        Ok(Plaintext::new(self.par.clone(), m))
    }
}

/// Decoder of plaintexts into messages.
#[derive(Debug, Clone)]
pub struct Decoder {
    par: Arc<HpbfvParameters>,
}

impl Decoder {
    /// Create a decoder for the given parameters.
    pub fn new(par: &Arc<HpbfvParameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Decode a plaintext polynomial: scale by b(x)/Q with rounding, fold
    /// modulo (x^s - beta, t), and evaluate at the slot roots.
    pub fn decode(&self, pt: &Plaintext) -> Result<Message> {
        let degree = self.par.degree();
        let slots = self.par.slots();
        let q = self.par.ctx_q().modulus();
        let beta = BigInt::from(self.par.beta().clone());

        let w = Vec::<BigInt>::from(&pt.poly);

        // b(x) * w = x^s * w - beta * w, negacyclically.
        let mut bw = vec![BigInt::zero(); degree];
        for (k, item) in bw.iter_mut().enumerate() {
            let shifted = if k >= slots {
                w[k - slots].clone()
            } else {
                -w[k + degree - slots].clone()
            };
            *item = shifted - &beta * &w[k];
        }
        let y: Vec<BigInt> = bw.into_iter().map(|v| round_div(v, q)).collect();

        let folded = self.par.slot_transform.fold(&y);
        let values = self.par.slot_transform.coeffs_to_message(&folded);
        Ok(Message::from_values(self.par.clone(), values))
    }
}
