#![warn(missing_docs, unused_imports)]

//! Residue Number System operations.

use crate::{zq::Modulus, Error, Result};
use itertools::izip;
use ndarray::ArrayView1;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::fmt::Debug;

/// Context for a Residue Number System.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct RnsContext {
    moduli_u64: Vec<u64>,
    moduli: Vec<Modulus>,
    garner: Vec<BigUint>,
    product: BigUint,
}

impl Debug for RnsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RnsContext")
            .field("moduli_u64", &self.moduli_u64)
            .field("product", &self.product)
            .finish()
    }
}

impl RnsContext {
    /// Create a RNS context from a list of distinct prime moduli.
    ///
    /// Returns an error if the list is empty or contains a repeated or
    /// invalid modulus.
    pub fn new(moduli_u64: &[u64]) -> Result<Self> {
        if moduli_u64.is_empty() {
            return Err(Error::Default("The list of moduli is empty".to_string()));
        }
        for (i, mi) in moduli_u64.iter().enumerate() {
            if moduli_u64[..i].contains(mi) {
                return Err(Error::Default("The moduli are not distinct".to_string()));
            }
        }

        let mut product = BigUint::from(1u64);
        moduli_u64.iter().for_each(|m| product *= *m);

        let mut moduli = Vec::with_capacity(moduli_u64.len());
        let mut garner = Vec::with_capacity(moduli_u64.len());
        for m in moduli_u64 {
            let q = Modulus::new(*m)?;
            let q_star = &product / *m;
            // q_tilde = (Q/q_i)^-1 mod q_i; the moduli are prime.
            let q_tilde = q
                .inv((&q_star % *m).to_u64().unwrap())
                .ok_or(Error::InvalidModulus(*m))?;
            garner.push(&q_star * q_tilde);
            moduli.push(q);
        }

        Ok(Self {
            moduli_u64: moduli_u64.to_owned(),
            moduli,
            garner,
            product,
        })
    }

    /// Returns the product of the moduli used when creating the RNS context.
    #[must_use]
    pub const fn modulus(&self) -> &BigUint {
        &self.product
    }

    /// Project a BigUint into its residues.
    #[must_use]
    pub fn project(&self, a: &BigUint) -> Vec<u64> {
        self.moduli_u64
            .iter()
            .map(|m| (a % *m).to_u64().unwrap())
            .collect()
    }

    /// Lift residues into a BigUint in [0, product).
    ///
    /// Aborts if the number of residues differs from the number of moduli in
    /// debug mode.
    #[must_use]
    pub fn lift(&self, residues: ArrayView1<u64>) -> BigUint {
        debug_assert_eq!(residues.len(), self.garner.len());
        let mut result = BigUint::zero();
        izip!(residues.iter(), self.garner.iter()).for_each(|(r, g)| result += g * *r);
        result % &self.product
    }

    /// Getter for the i-th Garner coefficient, (Q/q_i) * ((Q/q_i)^-1 mod q_i).
    #[must_use]
    pub fn get_garner(&self, i: usize) -> Option<&BigUint> {
        self.garner.get(i)
    }
}
