//! Message type: a vector of slot values modulo t.

use crate::hpbfv::HpbfvParameters;
use crate::{Error, Result};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// A message: `slots` big integers, each in \[0, t).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub(crate) par: Arc<HpbfvParameters>,
    values: Box<[BigUint]>,
}

impl Message {
    /// Create the all-zero message.
    pub fn new(par: &Arc<HpbfvParameters>) -> Self {
        Self {
            par: par.clone(),
            values: vec![BigUint::default(); par.slots()].into_boxed_slice(),
        }
    }

    /// Create a message from raw slot values; the values are reduced
    /// modulo t.
    pub fn from_values(par: Arc<HpbfvParameters>, values: Vec<BigUint>) -> Self {
        debug_assert_eq!(values.len(), par.slots());
        let t = par.t().clone();
        Self {
            values: values.into_iter().map(|v| v % &t).collect(),
            par,
        }
    }

    /// Sample a message with slots uniform in \[0, t).
    pub fn random<R: RngCore + CryptoRng>(
        par: &Arc<HpbfvParameters>,
        rng: &mut R,
    ) -> Result<Self> {
        let values = (0..par.slots())
            .map(|_| {
                spdz_util::sample_biguint_below(par.t(), rng)
                    .map_err(|e| Error::RngFailure(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            par: par.clone(),
            values: values.into_boxed_slice(),
        })
    }

    /// The slot values.
    pub fn values(&self) -> &[BigUint] {
        &self.values
    }

    /// Mutable access to the slot values; the caller keeps them in \[0, t).
    pub fn values_mut(&mut self) -> &mut [BigUint] {
        &mut self.values
    }

    /// Slot-wise addition modulo t.
    pub fn add(&self, other: &Message) -> Message {
        debug_assert_eq!(self.par, other.par);
        let t = self.par.t();
        Message {
            par: self.par.clone(),
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| (a + b) % t)
                .collect(),
        }
    }

    /// Slot-wise multiplication modulo t.
    pub fn mul(&self, other: &Message) -> Message {
        debug_assert_eq!(self.par, other.par);
        let t = self.par.t();
        Message {
            par: self.par.clone(),
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| (a * b) % t)
                .collect(),
        }
    }

    /// Slot-wise negation modulo t: (t - v) mod t.
    pub fn neg(&self) -> Message {
        let t = self.par.t();
        Message {
            par: self.par.clone(),
            values: self
                .values
                .iter()
                .map(|v| {
                    if v == &BigUint::default() {
                        BigUint::default()
                    } else {
                        t - v
                    }
                })
                .collect(),
        }
    }

    /// Slot-wise subtraction modulo t.
    pub fn sub(&self, other: &Message) -> Message {
        self.add(&other.neg())
    }
}
