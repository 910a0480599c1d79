//! Ciphertext type in the hpbfv encryption scheme.

use crate::hpbfv::HpbfvParameters;
use crate::{Error, Result};
use spdz_math::rq::{Poly, Representation};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A ciphertext encrypting a plaintext.
///
/// A ciphertext of degree d holds d + 1 polynomials over a shared context,
/// kept in power-basis representation between operations. Degree 1 is the
/// canonical state; tensoring produces degree 2 and relinearization reduces
/// back to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub(crate) par: Arc<HpbfvParameters>,
    pub(crate) c: Vec<Poly>,
}

impl Deref for Ciphertext {
    type Target = [Poly];

    fn deref(&self) -> &Self::Target {
        &self.c
    }
}

impl DerefMut for Ciphertext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.c
    }
}

impl Ciphertext {
    /// Create a ciphertext from a vector of polynomials.
    ///
    /// A ciphertext must contain at least two polynomials, all in power-basis
    /// representation and over the same context.
    pub fn new(c: Vec<Poly>, par: &Arc<HpbfvParameters>) -> Result<Self> {
        if c.len() < 2 {
            return Err(Error::BadDegree {
                found: c.len().saturating_sub(1),
                expected: 1,
            });
        }
        let ctx = c[0].ctx().clone();
        for ci in c.iter() {
            if ci.representation() != &Representation::PowerBasis {
                return Err(Error::MathError(spdz_math::Error::IncorrectRepresentation(
                    *ci.representation(),
                    Representation::PowerBasis,
                )));
            }
            if ci.ctx() != &ctx {
                return Err(Error::LevelMismatch);
            }
        }
        Ok(Self {
            par: par.clone(),
            c,
        })
    }

    /// Create a fresh zero ciphertext of the given degree.
    pub fn zero(par: &Arc<HpbfvParameters>, degree: usize) -> Self {
        debug_assert!(degree >= 1);
        Self {
            par: par.clone(),
            c: (0..=degree)
                .map(|_| Poly::zero(par.ctx_q(), Representation::PowerBasis))
                .collect(),
        }
    }

    /// The degree of the ciphertext.
    pub fn degree(&self) -> usize {
        self.c.len() - 1
    }

    /// Truncate the underlying vector of polynomials.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.c.truncate(len)
    }

    /// The parameters of the ciphertext.
    pub fn par(&self) -> &Arc<HpbfvParameters> {
        &self.par
    }
}
