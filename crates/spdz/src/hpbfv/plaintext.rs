//! Plaintext type in the hpbfv encryption scheme.

use crate::hpbfv::HpbfvParameters;
use spdz_math::rq::Poly;
use std::sync::Arc;

/// A plaintext polynomial, kept in power-basis representation.
///
/// On the encoding side this is the Delta-scaled message polynomial; on the
/// decryption side it is c0 + c1 * s + ..., still carrying its noise. Both
/// decode through [`crate::hpbfv::Decoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plaintext {
    pub(crate) par: Arc<HpbfvParameters>,
    pub(crate) poly: Poly,
}

impl Plaintext {
    pub(crate) fn new(par: Arc<HpbfvParameters>, poly: Poly) -> Self {
        Self { par, poly }
    }

    /// The underlying polynomial.
    pub fn poly(&self) -> &Poly {
        &self.poly
    }

    /// The degree of a plaintext operand, always 0.
    pub const fn degree(&self) -> usize {
        0
    }
}
