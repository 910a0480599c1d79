//! Public keys for the hpbfv encryption scheme.

use crate::hpbfv::HpbfvParameters;
use spdz_math::rq::Poly;
use std::sync::Arc;

/// Public key for the hpbfv encryption scheme: a pair (b, a) with
/// b = -a * s + e, in NTT + Montgomery form.
///
/// Keys produced by the multiparty [`crate::hpbfv::PartialKeyGenerator`]
/// live over Q x P with a CRS-derived a-part; pairwise keys generated by
/// [`crate::hpbfv::KeyGenerator`] live directly over Q.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublicKey {
    pub(crate) par: Arc<HpbfvParameters>,
    pub(crate) b: Poly,
    pub(crate) a: Poly,
}

impl PublicKey {
    pub(crate) fn new(par: Arc<HpbfvParameters>, b: Poly, a: Poly) -> Self {
        Self { par, b, a }
    }

    /// The b component, -a * s + e.
    pub fn b(&self) -> &Poly {
        &self.b
    }

    /// The a component; for CRS-derived keys this equals the first cell of
    /// the common reference string expansion.
    pub fn a(&self) -> &Poly {
        &self.a
    }
}
