use itertools::Itertools;
use num_bigint::BigUint;
use std::{fmt::Debug, sync::Arc};

use crate::{ntt::NttOperator, rns::RnsContext, zq::Modulus, Error, Result};

/// Struct that holds the context associated with elements in rq.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Context {
    pub(crate) moduli: Box<[u64]>,
    pub(crate) q: Box<[Modulus]>,
    pub(crate) rns: Arc<RnsContext>,
    pub(crate) ops: Box<[NttOperator]>,
    pub(crate) degree: usize,
    pub(crate) next_context: Option<Arc<Context>>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("moduli", &self.moduli)
            .field("degree", &self.degree)
            .finish()
    }
}

impl Context {
    /// Creates a context from a list of moduli and a polynomial degree.
    ///
    /// Returns an error if the moduli are not distinct primes less than
    /// 62 bits which support the NTT of size `degree`.
    pub fn new(moduli: &[u64], degree: usize) -> Result<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            return Err(Error::InvalidDegree(degree));
        }
        let rns = Arc::new(RnsContext::new(moduli)?);
        let mut q = Vec::with_capacity(moduli.len());
        let mut ops = Vec::with_capacity(moduli.len());
        for modulus in moduli {
            let qi = Modulus::new(*modulus)?;
            let op = NttOperator::new(&qi, degree).ok_or_else(|| {
                Error::Default(format!(
                    "Impossible to construct an Ntt operator modulo {modulus}"
                ))
            })?;
            q.push(qi);
            ops.push(op);
        }

        let next_context = if moduli.len() >= 2 {
            Some(Arc::new(Context::new(&moduli[..moduli.len() - 1], degree)?))
        } else {
            None
        };

        Ok(Self {
            moduli: moduli.to_owned().into_boxed_slice(),
            q: q.into_boxed_slice(),
            rns,
            ops: ops.into_boxed_slice(),
            degree,
            next_context,
        })
    }

    /// Creates a context in an `Arc`.
    pub fn new_arc(moduli: &[u64], degree: usize) -> Result<Arc<Self>> {
        Self::new(moduli, degree).map(Arc::new)
    }

    /// Returns the modulus as a BigUint.
    pub fn modulus(&self) -> &BigUint {
        self.rns.modulus()
    }

    /// Returns a reference to the moduli in this context.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the moduli as Modulus in this context.
    pub fn moduli_operators(&self) -> &[Modulus] {
        &self.q
    }

    /// Returns the RNS context.
    pub fn rns(&self) -> &Arc<RnsContext> {
        &self.rns
    }

    /// Returns the polynomial degree.
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the context whose moduli are the first `len` moduli of this
    /// context, following the chain of sub-contexts.
    pub fn subcontext(self: &Arc<Self>, len: usize) -> Result<Arc<Self>> {
        if len == 0 || len > self.moduli.len() {
            return Err(Error::InvalidContext);
        }
        let mut current = self.clone();
        while current.moduli.len() > len {
            current = current.next_context.as_ref().unwrap().clone();
        }
        Ok(current)
    }

    /// Returns whether the moduli of this context form a prefix of the moduli
    /// of the other context.
    pub fn is_prefix_of(&self, other: &Context) -> bool {
        self.degree == other.degree
            && self.moduli.len() <= other.moduli.len()
            && self
                .moduli
                .iter()
                .zip_eq(other.moduli[..self.moduli.len()].iter())
                .all(|(a, b)| a == b)
    }
}
