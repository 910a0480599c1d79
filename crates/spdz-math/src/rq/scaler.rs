//! Scaler of polynomials between contexts: exact centered CRT lift, rational
//! multiplication, rounding, and projection onto the target moduli.

use super::{Context, Poly, Representation};
use crate::{Error, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use std::sync::Arc;

/// A scaling factor, i.e. a positive rational number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingFactor {
    numerator: BigUint,
    denominator: BigUint,
}

impl ScalingFactor {
    /// Create a scaling factor from a numerator and a denominator.
    ///
    /// Aborts if the denominator is zero.
    pub fn new(numerator: &BigUint, denominator: &BigUint) -> Self {
        assert!(!denominator.is_zero());
        Self {
            numerator: numerator.clone(),
            denominator: denominator.clone(),
        }
    }

    /// The identity scaling factor.
    pub fn one() -> Self {
        Self {
            numerator: BigUint::from(1u64),
            denominator: BigUint::from(1u64),
        }
    }
}

/// Scaler that rescales polynomials from one context to another.
///
/// For each coefficient v, lifted centered modulo the source modulus, the
/// scaler computes round(v * numerator / denominator) and projects the result
/// onto the residues of the target context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaler {
    from: Arc<Context>,
    to: Arc<Context>,
    factor: ScalingFactor,
    double_denominator: BigInt,
}

impl Scaler {
    /// Create a scaler from a context `from` to a context `to`.
    ///
    /// Returns an error if the contexts are over different degrees.
    pub fn new(from: &Arc<Context>, to: &Arc<Context>, factor: ScalingFactor) -> Result<Self> {
        if from.degree != to.degree {
            return Err(Error::InvalidContext);
        }
        let double_denominator = BigInt::from(&factor.denominator << 1);
        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            factor,
            double_denominator,
        })
    }

    /// Floor division of 2x + d by 2d, i.e. rounding of x / d with ties
    /// toward positive infinity.
    fn round_div(&self, x: BigInt) -> BigInt {
        let num: BigInt = (x << 1) + BigInt::from(self.factor.denominator.clone());
        let mut q = &num / &self.double_denominator;
        if num.sign() == Sign::Minus && (&q * &self.double_denominator) != num {
            q -= 1;
        }
        q
    }

    /// Scale a polynomial in PowerBasis representation.
    ///
    /// Returns an error if the polynomial comes from another context or is
    /// not in PowerBasis representation.
    pub fn scale(&self, p: &Poly) -> Result<Poly> {
        if p.ctx() != &self.from {
            return Err(Error::InvalidContext);
        }
        if p.representation() != &Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                *p.representation(),
                Representation::PowerBasis,
            ));
        }

        let mut out = Poly::zero(&self.to, Representation::PowerBasis);
        let half = self.from.modulus() >> 1;
        let from_modulus = BigInt::from(self.from.modulus().clone());
        let numerator = BigInt::from(self.factor.numerator.clone());

        for j in 0..self.from.degree {
            let lifted = self.from.rns.lift(p.coefficients().column(j));
            let mut v = BigInt::from(lifted);
            if v.magnitude() > &half {
                v -= &from_modulus;
            }
            let w = self.round_div(v * &numerator);
            let negative = w.sign() == Sign::Minus;
            let magnitude = w.magnitude();
            for (i, m) in self.to.moduli.iter().enumerate() {
                let mut r = (magnitude % *m).to_u64().unwrap();
                if negative && r != 0 {
                    r = m - r;
                }
                out.coefficients_mut()[(i, j)] = r;
            }
        }
        Ok(out)
    }
}
