#![warn(missing_docs, unused_imports)]

//! Polynomials in R_q\[x\] = (ZZ_q1 x ... x ZZ_qn)\[x\] where the qi's are
//! prime moduli in zq.

mod context;
mod convert;
mod ops;

pub mod scaler;
pub mod traits;

use self::traits::TryConvertFrom;
use crate::{Error, Result};
pub use context::Context;
pub use scaler::{Scaler, ScalingFactor};

use spdz_util::{sample_ternary_hw, sample_vec_gaussian};
use itertools::izip;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

/// Possible representations of the underlying polynomial.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// The list of coefficients ci such that the polynomial is
    /// c0 + c1 * x + ... + c_(degree - 1) * x^(degree - 1).
    #[default]
    PowerBasis,
    /// The NTT representation of the PowerBasis coefficients.
    Ntt,
    /// The NTT representation with every residue in Montgomery form, used
    /// for fast repeated multiplication.
    NttMontgomery,
}

/// An exponent for a Galois substitution x -> x^i.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SubstitutionExponent {
    /// The value of the exponent.
    pub exponent: usize,
    ctx: Arc<Context>,
}

impl SubstitutionExponent {
    /// Creates a substitution element from an exponent.
    /// Returns an error if the exponent is even modulo 2 * degree.
    pub fn new(ctx: &Arc<Context>, exponent: usize) -> Result<Self> {
        let exponent = exponent % (2 * ctx.degree);
        if exponent & 1 == 0 {
            return Err(Error::Default(
                "The exponent should be odd modulo 2 * degree".to_string(),
            ));
        }
        Ok(Self {
            ctx: ctx.clone(),
            exponent,
        })
    }
}

/// Struct that holds a polynomial for a specific context.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    ctx: Arc<Context>,
    representation: Representation,
    coefficients: Array2<u64>,
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        if let Some(coeffs) = self.coefficients.as_slice_mut() {
            coeffs.zeroize()
        }
    }
}

impl AsRef<Poly> for Poly {
    fn as_ref(&self) -> &Poly {
        self
    }
}

impl AsMut<Poly> for Poly {
    fn as_mut(&mut self) -> &mut Poly {
        self
    }
}

impl Poly {
    /// Creates a polynomial holding the constant 0.
    #[must_use]
    pub fn zero(ctx: &Arc<Context>, representation: Representation) -> Self {
        Self {
            ctx: ctx.clone(),
            representation,
            coefficients: Array2::zeros((ctx.q.len(), ctx.degree)),
        }
    }

    /// Current representation of the polynomial.
    #[must_use]
    pub const fn representation(&self) -> &Representation {
        &self.representation
    }

    /// Returns the context of the underlying polynomial.
    #[must_use]
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Change the representation of the underlying polynomial.
    pub fn change_representation(&mut self, to: Representation) {
        match (self.representation, to) {
            (Representation::PowerBasis, Representation::Ntt) => self.ntt_forward(),
            (Representation::PowerBasis, Representation::NttMontgomery) => {
                self.ntt_forward();
                self.mform()
            }
            (Representation::Ntt, Representation::PowerBasis) => self.ntt_backward(),
            (Representation::Ntt, Representation::NttMontgomery) => self.mform(),
            (Representation::NttMontgomery, Representation::Ntt) => self.inv_mform(),
            (Representation::NttMontgomery, Representation::PowerBasis) => {
                self.inv_mform();
                self.ntt_backward()
            }
            _ => {}
        }
        self.representation = to;
    }

    /// Override the internal representation to a given representation.
    ///
    /// # Safety
    /// Prefer the `change_representation` function to safely modify the
    /// polynomial representation; this function does not transform the
    /// coefficients.
    pub unsafe fn override_representation(&mut self, to: Representation) {
        self.representation = to;
    }

    /// Generate a random polynomial.
    pub fn random<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        rng: &mut R,
    ) -> Self {
        let mut p = Poly::zero(ctx, representation);
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut v, qi)| {
            v.as_slice_mut()
                .unwrap()
                .copy_from_slice(&qi.random_vec(ctx.degree, rng))
        });
        p
    }

    /// Generate a random polynomial deterministically from a seed.
    ///
    /// The seed is hashed into a ChaCha8 stream, so that distinct callers
    /// derive identical polynomials from identical seeds.
    #[must_use]
    pub fn random_from_seed(
        ctx: &Arc<Context>,
        representation: Representation,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        let mut prng =
            ChaCha8Rng::from_seed(<ChaCha8Rng as SeedableRng>::Seed::from(hasher.finalize()));
        Self::random(ctx, representation, &mut prng)
    }

    /// Generate a stream of random polynomials from a common seed.
    ///
    /// The polynomials are sampled in call order; two streams built from the
    /// same seed yield the same sequence.
    pub fn random_stream(
        ctx: Arc<Context>,
        representation: Representation,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> impl Iterator<Item = Poly> {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        let mut prng =
            ChaCha8Rng::from_seed(<ChaCha8Rng as SeedableRng>::Seed::from(hasher.finalize()));
        std::iter::from_fn(move || Some(Poly::random(&ctx, representation, &mut prng)))
    }

    /// Generate a small polynomial with Gaussian coefficients of standard
    /// deviation sigma, rejected beyond `bound`, and convert it into the
    /// specified representation.
    pub fn small<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        sigma: f64,
        bound: i64,
        rng: &mut R,
    ) -> Result<Self> {
        let coeffs = Zeroizing::new(
            sample_vec_gaussian(ctx.degree, sigma, bound, rng).map_err(Error::from)?,
        );
        let mut p = Poly::try_convert_from(
            coeffs.as_ref() as &[i64],
            ctx,
            Representation::PowerBasis,
        )?;
        if representation != Representation::PowerBasis {
            p.change_representation(representation);
        }
        Ok(p)
    }

    /// Generate a ternary polynomial with the prescribed Hamming weight and
    /// convert it into the specified representation.
    pub fn ternary<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        hamming_weight: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let coeffs = Zeroizing::new(
            sample_ternary_hw(ctx.degree, hamming_weight, rng).map_err(Error::from)?,
        );
        let mut p = Poly::try_convert_from(
            coeffs.as_ref() as &[i64],
            ctx,
            Representation::PowerBasis,
        )?;
        if representation != Representation::PowerBasis {
            p.change_representation(representation);
        }
        Ok(p)
    }

    /// Access the polynomial coefficients in RNS representation.
    #[must_use]
    pub fn coefficients(&self) -> ArrayView2<'_, u64> {
        self.coefficients.view()
    }

    /// Mutable access to the polynomial coefficients in RNS representation.
    ///
    /// The caller is responsible for keeping every residue smaller than its
    /// modulus and for preserving the representation invariants.
    #[must_use]
    pub fn coefficients_mut(&mut self) -> ArrayViewMut2<'_, u64> {
        self.coefficients.view_mut()
    }

    /// Computes the forward Ntt on the coefficients.
    fn ntt_forward(&mut self) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter())
            .for_each(|(mut v, op)| op.forward(v.as_slice_mut().unwrap()));
    }

    /// Computes the backward Ntt on the coefficients.
    fn ntt_backward(&mut self) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter())
            .for_each(|(mut v, op)| op.backward(v.as_slice_mut().unwrap()));
    }

    /// Lifts every residue into Montgomery form.
    fn mform(&mut self) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter())
            .for_each(|(mut v, qi)| qi.mform_vec(v.as_slice_mut().unwrap()));
    }

    /// Takes every residue out of Montgomery form.
    fn inv_mform(&mut self) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter())
            .for_each(|(mut v, qi)| qi.inv_mform_vec(v.as_slice_mut().unwrap()));
    }

    /// Substitute x by x^i in a polynomial in PowerBasis representation.
    ///
    /// Returns an error if the polynomial is not in PowerBasis
    /// representation.
    pub fn substitute(&self, i: &SubstitutionExponent) -> Result<Poly> {
        if self.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                self.representation,
                Representation::PowerBasis,
            ));
        }
        if self.ctx != i.ctx {
            return Err(Error::InvalidContext);
        }
        let mut q = Poly::zero(&self.ctx, Representation::PowerBasis);
        let mask = self.ctx.degree - 1;
        izip!(
            q.coefficients.outer_iter_mut(),
            self.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut q_row, p_row, qi)| {
            let mut power = 0usize;
            for j in 0..self.ctx.degree {
                if power & self.ctx.degree != 0 {
                    q_row[power & mask] = qi.sub(q_row[power & mask], p_row[j]);
                } else {
                    q_row[power & mask] = qi.add(q_row[power & mask], p_row[j]);
                }
                power = (power + i.exponent) % (2 * self.ctx.degree);
            }
        });
        Ok(q)
    }

    /// Multiplies a polynomial in PowerBasis representation by x^power, with
    /// 0 <= power < 2 * degree.
    ///
    /// Returns an error if the polynomial is not in PowerBasis
    /// representation.
    pub fn mul_monomial(&self, power: usize) -> Result<Poly> {
        if self.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                self.representation,
                Representation::PowerBasis,
            ));
        }
        debug_assert!(power < 2 * self.ctx.degree);
        let degree = self.ctx.degree;
        let mask = degree - 1;
        let mut q = Poly::zero(&self.ctx, Representation::PowerBasis);
        izip!(
            q.coefficients.outer_iter_mut(),
            self.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut q_row, p_row, qi)| {
            for j in 0..degree {
                let index = j + power;
                if index & degree == 0 {
                    q_row[index & mask] = p_row[j];
                } else {
                    q_row[index & mask] = qi.neg(p_row[j]);
                }
            }
        });
        Ok(q)
    }

    /// Restrict the polynomial to a context whose moduli are a prefix of the
    /// moduli of the current context, by dropping the extra residue rows.
    ///
    /// This is a plain projection of the residues, not a modulus switch.
    pub fn restrict(&self, ctx: &Arc<Context>) -> Result<Poly> {
        if !ctx.is_prefix_of(&self.ctx) {
            return Err(Error::InvalidContext);
        }
        let mut q = Poly::zero(ctx, self.representation);
        izip!(
            q.coefficients.outer_iter_mut(),
            self.coefficients.outer_iter()
        )
        .for_each(|(mut q_row, p_row)| {
            q_row
                .as_slice_mut()
                .unwrap()
                .copy_from_slice(p_row.as_slice().unwrap())
        });
        Ok(q)
    }

    /// Scale a polynomial using a scaler.
    pub fn scale(&self, scaler: &Scaler) -> Result<Poly> {
        scaler.scale(self)
    }
}
