//! Secret keys for the hpbfv encryption scheme.

use crate::hpbfv::{Ciphertext, HpbfvParameters};
use crate::{Error, Result};
use num_bigint::BigInt;
use num_traits::Signed;
use rand::{CryptoRng, RngCore};
use spdz_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secret key for the hpbfv encryption scheme: a ternary polynomial with a
/// fixed Hamming weight.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKey {
    pub(crate) par: Arc<HpbfvParameters>,
    pub(crate) coeffs: Box<[i64]>,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl SecretKey {
    /// Generate a random [`SecretKey`].
    pub fn random<R: RngCore + CryptoRng>(
        par: &Arc<HpbfvParameters>,
        rng: &mut R,
    ) -> Result<Self> {
        let coeffs = spdz_util::sample_ternary_hw(par.degree(), par.hamming_weight(), rng)
            .map_err(|e| Error::OperandError(e.to_string()))?;
        Ok(Self::new(coeffs, par))
    }

    /// Generate a [`SecretKey`] from its coefficients.
    pub(crate) fn new(coeffs: Vec<i64>, par: &Arc<HpbfvParameters>) -> Self {
        Self {
            par: par.clone(),
            coeffs: coeffs.into_boxed_slice(),
        }
    }

    /// The coefficient-wise sum of secret keys: the joint key of a
    /// multiparty setup. Intended for analysis and tests; the protocols
    /// never materialise this key.
    pub fn aggregate(keys: &[SecretKey]) -> Result<SecretKey> {
        let first = keys.first().ok_or_else(|| {
            Error::ProtocolStall("no secret key shares provided".to_string())
        })?;
        let mut coeffs = vec![0i64; first.par.degree()];
        for key in keys {
            if key.par != first.par {
                return Err(Error::OperandError(
                    "Incompatible parameters".to_string(),
                ));
            }
            coeffs
                .iter_mut()
                .zip(key.coeffs.iter())
                .for_each(|(acc, c)| *acc += c);
        }
        Ok(SecretKey::new(coeffs, &first.par))
    }

    /// Materialise the key as a polynomial over the given context.
    pub(crate) fn as_poly(
        &self,
        ctx: &Arc<Context>,
        representation: Representation,
    ) -> Result<Zeroizing<Poly>> {
        let mut s = Zeroizing::new(Poly::try_convert_from(
            &self.coeffs as &[i64],
            ctx,
            Representation::PowerBasis,
        )?);
        s.change_representation(representation);
        Ok(s)
    }

    /// Measure how many bits of the decoding margin a ciphertext consumes
    /// under this key: the size of the centered residue of b(x) * (c0 +
    /// c1 * s + ...) modulo Q. Decoding fails once this reaches the size
    /// of Q.
    pub fn measure_noise(&self, ct: &Ciphertext) -> Result<usize> {
        if self.par != ct.par {
            return Err(Error::OperandError(
                "Incompatible parameters".to_string(),
            ));
        }
        let ctx = ct.c[0].ctx();
        let s = self.as_poly(ctx, Representation::NttMontgomery)?;
        let mut si = s.clone();

        let mut w = ct.c[0].clone();
        w.change_representation(Representation::Ntt);
        for i in 1..ct.c.len() {
            let mut cis = ct.c[i].clone();
            cis.change_representation(Representation::Ntt);
            cis *= si.as_ref();
            w += &cis;
            if i + 1 < ct.c.len() {
                *si.as_mut() *= s.as_ref();
            }
        }
        w.change_representation(Representation::PowerBasis);

        let degree = self.par.degree();
        let slots = self.par.slots();
        let beta = BigInt::from(self.par.beta().clone());
        let q = BigInt::from(ctx.modulus().clone());
        let half = &q >> 1;

        let coeffs = Vec::<BigInt>::from(&w);
        let mut noise = 0usize;
        for k in 0..degree {
            let shifted = if k >= slots {
                coeffs[k - slots].clone()
            } else {
                -coeffs[k + degree - slots].clone()
            };
            let mut residue = (shifted - &beta * &coeffs[k]) % &q;
            if residue > half {
                residue -= &q;
            } else if residue < -&half {
                residue += &q;
            }
            noise = std::cmp::max(noise, residue.abs().bits() as usize);
        }
        Ok(noise)
    }
}
