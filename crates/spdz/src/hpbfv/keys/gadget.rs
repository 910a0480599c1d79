//! Gadget ciphertexts: the key-switching material of the scheme.
//!
//! A gadget ciphertext is a \[d_rns\]\[d_pw2\] grid of RLWE pairs over Q x P
//! encrypting y * g_ij for a payload y, where g_ij = P * garner_i *
//! 2^(j * base) composes the RNS decomposition with a power-of-two
//! refinement. The gadget product decomposes an input polynomial into the
//! matching digits, accumulates the pairs, and divides by P with rounding.

use crate::hpbfv::HpbfvParameters;
use crate::{Error, Result};
use itertools::izip;
use rand::{CryptoRng, RngCore};
use spdz_math::rq::{traits::TryConvertFrom, Poly, Representation};
use std::sync::Arc;
use zeroize::Zeroizing;

/// A grid of RLWE pairs encrypting a gadget-decomposed payload.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GadgetCiphertext {
    pub(crate) par: Arc<HpbfvParameters>,
    pub(crate) cells: Vec<Vec<[Poly; 2]>>,
}

impl GadgetCiphertext {
    /// Create an all-zero gadget ciphertext.
    pub(crate) fn zero(par: &Arc<HpbfvParameters>) -> Self {
        let cells = (0..par.decomp_rns())
            .map(|_| {
                (0..par.decomp_pw2())
                    .map(|_| {
                        [
                            Poly::zero(par.ctx_qp(), Representation::NttMontgomery),
                            Poly::zero(par.ctx_qp(), Representation::NttMontgomery),
                        ]
                    })
                    .collect()
            })
            .collect();
        Self {
            par: par.clone(),
            cells,
        }
    }

    /// Access a cell of the grid.
    pub fn cell(&self, i: usize, j: usize) -> &[Poly; 2] {
        &self.cells[i][j]
    }

    /// Generate a switching key: every cell holds (-a * key + y * g_ij + e,
    /// a) for a fresh uniform a, encrypting the payload y under `key`.
    pub(crate) fn random_switching_key<R: RngCore + CryptoRng>(
        par: &Arc<HpbfvParameters>,
        key: &Poly,
        payload: &Poly,
        rng: &mut R,
    ) -> Result<Self> {
        let mut out = Self::zero(par);
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                let a = Poly::random(par.ctx_qp(), Representation::NttMontgomery, rng);
                let mut c0 = encrypt_zero_qp(par, &a, key, rng)?;
                let mut contribution = payload.clone();
                scalar_mul_rows(&mut contribution, par.gadget_vector(i, j));
                c0 += &contribution;
                out.cells[i][j] = [c0, a];
            }
        }
        Ok(out)
    }

    /// Add y * g_ij into the first component of every cell.
    pub(crate) fn add_gadget_payload(&mut self, payload: &Poly) {
        for i in 0..self.cells.len() {
            for j in 0..self.cells[i].len() {
                let mut contribution = payload.clone();
                scalar_mul_rows(&mut contribution, self.par.gadget_vector(i, j));
                self.cells[i][j][0] += &contribution;
            }
        }
    }

    /// Key switch: decompose x (power basis, over Q) into gadget digits and
    /// return (sum digits * cell_0, sum digits * cell_1) divided by P, both
    /// in power-basis representation over Q.
    pub fn gadget_product(&self, x: &Poly) -> Result<(Poly, Poly)> {
        let par = &self.par;
        if x.ctx() != par.ctx_q() {
            return Err(Error::LevelMismatch);
        }
        if x.representation() != &Representation::PowerBasis {
            return Err(Error::MathError(spdz_math::Error::IncorrectRepresentation(
                *x.representation(),
                Representation::PowerBasis,
            )));
        }

        let base = par.pow2_base();
        let mask = if base == 0 { 0 } else { (1u64 << base) - 1 };
        let mut acc0 = Poly::zero(par.ctx_qp(), Representation::Ntt);
        let mut acc1 = Poly::zero(par.ctx_qp(), Representation::Ntt);
        let coefficients = x.coefficients();
        let mut digits = vec![0u64; par.degree()];
        for i in 0..par.decomp_rns() {
            let residues = coefficients.row(i);
            for j in 0..par.decomp_pw2() {
                izip!(digits.iter_mut(), residues.iter()).for_each(|(d, r)| {
                    *d = if base == 0 { *r } else { (r >> (base * j)) & mask }
                });
                let digit_poly = Poly::try_convert_from(
                    &digits as &[u64],
                    par.ctx_qp(),
                    Representation::Ntt,
                )?;
                acc0 += &(&digit_poly * &self.cells[i][j][0]);
                acc1 += &(&digit_poly * &self.cells[i][j][1]);
            }
        }

        acc0.change_representation(Representation::PowerBasis);
        acc1.change_representation(Representation::PowerBasis);
        let p0 = acc0.scale(&par.down_scaler_p)?;
        let p1 = acc1.scale(&par.down_scaler_p)?;
        Ok((p0, p1))
    }
}

/// Multiply every residue row of a polynomial by the matching scalar.
/// Montgomery-form polynomials stay in Montgomery form.
pub(crate) fn scalar_mul_rows(p: &mut Poly, scalars: &[u64]) {
    let moduli = p.ctx().moduli_operators().to_vec();
    izip!(p.coefficients_mut().outer_iter_mut(), moduli.iter(), scalars.iter()).for_each(
        |(mut row, qi, si)| qi.scalar_mul_vec(row.as_slice_mut().unwrap(), *si),
    );
}

/// Fill c0 with an encryption of zero under `key` whose a-part is the
/// provided polynomial: c0 = -c1 * key + e over Q x P, in NTT + Montgomery
/// form. The Gaussian error is sampled over Q and extended to P with its
/// small centered norm.
pub(crate) fn encrypt_zero_qp<R: RngCore + CryptoRng>(
    par: &Arc<HpbfvParameters>,
    c1: &Poly,
    key: &Poly,
    rng: &mut R,
) -> Result<Poly> {
    let e = Zeroizing::new(
        spdz_util::sample_vec_gaussian(par.degree(), par.sigma(), par.gaussian_bound(), rng)
            .map_err(|err| Error::RngFailure(err.to_string()))?,
    );
    let mut c0 = Poly::try_convert_from(
        e.as_ref() as &[i64],
        par.ctx_qp(),
        Representation::NttMontgomery,
    )?;
    c0 -= &(c1 * key);
    Ok(c0)
}

#[cfg(test)]
mod tests {
    use super::GadgetCiphertext;
    use crate::hpbfv::{HpbfvParameters, SecretKey, HEMI};
    use num_bigint::BigInt;
    use rand::thread_rng;
    use spdz_math::rq::{Poly, Representation};
    use std::error::Error;

    #[test]
    fn key_switch_decrypts_product() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let sk = SecretKey::random(&par, &mut rng)?;
        let key = sk.as_poly(par.ctx_qp(), Representation::NttMontgomery)?;

        // Encrypt a small payload y under the key.
        let y = Poly::small(
            par.ctx_qp(),
            Representation::NttMontgomery,
            par.sigma(),
            par.gaussian_bound(),
            &mut rng,
        )?;
        let gct = GadgetCiphertext::random_switching_key(&par, &key, &y, &mut rng)?;

        let x = Poly::random(par.ctx_q(), Representation::PowerBasis, &mut rng);
        let (p0, p1) = gct.gadget_product(&x)?;

        // p0 + p1 * s should be close to x * y over Q.
        let s_q = sk.as_poly(par.ctx_q(), Representation::NttMontgomery)?;
        let mut lhs = p1.clone();
        lhs.change_representation(Representation::Ntt);
        lhs *= s_q.as_ref();
        let mut p0_ntt = p0.clone();
        p0_ntt.change_representation(Representation::Ntt);
        lhs += &p0_ntt;
        lhs.change_representation(Representation::PowerBasis);

        let mut x_ntt = x.clone();
        x_ntt.change_representation(Representation::Ntt);
        let mut y_q = y.restrict(par.ctx_q())?;
        y_q.change_representation(Representation::Ntt);
        let mut rhs = &x_ntt * &y_q;
        rhs.change_representation(Representation::PowerBasis);

        let diff = &lhs - &rhs;
        let q = BigInt::from(par.ctx_q().modulus().clone());
        for v in Vec::<BigInt>::from(&diff) {
            let centered = if &v > &(&q >> 1) { v - &q } else { v };
            // Key-switching noise stays far below the modulus.
            assert!(centered.magnitude().bits() < 80);
        }
        Ok(())
    }
}
