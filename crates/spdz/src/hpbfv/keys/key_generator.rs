//! Single-party key generation: encryption key pairs for the pairwise
//! protocol, and rotation keys for the evaluator.

use crate::hpbfv::keys::gadget::GadgetCiphertext;
use crate::hpbfv::{HpbfvParameters, PublicKey, SecretKey};
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use spdz_math::rq::{Poly, Representation, SubstitutionExponent};
use std::collections::HashMap;
use std::sync::Arc;

/// Single-party key generator.
pub struct KeyGenerator {
    par: Arc<HpbfvParameters>,
}

/// A set of key-switching keys for column rotations, indexed by Galois
/// element.
#[derive(Debug, Clone)]
pub struct RotationKeySet {
    pub(crate) keys: HashMap<usize, GadgetCiphertext>,
}

impl RotationKeySet {
    /// Look up the switching key for a Galois element.
    pub fn get_rotation_key(&self, galois_element: usize) -> Option<&GadgetCiphertext> {
        self.keys.get(&galois_element)
    }
}

/// Inverse of an odd element modulo a power of two, by Newton iteration.
fn inv_mod_pow2(g: usize, modulus: usize) -> usize {
    debug_assert!(modulus.is_power_of_two() && g % 2 == 1);
    let mask = (modulus - 1) as u64;
    let g = g as u64;
    let mut inv = g;
    for _ in 0..6 {
        inv = inv.wrapping_mul(2u64.wrapping_sub(g.wrapping_mul(inv))) & mask;
    }
    debug_assert_eq!((g.wrapping_mul(inv)) & mask, 1);
    inv as usize
}

impl KeyGenerator {
    /// Create a key generator for the given parameters.
    pub fn new(par: &Arc<HpbfvParameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Generate a fresh secret key.
    pub fn gen_secret_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<SecretKey> {
        SecretKey::random(&self.par, rng)
    }

    /// Generate a fresh key pair over Q, with a uniformly random a-part.
    pub fn gen_key_pair<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(SecretKey, PublicKey)> {
        let sk = self.gen_secret_key(rng)?;
        let s = sk.as_poly(self.par.ctx_q(), Representation::NttMontgomery)?;

        let a = Poly::random(self.par.ctx_q(), Representation::NttMontgomery, rng);
        let e = Poly::small(
            self.par.ctx_q(),
            Representation::NttMontgomery,
            self.par.sigma(),
            self.par.gaussian_bound(),
            rng,
        )?;
        let mut b = e;
        b -= &(&a * s.as_ref());
        let pk = PublicKey::new(self.par.clone(), b, a);
        Ok((sk, pk))
    }

    /// Generate switching keys for the requested column rotations.
    ///
    /// The key for the Galois element g encrypts s under the permuted secret
    /// s(x^(g^-1)), so that a ciphertext can be key switched before the
    /// permutation is applied.
    pub fn gen_rotation_keys<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        rotations: &[usize],
        rng: &mut R,
    ) -> Result<RotationKeySet> {
        let payload = sk.as_poly(self.par.ctx_qp(), Representation::NttMontgomery)?;
        let mut keys = HashMap::new();
        for k in rotations {
            if *k == 0 {
                continue;
            }
            let g = self.par.galois_element_for_column_rotation(*k);
            let g_inv = inv_mod_pow2(g, 2 * self.par.degree());
            let exponent = SubstitutionExponent::new(self.par.ctx_qp(), g_inv)
                .map_err(Error::MathError)?;
            let mut permuted = sk
                .as_poly(self.par.ctx_qp(), Representation::PowerBasis)?
                .substitute(&exponent)?;
            permuted.change_representation(Representation::NttMontgomery);
            let swk =
                GadgetCiphertext::random_switching_key(&self.par, &permuted, &payload, rng)?;
            keys.insert(g, swk);
        }
        Ok(RotationKeySet { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::{inv_mod_pow2, KeyGenerator};
    use crate::hpbfv::{HpbfvParameters, HEMI};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn pow2_inverse() {
        for m in [16usize, 4096, 16384] {
            for g in (1..50).step_by(2) {
                let inv = inv_mod_pow2(g, m);
                assert_eq!((g * inv) % m, 1);
            }
        }
    }

    #[test]
    fn key_pair() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let keygen = KeyGenerator::new(&par);
        let (sk1, pk1) = keygen.gen_key_pair(&mut rng)?;
        let (sk2, pk2) = keygen.gen_key_pair(&mut rng)?;
        assert_ne!(sk1, sk2);
        assert_ne!(pk1, pk2);
        assert_eq!(pk1.b().ctx(), par.ctx_q());
        Ok(())
    }

    #[test]
    fn rotation_keys() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let keygen = KeyGenerator::new(&par);
        let sk = keygen.gen_secret_key(&mut rng)?;
        let rtks = keygen.gen_rotation_keys(&sk, &[0, 1, 3], &mut rng)?;
        assert!(rtks
            .get_rotation_key(par.galois_element_for_column_rotation(1))
            .is_some());
        assert!(rtks
            .get_rotation_key(par.galois_element_for_column_rotation(3))
            .is_some());
        assert!(rtks
            .get_rotation_key(par.galois_element_for_column_rotation(2))
            .is_none());
        Ok(())
    }
}
