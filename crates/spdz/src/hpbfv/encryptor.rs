//! Public-key encryption.

use crate::hpbfv::{Ciphertext, Encoder, HpbfvParameters, Message, Plaintext, PublicKey};
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use spdz_math::rq::{Poly, Representation};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Encryptor under a public key.
pub struct Encryptor {
    par: Arc<HpbfvParameters>,
    b: Poly,
    a: Poly,
    encoder: Encoder,
}

impl Encryptor {
    /// Create an encryptor under the given public key.
    ///
    /// Keys over Q x P (multiparty keys) are restricted to their Q part.
    pub fn new(par: &Arc<HpbfvParameters>, pk: &PublicKey) -> Result<Self> {
        let (b, a) = if pk.b.ctx() == par.ctx_q() {
            (pk.b.clone(), pk.a.clone())
        } else {
            (pk.b.restrict(par.ctx_q())?, pk.a.restrict(par.ctx_q())?)
        };
        if b.ctx() != par.ctx_q() {
            return Err(Error::LevelMismatch);
        }
        Ok(Self {
            par: par.clone(),
            b,
            a,
            encoder: Encoder::new(par),
        })
    }

    /// Encrypt a plaintext: (b * u + e0 + Delta * m, a * u + e1).
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &Plaintext,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if pt.par != self.par {
            return Err(Error::OperandError("Incompatible parameters".to_string()));
        }
        let ctx = self.par.ctx_q();
        let u = Zeroizing::new(Poly::ternary(
            ctx,
            Representation::Ntt,
            self.par.hamming_weight(),
            rng,
        )?);
        let e0 = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.sigma(),
            self.par.gaussian_bound(),
            rng,
        )?);
        let e1 = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.sigma(),
            self.par.gaussian_bound(),
            rng,
        )?);

        let mut m = pt.poly.clone();
        m.change_representation(Representation::Ntt);

        let mut c0 = &self.b * u.as_ref();
        c0 += e0.as_ref();
        c0 += &m;
        let mut c1 = &self.a * u.as_ref();
        c1 += e1.as_ref();

        c0.change_representation(Representation::PowerBasis);
        c1.change_representation(Representation::PowerBasis);
        Ciphertext::new(vec![c0, c1], &self.par)
    }

    /// Encode and encrypt a message.
    pub fn encrypt_msg<R: RngCore + CryptoRng>(
        &self,
        msg: &Message,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let pt = self.encoder.encode(msg)?;
        self.encrypt(&pt, rng)
    }
}
