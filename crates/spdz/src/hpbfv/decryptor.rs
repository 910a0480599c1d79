//! Single-key decryption.

use crate::hpbfv::{Ciphertext, Decoder, HpbfvParameters, Message, Plaintext, SecretKey};
use crate::{Error, Result};
use spdz_math::rq::Representation;
use std::sync::Arc;

/// Decryptor under a secret key.
pub struct Decryptor {
    par: Arc<HpbfvParameters>,
    sk: SecretKey,
    decoder: Decoder,
}

impl Decryptor {
    /// Create a decryptor under the given secret key.
    pub fn new(par: &Arc<HpbfvParameters>, sk: &SecretKey) -> Self {
        Self {
            par: par.clone(),
            sk: sk.clone(),
            decoder: Decoder::new(par),
        }
    }

    /// Decrypt a ciphertext of any degree into the raw plaintext polynomial
    /// c0 + c1 * s + c2 * s^2 + ...
    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        if ct.par != self.par {
            return Err(Error::OperandError("Incompatible parameters".to_string()));
        }
        let ctx = ct.c[0].ctx();
        let s = self.sk.as_poly(ctx, Representation::NttMontgomery)?;
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
        Ok(Plaintext::new(self.par.clone(), w))
    }

    /// Decrypt a ciphertext and decode the message.
    pub fn decrypt_to_msg(&self, ct: &Ciphertext) -> Result<Message> {
        let pt = self.decrypt(ct)?;
        self.decoder.decode(&pt)
    }
}
