//! Distributed decryption: per-party shares with flooding noise, and joint
//! combination.

use crate::hpbfv::{
    Ciphertext, Decoder, HpbfvParameters, Message, Plaintext, SecretKey,
};
use crate::{Error, Result};
use itertools::izip;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use rand::{CryptoRng, RngCore};
use spdz_math::rq::Representation;
use std::sync::Arc;

/// A party's share in a distributed decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistDecShare {
    pub(crate) poly: spdz_math::rq::Poly,
}

impl DistDecShare {
    /// The underlying share polynomial.
    pub fn poly(&self) -> &spdz_math::rq::Poly {
        &self.poly
    }

    /// Blend an encoded mask into the share, in the ring domain. The SOHO
    /// resharing adds Delta * s here so that the joint decryption recovers
    /// the masked message.
    pub fn add_mask(&mut self, mask: &Plaintext) {
        self.poly += &mask.poly;
    }
}

/// Distributed decryptor holding one party's secret key share.
pub struct DistributedDecryptor {
    par: Arc<HpbfvParameters>,
    sk: SecretKey,
    decoder: Decoder,
}

impl DistributedDecryptor {
    /// Create a distributed decryptor for a party.
    pub fn new(par: &Arc<HpbfvParameters>, sk: &SecretKey) -> Self {
        Self {
            par: par.clone(),
            sk: sk.clone(),
            decoder: Decoder::new(par),
        }
    }

    /// Compute this party's decryption share c1 * s_i plus flooding noise of
    /// the given bit size.
    ///
    /// For every coefficient, a single masked integer of `noise_bits` bits
    /// is drawn and lifted into every RNS row.
    pub fn partial_decrypt<R: RngCore + CryptoRng>(
        &self,
        ct: &Ciphertext,
        noise_bits: usize,
        rng: &mut R,
    ) -> Result<DistDecShare> {
        if ct.degree() != 1 {
            return Err(Error::BadDegree {
                found: ct.degree(),
                expected: 1,
            });
        }
        let s = self.sk.as_poly(ct.c[1].ctx(), Representation::NttMontgomery)?;
        let mut share = ct.c[1].clone();
        share.change_representation(Representation::Ntt);
        share *= s.as_ref();
        share.change_representation(Representation::PowerBasis);

        let nbytes = noise_bits.div_ceil(8);
        let mask = (BigUint::one() << noise_bits) - 1u64;
        let mut buf = vec![0u8; nbytes];
        let moduli = share.ctx().moduli_operators().to_vec();
        let degree = self.par.degree();
        let mut coefficients = share.coefficients_mut();
        for j in 0..degree {
            rng.try_fill_bytes(&mut buf)
                .map_err(|e| Error::RngFailure(e.to_string()))?;
            let noise = BigUint::from_bytes_be(&buf) & &mask;
            izip!(coefficients.column_mut(j), moduli.iter()).for_each(|(c, qi)| {
                let reduced = (&noise % qi.modulus()).to_u64().unwrap();
                *c = qi.add(*c, reduced);
            });
        }
        drop(coefficients);

        Ok(DistDecShare { poly: share })
    }

    /// Combine decryption shares: sum them with c0 into the raw plaintext
    /// polynomial.
    pub fn joint_decrypt(
        &self,
        ct: &Ciphertext,
        shares: &[DistDecShare],
    ) -> Result<Plaintext> {
        if ct.degree() != 1 {
            return Err(Error::BadDegree {
                found: ct.degree(),
                expected: 1,
            });
        }
        if shares.is_empty() {
            return Err(Error::ProtocolStall(
                "no decryption shares received".to_string(),
            ));
        }
        let mut acc = ct.c[0].clone();
        for share in shares {
            if share.poly.ctx() != acc.ctx() {
                return Err(Error::LevelMismatch);
            }
            acc += &share.poly;
        }
        Ok(Plaintext::new(self.par.clone(), acc))
    }

    /// Combine decryption shares and decode the message.
    pub fn joint_decrypt_to_message(
        &self,
        ct: &Ciphertext,
        shares: &[DistDecShare],
    ) -> Result<Message> {
        let pt = self.joint_decrypt(ct, shares)?;
        self.decoder.decode(&pt)
    }
}

#[cfg(test)]
mod tests {
    use crate::hpbfv::{
        Ciphertext, DistributedDecryptor, Encryptor, HpbfvParameters, Message,
        PartialKeyGenerator, HEMI,
    };
    use crate::Error;
    use rand::thread_rng;
    use std::error::Error as StdError;

    #[test]
    fn partial_decrypt_requires_degree_one() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let kgen = PartialKeyGenerator::new(&par, &[0u8; 32]);
        let sk = kgen.gen_secret_key(&mut rng)?;
        let ddec = DistributedDecryptor::new(&par, &sk);

        let ct = Ciphertext::zero(&par, 2);
        let e = ddec.partial_decrypt(&ct, 40, &mut rng);
        assert!(matches!(e, Err(Error::BadDegree { found: 2, .. })));
        Ok(())
    }

    #[test]
    fn two_party_decryption() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let crs = [3u8; 32];

        let kgen1 = PartialKeyGenerator::new(&par, &crs);
        let kgen2 = PartialKeyGenerator::new(&par, &crs);
        let (sk1, pk1, rlk1) = kgen1.gen_keys(&mut rng)?;
        let (sk2, pk2, rlk2) = kgen2.gen_keys(&mut rng)?;
        let (jpk, _) = kgen1.aggregate_keys(&[pk1, pk2], &[rlk1, rlk2])?;

        let enc = Encryptor::new(&par, &jpk)?;
        let ddec1 = DistributedDecryptor::new(&par, &sk1);
        let ddec2 = DistributedDecryptor::new(&par, &sk2);

        let msg = Message::random(&par, &mut rng)?;
        let ct = enc.encrypt_msg(&msg, &mut rng)?;

        let sh1 = ddec1.partial_decrypt(&ct, 60, &mut rng)?;
        let sh2 = ddec2.partial_decrypt(&ct, 60, &mut rng)?;
        let decrypted = ddec1.joint_decrypt_to_message(&ct, &[sh1, sh2])?;
        assert_eq!(decrypted, msg);
        Ok(())
    }
}
