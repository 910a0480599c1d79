//! Multiparty partial key generation tied to a common reference string.
//!
//! Every party expands the 32-byte CRS into two grids A and U of uniform
//! polynomials over Q x P (A first, row-major, then U; the order is part of
//! the protocol). A party's partial public key shares its a-part with every
//! other party, and the partial relinearization keys compose so that the
//! aggregated pair (BD, V) supports the two-step gadget relinearization:
//! the blind r introduced by BD is cancelled by the second product against
//! V.

use crate::hpbfv::keys::gadget::encrypt_zero_qp;
use crate::hpbfv::{GadgetCiphertext, HpbfvParameters, PublicKey, SecretKey};
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use spdz_math::rq::{Poly, Representation};
use std::sync::Arc;

/// Relinearization key: two gadget ciphertexts.
///
/// BD holds, cell-wise, (-A * s + e, -A * r + s * g + e'); V holds
/// (-U * s - r * g + e'', U). In an aggregated key the second components of
/// V equal the CRS polynomials U, which is verified at aggregation time.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RelinearizationKey {
    pub(crate) bd: GadgetCiphertext,
    pub(crate) v: GadgetCiphertext,
}

impl RelinearizationKey {
    /// The BD gadget ciphertext.
    pub fn bd(&self) -> &GadgetCiphertext {
        &self.bd
    }

    /// The V gadget ciphertext.
    pub fn v(&self) -> &GadgetCiphertext {
        &self.v
    }
}

/// Per-party key generator bound to a common reference string.
pub struct PartialKeyGenerator {
    par: Arc<HpbfvParameters>,
    a: Vec<Vec<Poly>>,
    u: Vec<Vec<Poly>>,
}

impl PartialKeyGenerator {
    /// Create a key generator from the parameters and a 32-byte common
    /// reference string.
    ///
    /// Each party must call this with the same CRS; the sampled grids A and
    /// U are then identical across parties.
    pub fn new(par: &Arc<HpbfvParameters>, crs: &[u8; 32]) -> Self {
        let mut stream = Poly::random_stream(
            par.ctx_qp().clone(),
            Representation::NttMontgomery,
            *crs,
        );
        let mut grid = || -> Vec<Vec<Poly>> {
            (0..par.decomp_rns())
                .map(|_| (0..par.decomp_pw2()).map(|_| stream.next().unwrap()).collect())
                .collect()
        };
        let a = grid();
        let u = grid();
        Self {
            par: par.clone(),
            a,
            u,
        }
    }

    /// The CRS expansion used for the BD components.
    pub fn crs_a(&self, i: usize, j: usize) -> &Poly {
        &self.a[i][j]
    }

    /// The CRS expansion used for the V components.
    pub fn crs_u(&self, i: usize, j: usize) -> &Poly {
        &self.u[i][j]
    }

    /// Sample a ternary secret key with the prescribed Hamming weight.
    pub fn gen_secret_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<SecretKey> {
        SecretKey::random(&self.par, rng)
    }

    /// Generate the partial public key and partial relinearization key of a
    /// party.
    pub fn gen_partial_keys<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        rng: &mut R,
    ) -> Result<(PublicKey, RelinearizationKey)> {
        let par = &self.par;
        let s = sk.as_poly(par.ctx_qp(), Representation::NttMontgomery)?;

        // Fresh blind r, shaped like a secret key.
        let r = SecretKey::random(par, rng)?;
        let r_poly = r.as_poly(par.ctx_qp(), Representation::NttMontgomery)?;

        // d = -A * r + s * g + e'.
        let mut bd = GadgetCiphertext::zero(par);
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                bd.cells[i][j][0] = encrypt_zero_qp(par, &self.a[i][j], &r_poly, rng)?;
            }
        }
        bd.add_gadget_payload(&s);

        // b = -A * s + e; the d-part moves to the second component.
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                bd.cells[i][j][1] = bd.cells[i][j][0].clone();
                bd.cells[i][j][0] = encrypt_zero_qp(par, &self.a[i][j], &s, rng)?;
            }
        }

        // v = -U * s - r * g + e''.
        let mut v = GadgetCiphertext::zero(par);
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                v.cells[i][j][1] = self.u[i][j].clone();
                v.cells[i][j][0] = encrypt_zero_qp(par, &self.u[i][j], &s, rng)?;
            }
        }
        let neg_r = -r_poly.as_ref();
        v.add_gadget_payload(&neg_r);

        let pk = PublicKey::new(
            par.clone(),
            bd.cells[0][0][0].clone(),
            self.a[0][0].clone(),
        );
        Ok((pk, RelinearizationKey { bd, v }))
    }

    /// Generate a full key triple (sk, partial pk, partial rlk).
    pub fn gen_keys<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(SecretKey, PublicKey, RelinearizationKey)> {
        let sk = self.gen_secret_key(rng)?;
        let (pk, rlk) = self.gen_partial_keys(&sk, rng)?;
        Ok((sk, pk, rlk))
    }

    /// Aggregate the parties' partial keys into the joint public key and the
    /// joint relinearization key.
    ///
    /// The a-part of every public key and the second V components of every
    /// relinearization key must match the local CRS expansion; a mismatch is
    /// a fatal [`Error::CrsDivergence`].
    pub fn aggregate_keys(
        &self,
        pks: &[PublicKey],
        rlks: &[RelinearizationKey],
    ) -> Result<(PublicKey, RelinearizationKey)> {
        if pks.is_empty() || pks.len() != rlks.len() {
            return Err(Error::ProtocolStall(format!(
                "expected matching key shares, got {} public keys and {} relinearization keys",
                pks.len(),
                rlks.len()
            )));
        }
        let par = &self.par;

        let mut jrlk = rlks[0].clone();
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                for rlk in rlks.iter().skip(1) {
                    if rlk.v.cells[i][j][1] != self.u[i][j] {
                        return Err(Error::CrsDivergence("relinearization key"));
                    }
                    jrlk.bd.cells[i][j][0] += &rlk.bd.cells[i][j][0];
                    jrlk.bd.cells[i][j][1] += &rlk.bd.cells[i][j][1];
                    jrlk.v.cells[i][j][0] += &rlk.v.cells[i][j][0];
                }
            }
        }

        let mut jb = pks[0].b.clone();
        for pk in pks.iter().skip(1) {
            if pk.b.ctx() != jb.ctx() {
                return Err(Error::LevelMismatch);
            }
            if pk.a != self.a[0][0] {
                return Err(Error::CrsDivergence("public key"));
            }
            jb += &pk.b;
        }
        let jpk = PublicKey::new(par.clone(), jb, self.a[0][0].clone());

        Ok((jpk, jrlk))
    }
}

#[cfg(test)]
mod tests {
    use super::PartialKeyGenerator;
    use crate::hpbfv::{HpbfvParameters, HEMI};
    use crate::Error;
    use rand::{thread_rng, Rng};
    use std::error::Error as StdError;

    #[test]
    fn crs_determinism() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let mut crs = [0u8; 32];
        rng.fill(&mut crs);

        let kgen1 = PartialKeyGenerator::new(&par, &crs);
        let kgen2 = PartialKeyGenerator::new(&par, &crs);
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                assert_eq!(kgen1.crs_a(i, j), kgen2.crs_a(i, j));
                assert_eq!(kgen1.crs_u(i, j), kgen2.crs_u(i, j));
                assert_ne!(kgen1.crs_a(i, j), kgen1.crs_u(i, j));
            }
        }

        let mut other = crs;
        other[0] ^= 1;
        let kgen3 = PartialKeyGenerator::new(&par, &other);
        assert_ne!(kgen1.crs_a(0, 0), kgen3.crs_a(0, 0));
        Ok(())
    }

    #[test]
    fn partial_keys_share_the_crs() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let crs = [7u8; 32];

        let kgen1 = PartialKeyGenerator::new(&par, &crs);
        let kgen2 = PartialKeyGenerator::new(&par, &crs);
        let (_, pk1, rlk1) = kgen1.gen_keys(&mut rng)?;
        let (_, pk2, rlk2) = kgen2.gen_keys(&mut rng)?;

        assert_eq!(pk1.a(), pk2.a());
        assert_ne!(pk1.b(), pk2.b());
        for i in 0..par.decomp_rns() {
            for j in 0..par.decomp_pw2() {
                assert_eq!(rlk1.v().cell(i, j)[1], rlk2.v().cell(i, j)[1]);
            }
        }

        let (jpk, _) = kgen1.aggregate_keys(&[pk1.clone(), pk2.clone()], &[rlk1, rlk2])?;
        assert_eq!(jpk.a(), pk1.a());
        Ok(())
    }

    #[test]
    fn aggregation_rejects_tampered_keys() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let crs = [1u8; 32];
        let other_crs = [2u8; 32];

        let kgen = PartialKeyGenerator::new(&par, &crs);
        let stranger = PartialKeyGenerator::new(&par, &other_crs);

        let (_, pk1, rlk1) = kgen.gen_keys(&mut rng)?;
        let (_, pk2, rlk2) = stranger.gen_keys(&mut rng)?;

        let e = kgen.aggregate_keys(&[pk1.clone(), pk2], &[rlk1.clone(), rlk2]);
        assert!(matches!(e, Err(Error::CrsDivergence(_))));

        let e = kgen.aggregate_keys(&[pk1], &[]);
        assert!(matches!(e, Err(Error::ProtocolStall(_))));
        Ok(())
    }
}
