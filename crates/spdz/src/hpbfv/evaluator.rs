//! The multi-party evaluator: linear operations, tensor-and-rescale
//! multiplication over the double basis (Q, QMul), relinearization against a
//! joint relinearization key, and column rotations.

use crate::hpbfv::{
    Ciphertext, HpbfvParameters, Plaintext, RelinearizationKey, RotationKeySet,
};
use crate::{Error, Result};
use spdz_math::rq::{Poly, Representation, SubstitutionExponent};
use std::sync::Arc;

/// Evaluator over ciphertexts under the joint key material.
pub struct MEvaluator {
    par: Arc<HpbfvParameters>,
}

impl MEvaluator {
    /// Create an evaluator for the given parameters.
    pub fn new(par: &Arc<HpbfvParameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Unwrap the operands of a binary operation and check that the receiver
    /// has a sufficiently large degree.
    fn check_binary(
        &self,
        degree0: usize,
        degree1: usize,
        receiver_degree: usize,
    ) -> Result<()> {
        if degree0 + degree1 == 0 {
            return Err(Error::OperandError(
                "operands cannot be both plaintexts".to_string(),
            ));
        }
        if receiver_degree < degree0.max(degree1) {
            return Err(Error::OperandError(
                "receiver operand degree is too small".to_string(),
            ));
        }
        Ok(())
    }

    fn check_contexts(&self, polys: &[&Poly]) -> Result<()> {
        for p in polys {
            if p.ctx() != self.par.ctx_q() {
                return Err(Error::LevelMismatch);
            }
        }
        Ok(())
    }

    /// Element-wise combination of two ciphertexts; positions beyond the
    /// degree of the smaller operand are copied (or negated, for
    /// subtraction) from the larger one.
    fn evaluate_binary(
        &self,
        op0: &Ciphertext,
        op1: &Ciphertext,
        ct_out: &mut Ciphertext,
        subtract: bool,
    ) -> Result<()> {
        self.check_binary(op0.degree(), op1.degree(), ct_out.degree())?;
        self.check_contexts(&[&op0.c[0], &op1.c[0]])?;

        let smallest = op0.degree().min(op1.degree());
        let largest = op0.degree().max(op1.degree());
        for i in 0..=smallest {
            ct_out.c[i] = if subtract {
                &op0.c[i] - &op1.c[i]
            } else {
                &op0.c[i] + &op1.c[i]
            };
        }
        for i in smallest + 1..=largest {
            let tail = if op0.degree() > op1.degree() {
                op0.c[i].clone()
            } else if subtract {
                -&op1.c[i]
            } else {
                op1.c[i].clone()
            };
            ct_out.c[i] = tail;
        }
        ct_out.truncate(largest + 1);
        Ok(())
    }

    /// Add op0 to op1 and return the result in ct_out.
    pub fn add(&self, op0: &Ciphertext, op1: &Ciphertext, ct_out: &mut Ciphertext) -> Result<()> {
        self.evaluate_binary(op0, op1, ct_out, false)
    }

    /// Add op0 to op1 and create a new ciphertext to store the result.
    pub fn add_new(&self, op0: &Ciphertext, op1: &Ciphertext) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, op0.degree().max(op1.degree()));
        self.add(op0, op1, &mut ct_out)?;
        Ok(ct_out)
    }

    /// Subtract op1 from op0 and return the result in ct_out.
    pub fn sub(&self, op0: &Ciphertext, op1: &Ciphertext, ct_out: &mut Ciphertext) -> Result<()> {
        self.evaluate_binary(op0, op1, ct_out, true)
    }

    /// Subtract op1 from op0 and create a new ciphertext to store the
    /// result.
    pub fn sub_new(&self, op0: &Ciphertext, op1: &Ciphertext) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, op0.degree().max(op1.degree()));
        self.sub(op0, op1, &mut ct_out)?;
        Ok(ct_out)
    }

    /// Negate a ciphertext into ct_out.
    pub fn neg(&self, ct: &Ciphertext, ct_out: &mut Ciphertext) -> Result<()> {
        if ct_out.degree() < ct.degree() {
            return Err(Error::OperandError(
                "receiver operand degree is too small".to_string(),
            ));
        }
        for i in 0..=ct.degree() {
            ct_out.c[i] = -&ct.c[i];
        }
        ct_out.truncate(ct.degree() + 1);
        Ok(())
    }

    /// Negate a ciphertext into a new ciphertext.
    pub fn neg_new(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, ct.degree());
        self.neg(ct, &mut ct_out)?;
        Ok(ct_out)
    }

    /// Add an encoded plaintext to a ciphertext.
    pub fn plaintext_add(
        &self,
        ct: &Ciphertext,
        pt: &Plaintext,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.check_binary(ct.degree(), pt.degree(), ct_out.degree())?;
        self.check_contexts(&[&ct.c[0], &pt.poly])?;
        ct_out.c[0] = &ct.c[0] + &pt.poly;
        for i in 1..=ct.degree() {
            ct_out.c[i] = ct.c[i].clone();
        }
        ct_out.truncate(ct.degree() + 1);
        Ok(())
    }

    /// Add an encoded plaintext to a ciphertext, into a new ciphertext.
    pub fn plaintext_add_new(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, ct.degree());
        self.plaintext_add(ct, pt, &mut ct_out)?;
        Ok(ct_out)
    }

    /// Rescale a polynomial from the double basis back to Q and apply the
    /// plaintext modulus polynomial: b(x) * round(z / QMul).
    fn rescale_to_q(&self, mut z: Poly) -> Result<Poly> {
        z.change_representation(Representation::PowerBasis);
        let rho = z.scale(&self.par.down_scaler_qmul)?;
        let shifted = rho.mul_monomial(self.par.slots())?;
        let scaled = &rho * self.par.beta();
        Ok(&shifted - &scaled)
    }

    /// Extend a degree-1 ciphertext into the double basis (Q, QMul), scaled
    /// by QMul/Q, for hoisted multiplication.
    pub fn rescale_qmul(&self, ct: &Ciphertext) -> Result<[Poly; 2]> {
        if ct.degree() != 1 {
            return Err(Error::BadDegree {
                found: ct.degree(),
                expected: 1,
            });
        }
        self.check_contexts(&[&ct.c[0]])?;
        let mut extended = [
            ct.c[0].scale(&self.par.extender_qmul)?,
            ct.c[1].scale(&self.par.extender_qmul)?,
        ];
        extended
            .iter_mut()
            .for_each(|p| p.change_representation(Representation::NttMontgomery));
        Ok(extended)
    }

    /// Lift a degree-1 ciphertext into the double basis without rescaling.
    fn lift_qmul(&self, ct: &Ciphertext) -> Result<[Poly; 2]> {
        let mut lifted = [
            ct.c[0].scale(&self.par.lifter_qmul)?,
            ct.c[1].scale(&self.par.lifter_qmul)?,
        ];
        lifted
            .iter_mut()
            .for_each(|p| p.change_representation(Representation::Ntt));
        Ok(lifted)
    }

    /// Tensor two degree-1 ciphertexts and rescale by b(x)/Q, producing a
    /// degree-2 ciphertext.
    fn tensor_and_rescale(
        &self,
        op0: &[Poly; 2],
        op1: &[Poly; 2],
    ) -> Result<Ciphertext> {
        let z0 = &op0[0] * &op1[0];
        let mut z1 = &op0[0] * &op1[1];
        z1 += &(&op0[1] * &op1[0]);
        let z2 = &op0[1] * &op1[1];

        let c = vec![
            self.rescale_to_q(z0)?,
            self.rescale_to_q(z1)?,
            self.rescale_to_q(z2)?,
        ];
        Ciphertext::new(c, &self.par)
    }

    /// Reduce a degree-2 ciphertext back to degree 1 with the double gadget
    /// product against (BD, V).
    fn relinearize(
        &self,
        ct: &Ciphertext,
        rlk: &RelinearizationKey,
    ) -> Result<Ciphertext> {
        debug_assert_eq!(ct.degree(), 2);
        // c2 against BD: a key switch whose output still carries the blind r.
        let (p0, p1) = rlk.bd.gadget_product(&ct.c[2])?;
        let mut c1 = &ct.c[1] + &p1;

        // The masked part against V cancels r.
        let (q0, q1) = rlk.v.gadget_product(&p0)?;
        let c0 = &ct.c[0] + &q0;
        c1 += &q1;

        Ciphertext::new(vec![c0, c1], &self.par)
    }

    /// Multiply two degree-1 ciphertexts and relinearize the result.
    pub fn mul_and_relin(
        &self,
        op0: &Ciphertext,
        op1: &Ciphertext,
        rlk: &RelinearizationKey,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        if ct_out.degree() < 1 {
            return Err(Error::OperandError(
                "receiver operand degree is too small".to_string(),
            ));
        }
        let extended = self.rescale_qmul(op0)?;
        if op1.degree() != 1 {
            return Err(Error::BadDegree {
                found: op1.degree(),
                expected: 1,
            });
        }
        let lifted = self.lift_qmul(op1)?;
        let tensored = self.tensor_and_rescale(&extended, &lifted)?;
        *ct_out = self.relinearize(&tensored, rlk)?;
        Ok(())
    }

    /// Multiply two degree-1 ciphertexts and relinearize, into a new
    /// ciphertext.
    pub fn mul_and_relin_new(
        &self,
        op0: &Ciphertext,
        op1: &Ciphertext,
        rlk: &RelinearizationKey,
    ) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, 1);
        self.mul_and_relin(op0, op1, rlk, &mut ct_out)?;
        Ok(ct_out)
    }

    /// Hoisted multiplication: op0 was pre-extended with
    /// [`MEvaluator::rescale_qmul`], saving the per-multiplication rescale.
    pub fn mul_and_relin_hoisted(
        &self,
        op0: &[Poly; 2],
        op1: &Ciphertext,
        rlk: &RelinearizationKey,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        if ct_out.degree() < 1 {
            return Err(Error::OperandError(
                "receiver operand degree is too small".to_string(),
            ));
        }
        if op1.degree() != 1 {
            return Err(Error::BadDegree {
                found: op1.degree(),
                expected: 1,
            });
        }
        let lifted = self.lift_qmul(op1)?;
        let tensored = self.tensor_and_rescale(op0, &lifted)?;
        *ct_out = self.relinearize(&tensored, rlk)?;
        Ok(())
    }

    /// Multiply a ciphertext by an encoded plaintext; only the degree-0 and
    /// degree-1 cross terms exist.
    pub fn plaintext_mul(
        &self,
        ct: &Ciphertext,
        pt: &Plaintext,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.check_binary(ct.degree(), pt.degree(), ct_out.degree())?;
        if ct.degree() != 1 {
            return Err(Error::BadDegree {
                found: ct.degree(),
                expected: 1,
            });
        }
        self.check_contexts(&[&ct.c[0], &pt.poly])?;

        let extended = self.rescale_qmul(ct)?;
        let mut lifted = pt.poly.scale(&self.par.lifter_qmul)?;
        lifted.change_representation(Representation::Ntt);

        let z0 = &extended[0] * &lifted;
        let z1 = &extended[1] * &lifted;
        ct_out.c[0] = self.rescale_to_q(z0)?;
        ct_out.c[1] = self.rescale_to_q(z1)?;
        ct_out.truncate(2);
        Ok(())
    }

    /// Multiply a ciphertext by an encoded plaintext, into a new ciphertext.
    pub fn plaintext_mul_new(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, 1);
        self.plaintext_mul(ct, pt, &mut ct_out)?;
        Ok(ct_out)
    }

    /// Rotate the columns of a degree-1 ciphertext by k positions to the
    /// left. The rotation-key set must hold the key for the matching Galois
    /// element.
    pub fn rotate_columns(
        &self,
        ct: &Ciphertext,
        rtks: &RotationKeySet,
        k: usize,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        if ct.degree() != 1 || ct_out.degree() != 1 {
            return Err(Error::BadDegree {
                found: ct.degree().max(ct_out.degree()),
                expected: 1,
            });
        }
        if k == 0 {
            *ct_out = ct.clone();
            return Ok(());
        }
        let g = self.par.galois_element_for_column_rotation(k);
        let swk = rtks
            .get_rotation_key(g)
            .ok_or(Error::MissingRotationKey(g))?;

        let (mut p0, p1) = swk.gadget_product(&ct.c[1])?;
        p0 += &ct.c[0];

        let exponent = SubstitutionExponent::new(self.par.ctx_q(), g)?;
        ct_out.c[0] = p0.substitute(&exponent)?;
        ct_out.c[1] = p1.substitute(&exponent)?;
        Ok(())
    }

    /// Rotate the columns of a ciphertext into a new ciphertext.
    pub fn rotate_columns_new(
        &self,
        ct: &Ciphertext,
        rtks: &RotationKeySet,
        k: usize,
    ) -> Result<Ciphertext> {
        let mut ct_out = Ciphertext::zero(&self.par, 1);
        self.rotate_columns(ct, rtks, k, &mut ct_out)?;
        Ok(ct_out)
    }
}

#[cfg(test)]
mod tests {
    use crate::hpbfv::{
        Ciphertext, Decryptor, Encoder, Encryptor, HpbfvParameters, KeyGenerator, MEvaluator,
        Message, PartialKeyGenerator, SecretKey, HEMI,
    };
    use crate::Error;
    use rand::thread_rng;
    use std::error::Error as StdError;
    use std::sync::Arc;

    struct TestContext {
        par: Arc<HpbfvParameters>,
        sk: SecretKey,
        enc: Encryptor,
        dec: Decryptor,
        ecd: Encoder,
        eval: MEvaluator,
        rlk: crate::hpbfv::RelinearizationKey,
    }

    /// A single party playing the whole multiparty key generation.
    fn single_party_context() -> Result<TestContext, Box<dyn StdError>> {
        let mut rng = thread_rng();
        let par = HpbfvParameters::from_literal(&HEMI)?;
        let kgen = PartialKeyGenerator::new(&par, &[5u8; 32]);
        let (sk, pk, rlk) = kgen.gen_keys(&mut rng)?;
        let (jpk, jrlk) = kgen.aggregate_keys(&[pk], &[rlk])?;
        Ok(TestContext {
            enc: Encryptor::new(&par, &jpk)?,
            dec: Decryptor::new(&par, &sk),
            ecd: Encoder::new(&par),
            eval: MEvaluator::new(&par),
            rlk: jrlk,
            par,
            sk,
        })
    }

    #[test]
    fn additive_ops() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let ctx = single_party_context()?;

        let m1 = Message::random(&ctx.par, &mut rng)?;
        let m2 = Message::random(&ctx.par, &mut rng)?;
        let ct1 = ctx.enc.encrypt_msg(&m1, &mut rng)?;
        let ct2 = ctx.enc.encrypt_msg(&m2, &mut rng)?;

        let sum = ctx.eval.add_new(&ct1, &ct2)?;
        assert_eq!(ctx.dec.decrypt_to_msg(&sum)?, m1.add(&m2));

        let diff = ctx.eval.sub_new(&ct1, &ct2)?;
        assert_eq!(ctx.dec.decrypt_to_msg(&diff)?, m1.sub(&m2));

        let negated = ctx.eval.neg_new(&ct1)?;
        assert_eq!(ctx.dec.decrypt_to_msg(&negated)?, m1.neg());

        let pt2 = ctx.ecd.encode(&m2)?;
        let psum = ctx.eval.plaintext_add_new(&ct1, &pt2)?;
        assert_eq!(ctx.dec.decrypt_to_msg(&psum)?, m1.add(&m2));

        Ok(())
    }

    #[test]
    fn multiplication() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let ctx = single_party_context()?;

        let m1 = Message::random(&ctx.par, &mut rng)?;
        let m2 = Message::random(&ctx.par, &mut rng)?;
        let ct1 = ctx.enc.encrypt_msg(&m1, &mut rng)?;
        let ct2 = ctx.enc.encrypt_msg(&m2, &mut rng)?;
        let expected = m1.mul(&m2);

        // Plaintext multiplication.
        let pt2 = ctx.ecd.encode(&m2)?;
        let pmul = ctx.eval.plaintext_mul_new(&ct1, &pt2)?;
        assert_eq!(pmul.degree(), 1);
        assert_eq!(ctx.dec.decrypt_to_msg(&pmul)?, expected);

        // Ciphertext multiplication with relinearization.
        let cmul = ctx.eval.mul_and_relin_new(&ct1, &ct2, &ctx.rlk)?;
        assert_eq!(cmul.degree(), 1);
        println!("Noise: {}", ctx.sk.measure_noise(&cmul)?);
        assert_eq!(ctx.dec.decrypt_to_msg(&cmul)?, expected);

        // The hoisted variant computes the same product.
        let hoisted = ctx.eval.rescale_qmul(&ct1)?;
        let mut hmul = Ciphertext::zero(&ctx.par, 1);
        ctx.eval
            .mul_and_relin_hoisted(&hoisted, &ct2, &ctx.rlk, &mut hmul)?;
        assert_eq!(ctx.dec.decrypt_to_msg(&hmul)?, expected);

        Ok(())
    }

    #[test]
    fn rotation() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let ctx = single_party_context()?;
        let keygen = KeyGenerator::new(&ctx.par);
        let rtks = keygen.gen_rotation_keys(&ctx.sk, &[1, 2], &mut rng)?;

        let msg = Message::random(&ctx.par, &mut rng)?;
        let ct = ctx.enc.encrypt_msg(&msg, &mut rng)?;

        for k in [1usize, 2] {
            let rotated = ctx.eval.rotate_columns_new(&ct, &rtks, k)?;
            let decrypted = ctx.dec.decrypt_to_msg(&rotated)?;
            let mut expected = msg.values().to_vec();
            expected.rotate_left(k);
            assert_eq!(decrypted.values(), &expected[..]);
        }

        // Rotation by 0 copies.
        let rotated = ctx.eval.rotate_columns_new(&ct, &rtks, 0)?;
        assert_eq!(rotated, ct);

        // Missing key.
        let e = ctx.eval.rotate_columns_new(&ct, &rtks, 3);
        assert!(matches!(e, Err(Error::MissingRotationKey(_))));

        Ok(())
    }
}
