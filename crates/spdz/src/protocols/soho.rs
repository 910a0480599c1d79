//! The SOHO triple-generation protocol: sample, encrypt under the joint
//! key, aggregate, multiply homomorphically, and reshare through one
//! distributed decryption.

use crate::hpbfv::{
    Ciphertext, DistDecShare, DistributedDecryptor, Encoder, Encryptor, HpbfvParameters,
    MEvaluator, Message, PartialKeyGenerator, PublicKey, RelinearizationKey,
};
use crate::protocols::Triple;
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// A party of the SOHO protocol.
///
/// Lifecycle: construct with [`SohoParty::new`] (round 0 keygen), broadcast
/// the partial keys and call [`SohoParty::setup`] with everyone's; then for
/// every triple batch run [`SohoParty::buffer_triples_round_one`],
/// [`SohoParty::buffer_triples_round_two`] and
/// [`SohoParty::finalize_triple`], broadcasting the returned values between
/// rounds.
pub struct SohoParty {
    id: usize,
    par: Arc<HpbfvParameters>,

    keygen: PartialKeyGenerator,
    ppk: PublicKey,
    prlk: RelinearizationKey,
    jpk: Option<PublicKey>,
    jrlk: Option<RelinearizationKey>,

    ecd: Encoder,
    eval: MEvaluator,
    enc: Option<Encryptor>,
    ddec: DistributedDecryptor,

    triples: Vec<Triple>,
}

impl SohoParty {
    /// Create a party: expands the CRS and generates this party's partial
    /// keys.
    pub fn new<R: RngCore + CryptoRng>(
        id: usize,
        par: &Arc<HpbfvParameters>,
        crs: &[u8; 32],
        rng: &mut R,
    ) -> Result<Self> {
        let keygen = PartialKeyGenerator::new(par, crs);
        let (sk, ppk, prlk) = keygen.gen_keys(rng)?;
        let ddec = DistributedDecryptor::new(par, &sk);
        Ok(Self {
            id,
            par: par.clone(),
            keygen,
            ppk,
            prlk,
            jpk: None,
            jrlk: None,
            ecd: Encoder::new(par),
            eval: MEvaluator::new(par),
            enc: None,
            ddec,
            triples: Vec::new(),
        })
    }

    /// The party identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    /// This party's partial public key, to broadcast during round 0.
    pub fn ppk(&self) -> &PublicKey {
        &self.ppk
    }

    /// This party's partial relinearization key, to broadcast during
    /// round 0.
    pub fn prlk(&self) -> &RelinearizationKey {
        &self.prlk
    }

    /// The joint public key, available after [`SohoParty::setup`].
    pub fn jpk(&self) -> Option<&PublicKey> {
        self.jpk.as_ref()
    }

    /// The triples accumulated so far.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Aggregate everyone's partial keys into the joint key material and
    /// build the joint encryptor.
    pub fn setup(
        &mut self,
        ppks: &[PublicKey],
        prlks: &[RelinearizationKey],
    ) -> Result<()> {
        let (jpk, jrlk) = self.keygen.aggregate_keys(ppks, prlks)?;
        self.enc = Some(Encryptor::new(&self.par, &jpk)?);
        self.jpk = Some(jpk);
        self.jrlk = Some(jrlk);
        Ok(())
    }

    fn encryptor(&self) -> Result<&Encryptor> {
        self.enc.as_ref().ok_or_else(|| {
            Error::ProtocolStall("the setup round has not completed".to_string())
        })
    }

    /// Sample a message with slots uniformly random in \[0, t).
    pub fn sample_uniform_mod_t<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<Message> {
        Message::random(&self.par, rng)
    }

    /// Sample a uniform message and encrypt it under the joint key.
    pub fn sample_uniform_mod_t_and_encrypt<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Message, Ciphertext)> {
        let msg = self.sample_uniform_mod_t(rng)?;
        let ct = self.encryptor()?.encrypt_msg(&msg, rng)?;
        Ok((msg, ct))
    }

    /// Sum a batch of degree-1 ciphertexts.
    pub fn aggregate(&self, cts: &[Ciphertext]) -> Result<Ciphertext> {
        if cts.is_empty() {
            return Err(Error::ProtocolStall(
                "no ciphertexts received for aggregation".to_string(),
            ));
        }
        let mut sum = Ciphertext::zero(&self.par, 1);
        for ct in cts {
            sum = self.eval.add_new(&sum, ct)?;
        }
        Ok(sum)
    }

    /// Sum a batch of ciphertexts and add a further ciphertext.
    pub fn aggregate_and_add(
        &self,
        ct_in: &Ciphertext,
        cts: &[Ciphertext],
    ) -> Result<Ciphertext> {
        let sum = self.aggregate(cts)?;
        self.eval.add_new(ct_in, &sum)
    }

    /// Round 1: sample fresh uniform a and b and encrypt them under the
    /// joint key. The ciphertexts are broadcast to every party.
    pub fn buffer_triples_round_one<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<(Message, Message, Ciphertext, Ciphertext)> {
        let (a, ca) = self.sample_uniform_mod_t_and_encrypt(rng)?;
        let (b, cb) = self.sample_uniform_mod_t_and_encrypt(rng)?;
        Ok((a, b, ca, cb))
    }

    /// Round 2: aggregate everyone's encryptions, multiply the sums, and
    /// initiate the resharing. The returned share is broadcast; the mask
    /// and ciphertext are kept for the finalization.
    pub fn buffer_triples_round_two<R: RngCore + CryptoRng>(
        &mut self,
        cas: &[Ciphertext],
        cbs: &[Ciphertext],
        noise_bits: usize,
        rng: &mut R,
    ) -> Result<(Message, Ciphertext, DistDecShare)> {
        if cas.is_empty() || cas.len() != cbs.len() {
            return Err(Error::ProtocolStall(format!(
                "expected matching broadcasts, got {} and {} ciphertexts",
                cas.len(),
                cbs.len()
            )));
        }
        let sum_ca = self.aggregate(cas)?;
        let sum_cb = self.aggregate(cbs)?;

        let jrlk = self.jrlk.as_ref().ok_or_else(|| {
            Error::ProtocolStall("the setup round has not completed".to_string())
        })?;
        let cc = self.eval.mul_and_relin_new(&sum_ca, &sum_cb, jrlk)?;

        let (mask, share) = self.reshare_init(&cc, noise_bits, rng)?;
        Ok((mask, cc, share))
    }

    /// Start a resharing of the plaintext of cc: a decryption share with
    /// flooding noise, blinded by a fresh uniform mask in the ring domain.
    pub fn reshare_init<R: RngCore + CryptoRng>(
        &self,
        cc: &Ciphertext,
        noise_bits: usize,
        rng: &mut R,
    ) -> Result<(Message, DistDecShare)> {
        let mask = self.sample_uniform_mod_t(rng)?;
        let mut share = self.ddec.partial_decrypt(cc, noise_bits, rng)?;
        share.add_mask(&self.ecd.encode(&mask)?);
        Ok((mask, share))
    }

    /// Finish a resharing: party 0 decrypts the masked sum and removes its
    /// own mask, every other party contributes the negation of its mask.
    /// The outputs sum to the plaintext of cc modulo t.
    pub fn reshare_finalize(
        &self,
        cc: &Ciphertext,
        shares: &[DistDecShare],
        mask: &Message,
    ) -> Result<Message> {
        if self.id != 0 {
            return Ok(mask.neg());
        }
        let decrypted = self.ddec.joint_decrypt_to_message(cc, shares)?;
        Ok(decrypted.sub(mask))
    }

    /// Round 3: turn this batch into triples, one per slot.
    pub fn finalize_triple(
        &mut self,
        a: &Message,
        b: &Message,
        cc: &Ciphertext,
        mask: &Message,
        shares: &[DistDecShare],
    ) -> Result<()> {
        let c = self.reshare_finalize(cc, shares, mask)?;
        for k in 0..self.par.slots() {
            self.triples.push(Triple {
                a: a.values()[k].clone(),
                b: b.values()[k].clone(),
                c: c.values()[k].clone(),
            });
        }
        Ok(())
    }
}
