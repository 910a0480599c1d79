//! The HEMI triple-generation protocol: pairwise encryptions between every
//! pair of parties, with no joint key material.
//!
//! For the channel between parties i and j, party i generates a dedicated
//! key pair and keeps the secret key; its factor a_i travels to j encrypted
//! under that key, comes back multiplied by b_j and blinded by a fresh mask,
//! and is decrypted by i alone.

use crate::hpbfv::{
    Ciphertext, Decryptor, Encoder, Encryptor, HpbfvParameters, KeyGenerator, MEvaluator,
    Message, PublicKey,
};
use crate::protocols::Triple;
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// A party of the HEMI protocol.
pub struct HemiParty {
    id: usize,
    par: Arc<HpbfvParameters>,
    n_parties: usize,

    keygen: KeyGenerator,

    ecd: Encoder,
    eval: MEvaluator,
    /// Encryptors under this party's own channel keys, used to send to each
    /// peer.
    enc_selfs: Vec<Option<Encryptor>>,
    /// Encryptors under each peer's channel key, used to send masked
    /// responses back.
    encs: Vec<Option<Encryptor>>,
    /// Decryptors under this party's own channel keys; decs\[j\] opens what
    /// comes back from peer j.
    decs: Vec<Option<Decryptor>>,

    triples: Vec<Triple>,
}

impl HemiParty {
    /// Create a party of an n-party HEMI protocol.
    pub fn new(id: usize, par: &Arc<HpbfvParameters>, n_parties: usize) -> Self {
        Self {
            id,
            par: par.clone(),
            n_parties,
            keygen: KeyGenerator::new(par),
            ecd: Encoder::new(par),
            eval: MEvaluator::new(par),
            enc_selfs: (0..n_parties).map(|_| None).collect(),
            encs: (0..n_parties).map(|_| None).collect(),
            decs: (0..n_parties).map(|_| None).collect(),
            triples: Vec::new(),
        }
    }

    /// The party identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The triples accumulated so far.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Generate one key pair per peer; the returned public keys are
    /// broadcast (entry j is the key peer j will use to respond to this
    /// party).
    pub fn init_setup<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<Option<PublicKey>>> {
        let mut pks = (0..self.n_parties).map(|_| None).collect::<Vec<_>>();
        for j in 0..self.n_parties {
            if j == self.id {
                continue;
            }
            let (sk, pk) = self.keygen.gen_key_pair(rng)?;
            self.enc_selfs[j] = Some(Encryptor::new(&self.par, &pk)?);
            self.decs[j] = Some(Decryptor::new(&self.par, &sk));
            pks[j] = Some(pk);
        }
        Ok(pks)
    }

    /// Store the peers' channel keys; entry j is the key party j generated
    /// for this party.
    pub fn finalize_setup(&mut self, pks: &[Option<PublicKey>]) -> Result<()> {
        if pks.len() != self.n_parties {
            return Err(Error::ProtocolStall(format!(
                "expected {} peer keys, got {}",
                self.n_parties,
                pks.len()
            )));
        }
        for (j, pk) in pks.iter().enumerate() {
            if j == self.id {
                continue;
            }
            let pk = pk.as_ref().ok_or_else(|| {
                Error::ProtocolStall(format!("missing channel key from party {j}"))
            })?;
            self.encs[j] = Some(Encryptor::new(&self.par, pk)?);
        }
        Ok(())
    }

    /// Sample this party's factors a and b, uniform modulo t.
    pub fn sample_a_and_b<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Message, Message)> {
        Ok((
            Message::random(&self.par, rng)?,
            Message::random(&self.par, rng)?,
        ))
    }

    /// Pairwise round one: encrypt the factor a under this party's own
    /// channel key for `dst` and send the ciphertext to `dst`.
    pub fn pairwise_round_one<R: RngCore + CryptoRng>(
        &self,
        a: &Message,
        dst: usize,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let enc = self.enc_selfs[dst].as_ref().ok_or_else(|| {
            Error::ProtocolStall(format!("no channel key for party {dst}"))
        })?;
        enc.encrypt_msg(a, rng)
    }

    /// Pairwise round two: on the ciphertext received from `src`, multiply
    /// by this party's factor b and subtract a fresh uniform mask encrypted
    /// under src's channel key. The mask is kept locally, the ciphertext
    /// goes back to `src`.
    pub fn pairwise_round_two<R: RngCore + CryptoRng>(
        &self,
        ct_in: &Ciphertext,
        b: &Message,
        src: usize,
        rng: &mut R,
    ) -> Result<(Message, Ciphertext)> {
        let enc = self.encs[src].as_ref().ok_or_else(|| {
            Error::ProtocolStall(format!("no channel key from party {src}"))
        })?;
        let mask = Message::random(&self.par, rng)?;
        let enc_mask = enc.encrypt_msg(&mask, rng)?;

        let pt_b = self.ecd.encode(b)?;
        let product = self.eval.plaintext_mul_new(ct_in, &pt_b)?;
        let response = self.eval.sub_new(&product, &enc_mask)?;
        Ok((mask, response))
    }

    /// Finalize: decrypt the responses that came back, and assemble this
    /// party's share of c = a * b as a_i * b_i plus the decrypted
    /// cross-terms plus the masks kept in round two.
    pub fn finalize(
        &mut self,
        a: &Message,
        b: &Message,
        masks: &[Option<Message>],
        responses: &[Option<Ciphertext>],
    ) -> Result<()> {
        if masks.len() != self.n_parties || responses.len() != self.n_parties {
            return Err(Error::ProtocolStall(format!(
                "expected {} pairwise messages, got {} masks and {} responses",
                self.n_parties,
                masks.len(),
                responses.len()
            )));
        }
        let mut share = a.mul(b);
        for j in 0..self.n_parties {
            if j == self.id {
                continue;
            }
            let response = responses[j].as_ref().ok_or_else(|| {
                Error::ProtocolStall(format!("missing response from party {j}"))
            })?;
            let mask = masks[j].as_ref().ok_or_else(|| {
                Error::ProtocolStall(format!("missing mask for party {j}"))
            })?;
            let dec = self.decs[j].as_ref().ok_or_else(|| {
                Error::ProtocolStall(format!("no channel key for party {j}"))
            })?;
            let decrypted = dec.decrypt_to_msg(response)?;
            share = share.add(&decrypted).add(mask);
        }

        for k in 0..self.par.slots() {
            self.triples.push(Triple {
                a: a.values()[k].clone(),
                b: b.values()[k].clone(),
                c: share.values()[k].clone(),
            });
        }
        Ok(())
    }
}
