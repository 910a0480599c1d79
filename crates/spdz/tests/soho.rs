//! Multiparty scenarios over the joint-key (SOHO) protocol.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spdz::hpbfv::{
    Ciphertext, DistDecShare, DistributedDecryptor, Encryptor, HpbfvParameters, MEvaluator,
    Message, PartialKeyGenerator, PublicKey, RelinearizationKey, SecretKey, HPN13D10T128, SOHO,
};
use spdz::protocols::SohoParty;
use num_bigint::BigUint;
use std::error::Error;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

const NOISE_BITS: usize = 80;

struct Bench {
    kgen: PartialKeyGenerator,
    sks: Vec<SecretKey>,
    ppks: Vec<PublicKey>,
    prlks: Vec<RelinearizationKey>,
    enc: Encryptor,
    eval: MEvaluator,
    ddecs: Vec<DistributedDecryptor>,
    jpk: PublicKey,
    jrlk: RelinearizationKey,
}

/// Key setup for n parties with per-party PRNGs seeded 0..n and an all-zero
/// CRS.
fn bench(par: &Arc<HpbfvParameters>, n_parties: usize) -> Result<Bench, Box<dyn Error>> {
    let crs = [0u8; 32];
    let kgen = PartialKeyGenerator::new(par, &crs);

    let mut sks = Vec::new();
    let mut ppks = Vec::new();
    let mut prlks = Vec::new();
    let mut ddecs = Vec::new();
    for i in 0..n_parties {
        let mut rng = ChaCha8Rng::seed_from_u64(i as u64);
        let sk = kgen.gen_secret_key(&mut rng)?;
        let (ppk, prlk) = kgen.gen_partial_keys(&sk, &mut rng)?;
        ddecs.push(DistributedDecryptor::new(par, &sk));
        sks.push(sk);
        ppks.push(ppk);
        prlks.push(prlk);
    }
    let (jpk, jrlk) = kgen.aggregate_keys(&ppks, &prlks)?;

    Ok(Bench {
        kgen,
        sks,
        ppks,
        prlks,
        enc: Encryptor::new(par, &jpk)?,
        eval: MEvaluator::new(par),
        ddecs,
        jpk,
        jrlk,
    })
}

fn joint_decrypt(bench: &Bench, ct: &Ciphertext) -> Result<Message, Box<dyn Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(0xdec);
    let shares = bench
        .ddecs
        .iter()
        .map(|d| d.partial_decrypt(ct, NOISE_BITS, &mut rng))
        .collect::<spdz::Result<Vec<DistDecShare>>>()?;
    Ok(bench.ddecs[0].joint_decrypt_to_message(ct, &shares)?)
}

#[test]
fn joint_key_operations() -> Result<(), Box<dyn Error>> {
    let par = HpbfvParameters::from_literal(&HPN13D10T128)?;
    let bench = bench(&par, 3)?;
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let a = Message::random(&par, &mut rng)?;
    let b = Message::random(&par, &mut rng)?;
    let ct_a = bench.enc.encrypt_msg(&a, &mut rng)?;
    let ct_b = bench.enc.encrypt_msg(&b, &mut rng)?;

    // An encryption under the joint key decrypts from the parties' shares.
    assert_eq!(joint_decrypt(&bench, &ct_a)?, a);
    assert_eq!(joint_decrypt(&bench, &ct_b)?, b);

    // Homomorphic addition.
    let ct_sum = bench.eval.add_new(&ct_a, &ct_b)?;
    assert_eq!(joint_decrypt(&bench, &ct_sum)?, a.add(&b));

    // Multiplication against the joint relinearization key.
    let cc = bench.eval.mul_and_relin_new(&ct_a, &ct_b, &bench.jrlk)?;
    assert_eq!(cc.degree(), 1);
    assert_eq!(joint_decrypt(&bench, &cc)?, a.mul(&b));

    Ok(())
}

#[test]
fn reshare_produces_additive_sharing() -> Result<(), Box<dyn Error>> {
    let par = HpbfvParameters::from_literal(&HPN13D10T128)?;
    let crs = [0u8; 32];
    let n_parties = 3;

    let mut parties = Vec::new();
    for id in 0..n_parties {
        let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
        parties.push(SohoParty::new(id, &par, &crs, &mut rng)?);
    }
    let ppks: Vec<PublicKey> = parties.iter().map(|p| p.ppk().clone()).collect();
    let prlks: Vec<RelinearizationKey> = parties.iter().map(|p| p.prlk().clone()).collect();
    for party in parties.iter_mut() {
        party.setup(&ppks, &prlks)?;
    }

    // Each party samples and encrypts a value; the aggregate decrypts to
    // the sum.
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut values = Vec::new();
    let mut cts = Vec::new();
    for party in parties.iter() {
        let (v, ct) = party.sample_uniform_mod_t_and_encrypt(&mut rng)?;
        values.push(v);
        cts.push(ct);
    }
    let sum_ct = parties[0].aggregate(&cts)?;
    let expected_sum = values[1..].iter().fold(values[0].clone(), |acc, v| acc.add(v));

    // Reshare the aggregate: the outputs form an additive sharing of it.
    let mut masks = Vec::new();
    let mut shares = Vec::new();
    for party in parties.iter() {
        let (mask, share) = party.reshare_init(&sum_ct, NOISE_BITS, &mut rng)?;
        masks.push(mask);
        shares.push(share);
    }
    let mut total: Option<Message> = None;
    for (party, mask) in parties.iter().zip(masks.iter()) {
        let out = party.reshare_finalize(&sum_ct, &shares, mask)?;
        total = Some(match total {
            None => out,
            Some(acc) => acc.add(&out),
        });
    }
    assert_eq!(total.unwrap(), expected_sum);

    Ok(())
}

#[test]
fn soho_triple_protocol() -> Result<(), Box<dyn Error>> {
    let par = HpbfvParameters::from_literal(&HPN13D10T128)?;
    let crs = [0u8; 32];
    let n_parties = 3;

    // Per-party inboxes for the three broadcast phases.
    let mut key_txs = Vec::new();
    let mut key_rxs = Vec::new();
    let mut ct_txs = Vec::new();
    let mut ct_rxs = Vec::new();
    let mut share_txs = Vec::new();
    let mut share_rxs = Vec::new();
    for _ in 0..n_parties {
        let (tx, rx) = mpsc::channel::<(usize, PublicKey, RelinearizationKey)>();
        key_txs.push(tx);
        key_rxs.push(rx);
        let (tx, rx) = mpsc::channel::<(usize, Ciphertext, Ciphertext)>();
        ct_txs.push(tx);
        ct_rxs.push(rx);
        let (tx, rx) = mpsc::channel::<(usize, DistDecShare)>();
        share_txs.push(tx);
        share_rxs.push(rx);
    }

    let mut handles = Vec::new();
    for id in (0..n_parties).rev() {
        let par = par.clone();
        let key_txs = key_txs.clone();
        let ct_txs = ct_txs.clone();
        let share_txs = share_txs.clone();
        let key_rx = key_rxs.pop().unwrap();
        let ct_rx = ct_rxs.pop().unwrap();
        let share_rx = share_rxs.pop().unwrap();
        handles.push(thread::spawn(move || -> spdz::Result<SohoParty> {
            let mut rng = ChaCha8Rng::seed_from_u64(id as u64);

            // Round 0: key generation and exchange.
            let mut party = SohoParty::new(id, &par, &crs, &mut rng)?;
            for tx in &key_txs {
                tx.send((id, party.ppk().clone(), party.prlk().clone())).unwrap();
            }
            let mut ppks: Vec<Option<PublicKey>> = (0..n_parties).map(|_| None).collect();
            let mut prlks: Vec<Option<RelinearizationKey>> =
                (0..n_parties).map(|_| None).collect();
            for _ in 0..n_parties {
                let (sender, ppk, prlk) = key_rx.recv().unwrap();
                ppks[sender] = Some(ppk);
                prlks[sender] = Some(prlk);
            }
            let ppks: Vec<PublicKey> = ppks.into_iter().map(Option::unwrap).collect();
            let prlks: Vec<RelinearizationKey> =
                prlks.into_iter().map(Option::unwrap).collect();
            party.setup(&ppks, &prlks)?;

            // Round 1: sample and exchange the encrypted factors.
            let (a, b, ca, cb) = party.buffer_triples_round_one(&mut rng)?;
            for tx in &ct_txs {
                tx.send((id, ca.clone(), cb.clone())).unwrap();
            }
            let mut cas: Vec<Option<Ciphertext>> = (0..n_parties).map(|_| None).collect();
            let mut cbs: Vec<Option<Ciphertext>> = (0..n_parties).map(|_| None).collect();
            for _ in 0..n_parties {
                let (sender, ca, cb) = ct_rx.recv().unwrap();
                cas[sender] = Some(ca);
                cbs[sender] = Some(cb);
            }
            let cas: Vec<Ciphertext> = cas.into_iter().map(Option::unwrap).collect();
            let cbs: Vec<Ciphertext> = cbs.into_iter().map(Option::unwrap).collect();

            // Round 2: multiply and exchange the decryption shares.
            let (mask, cc, share) =
                party.buffer_triples_round_two(&cas, &cbs, NOISE_BITS, &mut rng)?;
            for tx in &share_txs {
                tx.send((id, share.clone())).unwrap();
            }
            let mut shares: Vec<Option<DistDecShare>> =
                (0..n_parties).map(|_| None).collect();
            for _ in 0..n_parties {
                let (sender, share) = share_rx.recv().unwrap();
                shares[sender] = Some(share);
            }
            let shares: Vec<DistDecShare> = shares.into_iter().map(Option::unwrap).collect();

            // Round 3: finalize.
            party.finalize_triple(&a, &b, &cc, &mask, &shares)?;
            Ok(party)
        }));
    }

    let mut parties: Vec<SohoParty> = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<spdz::Result<Vec<_>>>()?;
    parties.sort_by_key(|p| p.id());

    // Sum of shares is a multiplication triple, for every slot.
    let t = par.t();
    assert_eq!(parties[0].triples().len(), par.slots());
    for i in 0..parties[0].triples().len() {
        let mut a_sum = BigUint::default();
        let mut b_sum = BigUint::default();
        let mut c_sum = BigUint::default();
        for party in &parties {
            let triple = &party.triples()[i];
            a_sum += &triple.a;
            b_sum += &triple.b;
            c_sum += &triple.c;
        }
        assert_eq!((&a_sum * &b_sum) % t, c_sum % t, "triple {i}");
    }

    Ok(())
}

#[test]
fn setup_scales_to_a_hundred_parties() -> Result<(), Box<dyn Error>> {
    let par = HpbfvParameters::from_literal(&SOHO)?;
    let n_parties = 100;
    let bench = bench(&par, n_parties)?;

    // The b-parts are independent, the a-parts are the shared CRS
    // expansion.
    for i in 0..n_parties {
        for j in 0..n_parties {
            if i == j {
                continue;
            }
            assert_ne!(bench.ppks[i].b(), bench.ppks[j].b());
            assert_eq!(bench.ppks[i].a(), bench.ppks[j].a());
        }
    }
    assert_eq!(bench.prlks.len(), n_parties);

    // The joint public key is, up to the accumulated noise, the key that
    // the sum of the secret keys would generate.
    let jpk = &bench.jpk;
    let jsk = SecretKey::aggregate(&bench.sks)?;
    let mut rng = ChaCha8Rng::seed_from_u64(0x10061);
    let (pk_joint, _) = bench.kgen.gen_partial_keys(&jsk, &mut rng)?;
    assert_eq!(jpk.a(), pk_joint.a());

    let mut diff = jpk.b() - pk_joint.b();
    diff.change_representation(spdz_math::rq::Representation::PowerBasis);
    let bound = (6.0 * par.sigma() * n_parties as f64) as i64;
    let q0 = par.ctx_qp().moduli_operators()[0].clone();
    for coeff in diff.coefficients().row(0) {
        let centered = q0.center(*coeff);
        assert!(
            centered.abs() <= bound,
            "coefficient {centered} exceeds the noise bound {bound}"
        );
    }

    Ok(())
}
