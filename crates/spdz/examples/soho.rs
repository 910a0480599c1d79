// Three parties generating multiplication triples with the SOHO protocol.

use console::style;
use rand::{thread_rng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spdz::hpbfv::{HpbfvParameters, SOHO};
use spdz::protocols::SohoParty;
use std::{env, error::Error, process::exit};

fn print_notice_and_exit(error: Option<String>) {
    println!(
        "{} SOHO triple generation with spdz",
        style("  overview:").magenta().bold()
    );
    println!(
        "{} soho [-h] [--help] [--num_parties=<value>]",
        style("     usage:").magenta().bold()
    );
    println!(
        "{} {} must be at least 2",
        style("constraints:").magenta().bold(),
        style("num_parties").blue(),
    );
    if let Some(error) = error {
        println!("{} {}", style("     error:").red().bold(), error);
    }
    exit(0);
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut num_parties = 3usize;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print_notice_and_exit(None)
        } else if let Some(value) = arg.strip_prefix("--num_parties=") {
            match value.parse::<usize>() {
                Ok(n) if n >= 2 => num_parties = n,
                _ => print_notice_and_exit(Some(
                    "num_parties must be an integer >= 2".to_string(),
                )),
            }
        } else {
            print_notice_and_exit(Some(format!("unrecognized argument: {arg}")))
        }
    }

    let par = HpbfvParameters::from_literal(&SOHO)?;
    let mut crs = [0u8; 32];
    thread_rng().fill(&mut crs);

    println!(
        "{} N = {}, {} slots, t of {} bits, {} parties",
        style("parameters:").magenta().bold(),
        par.degree(),
        par.slots(),
        par.t().bits(),
        num_parties,
    );

    // Round 0: every party generates its partial keys; the broadcasts are
    // collected and aggregated.
    let mut rngs: Vec<ChaCha8Rng> = (0..num_parties)
        .map(|i| ChaCha8Rng::seed_from_u64(i as u64))
        .collect();
    let mut parties = Vec::new();
    for (id, rng) in rngs.iter_mut().enumerate() {
        parties.push(SohoParty::new(id, &par, &crs, rng)?);
    }
    let ppks: Vec<_> = parties.iter().map(|p| p.ppk().clone()).collect();
    let prlks: Vec<_> = parties.iter().map(|p| p.prlk().clone()).collect();
    for party in parties.iter_mut() {
        party.setup(&ppks, &prlks)?;
    }
    println!("{} joint keys aggregated", style("   round 0:").magenta().bold());

    // Round 1: sample and encrypt the factors.
    let mut kept = Vec::new();
    let mut cas = Vec::new();
    let mut cbs = Vec::new();
    for (party, rng) in parties.iter_mut().zip(rngs.iter_mut()) {
        let (a, b, ca, cb) = party.buffer_triples_round_one(rng)?;
        kept.push((a, b));
        cas.push(ca);
        cbs.push(cb);
    }
    println!("{} factors encrypted", style("   round 1:").magenta().bold());

    // Round 2: multiply and exchange decryption shares.
    let mut masked = Vec::new();
    let mut shares = Vec::new();
    for (party, rng) in parties.iter_mut().zip(rngs.iter_mut()) {
        let (mask, cc, share) = party.buffer_triples_round_two(&cas, &cbs, 80, rng)?;
        masked.push((mask, cc));
        shares.push(share);
    }
    println!("{} products reshared", style("   round 2:").magenta().bold());

    // Round 3: finalize the triples.
    for (i, party) in parties.iter_mut().enumerate() {
        let (a, b) = &kept[i];
        let (mask, cc) = &masked[i];
        party.finalize_triple(a, b, cc, mask, &shares)?;
    }

    println!(
        "{} {} triples per party",
        style("  finished:").magenta().bold(),
        parties[0].triples().len(),
    );
    Ok(())
}
