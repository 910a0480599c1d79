//! SPDZ-style preprocessing protocols: multiplication-triple generation.
//!
//! Two front-ends produce the same additively shared triples: [`SohoParty`]
//! uses a joint key and one distributed decryption per batch, while
//! [`HemiParty`] exchanges pairwise encryptions between every pair of
//! parties. Message transport is left to the caller; the protocol structs
//! only consume the collected broadcasts of each round.

mod hemi;
mod soho;

pub use hemi::HemiParty;
pub use soho::SohoParty;

use num_bigint::BigUint;

/// An additively shared multiplication triple: one party's share of
/// uniformly random values (a, b, c) with c = a * b modulo t.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    /// Share of the first factor.
    pub a: BigUint,
    /// Share of the second factor.
    pub b: BigUint,
    /// Share of the product.
    pub c: BigUint,
}
