#![crate_name = "spdz_math"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Mathematical layer of the spdz crates: arithmetic modulo word-sized
//! primes, number-theoretic transforms, residue number systems, and
//! polynomials in R_q = Z_q[x]/(x^N + 1).

mod errors;

pub mod ntt;
pub mod rns;
pub mod rq;
pub mod zq;

pub use errors::{Error, Result};
