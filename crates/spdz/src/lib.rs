#![crate_name = "spdz"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! A multiparty BFV-style homomorphic encryption scheme with a large
//! plaintext modulus, and the SPDZ-style preprocessing protocols built on
//! top of it.
//!
//! The scheme works over R = Z\[x\]/(x^N + 1) with a polynomial plaintext
//! modulus b(x) = x^s - beta; messages are vectors of s big integers modulo
//! t = beta^(N/s) + 1. The [`hpbfv`] module provides the evaluator together
//! with partial key generation from a common reference string, key
//! aggregation, and distributed decryption; the [`protocols`] module
//! implements the SOHO and HEMI multiplication-triple front-ends.

mod errors;

pub mod hpbfv;
pub mod protocols;

pub use errors::{Error, ParametersError, Result};
