//! The multiparty high-precision BFV encryption scheme.
//!
//! Ciphertexts live over an RNS modulus Q; the plaintext modulus is the
//! polynomial b(x) = x^slots - beta, so that messages are vectors of `slots`
//! big integers modulo t = beta^(N/slots) + 1. Multiparty key material is
//! derived from a 32-byte common reference string.

mod ciphertext;
mod decryptor;
mod dist_dec;
mod encoding;
mod encryptor;
mod evaluator;
mod keys;
mod message;
mod parameters;
mod partial_keygen;
mod plaintext;

pub use ciphertext::Ciphertext;
pub use decryptor::Decryptor;
pub use dist_dec::{DistDecShare, DistributedDecryptor};
pub use encoding::{Decoder, Encoder};
pub use encryptor::Encryptor;
pub use evaluator::MEvaluator;
pub use keys::{
    GadgetCiphertext, KeyGenerator, PublicKey, RotationKeySet, SecretKey,
};
pub use message::Message;
pub use parameters::{
    HpbfvParameters, HpbfvParametersBuilder, HpbfvParametersLiteral, HEMI, HPN13D10T128, SOHO,
};
pub use partial_keygen::{PartialKeyGenerator, RelinearizationKey};
pub use plaintext::Plaintext;
