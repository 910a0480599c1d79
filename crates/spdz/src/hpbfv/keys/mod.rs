//! Keys for the hpbfv encryption scheme.

pub(crate) mod gadget;
mod key_generator;
mod public_key;
mod secret_key;

pub use gadget::GadgetCiphertext;
pub use key_generator::{KeyGenerator, RotationKeySet};
pub use public_key::PublicKey;
pub use secret_key::SecretKey;
