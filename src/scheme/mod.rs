//! Eon and epoch key material and the epoch-keyed hybrid encryption
//! scheme.
//!
//! An **eon** is the period during which one distributed key is valid.
//! The key generation protocol gives every keyper an [`EonSecretKeyShare`]
//! and publishes the combined [`EonPublicKey`]. Within an eon, every
//! **epoch** (batch) has its own identifier point and its own decryption
//! key: keypers publish [`EpochSecretKeyShare`]s, and any threshold subset
//! combines into the [`EpochSecretKey`] that opens ciphertexts encrypted
//! to `(eon public key, epoch id)`.
//!
//! [`keys`] holds the key types and the compute/verify operations;
//! [`ciphertext`] holds [`Sigma`], [`EncryptedMessage`] and the hybrid
//! encrypt/decrypt pair.

mod ciphertext;
mod keys;

pub use ciphertext::*;
pub use keys::*;
