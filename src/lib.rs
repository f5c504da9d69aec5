//! # TEKS: Threshold Epoch Key Sharing
//!
//! TEKS is a threshold cryptography engine for a distributed key
//! generation (DKG) and epoch-keyed encryption protocol run by a set of
//! cooperating participants ("keypers").
//!
//! ## Overview
//!
//! A group of keypers runs a verifiable-secret-sharing DKG over a
//! pairing-friendly curve. The run produces, per keyper, a share of a
//! group-wide **eon** secret key together with the combined eon public
//! key. During the eon, every **epoch** (batch) gets its own decryption
//! key: keypers publish epoch secret key shares, and any `t` of them
//! combine into the epoch secret key that opens ciphertexts encrypted to
//! `(eon public key, epoch id)`.
//!
//! Both protocols advance in lock-step with an externally observed
//! consensus chain: the [`Decider`](decider::Decider) reads the observed
//! event log once per step and emits protocol messages and contract
//! actions for an external runner.
//!
//! ## Architecture
//!
//! - **[`arith`]**: scalar/point/pairing abstractions with the arkworks
//!   BLS12-381 backend, secret polynomials, commitment vectors, Lagrange
//!   interpolation
//! - **[`scheme`]**: eon/epoch key material and the epoch-keyed hybrid
//!   encryption scheme
//! - **[`dkg`]**: the four-phase [`PureDkg`](dkg::PureDkg) state machine
//!   and the per-eon [`EpochKeyGenerator`](dkg::EpochKeyGenerator)
//! - **[`observe`]**: the observed hub chain and main chain state read by
//!   the Decider
//! - **[`decider`]**: per-step orchestration and the
//!   [`Action`](decider::Action) vocabulary
//! - **[`messages`]**: the outbound protocol message sum type
//! - **[`sym_enc`]** / **[`peer_enc`]**: context-bound BLAKE3 keystream
//!   encryption and the authenticated keyper-to-keyper cipher for
//!   private evaluations
//!
//! ## Quick example
//!
//! An honest single-dealer setup and one epoch-keyed round trip:
//!
//! ```rust
//! use rand::thread_rng;
//! use teks::scheme::{
//!     Sigma, compute_eon_public_key, compute_eon_secret_key_share, compute_epoch_id,
//!     compute_epoch_secret_key_share, encrypt,
//! };
//! use teks::{FieldElement, Fr, PairingEngine, Polynomial};
//!
//! let mut rng = thread_rng();
//!
//! // One dealer: its constant term is the eon secret.
//! let poly = Polynomial::<PairingEngine>::random(&mut rng, 1);
//! let gammas = [poly.gammas()];
//! let eon_public_key = compute_eon_public_key(&gammas);
//! let eon_secret = compute_eon_secret_key_share::<PairingEngine>(&[poly.evaluate(&Fr::zero())]);
//!
//! // Epoch 7 gets its own key.
//! let epoch_id = compute_epoch_id(7);
//! let epoch_secret_key =
//!     teks::scheme::EpochSecretKey(compute_epoch_secret_key_share(&eon_secret, &epoch_id).0);
//!
//! let sigma = Sigma::random(&mut rng);
//! let ciphertext = encrypt(b"batch contents", &eon_public_key, &epoch_id, &sigma);
//! assert_eq!(ciphertext.decrypt(&epoch_secret_key).unwrap(), b"batch contents");
//! ```
//!
//! The multi-party flow with its phase schedule, accusations, apologies
//! and observed event log runs through [`decider::Decider::decide`]; see
//! the integration tests for complete scenarios.
//!
//! ## Feature flags
//!
//! - **`ark_bls12381`** (default): arkworks backend for BLS12-381
//! - **`parallel`**: parallelize per-keyper public share computation
//!   with rayon

pub mod arith;
pub mod config;
pub mod decider;
pub mod dkg;
pub mod errors;
pub mod messages;
pub mod observe;
pub mod peer_enc;
pub mod scheme;
pub mod sym_enc;

mod serde_impl;

pub use arith::*;
pub use config::KeyperConfig;
pub use errors::*;
pub use peer_enc::{EciesCipher, PeerCipher};
pub use sym_enc::{SymmetricEncryption, XofStreamCipher};
