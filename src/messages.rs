//! Outbound protocol messages sent to the hub chain.
//!
//! The message kinds form a closed sum; the runner serializes them for
//! the hub transport. Semantic content only; the wire encoding is owned
//! by the transport layer.

use crate::{Gammas, PairingBackend, observe::Address, scheme::EpochSecretKeyShare};

/// A message to the hub chain, as emitted by the Decider.
pub enum Message<B: PairingBackend> {
    /// Registers the keyper's validator and encryption public keys.
    CheckIn {
        validator_public_key: Vec<u8>,
        encryption_public_key: Vec<u8>,
    },
    /// A vote for a batch config observed on the main chain.
    BatchConfig {
        start_batch_index: u64,
        keypers: Vec<Address>,
        threshold: u64,
        config_contract_address: Address,
        config_index: u64,
        started: bool,
        validators_updated: bool,
    },
    /// The dealer's public polynomial commitment.
    PolyCommitment { eon: u64, gammas: Gammas<B> },
    /// Encrypted private evaluations; the i-th ciphertext is addressed
    /// to the i-th receiver.
    PolyEval {
        eon: u64,
        receivers: Vec<Address>,
        encrypted_evals: Vec<Vec<u8>>,
    },
    /// Accusations against dealers that failed to deal correctly.
    Accusation { eon: u64, accused: Vec<Address> },
    /// Public answers to accusations; the i-th eval answers the i-th
    /// accuser.
    Apology {
        eon: u64,
        accusers: Vec<Address>,
        poly_evals: Vec<B::Scalar>,
    },
    /// A vote to start a new eon at the given batch index.
    EonStartVote { start_batch_index: u64 },
    /// This keyper's share of an epoch secret key.
    EpochSecretKeyShare {
        eon: u64,
        epoch: u64,
        share: EpochSecretKeyShare<B>,
    },
}

impl<B: PairingBackend> Message<B> {
    /// Short kind tag, used in action descriptions and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::CheckIn { .. } => "check-in",
            Message::BatchConfig { .. } => "batch-config",
            Message::PolyCommitment { .. } => "poly-commitment",
            Message::PolyEval { .. } => "poly-eval",
            Message::Accusation { .. } => "accusation",
            Message::Apology { .. } => "apology",
            Message::EonStartVote { .. } => "eon-start-vote",
            Message::EpochSecretKeyShare { .. } => "epoch-secret-key-share",
        }
    }
}

impl<B: PairingBackend> Clone for Message<B> {
    fn clone(&self) -> Self {
        match self {
            Message::CheckIn {
                validator_public_key,
                encryption_public_key,
            } => Message::CheckIn {
                validator_public_key: validator_public_key.clone(),
                encryption_public_key: encryption_public_key.clone(),
            },
            Message::BatchConfig {
                start_batch_index,
                keypers,
                threshold,
                config_contract_address,
                config_index,
                started,
                validators_updated,
            } => Message::BatchConfig {
                start_batch_index: *start_batch_index,
                keypers: keypers.clone(),
                threshold: *threshold,
                config_contract_address: *config_contract_address,
                config_index: *config_index,
                started: *started,
                validators_updated: *validators_updated,
            },
            Message::PolyCommitment { eon, gammas } => Message::PolyCommitment {
                eon: *eon,
                gammas: gammas.clone(),
            },
            Message::PolyEval {
                eon,
                receivers,
                encrypted_evals,
            } => Message::PolyEval {
                eon: *eon,
                receivers: receivers.clone(),
                encrypted_evals: encrypted_evals.clone(),
            },
            Message::Accusation { eon, accused } => Message::Accusation {
                eon: *eon,
                accused: accused.clone(),
            },
            Message::Apology {
                eon,
                accusers,
                poly_evals,
            } => Message::Apology {
                eon: *eon,
                accusers: accusers.clone(),
                poly_evals: poly_evals.clone(),
            },
            Message::EonStartVote { start_batch_index } => Message::EonStartVote {
                start_batch_index: *start_batch_index,
            },
            Message::EpochSecretKeyShare { eon, epoch, share } => Message::EpochSecretKeyShare {
                eon: *eon,
                epoch: *epoch,
                share: *share,
            },
        }
    }
}

impl<B: PairingBackend> std::fmt::Debug for Message<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message").field("kind", &self.kind()).finish_non_exhaustive()
    }
}

impl<B: PairingBackend> PartialEq for Message<B> {
    fn eq(&self, other: &Self) -> bool {
        use Message::*;
        match (self, other) {
            (
                CheckIn {
                    validator_public_key: a1,
                    encryption_public_key: a2,
                },
                CheckIn {
                    validator_public_key: b1,
                    encryption_public_key: b2,
                },
            ) => a1 == b1 && a2 == b2,
            (
                BatchConfig {
                    start_batch_index: a1,
                    keypers: a2,
                    threshold: a3,
                    config_contract_address: a4,
                    config_index: a5,
                    started: a6,
                    validators_updated: a7,
                },
                BatchConfig {
                    start_batch_index: b1,
                    keypers: b2,
                    threshold: b3,
                    config_contract_address: b4,
                    config_index: b5,
                    started: b6,
                    validators_updated: b7,
                },
            ) => {
                a1 == b1 && a2 == b2 && a3 == b3 && a4 == b4 && a5 == b5 && a6 == b6 && a7 == b7
            }
            (
                PolyCommitment { eon: a1, gammas: a2 },
                PolyCommitment { eon: b1, gammas: b2 },
            ) => a1 == b1 && a2 == b2,
            (
                PolyEval {
                    eon: a1,
                    receivers: a2,
                    encrypted_evals: a3,
                },
                PolyEval {
                    eon: b1,
                    receivers: b2,
                    encrypted_evals: b3,
                },
            ) => a1 == b1 && a2 == b2 && a3 == b3,
            (
                Accusation { eon: a1, accused: a2 },
                Accusation { eon: b1, accused: b2 },
            ) => a1 == b1 && a2 == b2,
            (
                Apology {
                    eon: a1,
                    accusers: a2,
                    poly_evals: a3,
                },
                Apology {
                    eon: b1,
                    accusers: b2,
                    poly_evals: b3,
                },
            ) => a1 == b1 && a2 == b2 && a3 == b3,
            (
                EonStartVote { start_batch_index: a1 },
                EonStartVote { start_batch_index: b1 },
            ) => a1 == b1,
            (
                EpochSecretKeyShare {
                    eon: a1,
                    epoch: a2,
                    share: a3,
                },
                EpochSecretKeyShare {
                    eon: b1,
                    epoch: b2,
                    share: b3,
                },
            ) => a1 == b1 && a2 == b2 && a3 == b3,
            _ => false,
        }
    }
}

impl<B: PairingBackend> Eq for Message<B> {}
