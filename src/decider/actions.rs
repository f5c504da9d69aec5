use std::fmt;

use crate::{PairingBackend, messages::Message};

/// Authorization payload for appealing an accusation at the keyper
/// slasher. Produced by an [`AppealAuthorizer`](super::AppealAuthorizer);
/// its exact signing scheme is owned by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppealAuthorization {
    pub half_step: u64,
    pub signature: Vec<u8>,
}

/// An outbound effect decided on by the Decider, executed later by the
/// runner.
///
/// Actions are value types: each carries everything its execution needs,
/// so the runner may copy them across threads and retry them freely. The
/// runner must submit the actions of one step in order.
pub enum Action<B: PairingBackend> {
    /// Send a protocol message to the hub chain.
    SendHubMessage {
        description: String,
        msg: Message<B>,
    },
    /// Instruct the executor contract to execute a cipher batch.
    ExecuteCipherBatch {
        half_step: u64,
        cipher_batch_hash: [u8; 32],
        transactions: Vec<Vec<u8>>,
        keyper_index: u64,
    },
    /// Instruct the executor contract to execute a plain batch.
    ExecutePlainBatch {
        half_step: u64,
        transactions: Vec<Vec<u8>>,
    },
    /// Instruct the executor contract to skip a cipher batch.
    SkipCipherBatch { half_step: u64 },
    /// Accuse the executor of a half step at the keyper slasher.
    Accuse {
        half_step: u64,
        /// Index of the accuser, not of the accused executor.
        keyper_index: u64,
    },
    /// Counter an earlier invalid accusation.
    Appeal { authorization: AppealAuthorization },
}

impl<B: PairingBackend> fmt::Display for Action<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SendHubMessage { description, .. } => {
                write!(f, "-> hub: {description}")
            }
            Action::ExecuteCipherBatch { half_step, .. } => {
                write!(f, "-> executor contract: execute cipher half step {half_step}")
            }
            Action::ExecutePlainBatch { half_step, .. } => {
                write!(f, "-> executor contract: execute plain half step {half_step}")
            }
            Action::SkipCipherBatch { half_step } => {
                write!(f, "-> executor contract: skip cipher half step {half_step}")
            }
            Action::Accuse { half_step, .. } => {
                write!(f, "-> keyper slasher: accuse for half step {half_step}")
            }
            Action::Appeal { authorization } => {
                write!(
                    f,
                    "-> keyper slasher: appeal for half step {}",
                    authorization.half_step
                )
            }
        }
    }
}

impl<B: PairingBackend> fmt::Debug for Action<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<B: PairingBackend> Clone for Action<B> {
    fn clone(&self) -> Self {
        match self {
            Action::SendHubMessage { description, msg } => Action::SendHubMessage {
                description: description.clone(),
                msg: msg.clone(),
            },
            Action::ExecuteCipherBatch {
                half_step,
                cipher_batch_hash,
                transactions,
                keyper_index,
            } => Action::ExecuteCipherBatch {
                half_step: *half_step,
                cipher_batch_hash: *cipher_batch_hash,
                transactions: transactions.clone(),
                keyper_index: *keyper_index,
            },
            Action::ExecutePlainBatch {
                half_step,
                transactions,
            } => Action::ExecutePlainBatch {
                half_step: *half_step,
                transactions: transactions.clone(),
            },
            Action::SkipCipherBatch { half_step } => Action::SkipCipherBatch {
                half_step: *half_step,
            },
            Action::Accuse {
                half_step,
                keyper_index,
            } => Action::Accuse {
                half_step: *half_step,
                keyper_index: *keyper_index,
            },
            Action::Appeal { authorization } => Action::Appeal {
                authorization: authorization.clone(),
            },
        }
    }
}

impl<B: PairingBackend> PartialEq for Action<B> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Action::SendHubMessage {
                    description: a1,
                    msg: a2,
                },
                Action::SendHubMessage {
                    description: b1,
                    msg: b2,
                },
            ) => a1 == b1 && a2 == b2,
            (
                Action::ExecuteCipherBatch {
                    half_step: a1,
                    cipher_batch_hash: a2,
                    transactions: a3,
                    keyper_index: a4,
                },
                Action::ExecuteCipherBatch {
                    half_step: b1,
                    cipher_batch_hash: b2,
                    transactions: b3,
                    keyper_index: b4,
                },
            ) => a1 == b1 && a2 == b2 && a3 == b3 && a4 == b4,
            (
                Action::ExecutePlainBatch {
                    half_step: a1,
                    transactions: a2,
                },
                Action::ExecutePlainBatch {
                    half_step: b1,
                    transactions: b2,
                },
            ) => a1 == b1 && a2 == b2,
            (
                Action::SkipCipherBatch { half_step: a1 },
                Action::SkipCipherBatch { half_step: b1 },
            ) => a1 == b1,
            (
                Action::Accuse {
                    half_step: a1,
                    keyper_index: a2,
                },
                Action::Accuse {
                    half_step: b1,
                    keyper_index: b2,
                },
            ) => a1 == b1 && a2 == b2,
            (Action::Appeal { authorization: a }, Action::Appeal { authorization: b }) => a == b,
            _ => false,
        }
    }
}

impl<B: PairingBackend> Eq for Action<B> {}
