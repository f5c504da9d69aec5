//! Error types for the crate.
//!
//! Two layers, matching the crate architecture: [`BackendError`] covers
//! faults raised by the curve backend (bad encodings, impossible math),
//! while [`Error`] is the protocol-facing type returned by the DKG, the
//! epoch key generator, the hybrid encryption scheme and the Decider.
//!
//! Every variant that can be produced by a peer's message is contained at
//! the handler boundary: the caller logs it and moves on, the step never
//! aborts. Only [`Error::StateInvariant`] signals a programmer bug.

use thiserror::Error;

use crate::dkg::Phase;

/// Errors bubbled up from the curve backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A point encoding that does not parse, is off-curve, outside the
    /// prime-order subgroup, or is the identity where the identity is not
    /// accepted.
    #[error("malformed point: {0}")]
    MalformedPoint(&'static str),
    #[error("serialization failure: {0}")]
    Serialization(&'static str),
    #[error("math error: {0}")]
    Math(&'static str),
}

/// Protocol-facing errors returned by handlers and key operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A commitment vector whose length does not match the threshold, or a
    /// polynomial combined with a commitment of a different degree.
    #[error("degree mismatch: expected {expected} commitment entries, got {actual}")]
    DegreeMismatch { expected: usize, actual: usize },

    /// A key share that fails verification against the sender's public
    /// key share or commitment.
    #[error("invalid key share from keyper {sender}")]
    BadShare { sender: u64 },

    #[error("decryption failed: {0}")]
    DecryptionFailure(&'static str),

    /// A message arriving outside the phase in which it is accepted.
    #[error("message for phase {expected} arrived in phase {current}")]
    WrongPhase { expected: Phase, current: Phase },

    /// A sender index outside the keyper set of the eon.
    #[error("sender {0} is not a member of the keyper set")]
    UnknownSender(u64),

    /// A key was requested before enough qualified dealers or shares were
    /// available.
    #[error("only {available} of the required {threshold} contributions available")]
    ThresholdNotMet { available: usize, threshold: usize },

    /// A condition that cannot be produced by peer input. Reaching this
    /// variant is a bug in the calling code.
    #[error("state invariant violated: {0}")]
    StateInvariant(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
