//! Keyper evaluation points and Lagrange interpolation at zero.
//!
//! Keypers are numbered `0..n-1`; keyper k evaluates polynomials at
//! `x_k = k + 1`. Zero is never an evaluation point because `p(0)` is the
//! shared secret. Lagrange coefficients are computed over these
//! x-coordinates, not over the raw indices.

use crate::{BackendError, FieldElement, PairingBackend};

/// The evaluation point of the keyper with the given index: `x_k = k + 1`.
pub fn keyper_x<B: PairingBackend>(keyper_index: u64) -> B::Scalar {
    B::Scalar::from_u64(keyper_index + 1)
}

/// The Lagrange coefficient `λ_i` at zero for keyper `keyper_index` over
/// the given set of keyper indices:
/// `λ_i = Π_{k ≠ i} x_k / (x_k − x_i)`.
///
/// For any polynomial `p` of degree below the set size,
/// `Σ λ_i · p(x_i) = p(0)`.
pub fn lagrange_coefficient<B: PairingBackend>(
    keyper_index: u64,
    keyper_indices: &[u64],
) -> Result<B::Scalar, BackendError> {
    let x_i = keyper_x::<B>(keyper_index);
    let mut lambda = B::Scalar::one();
    for &k in keyper_indices {
        if k == keyper_index {
            continue;
        }
        let x_k = keyper_x::<B>(k);
        let denom = (x_k - x_i)
            .invert()
            .ok_or(BackendError::Math("lagrange points must be distinct"))?;
        lambda *= x_k * denom;
    }
    Ok(lambda)
}
