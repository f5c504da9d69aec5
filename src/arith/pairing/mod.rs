use std::fmt::Debug;

#[cfg(feature = "ark_bls12381")]
mod ark_bls12_381;
#[cfg(feature = "ark_bls12381")]
pub use ark_bls12_381::PairingEngine;

use crate::{BackendError, CurvePoint, FieldElement, TargetGroup};

/// Main backend trait that ties together the pairing-based operations.
///
/// Concrete backends (such as [`PairingEngine`]) implement this trait to
/// provide the scalar field, both source groups, the target group and the
/// pairing itself. All protocol code is generic over it.
///
/// # Example
///
/// ```rust
/// use teks::{CurvePoint, PairingBackend, PairingEngine};
///
/// let g1 = <PairingEngine as PairingBackend>::G1::generator();
/// let g2 = <PairingEngine as PairingBackend>::G2::generator();
///
/// let result = PairingEngine::pairing(&g1, &g2);
/// println!("{:?}", result);
/// ```
pub trait PairingBackend: Send + Sync + Debug + Sized + 'static {
    /// Scalar field type (Fr).
    type Scalar: FieldElement;
    /// First curve group (G1).
    type G1: CurvePoint<Self::Scalar>;
    /// Second curve group (G2).
    type G2: CurvePoint<Self::Scalar>;
    /// Pairing target group (GT).
    type Target: TargetGroup<Scalar = Self::Scalar>;

    /// Computes the bilinear pairing: `e(g1, g2) -> GT`.
    ///
    /// The pairing satisfies bilinearity: `e(a*P, b*Q) = e(P, Q)^(ab)`.
    fn pairing(g1: &Self::G1, g2: &Self::G2) -> Self::Target;

    /// Computes a product of pairings: `∏ e(g1[i], g2[i])`.
    ///
    /// More efficient than computing individual pairings and combining.
    /// Returns an error if the input slices have different lengths.
    fn multi_pairing(g1: &[Self::G1], g2: &[Self::G2]) -> Result<Self::Target, BackendError>;

    /// Returns true iff `∏ e(g1[i], g2[i])` is the identity of GT.
    ///
    /// This is the verification primitive for key shares: it checks a
    /// relation between group elements without revealing any scalar.
    fn pairing_check(g1: &[Self::G1], g2: &[Self::G2]) -> Result<bool, BackendError> {
        Ok(Self::multi_pairing(g1, g2)?.is_identity())
    }
}
