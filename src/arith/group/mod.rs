use std::fmt::Debug;

use crate::{BackendError, FieldElement};

#[cfg(feature = "ark_bls12381")]
mod ark_bls12_381;
#[cfg(feature = "ark_bls12381")]
pub use ark_bls12_381::{G1, G2, Gt};

/// Elliptic curve point abstraction for the G1 and G2 source groups.
///
/// Serialization uses the backend's canonical uncompressed fixed-width
/// encoding. Parsing is strict: encodings of the wrong width, off-curve
/// points, points outside the prime-order subgroup, and the point at
/// infinity are rejected; the identity can be accepted explicitly via
/// [`from_repr_allow_identity`](CurvePoint::from_repr_allow_identity).
///
/// # Example
///
/// ```rust
/// use rand::thread_rng;
/// use teks::{CurvePoint, FieldElement, PairingBackend, PairingEngine};
///
/// type G1 = <PairingEngine as PairingBackend>::G1;
/// type Scalar = <PairingEngine as PairingBackend>::Scalar;
///
/// let mut rng = thread_rng();
/// let scalar = Scalar::random(&mut rng);
///
/// let point = G1::generator().mul_scalar(&scalar);
/// let bytes = point.to_repr();
/// assert_eq!(point, G1::from_repr(&bytes).unwrap());
/// ```
pub trait CurvePoint<F: FieldElement>:
    Clone + Copy + Send + Sync + Debug + 'static + PartialEq + Eq
{
    /// Width of the canonical uncompressed encoding in bytes.
    const ENCODED_LEN: usize;

    /// Returns the point at infinity (identity element).
    fn identity() -> Self;

    /// Returns the standard generator for this group.
    fn generator() -> Self;

    /// Checks if this point is the identity element.
    fn is_identity(&self) -> bool;

    /// Performs elliptic curve point addition.
    fn add(&self, other: &Self) -> Self;

    /// Performs elliptic curve point subtraction.
    fn sub(&self, other: &Self) -> Self;

    /// Returns the additive inverse of this point.
    fn negate(&self) -> Self;

    /// Performs scalar multiplication: returns `scalar * self`.
    fn mul_scalar(&self, scalar: &F) -> Self;

    /// Serializes this point to its canonical uncompressed encoding.
    fn to_repr(&self) -> Vec<u8>;

    /// Parses a canonical encoding, rejecting the point at infinity.
    fn from_repr(bytes: &[u8]) -> Result<Self, BackendError>;

    /// Parses a canonical encoding, accepting the point at infinity.
    fn from_repr_allow_identity(bytes: &[u8]) -> Result<Self, BackendError>;
}

/// Pairing target group (GT) abstraction.
///
/// The target group of the pairing is a multiplicative subgroup of the
/// extension field; its elements are the shared secrets of the hybrid
/// encryption scheme.
pub trait TargetGroup: Clone + Send + Sync + Debug + 'static + PartialEq {
    /// Scalar field type for scalar multiplication.
    type Scalar: FieldElement;

    /// Returns the multiplicative identity element.
    fn identity() -> Self;

    /// Checks if this element is the identity.
    fn is_identity(&self) -> bool;

    /// Performs scalar multiplication (exponentiation in multiplicative notation).
    fn mul_scalar(&self, scalar: &Self::Scalar) -> Self;

    /// Combines (multiplies) two target group elements.
    fn combine(&self, other: &Self) -> Self;

    /// Serializes this element to its canonical byte encoding.
    fn to_repr(&self) -> Vec<u8>;

    /// Deserializes an element from its canonical byte encoding.
    fn from_repr(bytes: &[u8]) -> Result<Self, BackendError>;
}
