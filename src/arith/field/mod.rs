use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand_core::RngCore;

use crate::BackendError;

#[cfg(feature = "ark_bls12381")]
mod ark_bls12_381;
#[cfg(feature = "ark_bls12381")]
pub use ark_bls12_381::Fr;

/// Scalar field abstraction for the pairing groups.
///
/// This trait abstracts over the scalar field Fr of the pairing-friendly
/// curve. Protocol code is written against it so that the concrete curve
/// library stays behind the backend seam.
///
/// Two byte encodings are exposed:
///
/// - [`to_repr`](FieldElement::to_repr)/[`from_repr`](FieldElement::from_repr):
///   the backend's canonical fixed-width representation, used for hashing
///   and local serialization.
/// - [`to_bytes_be`](FieldElement::to_bytes_be)/[`from_bytes_be`](FieldElement::from_bytes_be):
///   minimal big-endian unsigned bytes, the wire form of scalar shares.
///   Parsing is strict: values not reduced modulo the field order and
///   encodings with leading zero bytes are rejected.
///
/// # Example
///
/// ```rust
/// use rand::thread_rng;
/// use teks::{FieldElement, Fr};
///
/// let mut rng = thread_rng();
/// let a = Fr::random(&mut rng);
///
/// let inv = a.invert().expect("non-zero element");
/// let bytes = a.to_repr();
/// let recovered = Fr::from_repr(&bytes).expect("valid repr");
/// assert_eq!(a, recovered);
/// # let _ = inv;
/// ```
pub trait FieldElement:
    Clone
    + Copy
    + Send
    + Sync
    + Debug
    + 'static
    + PartialEq
    + Eq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Canonical byte representation (32 bytes for BLS12-381 scalars).
    type Repr: AsRef<[u8]> + AsMut<[u8]> + Default + Debug + Send + Sync + Clone + 'static;

    /// Returns the additive identity (zero) element.
    fn zero() -> Self;

    /// Returns the multiplicative identity (one) element.
    fn one() -> Self;

    /// Samples a uniform field element from the provided RNG.
    fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self;

    /// Computes the multiplicative inverse, returning `None` for zero.
    fn invert(&self) -> Option<Self>;

    /// Converts a `u64` into the field.
    fn from_u64(n: u64) -> Self;

    /// Serializes this element to its canonical representation.
    fn to_repr(&self) -> Self::Repr;

    /// Deserializes an element from its canonical representation.
    ///
    /// Fails if the representation is not a reduced field element.
    fn from_repr(repr: &Self::Repr) -> Result<Self, BackendError>;

    /// Encodes this element as minimal big-endian unsigned bytes.
    ///
    /// Zero encodes as the empty string.
    fn to_bytes_be(&self) -> Vec<u8>;

    /// Parses minimal big-endian unsigned bytes.
    ///
    /// Rejects encodings longer than the field width, encodings with a
    /// leading zero byte, and values not below the field order.
    fn from_bytes_be(bytes: &[u8]) -> Result<Self, BackendError>;
}
