use ark_bls12_381::{g1, g2, Bls12_381, G1Projective, G2Projective};
use ark_ec::{
    short_weierstrass::{Affine, Projective},
    pairing::PairingOutput,
    AffineRepr, CurveGroup, Group,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::Zero;

use crate::{BackendError, CurvePoint, Fr, TargetGroup};

pub type G1 = G1Projective;
pub type G2 = G2Projective;
pub type Gt = PairingOutput<Bls12_381>;

macro_rules! impl_curve_point {
    ($proj:ty, $affine:ty, $len:expr, $label:expr) => {
        impl CurvePoint<Fr> for $proj {
            const ENCODED_LEN: usize = $len;

            fn identity() -> Self {
                <$proj>::zero()
            }

            fn generator() -> Self {
                <$proj as Group>::generator()
            }

            fn is_identity(&self) -> bool {
                self.is_zero()
            }

            fn add(&self, other: &Self) -> Self {
                self + other
            }

            fn sub(&self, other: &Self) -> Self {
                self - other
            }

            fn negate(&self) -> Self {
                -*self
            }

            fn mul_scalar(&self, scalar: &Fr) -> Self {
                *self * *scalar
            }

            fn to_repr(&self) -> Vec<u8> {
                let affine = self.into_affine();
                let mut bytes = Vec::with_capacity(Self::ENCODED_LEN);
                affine
                    .serialize_uncompressed(&mut bytes)
                    .expect("point serialization into vec");
                bytes
            }

            fn from_repr(bytes: &[u8]) -> Result<Self, BackendError> {
                let point = Self::from_repr_allow_identity(bytes)?;
                if point.is_zero() {
                    return Err(BackendError::MalformedPoint(concat!(
                        $label,
                        " encoding is the point at infinity"
                    )));
                }
                Ok(point)
            }

            fn from_repr_allow_identity(bytes: &[u8]) -> Result<Self, BackendError> {
                if bytes.len() != Self::ENCODED_LEN {
                    return Err(BackendError::MalformedPoint(concat!(
                        $label,
                        " encoding has wrong length"
                    )));
                }
                // Checked deserialization rejects off-curve and
                // out-of-subgroup points.
                let affine = <$affine>::deserialize_uncompressed(bytes).map_err(|_| {
                    BackendError::MalformedPoint(concat!("invalid ", $label, " encoding"))
                })?;
                Ok(affine.into_group())
            }
        }
    };
}

impl_curve_point!(Projective<g1::Config>, Affine<g1::Config>, 96, "G1");
impl_curve_point!(Projective<g2::Config>, Affine<g2::Config>, 192, "G2");

impl TargetGroup for Gt {
    type Scalar = Fr;

    fn identity() -> Self {
        Gt::zero()
    }

    fn is_identity(&self) -> bool {
        self.is_zero()
    }

    fn mul_scalar(&self, scalar: &Self::Scalar) -> Self {
        *self * scalar
    }

    fn combine(&self, other: &Self) -> Self {
        *self + *other
    }

    fn to_repr(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.serialize_compressed(&mut bytes)
            .expect("target group serialization into vec");
        bytes
    }

    fn from_repr(bytes: &[u8]) -> Result<Self, BackendError> {
        Self::deserialize_compressed(bytes)
            .map_err(|_| BackendError::Serialization("invalid target group bytes"))
    }
}
