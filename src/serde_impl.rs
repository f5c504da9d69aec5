//! Serde support for the publishable scheme types.
//!
//! Curve points and scalars are serialized through their canonical byte
//! representations, so serialized values round-trip byte-exactly and
//! deserialization applies the same strict validation as the wire
//! parsers (off-curve points, unreduced scalars and identity points are
//! rejected).

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    CurvePoint, FieldElement, Gammas, PairingBackend,
    observe::Address,
    scheme::{
        EncryptedMessage, EonPublicKey, EonPublicKeyShare, EonSecretKeyShare, EpochId,
        EpochSecretKey, EpochSecretKeyShare,
    },
};

fn scalar_from_bytes<B, E>(bytes: &[u8]) -> Result<B::Scalar, E>
where
    B: PairingBackend,
    E: de::Error,
{
    let mut repr = <B::Scalar as FieldElement>::Repr::default();
    if repr.as_ref().len() != bytes.len() {
        return Err(E::custom("scalar has wrong length"));
    }
    repr.as_mut().copy_from_slice(bytes);
    B::Scalar::from_repr(&repr).map_err(E::custom)
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| de::Error::custom("address must be 20 bytes"))?;
        Ok(Address(bytes))
    }
}

impl<B: PairingBackend> Serialize for Gammas<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let points: Vec<Vec<u8>> = self.points().iter().map(|p| p.to_repr()).collect();
        points.serialize(serializer)
    }
}

impl<'de, B: PairingBackend> Deserialize<'de> for Gammas<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Vec::<Vec<u8>>::deserialize(deserializer)?;
        let points = encoded
            .iter()
            .map(|bytes| B::G2::from_repr(bytes).map_err(de::Error::custom))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Gammas::from_points(points))
    }
}

macro_rules! impl_serde_g1_wrapper {
    ($name:ident) => {
        impl<B: PairingBackend> Serialize for $name<B> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0.to_repr())
            }
        }

        impl<'de, B: PairingBackend> Deserialize<'de> for $name<B> {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let bytes = Vec::<u8>::deserialize(deserializer)?;
                B::G1::from_repr(&bytes).map(Self).map_err(de::Error::custom)
            }
        }
    };
}

macro_rules! impl_serde_g2_wrapper {
    ($name:ident) => {
        impl<B: PairingBackend> Serialize for $name<B> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0.to_repr())
            }
        }

        impl<'de, B: PairingBackend> Deserialize<'de> for $name<B> {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let bytes = Vec::<u8>::deserialize(deserializer)?;
                B::G2::from_repr(&bytes).map(Self).map_err(de::Error::custom)
            }
        }
    };
}

impl_serde_g1_wrapper!(EpochId);
impl_serde_g1_wrapper!(EpochSecretKeyShare);
impl_serde_g1_wrapper!(EpochSecretKey);
impl_serde_g2_wrapper!(EonPublicKeyShare);
impl_serde_g2_wrapper!(EonPublicKey);

impl<B: PairingBackend> Serialize for EonSecretKeyShare<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0.to_repr().as_ref())
    }
}

impl<'de, B: PairingBackend> Deserialize<'de> for EonSecretKeyShare<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        scalar_from_bytes::<B, D::Error>(&bytes).map(Self)
    }
}

impl<B: PairingBackend> Serialize for EncryptedMessage<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("EncryptedMessage", 3)?;
        state.serialize_field("c1", &self.c1.to_repr())?;
        state.serialize_field("payload", &self.payload)?;
        state.serialize_field("sigma_box", &self.sigma_box)?;
        state.end()
    }
}

impl<'de, B: PairingBackend> Deserialize<'de> for EncryptedMessage<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct EncryptedMessageHelper {
            c1: Vec<u8>,
            payload: Vec<u8>,
            sigma_box: Vec<u8>,
        }

        let helper = EncryptedMessageHelper::deserialize(deserializer)?;
        Ok(EncryptedMessage {
            c1: B::G2::from_repr(&helper.c1).map_err(de::Error::custom)?,
            payload: helper.payload,
            sigma_box: helper.sigma_box,
        })
    }
}
