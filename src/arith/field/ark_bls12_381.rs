use ark_bls12_381::Fr as ArkFr;
use ark_ff::{Field, One, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_core::RngCore;

use crate::{BackendError, FieldElement};

pub type Fr = ArkFr;

const SCALAR_WIDTH: usize = 32;

impl FieldElement for Fr {
    type Repr = [u8; SCALAR_WIDTH];

    fn zero() -> Self {
        Zero::zero()
    }

    fn one() -> Self {
        One::one()
    }

    fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        // 64 uniform bytes reduced mod q keep the bias negligible.
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        ArkFr::from_le_bytes_mod_order(&bytes)
    }

    fn invert(&self) -> Option<Self> {
        self.inverse()
    }

    fn from_u64(n: u64) -> Self {
        ArkFr::from(n)
    }

    fn to_repr(&self) -> Self::Repr {
        let mut repr = [0u8; SCALAR_WIDTH];
        self.serialize_compressed(&mut repr[..])
            .expect("scalar serialization into fixed buffer");
        repr
    }

    fn from_repr(repr: &Self::Repr) -> Result<Self, BackendError> {
        Self::deserialize_compressed(&repr[..])
            .map_err(|_| BackendError::Serialization("invalid scalar bytes"))
    }

    fn to_bytes_be(&self) -> Vec<u8> {
        let mut bytes = self.to_repr().to_vec();
        bytes.reverse();
        let leading = bytes.iter().take_while(|b| **b == 0).count();
        bytes.split_off(leading)
    }

    fn from_bytes_be(bytes: &[u8]) -> Result<Self, BackendError> {
        if bytes.len() > SCALAR_WIDTH {
            return Err(BackendError::Serialization("scalar encoding too long"));
        }
        if bytes.first() == Some(&0) {
            return Err(BackendError::Serialization("non-minimal scalar encoding"));
        }
        let mut repr = [0u8; SCALAR_WIDTH];
        for (dst, src) in repr.iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }
        Self::from_repr(&repr)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn repr_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..32 {
            let s = <Fr as FieldElement>::random(&mut rng);
            let repr = s.to_repr();
            assert_eq!(s, Fr::from_repr(&repr).unwrap());
        }
    }

    #[test]
    fn big_endian_roundtrip_is_minimal() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        for _ in 0..32 {
            let s = <Fr as FieldElement>::random(&mut rng);
            let bytes = s.to_bytes_be();
            assert_ne!(bytes.first(), Some(&0));
            assert_eq!(s, Fr::from_bytes_be(&bytes).unwrap());
        }
    }

    #[test]
    fn zero_encodes_empty() {
        let zero = <Fr as FieldElement>::zero();
        assert!(zero.to_bytes_be().is_empty());
        assert_eq!(zero, Fr::from_bytes_be(&[]).unwrap());
    }

    #[test]
    fn rejects_padded_encoding() {
        assert!(Fr::from_bytes_be(&[0, 1]).is_err());
        assert!(Fr::from_bytes_be(&[0u8; 33]).is_err());
    }

    #[test]
    fn rejects_unreduced_scalar() {
        // q - 1 < 2^255, so the all-ones 32-byte string is >= q.
        assert!(Fr::from_bytes_be(&[0xff; 32]).is_err());
    }
}
