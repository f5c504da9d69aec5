use ark_bls12_381::Bls12_381;
use ark_ec::pairing::Pairing;

use crate::{BackendError, Fr, G1, G2, Gt, PairingBackend};

/// Arkworks BLS12-381 backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairingEngine;

impl PairingBackend for PairingEngine {
    type Scalar = Fr;
    type G1 = G1;
    type G2 = G2;
    type Target = Gt;

    fn pairing(g1: &Self::G1, g2: &Self::G2) -> Self::Target {
        Bls12_381::pairing(*g1, *g2)
    }

    fn multi_pairing(g1: &[Self::G1], g2: &[Self::G2]) -> Result<Self::Target, BackendError> {
        if g1.len() != g2.len() {
            return Err(BackendError::Math("pairing input length mismatch"));
        }
        Ok(Bls12_381::multi_pairing(
            g1.iter().copied(),
            g2.iter().copied(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{CurvePoint, FieldElement};

    #[test]
    fn bilinearity() {
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let a = <Fr as FieldElement>::random(&mut rng);
        let b = <Fr as FieldElement>::random(&mut rng);

        let g1 = <G1 as CurvePoint<Fr>>::generator();
        let g2 = <G2 as CurvePoint<Fr>>::generator();

        let lhs = PairingEngine::pairing(&g1.mul_scalar(&a), &g2.mul_scalar(&b));
        let rhs = PairingEngine::pairing(&g1.mul_scalar(&(a * b)), &g2);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn pairing_check_identity() {
        let mut rng = ChaCha20Rng::seed_from_u64(14);
        let s = <Fr as FieldElement>::random(&mut rng);

        let g1 = <G1 as CurvePoint<Fr>>::generator();
        let g2 = <G2 as CurvePoint<Fr>>::generator();

        // e(s*g1, g2) * e(-g1, s*g2) == 1
        let ok = PairingEngine::pairing_check(
            &[g1.mul_scalar(&s), g1.negate()],
            &[g2, g2.mul_scalar(&s)],
        )
        .unwrap();
        assert!(ok);

        let bad = PairingEngine::pairing_check(&[g1, g1], &[g2, g2]).unwrap();
        assert!(!bad);
    }

    #[test]
    fn multi_pairing_length_mismatch() {
        let g1 = <G1 as CurvePoint<Fr>>::generator();
        assert!(PairingEngine::multi_pairing(&[g1], &[]).is_err());
    }
}
