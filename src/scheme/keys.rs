use rand_core::RngCore;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    BackendError, CurvePoint, Error, FieldElement, Gammas, PairingBackend,
    arith::{keyper_x, lagrange_coefficient},
    scheme::{EncryptedMessage, Sigma, encrypt},
};

/// A keyper's share of the eon secret key: the sum of the qualified
/// dealers' polynomial evaluations at the keyper's point.
pub struct EonSecretKeyShare<B: PairingBackend>(pub B::Scalar);

/// The public counterpart of an [`EonSecretKeyShare`], a point in G2.
/// Anyone can compute it from the qualified dealers' commitments.
pub struct EonPublicKeyShare<B: PairingBackend>(pub B::G2);

/// The combined eon public key, `Σ_j Γ_j.Π(0)` over qualified dealers.
pub struct EonPublicKey<B: PairingBackend>(pub B::G2);

/// The identifier point of an epoch: `(e + 1)·g1` for external epoch
/// index `e`. Zero is skipped so the identity never identifies an epoch.
pub struct EpochId<B: PairingBackend>(pub B::G1);

/// A keyper's share of an epoch secret key, `s_k · EpochId` in G1.
pub struct EpochSecretKeyShare<B: PairingBackend>(pub B::G1);

/// The combined epoch secret key, assembled from threshold shares by
/// Lagrange interpolation at zero.
pub struct EpochSecretKey<B: PairingBackend>(pub B::G1);

macro_rules! impl_wrapper_traits {
    ($name:ident) => {
        impl<B: PairingBackend> Clone for $name<B> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<B: PairingBackend> Copy for $name<B> {}

        impl<B: PairingBackend> std::fmt::Debug for $name<B> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl<B: PairingBackend> PartialEq for $name<B> {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }

        impl<B: PairingBackend> Eq for $name<B> {}
    };
}

impl_wrapper_traits!(EonSecretKeyShare);
impl_wrapper_traits!(EonPublicKeyShare);
impl_wrapper_traits!(EonPublicKey);
impl_wrapper_traits!(EpochId);
impl_wrapper_traits!(EpochSecretKeyShare);
impl_wrapper_traits!(EpochSecretKey);

/// Computes a keyper's eon secret key share from the polynomial
/// evaluations received from the qualified dealers.
pub fn compute_eon_secret_key_share<B: PairingBackend>(
    poly_evals: &[B::Scalar],
) -> EonSecretKeyShare<B> {
    let mut acc = B::Scalar::zero();
    for eval in poly_evals {
        acc += *eval;
    }
    EonSecretKeyShare(acc)
}

/// Computes the eon public key share of the given keyper from the
/// qualified dealers' commitments: `Σ_j Γ_j.Π(x_k)`.
pub fn compute_eon_public_key_share<B: PairingBackend>(
    keyper_index: u64,
    gammas: &[Gammas<B>],
) -> EonPublicKeyShare<B> {
    let x = keyper_x::<B>(keyper_index);
    let mut acc = B::G2::identity();
    for gs in gammas {
        acc = acc.add(&gs.pi(&x));
    }
    EonPublicKeyShare(acc)
}

/// Computes the eon public key shares of all `num_keypers` keypers.
#[instrument(level = "trace", skip_all, fields(num_keypers, dealers = gammas.len()))]
pub fn compute_eon_public_key_shares<B: PairingBackend>(
    num_keypers: u64,
    gammas: &[Gammas<B>],
) -> Vec<EonPublicKeyShare<B>> {
    #[cfg(feature = "parallel")]
    {
        (0..num_keypers)
            .into_par_iter()
            .map(|k| compute_eon_public_key_share(k, gammas))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..num_keypers)
            .map(|k| compute_eon_public_key_share(k, gammas))
            .collect()
    }
}

/// Computes the combined eon public key from the qualified dealers'
/// commitments: `Σ_j Γ_j.Π(0)`.
pub fn compute_eon_public_key<B: PairingBackend>(gammas: &[Gammas<B>]) -> EonPublicKey<B> {
    let zero = B::Scalar::zero();
    let mut acc = B::G2::identity();
    for gs in gammas {
        acc = acc.add(&gs.pi(&zero));
    }
    EonPublicKey(acc)
}

/// Computes the identifier point of the given epoch.
pub fn compute_epoch_id<B: PairingBackend>(epoch_index: u64) -> EpochId<B> {
    let scalar = B::Scalar::from_u64(epoch_index + 1);
    EpochId(B::G1::generator().mul_scalar(&scalar))
}

/// Computes a keyper's epoch secret key share.
pub fn compute_epoch_secret_key_share<B: PairingBackend>(
    eon_secret_key_share: &EonSecretKeyShare<B>,
    epoch_id: &EpochId<B>,
) -> EpochSecretKeyShare<B> {
    EpochSecretKeyShare(epoch_id.0.mul_scalar(&eon_secret_key_share.0))
}

/// Combines exactly `threshold` epoch secret key shares into the epoch
/// secret key via Lagrange interpolation at zero.
///
/// The i-th share must belong to the keyper with the i-th index;
/// coefficients are computed over the keypers' x-coordinates, not over
/// the indices themselves.
#[instrument(level = "debug", skip_all, fields(shares = epoch_secret_key_shares.len(), threshold))]
pub fn compute_epoch_secret_key<B: PairingBackend>(
    keyper_indices: &[u64],
    epoch_secret_key_shares: &[EpochSecretKeyShare<B>],
    threshold: u64,
) -> Result<EpochSecretKey<B>, Error> {
    if keyper_indices.len() != epoch_secret_key_shares.len() {
        return Err(Error::InvalidConfig(format!(
            "got {} keyper indices, but {} secret key shares",
            keyper_indices.len(),
            epoch_secret_key_shares.len()
        )));
    }
    if epoch_secret_key_shares.len() as u64 != threshold {
        return Err(Error::ThresholdNotMet {
            available: epoch_secret_key_shares.len(),
            threshold: threshold as usize,
        });
    }

    let mut acc = B::G1::identity();
    for (keyper_index, share) in keyper_indices.iter().zip(epoch_secret_key_shares) {
        let lambda = lagrange_coefficient::<B>(*keyper_index, keyper_indices)?;
        acc = acc.add(&share.0.mul_scalar(&lambda));
    }
    Ok(EpochSecretKey(acc))
}

/// Checks an epoch secret key share published by a keyper against the
/// keyper's eon public key share:
/// `e(share, g2) == e(epoch_id, pub_share)`, evaluated as the
/// pairing-product identity `e(share, g2) · e(−epoch_id, pub_share) == 1`.
pub fn verify_epoch_secret_key_share<B: PairingBackend>(
    epoch_secret_key_share: &EpochSecretKeyShare<B>,
    eon_public_key_share: &EonPublicKeyShare<B>,
    epoch_id: &EpochId<B>,
) -> Result<bool, BackendError> {
    B::pairing_check(
        &[epoch_secret_key_share.0, epoch_id.0.negate()],
        &[B::G2::generator(), eon_public_key_share.0],
    )
}

/// Checks that an epoch secret key is the correct key for the epoch under
/// the given eon public key, by round-tripping a random probe message.
pub fn verify_epoch_secret_key<B: PairingBackend, R: RngCore + ?Sized>(
    rng: &mut R,
    epoch_secret_key: &EpochSecretKey<B>,
    eon_public_key: &EonPublicKey<B>,
    epoch_index: u64,
) -> Result<bool, Error> {
    let sigma = Sigma::<B>::random(rng);
    let mut probe = [0u8; 32];
    rng.fill_bytes(&mut probe);

    let epoch_id = compute_epoch_id::<B>(epoch_index);
    let encrypted: EncryptedMessage<B> = encrypt(&probe, eon_public_key, &epoch_id, &sigma);
    match encrypted.decrypt(epoch_secret_key) {
        Ok(decrypted) => Ok(decrypted == probe),
        Err(Error::DecryptionFailure(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{PairingEngine, Polynomial};

    type Scalar = <PairingEngine as PairingBackend>::Scalar;

    fn dealt_shares(
        rng: &mut ChaCha20Rng,
        num_keypers: u64,
        threshold: u64,
    ) -> (Vec<Gammas<PairingEngine>>, Vec<EonSecretKeyShare<PairingEngine>>) {
        let polys: Vec<Polynomial<PairingEngine>> = (0..num_keypers)
            .map(|_| Polynomial::random(rng, (threshold - 1) as usize))
            .collect();
        let gammas: Vec<_> = polys.iter().map(|p| p.gammas()).collect();
        let shares = (0..num_keypers)
            .map(|k| {
                let evals: Vec<Scalar> = polys
                    .iter()
                    .map(|p| p.evaluate(&keyper_x::<PairingEngine>(k)))
                    .collect();
                compute_eon_secret_key_share::<PairingEngine>(&evals)
            })
            .collect();
        (gammas, shares)
    }

    #[test]
    fn epoch_share_verification() {
        let mut rng = ChaCha20Rng::seed_from_u64(51);
        let (gammas, shares) = dealt_shares(&mut rng, 3, 2);
        let pub_shares = compute_eon_public_key_shares::<PairingEngine>(3, &gammas);
        let epoch_id = compute_epoch_id::<PairingEngine>(7);

        for k in 0..3u64 {
            let share = compute_epoch_secret_key_share(&shares[k as usize], &epoch_id);
            assert!(
                verify_epoch_secret_key_share(&share, &pub_shares[k as usize], &epoch_id).unwrap()
            );
            // A share verified against another keyper's public share fails.
            let other = (k + 1) % 3;
            assert!(
                !verify_epoch_secret_key_share(&share, &pub_shares[other as usize], &epoch_id)
                    .unwrap()
            );
        }
    }

    #[test]
    fn any_threshold_subset_combines_to_the_same_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(52);
        let (gammas, shares) = dealt_shares(&mut rng, 4, 3);
        let eon_public_key = compute_eon_public_key::<PairingEngine>(&gammas);
        let epoch_id = compute_epoch_id::<PairingEngine>(0);

        let epoch_shares: Vec<_> = shares
            .iter()
            .map(|s| compute_epoch_secret_key_share(s, &epoch_id))
            .collect();

        let mut keys = Vec::new();
        for indices in [[0u64, 1, 2], [0, 2, 3], [1, 2, 3]] {
            let selected: Vec<_> = indices.iter().map(|&i| epoch_shares[i as usize]).collect();
            let key = compute_epoch_secret_key(&indices, &selected, 3).unwrap();
            assert!(
                verify_epoch_secret_key(&mut rng, &key, &eon_public_key, 0).unwrap(),
                "subset {indices:?} produced an invalid key"
            );
            keys.push(key);
        }
        assert_eq!(keys[0], keys[1]);
        assert_eq!(keys[1], keys[2]);
    }

    #[test]
    fn combining_wrong_share_count_fails() {
        let mut rng = ChaCha20Rng::seed_from_u64(53);
        let (_, shares) = dealt_shares(&mut rng, 3, 2);
        let epoch_id = compute_epoch_id::<PairingEngine>(1);
        let epoch_share = compute_epoch_secret_key_share(&shares[0], &epoch_id);

        assert!(matches!(
            compute_epoch_secret_key::<PairingEngine>(&[0], &[epoch_share], 2),
            Err(Error::ThresholdNotMet {
                available: 1,
                threshold: 2
            })
        ));
        assert!(compute_epoch_secret_key::<PairingEngine>(&[0, 1], &[epoch_share], 2).is_err());
    }

    #[test]
    fn epoch_id_pairing_relation() {
        let mut rng = ChaCha20Rng::seed_from_u64(54);
        let s = Scalar::random(&mut rng);
        let epoch_id = compute_epoch_id::<PairingEngine>(9);

        // e(s·id, g2) == e(id, s·g2)
        let lhs = PairingEngine::pairing(
            &epoch_id.0.mul_scalar(&s),
            &<PairingEngine as PairingBackend>::G2::generator(),
        );
        let rhs = PairingEngine::pairing(
            &epoch_id.0,
            &<PairingEngine as PairingBackend>::G2::generator().mul_scalar(&s),
        );
        assert_eq!(lhs, rhs);
    }
}
