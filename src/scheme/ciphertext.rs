use rand_core::RngCore;

use crate::{
    CurvePoint, Error, FieldElement, PairingBackend, SymmetricEncryption, TargetGroup,
    XofStreamCipher,
    scheme::{EonPublicKey, EpochId, EpochSecretKey},
};

const PAYLOAD_DOMAIN: &str = "teks::epoch-payload";
const SIGMA_BOX_DOMAIN: &[u8] = b"teks::sigma-box";

/// The encryption randomness of the hybrid scheme: a scalar whose
/// canonical representation doubles as the byte block recovered during
/// decryption.
///
/// Encryption is deterministic given the sigma value, which is what makes
/// the consistency check during decryption possible.
pub struct Sigma<B: PairingBackend>(B::Scalar);

impl<B: PairingBackend> Sigma<B> {
    /// Samples a fresh sigma value.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self(B::Scalar::random(rng))
    }

    /// Rebuilds a sigma value from a scalar.
    pub fn from_scalar(scalar: B::Scalar) -> Self {
        Self(scalar)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_repr().as_ref().to_vec()
    }
}

impl<B: PairingBackend> Clone for Sigma<B> {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl<B: PairingBackend> std::fmt::Debug for Sigma<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The sigma value decrypts the message; keep it out of logs.
        f.write_str("Sigma(..)")
    }
}

/// A message encrypted to `(eon public key, epoch id)`.
///
/// - `c1 = sigma·g2`
/// - `payload = plaintext ⊕ XOF(e(epoch_id, sigma·eon_pk))`
/// - `sigma_box = sigma ⊕ H(plaintext)`
pub struct EncryptedMessage<B: PairingBackend> {
    pub c1: B::G2,
    pub payload: Vec<u8>,
    pub sigma_box: Vec<u8>,
}

impl<B: PairingBackend> Clone for EncryptedMessage<B> {
    fn clone(&self) -> Self {
        Self {
            c1: self.c1,
            payload: self.payload.clone(),
            sigma_box: self.sigma_box.clone(),
        }
    }
}

impl<B: PairingBackend> std::fmt::Debug for EncryptedMessage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedMessage")
            .field("c1", &self.c1)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

impl<B: PairingBackend> PartialEq for EncryptedMessage<B> {
    fn eq(&self, other: &Self) -> bool {
        self.c1 == other.c1 && self.payload == other.payload && self.sigma_box == other.sigma_box
    }
}

impl<B: PairingBackend> Eq for EncryptedMessage<B> {}

/// A keystream of `len` bytes bound to the plaintext, used to box the
/// sigma value.
fn sigma_mask(plaintext: &[u8], len: usize) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(SIGMA_BOX_DOMAIN);
    hasher.update(plaintext);
    let mut reader = hasher.finalize_xof();
    let mut mask = vec![0u8; len];
    reader.fill(&mut mask);
    mask
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Encrypts a message to the eon public key and epoch identifier.
///
/// Deterministic given `sigma`; callers wanting semantic security sample
/// a fresh sigma per message via [`Sigma::random`].
pub fn encrypt<B: PairingBackend>(
    plaintext: &[u8],
    eon_public_key: &EonPublicKey<B>,
    epoch_id: &EpochId<B>,
    sigma: &Sigma<B>,
) -> EncryptedMessage<B> {
    let c1 = B::G2::generator().mul_scalar(&sigma.0);
    let shared = B::pairing(&epoch_id.0, &eon_public_key.0.mul_scalar(&sigma.0));

    // The keystream is bound to c1, the public handle of this ciphertext.
    let sym = XofStreamCipher::new(PAYLOAD_DOMAIN);
    let payload = sym
        .encrypt(&shared.to_repr(), &c1.to_repr(), plaintext)
        .expect("keystream encryption is total");

    let sigma_bytes = sigma.to_bytes();
    let sigma_box = xor(&sigma_bytes, &sigma_mask(plaintext, sigma_bytes.len()));

    EncryptedMessage {
        c1,
        payload,
        sigma_box,
    }
}

impl<B: PairingBackend> EncryptedMessage<B> {
    /// Decrypts with the epoch secret key.
    ///
    /// Recovers the payload via `e(epoch_sk, c1)`, unboxes sigma and
    /// checks `sigma·g2 == c1`; any mismatch yields
    /// [`Error::DecryptionFailure`].
    pub fn decrypt(&self, epoch_secret_key: &EpochSecretKey<B>) -> Result<Vec<u8>, Error> {
        let shared = B::pairing(&epoch_secret_key.0, &self.c1);

        let sym = XofStreamCipher::new(PAYLOAD_DOMAIN);
        let plaintext = sym.decrypt(&shared.to_repr(), &self.c1.to_repr(), &self.payload)?;

        let sigma_bytes = xor(&self.sigma_box, &sigma_mask(&plaintext, self.sigma_box.len()));
        let mut repr = <B::Scalar as FieldElement>::Repr::default();
        if repr.as_ref().len() != sigma_bytes.len() {
            return Err(Error::DecryptionFailure("sigma box has wrong length"));
        }
        repr.as_mut().copy_from_slice(&sigma_bytes);
        let sigma = B::Scalar::from_repr(&repr)
            .map_err(|_| Error::DecryptionFailure("recovered sigma is not a scalar"))?;

        if B::G2::generator().mul_scalar(&sigma) != self.c1 {
            return Err(Error::DecryptionFailure("sigma consistency check failed"));
        }
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{
        PairingEngine,
        scheme::{
            compute_epoch_id, compute_epoch_secret_key_share, compute_eon_public_key,
            compute_eon_secret_key_share,
        },
    };

    type Scalar = <PairingEngine as PairingBackend>::Scalar;

    /// A one-dealer "eon": secret s, public key s·g2, epoch key s·id.
    fn single_dealer_eon(
        rng: &mut ChaCha20Rng,
        epoch_index: u64,
    ) -> (
        EonPublicKey<PairingEngine>,
        EpochId<PairingEngine>,
        EpochSecretKey<PairingEngine>,
    ) {
        let poly = crate::Polynomial::<PairingEngine>::random(rng, 1);
        let gammas = [poly.gammas()];
        let eon_public_key = compute_eon_public_key(&gammas);
        let eon_secret = compute_eon_secret_key_share::<PairingEngine>(&[
            poly.evaluate(&Scalar::zero()),
        ]);
        let epoch_id = compute_epoch_id(epoch_index);
        let share = compute_epoch_secret_key_share(&eon_secret, &epoch_id);
        (eon_public_key, epoch_id, EpochSecretKey(share.0))
    }

    #[test]
    fn roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(61);
        let (pk, epoch_id, sk) = single_dealer_eon(&mut rng, 3);

        let sigma = Sigma::random(&mut rng);
        let message = b"threshold-encrypted batch contents";
        let ct = encrypt(message, &pk, &epoch_id, &sigma);
        assert_eq!(ct.decrypt(&sk).unwrap(), message);
    }

    #[test]
    fn deterministic_given_sigma() {
        let mut rng = ChaCha20Rng::seed_from_u64(62);
        let (pk, epoch_id, _) = single_dealer_eon(&mut rng, 0);

        let sigma = Sigma::random(&mut rng);
        let a = encrypt(b"same message", &pk, &epoch_id, &sigma);
        let b = encrypt(b"same message", &pk, &epoch_id, &sigma);
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_epoch_key_fails() {
        let mut rng = ChaCha20Rng::seed_from_u64(63);
        let (pk, epoch_id, _) = single_dealer_eon(&mut rng, 4);
        let (_, _, other_sk) = single_dealer_eon(&mut rng, 4);

        let sigma = Sigma::random(&mut rng);
        let ct = encrypt(b"message", &pk, &epoch_id, &sigma);
        assert!(matches!(
            ct.decrypt(&other_sk),
            Err(Error::DecryptionFailure(_))
        ));
    }

    #[test]
    fn tampered_payload_fails() {
        let mut rng = ChaCha20Rng::seed_from_u64(64);
        let (pk, epoch_id, sk) = single_dealer_eon(&mut rng, 5);

        let sigma = Sigma::random(&mut rng);
        let mut ct = encrypt(b"message", &pk, &epoch_id, &sigma);
        ct.payload[0] ^= 1;
        assert!(matches!(ct.decrypt(&sk), Err(Error::DecryptionFailure(_))));
    }

    #[test]
    fn empty_message_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(65);
        let (pk, epoch_id, sk) = single_dealer_eon(&mut rng, 6);

        let sigma = Sigma::random(&mut rng);
        let ct = encrypt(b"", &pk, &epoch_id, &sigma);
        assert_eq!(ct.decrypt(&sk).unwrap(), b"");
    }
}
