//! Private keyper-to-keyper encryption for polynomial evaluations.
//!
//! During the dealing phase each keyper sends every other keyper one
//! private evaluation of its secret polynomial. The evaluations travel
//! over the public hub chain, so they are encrypted to the receiver's
//! registered encryption public key.
//!
//! The protocol core only depends on the [`PeerCipher`] abstraction;
//! [`EciesCipher`] is a concrete ephemeral-ECIES-style implementation
//! over the backend's G1 group with an authenticated (keyed-BLAKE3)
//! envelope. Registered public keys travel as opaque canonical bytes in
//! the observed checked-in state.

use rand_core::RngCore;
use tracing::instrument;

use crate::{CurvePoint, Error, FieldElement, PairingBackend, SymmetricEncryption, XofStreamCipher};

const TAG_LEN: usize = 32;
const KEY_DOMAIN: &[u8] = b"teks::peer-enc::key";
const STREAM_DOMAIN: &str = "teks::peer-enc::stream";
const TAG_DOMAIN: &str = "teks::peer-enc::tag";

/// Authenticated encryption to a peer's registered public key.
///
/// `decrypt` must reject any ciphertext not produced for this cipher's
/// own key pair.
pub trait PeerCipher {
    /// Canonical encoding of this cipher's own public key, as registered
    /// on the hub chain at check-in.
    fn public_key_bytes(&self) -> Vec<u8>;

    /// Encrypts `plaintext` to the peer identified by `public_key` bytes.
    fn encrypt_to<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        public_key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error>;

    /// Decrypts a ciphertext addressed to this cipher's own key pair.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Ephemeral-ECIES-style cipher over the backend's G1 group.
///
/// Encryption samples an ephemeral scalar `r`, derives a key from the
/// shared point `r·pk` together with both public keys, and produces
/// `r·g1 || plaintext ⊕ keystream || tag`. The tag is a keyed-BLAKE3 MAC
/// over the ephemeral point and the ciphertext body.
pub struct EciesCipher<B: PairingBackend> {
    secret: B::Scalar,
    public: B::G1,
}

impl<B: PairingBackend> EciesCipher<B> {
    /// Generates a fresh key pair.
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let secret = B::Scalar::random(rng);
        let public = B::G1::generator().mul_scalar(&secret);
        Self { secret, public }
    }

    /// Rebuilds the cipher from an existing secret scalar.
    pub fn from_secret(secret: B::Scalar) -> Self {
        let public = B::G1::generator().mul_scalar(&secret);
        Self { secret, public }
    }

    fn derive_key(shared: &B::G1, ephemeral: &B::G1, receiver: &B::G1) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(&shared.to_repr());
        hasher.update(&ephemeral.to_repr());
        hasher.update(&receiver.to_repr());
        *hasher.finalize().as_bytes()
    }

    fn tag(key: &[u8; 32], header: &[u8], body: &[u8]) -> [u8; TAG_LEN] {
        let tag_key = blake3::derive_key(TAG_DOMAIN, key);
        let mut mac = blake3::Hasher::new_keyed(&tag_key);
        mac.update(header);
        mac.update(body);
        *mac.finalize().as_bytes()
    }
}

impl<B: PairingBackend> PeerCipher for EciesCipher<B> {
    fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_repr()
    }

    #[instrument(level = "trace", skip_all, fields(len = plaintext.len()))]
    fn encrypt_to<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        public_key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let receiver = B::G1::from_repr(public_key)?;
        let ephemeral_scalar = B::Scalar::random(rng);
        let ephemeral = B::G1::generator().mul_scalar(&ephemeral_scalar);
        let shared = receiver.mul_scalar(&ephemeral_scalar);

        let key = Self::derive_key(&shared, &ephemeral, &receiver);
        let header = ephemeral.to_repr();
        // The keystream is bound to the ephemeral key of this envelope.
        let body = XofStreamCipher::new(STREAM_DOMAIN).encrypt(&key, &header, plaintext)?;
        let tag = Self::tag(&key, &header, &body);

        let mut out = header;
        out.extend_from_slice(&body);
        out.extend_from_slice(&tag);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let point_len = B::G1::ENCODED_LEN;
        if ciphertext.len() < point_len + TAG_LEN {
            return Err(Error::DecryptionFailure("ciphertext too short"));
        }
        let (header, rest) = ciphertext.split_at(point_len);
        let (body, tag) = rest.split_at(rest.len() - TAG_LEN);

        let ephemeral = B::G1::from_repr(header)
            .map_err(|_| Error::DecryptionFailure("invalid ephemeral point"))?;
        let shared = ephemeral.mul_scalar(&self.secret);
        let key = Self::derive_key(&shared, &ephemeral, &self.public);

        if Self::tag(&key, header, body) != *tag {
            return Err(Error::DecryptionFailure("authentication tag mismatch"));
        }

        XofStreamCipher::new(STREAM_DOMAIN).decrypt(&key, header, body)
    }
}

impl<B: PairingBackend> std::fmt::Debug for EciesCipher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EciesCipher")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
