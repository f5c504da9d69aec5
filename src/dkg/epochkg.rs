use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::{
    Error, PairingBackend,
    dkg::DkgResult,
    scheme::{
        EonPublicKeyShare, EonSecretKeyShare, EpochSecretKey, EpochSecretKeyShare,
        compute_epoch_id, compute_epoch_secret_key, compute_epoch_secret_key_share,
        verify_epoch_secret_key_share,
    },
};

/// An epoch secret key share as observed from a peer.
pub struct EpochSecretKeyShareMsg<B: PairingBackend> {
    pub eon: u64,
    pub epoch: u64,
    pub sender: u64,
    pub share: EpochSecretKeyShare<B>,
}

impl<B: PairingBackend> Clone for EpochSecretKeyShareMsg<B> {
    fn clone(&self) -> Self {
        Self {
            eon: self.eon,
            epoch: self.epoch,
            sender: self.sender,
            share: self.share,
        }
    }
}

impl<B: PairingBackend> std::fmt::Debug for EpochSecretKeyShareMsg<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochSecretKeyShareMsg")
            .field("eon", &self.eon)
            .field("epoch", &self.epoch)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

struct EpochState<B: PairingBackend> {
    shares: BTreeMap<u64, EpochSecretKeyShare<B>>,
    secret_key: Option<EpochSecretKey<B>>,
}

impl<B: PairingBackend> Default for EpochState<B> {
    fn default() -> Self {
        Self {
            shares: BTreeMap::new(),
            secret_key: None,
        }
    }
}

/// Per-eon epoch key generator.
///
/// Created from a finalized [`DkgResult`]; computes this keyper's own
/// epoch secret key shares, verifies the shares published by peers
/// against their eon public key shares, and assembles the epoch secret
/// key as soon as shares from `threshold` distinct senders are present.
pub struct EpochKeyGenerator<B: PairingBackend> {
    eon: u64,
    num_keypers: u64,
    threshold: u64,
    keyper: u64,
    eon_secret_key_share: EonSecretKeyShare<B>,
    eon_public_key_shares: Vec<EonPublicKeyShare<B>>,
    epochs: BTreeMap<u64, EpochState<B>>,
}

impl<B: PairingBackend> EpochKeyGenerator<B> {
    /// Builds the generator from a finalized key generation result.
    pub fn new(result: &DkgResult<B>) -> Self {
        Self {
            eon: result.eon,
            num_keypers: result.num_keypers,
            threshold: result.threshold,
            keyper: result.keyper,
            eon_secret_key_share: result.eon_secret_key_share,
            eon_public_key_shares: result.eon_public_key_shares.clone(),
            epochs: BTreeMap::new(),
        }
    }

    pub fn eon(&self) -> u64 {
        self.eon
    }

    pub fn keyper(&self) -> u64 {
        self.keyper
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// This keyper's share of the given epoch's secret key.
    pub fn compute_epoch_secret_key_share(&self, epoch: u64) -> EpochSecretKeyShareMsg<B> {
        let epoch_id = compute_epoch_id::<B>(epoch);
        EpochSecretKeyShareMsg {
            eon: self.eon,
            epoch,
            sender: self.keyper,
            share: compute_epoch_secret_key_share(&self.eon_secret_key_share, &epoch_id),
        }
    }

    /// The assembled secret key for the given epoch, if threshold shares
    /// have been collected.
    pub fn secret_key(&self, epoch: u64) -> Option<&EpochSecretKey<B>> {
        self.epochs.get(&epoch)?.secret_key.as_ref()
    }

    /// Ingests a peer's epoch secret key share.
    ///
    /// The share is verified against the sender's eon public key share;
    /// a failing check yields [`Error::BadShare`]. Duplicate shares from
    /// the same sender are ignored. Once shares from `threshold` distinct
    /// senders are present, the epoch secret key is assembled.
    #[instrument(level = "debug", skip_all, fields(eon = self.eon, epoch = msg.epoch, sender = msg.sender))]
    pub fn handle_epoch_secret_key_share(
        &mut self,
        msg: &EpochSecretKeyShareMsg<B>,
    ) -> Result<(), Error> {
        if msg.sender >= self.num_keypers {
            return Err(Error::UnknownSender(msg.sender));
        }

        let epoch_id = compute_epoch_id::<B>(msg.epoch);
        let public_key_share = &self.eon_public_key_shares[msg.sender as usize];
        if !verify_epoch_secret_key_share(&msg.share, public_key_share, &epoch_id)? {
            return Err(Error::BadShare { sender: msg.sender });
        }

        let state = self.epochs.entry(msg.epoch).or_default();
        if state.shares.contains_key(&msg.sender) {
            debug!("duplicate epoch secret key share ignored");
            return Ok(());
        }
        state.shares.insert(msg.sender, msg.share);

        if state.secret_key.is_none() && state.shares.len() as u64 == self.threshold {
            let keyper_indices: Vec<u64> = state.shares.keys().copied().collect();
            let shares: Vec<EpochSecretKeyShare<B>> = state.shares.values().copied().collect();
            let secret_key =
                compute_epoch_secret_key::<B>(&keyper_indices, &shares, self.threshold)?;
            state.secret_key = Some(secret_key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{CurvePoint, PairingEngine, dkg::PureDkg, scheme::verify_epoch_secret_key};

    /// Finalized results for an honest run of `n` keypers.
    fn honest_results(rng: &mut ChaCha20Rng, n: u64, t: u64) -> Vec<DkgResult<PairingEngine>> {
        let mut dkgs: Vec<PureDkg<PairingEngine>> =
            (0..n).map(|k| PureDkg::new(1, n, t, k).unwrap()).collect();

        let mut commitments = Vec::new();
        let mut evals = Vec::new();
        for dkg in dkgs.iter_mut() {
            let (gammas, outgoing) = dkg.start_phase1_dealing(rng).unwrap();
            commitments.push(crate::dkg::PolyCommitmentMsg {
                eon: 1,
                sender: dkg.keyper(),
                gammas,
            });
            evals.extend(outgoing);
        }
        for commitment in commitments {
            for dkg in dkgs.iter_mut() {
                dkg.handle_poly_commitment_msg(commitment.clone()).unwrap();
            }
        }
        for msg in evals {
            dkgs[msg.receiver as usize].handle_poly_eval_msg(msg).unwrap();
        }
        dkgs.iter_mut()
            .map(|dkg| {
                dkg.start_phase2_accusing().unwrap();
                dkg.start_phase3_apologizing().unwrap();
                dkg.finalize().unwrap();
                dkg.compute_result().unwrap()
            })
            .collect()
    }

    #[test]
    fn threshold_shares_assemble_a_valid_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(91);
        let results = honest_results(&mut rng, 3, 2);
        let eon_public_key = results[0].eon_public_key;

        let mut ekg = EpochKeyGenerator::new(&results[0]);
        let epoch = 12;

        let share1 = EpochKeyGenerator::new(&results[1]).compute_epoch_secret_key_share(epoch);
        ekg.handle_epoch_secret_key_share(&share1).unwrap();
        assert!(ekg.secret_key(epoch).is_none());

        let share0 = ekg.compute_epoch_secret_key_share(epoch);
        ekg.handle_epoch_secret_key_share(&share0).unwrap();

        let key = ekg.secret_key(epoch).expect("threshold reached");
        assert!(verify_epoch_secret_key(&mut rng, key, &eon_public_key, epoch).unwrap());
    }

    #[test]
    fn bad_share_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(92);
        let results = honest_results(&mut rng, 3, 2);
        let mut ekg = EpochKeyGenerator::new(&results[0]);

        let mut share = EpochKeyGenerator::new(&results[1]).compute_epoch_secret_key_share(3);
        share.share = EpochSecretKeyShare(
            share
                .share
                .0
                .add(&<PairingEngine as PairingBackend>::G1::generator()),
        );
        assert!(matches!(
            ekg.handle_epoch_secret_key_share(&share),
            Err(Error::BadShare { sender: 1 })
        ));
        assert!(ekg.secret_key(3).is_none());
    }

    #[test]
    fn duplicate_shares_do_not_count_twice() {
        let mut rng = ChaCha20Rng::seed_from_u64(93);
        let results = honest_results(&mut rng, 3, 2);
        let mut ekg = EpochKeyGenerator::new(&results[0]);

        let share = EpochKeyGenerator::new(&results[1]).compute_epoch_secret_key_share(4);
        ekg.handle_epoch_secret_key_share(&share).unwrap();
        ekg.handle_epoch_secret_key_share(&share).unwrap();
        assert!(ekg.secret_key(4).is_none(), "one sender must not reach threshold");
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(94);
        let results = honest_results(&mut rng, 3, 2);
        let mut ekg = EpochKeyGenerator::new(&results[0]);

        let mut share = EpochKeyGenerator::new(&results[1]).compute_epoch_secret_key_share(5);
        share.sender = 9;
        assert!(matches!(
            ekg.handle_epoch_secret_key_share(&share),
            Err(Error::UnknownSender(9))
        ));
    }

    #[test]
    fn distinct_epochs_are_tracked_independently() {
        let mut rng = ChaCha20Rng::seed_from_u64(95);
        let results = honest_results(&mut rng, 3, 2);
        let eon_public_key = results[0].eon_public_key;
        let mut ekg = EpochKeyGenerator::new(&results[0]);

        for epoch in [0u64, 1] {
            for source in &results[..2] {
                let share = EpochKeyGenerator::new(source).compute_epoch_secret_key_share(epoch);
                ekg.handle_epoch_secret_key_share(&share).unwrap();
            }
        }
        let key0 = ekg.secret_key(0).unwrap();
        let key1 = ekg.secret_key(1).unwrap();
        assert_ne!(key0.0, key1.0);
        assert!(verify_epoch_secret_key(&mut rng, key0, &eon_public_key, 0).unwrap());
        assert!(verify_epoch_secret_key(&mut rng, key1, &eon_public_key, 1).unwrap());
    }
}
