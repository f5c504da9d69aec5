use std::collections::{BTreeMap, BTreeSet};

use rand_core::RngCore;
use tracing::{debug, instrument, warn};

use crate::{
    Error, Gammas, PairingBackend, Polynomial,
    arith::keyper_x,
    dkg::Phase,
    scheme::{
        EonPublicKey, EonPublicKeyShare, EonSecretKeyShare, compute_eon_public_key,
        compute_eon_public_key_shares, compute_eon_secret_key_share,
    },
};

/// A dealer's public commitment to its polynomial.
pub struct PolyCommitmentMsg<B: PairingBackend> {
    pub eon: u64,
    pub sender: u64,
    pub gammas: Gammas<B>,
}

/// A private polynomial evaluation sent from a dealer to one receiver.
pub struct PolyEvalMsg<B: PairingBackend> {
    pub eon: u64,
    pub sender: u64,
    pub receiver: u64,
    pub eval: B::Scalar,
}

/// An accusation against a dealer that failed to deal correctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccusationMsg {
    pub eon: u64,
    pub accuser: u64,
    pub accused: u64,
}

/// A dealer's public answer to an accusation: the evaluation the accuser
/// should have received, publishable so everyone can verify it.
pub struct ApologyMsg<B: PairingBackend> {
    pub eon: u64,
    pub accuser: u64,
    pub accused: u64,
    pub eval: B::Scalar,
}

impl<B: PairingBackend> Clone for PolyCommitmentMsg<B> {
    fn clone(&self) -> Self {
        Self {
            eon: self.eon,
            sender: self.sender,
            gammas: self.gammas.clone(),
        }
    }
}

impl<B: PairingBackend> Clone for PolyEvalMsg<B> {
    fn clone(&self) -> Self {
        Self {
            eon: self.eon,
            sender: self.sender,
            receiver: self.receiver,
            eval: self.eval,
        }
    }
}

impl<B: PairingBackend> Clone for ApologyMsg<B> {
    fn clone(&self) -> Self {
        Self {
            eon: self.eon,
            accuser: self.accuser,
            accused: self.accused,
            eval: self.eval,
        }
    }
}

impl<B: PairingBackend> std::fmt::Debug for PolyCommitmentMsg<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolyCommitmentMsg")
            .field("eon", &self.eon)
            .field("sender", &self.sender)
            .field("entries", &self.gammas.len())
            .finish()
    }
}

impl<B: PairingBackend> std::fmt::Debug for PolyEvalMsg<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The eval is a private share; keep it out of logs.
        f.debug_struct("PolyEvalMsg")
            .field("eon", &self.eon)
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

impl<B: PairingBackend> std::fmt::Debug for ApologyMsg<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApologyMsg")
            .field("eon", &self.eon)
            .field("accuser", &self.accuser)
            .field("accused", &self.accused)
            .finish_non_exhaustive()
    }
}

/// The outcome of a finalized key generation run.
pub struct DkgResult<B: PairingBackend> {
    pub eon: u64,
    pub num_keypers: u64,
    pub threshold: u64,
    /// Index of the keyper this result belongs to.
    pub keyper: u64,
    /// This keyper's share of the eon secret key.
    pub eon_secret_key_share: EonSecretKeyShare<B>,
    /// The combined eon public key.
    pub eon_public_key: EonPublicKey<B>,
    /// Every keyper's public key share, indexed by keyper index.
    pub eon_public_key_shares: Vec<EonPublicKeyShare<B>>,
    /// The dealers whose contributions made it into the key.
    pub qualified: BTreeSet<u64>,
}

impl<B: PairingBackend> Clone for DkgResult<B> {
    fn clone(&self) -> Self {
        Self {
            eon: self.eon,
            num_keypers: self.num_keypers,
            threshold: self.threshold,
            keyper: self.keyper,
            eon_secret_key_share: self.eon_secret_key_share,
            eon_public_key: self.eon_public_key,
            eon_public_key_shares: self.eon_public_key_shares.clone(),
            qualified: self.qualified.clone(),
        }
    }
}

impl<B: PairingBackend> std::fmt::Debug for DkgResult<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DkgResult")
            .field("eon", &self.eon)
            .field("num_keypers", &self.num_keypers)
            .field("threshold", &self.threshold)
            .field("keyper", &self.keyper)
            .field("qualified", &self.qualified)
            .finish_non_exhaustive()
    }
}

/// The side-effect-free per-participant key generation state machine.
///
/// One instance per keyper per eon. The caller drives the phase
/// transitions (`start_phase1_dealing`, `start_phase2_accusing`,
/// `start_phase3_apologizing`, `finalize`) according to the phase
/// schedule, and feeds inbound messages into the `handle_*` methods.
/// Handlers accept messages only in the phase they belong to, are
/// idempotent under re-delivery, and never abort on invalid peer input:
/// the error is returned for logging and the state is left unchanged.
pub struct PureDkg<B: PairingBackend> {
    eon: u64,
    num_keypers: u64,
    threshold: u64,
    keyper: u64,
    phase: Phase,
    polynomial: Option<Polynomial<B>>,
    commitments: BTreeMap<u64, Gammas<B>>,
    evals: BTreeMap<u64, B::Scalar>,
    // Evals that arrived before their dealer's commitment; emptied at the
    // end of the dealing phase.
    pending_evals: BTreeMap<u64, B::Scalar>,
    accusations: BTreeSet<(u64, u64)>,
    apologies: BTreeMap<(u64, u64), B::Scalar>,
}

impl<B: PairingBackend> PureDkg<B> {
    /// Creates a new participant for `(eon, num_keypers, threshold)` with
    /// the given own index.
    pub fn new(eon: u64, num_keypers: u64, threshold: u64, keyper: u64) -> Result<Self, Error> {
        if threshold == 0 || threshold > num_keypers {
            return Err(Error::InvalidConfig(format!(
                "threshold must be within [1, {num_keypers}], got {threshold}"
            )));
        }
        if keyper >= num_keypers {
            return Err(Error::InvalidConfig(format!(
                "keyper index {keyper} outside of 0..{num_keypers}"
            )));
        }
        Ok(Self {
            eon,
            num_keypers,
            threshold,
            keyper,
            phase: Phase::Off,
            polynomial: None,
            commitments: BTreeMap::new(),
            evals: BTreeMap::new(),
            pending_evals: BTreeMap::new(),
            accusations: BTreeSet::new(),
            apologies: BTreeMap::new(),
        })
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

    pub fn num_keypers(&self) -> u64 {
        self.num_keypers
    }

    /// The current local phase. Only ever advances.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn ensure_phase(&self, expected: Phase) -> Result<(), Error> {
        if self.phase != expected {
            return Err(Error::WrongPhase {
                expected,
                current: self.phase,
            });
        }
        Ok(())
    }

    fn ensure_member(&self, index: u64) -> Result<(), Error> {
        if index >= self.num_keypers {
            return Err(Error::UnknownSender(index));
        }
        Ok(())
    }

    /// Samples the polynomial and enters the dealing phase.
    ///
    /// Returns the commitment to publish and the private evaluations to
    /// deliver to the other keypers. The own evaluation is recorded
    /// directly and never takes the round trip through the log.
    #[instrument(level = "debug", skip_all, fields(eon = self.eon, keyper = self.keyper))]
    pub fn start_phase1_dealing<R: RngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(Gammas<B>, Vec<PolyEvalMsg<B>>), Error> {
        self.ensure_phase(Phase::Off)?;

        let polynomial = Polynomial::<B>::random(rng, (self.threshold - 1) as usize);
        let gammas = polynomial.gammas();

        self.evals
            .insert(self.keyper, polynomial.evaluate(&keyper_x::<B>(self.keyper)));

        let evals = (0..self.num_keypers)
            .filter(|j| *j != self.keyper)
            .map(|receiver| PolyEvalMsg {
                eon: self.eon,
                sender: self.keyper,
                receiver,
                eval: polynomial.evaluate(&keyper_x::<B>(receiver)),
            })
            .collect();

        self.polynomial = Some(polynomial);
        self.phase = Phase::Dealing;
        Ok((gammas, evals))
    }

    /// Records a dealer's commitment. Accepted only while dealing; the
    /// commitment must have exactly `threshold` entries.
    pub fn handle_poly_commitment_msg(&mut self, msg: PolyCommitmentMsg<B>) -> Result<(), Error> {
        self.ensure_phase(Phase::Dealing)?;
        self.ensure_member(msg.sender)?;
        msg.gammas.ensure_len(self.threshold as usize)?;

        if self.commitments.contains_key(&msg.sender) {
            debug!(eon = self.eon, sender = msg.sender, "duplicate commitment ignored");
            return Ok(());
        }

        // A queued eval can now be checked against the commitment.
        if let Some(eval) = self.pending_evals.remove(&msg.sender) {
            if msg.gammas.verify_eval(&keyper_x::<B>(self.keyper), &eval) {
                self.evals.insert(msg.sender, eval);
            } else {
                warn!(
                    eon = self.eon,
                    sender = msg.sender,
                    "queued eval does not match late commitment"
                );
            }
        }

        self.commitments.insert(msg.sender, msg.gammas);
        Ok(())
    }

    /// Records a private evaluation addressed to this keyper. If the
    /// dealer's commitment has not arrived yet, the eval is queued until
    /// it does or the dealing phase ends.
    pub fn handle_poly_eval_msg(&mut self, msg: PolyEvalMsg<B>) -> Result<(), Error> {
        self.ensure_phase(Phase::Dealing)?;
        if msg.receiver != self.keyper {
            return Err(Error::StateInvariant("poly eval not addressed to this keyper"));
        }
        if msg.sender == self.keyper {
            return Err(Error::StateInvariant(
                "own poly eval must not be consumed from the log",
            ));
        }
        self.ensure_member(msg.sender)?;

        if self.evals.contains_key(&msg.sender) {
            debug!(eon = self.eon, sender = msg.sender, "duplicate poly eval ignored");
            return Ok(());
        }

        match self.commitments.get(&msg.sender) {
            Some(gammas) => {
                if !gammas.verify_eval(&keyper_x::<B>(self.keyper), &msg.eval) {
                    return Err(Error::BadShare { sender: msg.sender });
                }
                self.evals.insert(msg.sender, msg.eval);
            }
            None => {
                self.pending_evals.entry(msg.sender).or_insert(msg.eval);
            }
        }
        Ok(())
    }

    /// Ends the dealing phase and emits one accusation for every dealer
    /// that failed to publish a commitment or to deliver a verifying
    /// evaluation.
    #[instrument(level = "debug", skip_all, fields(eon = self.eon, keyper = self.keyper))]
    pub fn start_phase2_accusing(&mut self) -> Result<Vec<AccusationMsg>, Error> {
        self.ensure_phase(Phase::Dealing)?;
        self.phase = Phase::Accusing;

        if !self.pending_evals.is_empty() {
            warn!(
                eon = self.eon,
                count = self.pending_evals.len(),
                "dropping evals whose commitments never arrived"
            );
            self.pending_evals.clear();
        }

        let accusations = (0..self.num_keypers)
            .filter(|dealer| {
                !self.commitments.contains_key(dealer) || !self.evals.contains_key(dealer)
            })
            .map(|accused| AccusationMsg {
                eon: self.eon,
                accuser: self.keyper,
                accused,
            })
            .collect();
        Ok(accusations)
    }

    /// Records an accusation. Accepted only while accusing.
    pub fn handle_accusation_msg(&mut self, msg: AccusationMsg) -> Result<(), Error> {
        self.ensure_phase(Phase::Accusing)?;
        self.ensure_member(msg.accuser)?;
        self.ensure_member(msg.accused)?;
        self.accusations.insert((msg.accuser, msg.accused));
        Ok(())
    }

    /// Ends the accusing phase and emits one apology for every accusation
    /// against this keyper, revealing the accuser's evaluation so that
    /// everyone can check it.
    #[instrument(level = "debug", skip_all, fields(eon = self.eon, keyper = self.keyper))]
    pub fn start_phase3_apologizing(&mut self) -> Result<Vec<ApologyMsg<B>>, Error> {
        self.ensure_phase(Phase::Accusing)?;
        self.phase = Phase::Apologizing;

        let polynomial = self
            .polynomial
            .as_ref()
            .ok_or(Error::StateInvariant("no polynomial after dealing"))?;

        let apologies = self
            .accusations
            .iter()
            .filter(|(_, accused)| *accused == self.keyper)
            .map(|(accuser, _)| ApologyMsg {
                eon: self.eon,
                accuser: *accuser,
                accused: self.keyper,
                eval: polynomial.evaluate(&keyper_x::<B>(*accuser)),
            })
            .collect();
        Ok(apologies)
    }

    /// Records an apology if it verifies against the accused dealer's
    /// commitment; a non-verifying apology leaves the accusation
    /// unresolved.
    pub fn handle_apology_msg(&mut self, msg: ApologyMsg<B>) -> Result<(), Error> {
        self.ensure_phase(Phase::Apologizing)?;
        self.ensure_member(msg.accuser)?;
        self.ensure_member(msg.accused)?;

        if self.apologies.contains_key(&(msg.accuser, msg.accused)) {
            debug!(
                eon = self.eon,
                accuser = msg.accuser,
                accused = msg.accused,
                "duplicate apology ignored"
            );
            return Ok(());
        }

        let verified = self
            .commitments
            .get(&msg.accused)
            .is_some_and(|gammas| gammas.verify_eval(&keyper_x::<B>(msg.accuser), &msg.eval));
        if !verified {
            return Err(Error::BadShare { sender: msg.accused });
        }

        self.apologies.insert((msg.accuser, msg.accused), msg.eval);
        Ok(())
    }

    /// Ends the apologizing phase.
    pub fn finalize(&mut self) -> Result<(), Error> {
        self.ensure_phase(Phase::Apologizing)?;
        self.phase = Phase::Finalized;
        Ok(())
    }

    /// Whether the given dealer has an unresolved accusation, i.e. one
    /// without a verified apology.
    fn has_unresolved_accusation(&self, dealer: u64) -> bool {
        self.accusations
            .iter()
            .any(|(accuser, accused)| *accused == dealer && !self.apologies.contains_key(&(*accuser, dealer)))
    }

    /// Computes the key material from the qualified dealers.
    ///
    /// A dealer qualifies if its commitment was accepted, an evaluation
    /// for this keyper is available (directly or from a verified
    /// apology), and no accusation against it remained unresolved. Fails
    /// with [`Error::ThresholdNotMet`] if fewer than `threshold` dealers
    /// qualify. The secret polynomial is destroyed here.
    #[instrument(level = "info", skip_all, fields(eon = self.eon, keyper = self.keyper))]
    pub fn compute_result(&mut self) -> Result<DkgResult<B>, Error> {
        self.ensure_phase(Phase::Finalized)?;

        let mut qualified = BTreeSet::new();
        let mut evals = Vec::new();
        let mut gammas = Vec::new();
        for dealer in 0..self.num_keypers {
            let Some(commitment) = self.commitments.get(&dealer) else {
                continue;
            };
            if self.has_unresolved_accusation(dealer) {
                continue;
            }
            let eval = self
                .evals
                .get(&dealer)
                .or_else(|| self.apologies.get(&(self.keyper, dealer)));
            let Some(eval) = eval else {
                continue;
            };
            qualified.insert(dealer);
            evals.push(*eval);
            gammas.push(commitment.clone());
        }

        if (qualified.len() as u64) < self.threshold {
            return Err(Error::ThresholdNotMet {
                available: qualified.len(),
                threshold: self.threshold as usize,
            });
        }

        self.polynomial = None;

        Ok(DkgResult {
            eon: self.eon,
            num_keypers: self.num_keypers,
            threshold: self.threshold,
            keyper: self.keyper,
            eon_secret_key_share: compute_eon_secret_key_share::<B>(&evals),
            eon_public_key: compute_eon_public_key(&gammas),
            eon_public_key_shares: compute_eon_public_key_shares(self.num_keypers, &gammas),
            qualified,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{CurvePoint, FieldElement, PairingEngine, scheme::compute_epoch_id};

    type Dkg = PureDkg<PairingEngine>;
    type Scalar = <PairingEngine as PairingBackend>::Scalar;

    /// Runs the dealing phase for `n` keypers and routes all messages,
    /// optionally tampering with them first.
    fn run_dealing(
        rng: &mut ChaCha20Rng,
        dkgs: &mut [Dkg],
        tamper: impl Fn(&mut PolyEvalMsg<PairingEngine>),
    ) {
        let mut commitments = Vec::new();
        let mut evals = Vec::new();
        for dkg in dkgs.iter_mut() {
            let (gammas, mut outgoing) = dkg.start_phase1_dealing(rng).unwrap();
            commitments.push(PolyCommitmentMsg {
                eon: dkg.eon(),
                sender: dkg.keyper(),
                gammas,
            });
            for msg in &mut outgoing {
                tamper(msg);
            }
            evals.extend(outgoing);
        }
        for commitment in commitments {
            for dkg in dkgs.iter_mut() {
                dkg.handle_poly_commitment_msg(commitment.clone()).unwrap();
            }
        }
        for msg in evals {
            let _ = dkgs[msg.receiver as usize].handle_poly_eval_msg(msg);
        }
    }

    /// Routes accusations and apologies and finalizes every keyper.
    fn run_tail(dkgs: &mut [Dkg]) -> Vec<Result<DkgResult<PairingEngine>, Error>> {
        let mut accusations = Vec::new();
        for dkg in dkgs.iter_mut() {
            accusations.extend(dkg.start_phase2_accusing().unwrap());
        }
        for msg in &accusations {
            for dkg in dkgs.iter_mut() {
                dkg.handle_accusation_msg(*msg).unwrap();
            }
        }

        let mut apologies = Vec::new();
        for dkg in dkgs.iter_mut() {
            apologies.extend(dkg.start_phase3_apologizing().unwrap());
        }
        for msg in &apologies {
            for dkg in dkgs.iter_mut() {
                let _ = dkg.handle_apology_msg(msg.clone());
            }
        }

        dkgs.iter_mut()
            .map(|dkg| {
                dkg.finalize().unwrap();
                dkg.compute_result()
            })
            .collect()
    }

    fn new_dkgs(n: u64, t: u64) -> Vec<Dkg> {
        (0..n).map(|k| Dkg::new(5, n, t, k).unwrap()).collect()
    }

    #[test]
    fn honest_run_agrees_on_the_eon_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(71);
        let mut dkgs = new_dkgs(3, 2);
        run_dealing(&mut rng, &mut dkgs, |_| {});
        let results: Vec<_> = run_tail(&mut dkgs)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for result in &results {
            assert_eq!(result.qualified.len(), 3);
            assert_eq!(result.eon_public_key, results[0].eon_public_key);
            assert_eq!(
                result.eon_public_key_shares,
                results[0].eon_public_key_shares
            );
        }
        // Each secret share matches its public counterpart.
        let epoch_id = compute_epoch_id::<PairingEngine>(0);
        for result in &results {
            let share = crate::scheme::compute_epoch_secret_key_share(
                &result.eon_secret_key_share,
                &epoch_id,
            );
            assert!(
                crate::scheme::verify_epoch_secret_key_share(
                    &share,
                    &result.eon_public_key_shares[result.keyper as usize],
                    &epoch_id
                )
                .unwrap()
            );
        }
    }

    #[test]
    fn wrong_phase_messages_are_rejected() {
        let mut dkg = Dkg::new(1, 3, 2, 0).unwrap();
        let msg = AccusationMsg {
            eon: 1,
            accuser: 1,
            accused: 2,
        };
        assert!(matches!(
            dkg.handle_accusation_msg(msg),
            Err(Error::WrongPhase { .. })
        ));
    }

    #[test]
    fn phase_transitions_only_advance() {
        let mut rng = ChaCha20Rng::seed_from_u64(72);
        let mut dkg = Dkg::new(1, 3, 2, 0).unwrap();
        assert_eq!(dkg.phase(), Phase::Off);
        dkg.start_phase1_dealing(&mut rng).unwrap();
        assert_eq!(dkg.phase(), Phase::Dealing);
        assert!(dkg.start_phase1_dealing(&mut rng).is_err());
        dkg.start_phase2_accusing().unwrap();
        dkg.start_phase3_apologizing().unwrap();
        dkg.finalize().unwrap();
        assert_eq!(dkg.phase(), Phase::Finalized);
    }

    #[test]
    fn commitment_with_wrong_length_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(73);
        let mut dkg = Dkg::new(1, 3, 2, 0).unwrap();
        dkg.start_phase1_dealing(&mut rng).unwrap();

        let gammas = Polynomial::<PairingEngine>::random(&mut rng, 2).gammas();
        let msg = PolyCommitmentMsg {
            eon: 1,
            sender: 1,
            gammas,
        };
        assert!(matches!(
            dkg.handle_poly_commitment_msg(msg),
            Err(Error::DegreeMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn eval_queued_until_commitment_arrives() {
        let mut rng = ChaCha20Rng::seed_from_u64(74);
        let mut dkg = Dkg::new(1, 2, 2, 0).unwrap();
        dkg.start_phase1_dealing(&mut rng).unwrap();

        let dealer_poly = Polynomial::<PairingEngine>::random(&mut rng, 1);
        let eval = dealer_poly.evaluate(&keyper_x::<PairingEngine>(0));

        dkg.handle_poly_eval_msg(PolyEvalMsg {
            eon: 1,
            sender: 1,
            receiver: 0,
            eval,
        })
        .unwrap();
        // Not yet usable: the commitment is missing.
        assert!(!dkg.evals.contains_key(&1));

        dkg.handle_poly_commitment_msg(PolyCommitmentMsg {
            eon: 1,
            sender: 1,
            gammas: dealer_poly.gammas(),
        })
        .unwrap();
        assert!(dkg.evals.contains_key(&1));
    }

    #[test]
    fn tampered_eval_leads_to_one_accusation() {
        let mut rng = ChaCha20Rng::seed_from_u64(75);
        let mut dkgs = new_dkgs(3, 2);
        // Keyper 1 garbles the eval it sends to keyper 0.
        run_dealing(&mut rng, &mut dkgs, |msg| {
            if msg.sender == 1 && msg.receiver == 0 {
                msg.eval += Scalar::one();
            }
        });

        let accusations = dkgs[0].start_phase2_accusing().unwrap();
        assert_eq!(
            accusations,
            vec![AccusationMsg {
                eon: 5,
                accuser: 0,
                accused: 1
            }]
        );
        // The other keypers saw nothing wrong.
        assert!(dkgs[2].start_phase2_accusing().unwrap().is_empty());
    }

    #[test]
    fn verified_apology_requalifies_the_dealer() {
        let mut rng = ChaCha20Rng::seed_from_u64(76);
        let mut dkgs = new_dkgs(3, 2);
        run_dealing(&mut rng, &mut dkgs, |msg| {
            if msg.sender == 1 && msg.receiver == 0 {
                msg.eval += Scalar::one();
            }
        });

        let results: Vec<_> = run_tail(&mut dkgs)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        for result in &results {
            assert_eq!(result.qualified.len(), 3, "apology should resolve the accusation");
            assert_eq!(result.eon_public_key, results[0].eon_public_key);
        }
    }

    #[test]
    fn silent_dealer_is_disqualified() {
        let mut rng = ChaCha20Rng::seed_from_u64(77);
        let mut dkgs = new_dkgs(3, 2);

        // Keyper 2 deals but none of its messages get delivered.
        let mut commitments = Vec::new();
        let mut evals = Vec::new();
        for dkg in dkgs.iter_mut() {
            let (gammas, outgoing) = dkg.start_phase1_dealing(&mut rng).unwrap();
            if dkg.keyper() != 2 {
                commitments.push(PolyCommitmentMsg {
                    eon: dkg.eon(),
                    sender: dkg.keyper(),
                    gammas,
                });
                evals.extend(outgoing);
            }
        }
        for commitment in commitments {
            for dkg in dkgs.iter_mut() {
                dkg.handle_poly_commitment_msg(commitment.clone()).unwrap();
            }
        }
        for msg in evals {
            if msg.receiver != 2 {
                dkgs[msg.receiver as usize].handle_poly_eval_msg(msg).unwrap();
            }
        }

        let results = run_tail(&mut dkgs[..2]);
        for result in results {
            let result = result.unwrap();
            assert_eq!(result.qualified, BTreeSet::from([0, 1]));
            // pk = Γ_0[0] + Γ_1[0], dealer 2 contributes nothing.
            let expected = dkgs[0].commitments[&0].points()[0]
                .add(&dkgs[0].commitments[&1].points()[0]);
            assert_eq!(result.eon_public_key.0, expected);
        }
    }

    #[test]
    fn too_few_qualified_dealers_fails_finalization() {
        let mut rng = ChaCha20Rng::seed_from_u64(78);
        // Two of three dealers stay silent; threshold 2 cannot be met.
        let mut dkg = Dkg::new(9, 3, 2, 0).unwrap();
        dkg.start_phase1_dealing(&mut rng).unwrap();
        dkg.start_phase2_accusing().unwrap();
        dkg.start_phase3_apologizing().unwrap();
        dkg.finalize().unwrap();
        assert!(matches!(
            dkg.compute_result(),
            Err(Error::ThresholdNotMet {
                available: 0,
                threshold: 2
            })
        ));
    }

    #[test]
    fn own_eval_from_log_is_an_invariant_violation() {
        let mut rng = ChaCha20Rng::seed_from_u64(79);
        let mut dkg = Dkg::new(1, 3, 2, 0).unwrap();
        dkg.start_phase1_dealing(&mut rng).unwrap();
        let msg = PolyEvalMsg {
            eon: 1,
            sender: 0,
            receiver: 0,
            eval: Scalar::one(),
        };
        assert!(matches!(
            dkg.handle_poly_eval_msg(msg),
            Err(Error::StateInvariant(_))
        ));
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(80);
        let mut dkg = Dkg::new(1, 3, 2, 0).unwrap();
        dkg.start_phase1_dealing(&mut rng).unwrap();
        let msg = PolyEvalMsg {
            eon: 1,
            sender: 7,
            receiver: 0,
            eval: Scalar::one(),
        };
        assert!(matches!(
            dkg.handle_poly_eval_msg(msg),
            Err(Error::UnknownSender(7))
        ));
    }

    #[test]
    fn own_eval_without_own_commitment_still_accuses_self() {
        // If our own commitment never shows up in the log, we accuse
        // ourselves like any other silent dealer.
        let mut rng = ChaCha20Rng::seed_from_u64(81);
        let mut dkg = Dkg::new(1, 2, 1, 0).unwrap();
        dkg.start_phase1_dealing(&mut rng).unwrap();
        let accusations = dkg.start_phase2_accusing().unwrap();
        assert!(accusations.iter().any(|a| a.accused == 0));
    }
}
