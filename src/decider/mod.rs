//! The per-step orchestration of the keyper protocols.
//!
//! [`Decider::decide`] is invoked by the outer runtime whenever the
//! observed hub or main chain state changes. It reads the fresh suffix of
//! each observed event category, drives every key generation and epoch
//! key generation session forward, and appends the resulting [`Action`]s
//! in a fixed order. It is pure of side effects: only the [`State`] and
//! the action list are mutated, and running it twice on unchanged
//! observed state emits nothing new.
//!
//! Per step, in order:
//!
//! 1. no-op unless this address is a keyper
//! 2. check in, if not yet checked in
//! 3. vote for new batch configs seen on the main chain
//! 4. start key generation for newly observed eons
//! 5. drive every key generation session (phase starts + log suffixes)
//! 6. send queued poly evals whose receivers' keys are now known
//! 7. publish own epoch secret key shares and drive epoch key sessions
//! 8. execute batches when it is this keyper's turn
//! 9. appeal accusations raised against this keyper

mod actions;
pub use actions::*;

use std::collections::BTreeSet;

use rand_core::RngCore;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    Error, FieldElement, PairingBackend,
    config::KeyperConfig,
    dkg::{
        AccusationMsg, ApologyMsg, EpochKeyGenerator, EpochSecretKeyShareMsg, Phase,
        PhaseSchedule, PolyCommitmentMsg, PolyEvalMsg, PureDkg,
    },
    messages::Message,
    observe::{Address, Batch, Eon, Hub, MainChain},
    peer_enc::PeerCipher,
};

/// Hook supplying the decrypted transactions of a cipher batch.
///
/// The selection policy (which votes count, how ties break) is owned by
/// the caller; without a source, cipher batches execute with an empty
/// transaction list.
pub trait CipherTransactionSource {
    fn transactions_for_batch(&self, batch_index: u64) -> Vec<Vec<u8>>;
}

/// Hook producing the authorization for appealing an accusation.
pub trait AppealAuthorizer {
    fn authorize(&self, half_step: u64) -> AppealAuthorization;
}

/// Position of an address in a keyper roster.
fn keyper_index(keypers: &[Address], address: &Address) -> Option<u64> {
    keypers.iter().position(|k| k == address).map(|i| i as u64)
}

/// Local state of one active key generation session.
///
/// The cursors index into the corresponding event vectors of the
/// observed [`Eon`] and only ever advance; replaying an already consumed
/// suffix is a no-op.
pub struct DkgSession<B: PairingBackend> {
    pub eon: u64,
    pub keypers: Vec<Address>,
    pub pure: PureDkg<B>,
    pub commitments_index: usize,
    pub poly_evals_index: usize,
    pub accusations_index: usize,
    pub apologies_index: usize,
    /// Poly evals waiting for their receivers' encryption keys.
    pub outgoing_poly_evals: Vec<PolyEvalMsg<B>>,
}

impl<B: PairingBackend> DkgSession<B> {
    fn new(eon: u64, keypers: Vec<Address>, pure: PureDkg<B>) -> Self {
        Self {
            eon,
            keypers,
            pure,
            commitments_index: 0,
            poly_evals_index: 0,
            accusations_index: 0,
            apologies_index: 0,
            outgoing_poly_evals: Vec::new(),
        }
    }

    fn sync_commitments(&mut self, eon: &Eon<B>, schedule: &PhaseSchedule) {
        for event in &eon.commitments[self.commitments_index..] {
            let phase = schedule.phase_at(event.height, eon.start_height);
            if phase != Phase::Dealing {
                warn!(eon = self.eon, %event.sender, %phase, "commitment arrived in wrong phase");
                continue;
            }
            let Some(sender) = keyper_index(&self.keypers, &event.sender) else {
                continue;
            };
            if let Err(err) = self.pure.handle_poly_commitment_msg(PolyCommitmentMsg {
                eon: event.eon,
                sender,
                gammas: event.gammas.clone(),
            }) {
                warn!(eon = self.eon, sender, %err, "cannot handle commitment");
            }
        }
        self.commitments_index = eon.commitments.len();
    }

    fn sync_poly_evals(
        &mut self,
        eon: &Eon<B>,
        schedule: &PhaseSchedule,
        cipher: &impl PeerCipher,
    ) {
        let my_index = self.pure.keyper();
        for event in &eon.poly_evals[self.poly_evals_index..] {
            let phase = schedule.phase_at(event.height, eon.start_height);
            if phase != Phase::Dealing {
                warn!(eon = self.eon, %event.sender, %phase, "poly eval arrived in wrong phase");
                continue;
            }
            let Some(sender) = keyper_index(&self.keypers, &event.sender) else {
                continue;
            };
            // Our own eval was recorded at dealing time and never takes
            // the round trip through the log.
            if sender == my_index {
                continue;
            }

            for (receiver, encrypted) in event.receivers.iter().zip(&event.encrypted_evals) {
                let Some(receiver_index) = keyper_index(&self.keypers, receiver) else {
                    warn!(eon = self.eon, %receiver, "poly eval for unknown receiver");
                    continue;
                };
                if receiver_index != my_index {
                    continue;
                }
                let eval_bytes = match cipher.decrypt(encrypted) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(eon = self.eon, sender, %err, "cannot decrypt poly eval");
                        continue;
                    }
                };
                let eval = match B::Scalar::from_bytes_be(&eval_bytes) {
                    Ok(eval) => eval,
                    Err(err) => {
                        warn!(eon = self.eon, sender, %err, "poly eval is not a scalar");
                        continue;
                    }
                };
                if let Err(err) = self.pure.handle_poly_eval_msg(PolyEvalMsg {
                    eon: event.eon,
                    sender,
                    receiver: my_index,
                    eval,
                }) {
                    warn!(eon = self.eon, sender, %err, "cannot handle poly eval");
                }
            }
        }
        self.poly_evals_index = eon.poly_evals.len();
    }

    fn sync_accusations(&mut self, eon: &Eon<B>, schedule: &PhaseSchedule) {
        for event in &eon.accusations[self.accusations_index..] {
            let phase = schedule.phase_at(event.height, eon.start_height);
            if phase != Phase::Accusing {
                warn!(eon = self.eon, %event.sender, %phase, "accusation arrived in wrong phase");
                continue;
            }
            let Some(accuser) = keyper_index(&self.keypers, &event.sender) else {
                warn!(eon = self.eon, %event.sender, "accusation from unknown sender");
                continue;
            };
            for accused_address in &event.accused {
                let Some(accused) = keyper_index(&self.keypers, accused_address) else {
                    warn!(eon = self.eon, %accused_address, "accusation against unknown keyper");
                    continue;
                };
                if let Err(err) = self.pure.handle_accusation_msg(AccusationMsg {
                    eon: self.eon,
                    accuser,
                    accused,
                }) {
                    warn!(eon = self.eon, accuser, accused, %err, "cannot handle accusation");
                }
            }
        }
        self.accusations_index = eon.accusations.len();
    }

    fn sync_apologies(&mut self, eon: &Eon<B>, schedule: &PhaseSchedule) {
        for event in &eon.apologies[self.apologies_index..] {
            let phase = schedule.phase_at(event.height, eon.start_height);
            if phase != Phase::Apologizing {
                warn!(eon = self.eon, %event.sender, %phase, "apology arrived in wrong phase");
                continue;
            }
            let Some(accused) = keyper_index(&self.keypers, &event.sender) else {
                warn!(eon = self.eon, %event.sender, "apology from unknown sender");
                continue;
            };
            for (accuser_address, eval) in event.accusers.iter().zip(&event.poly_evals) {
                let Some(accuser) = keyper_index(&self.keypers, accuser_address) else {
                    warn!(eon = self.eon, %accuser_address, "apology to unknown accuser");
                    continue;
                };
                if let Err(err) = self.pure.handle_apology_msg(ApologyMsg {
                    eon: self.eon,
                    accuser,
                    accused,
                    eval: *eval,
                }) {
                    warn!(eon = self.eon, accuser, accused, %err, "cannot handle apology");
                }
            }
        }
        self.apologies_index = eon.apologies.len();
    }
}

/// Local state of one epoch key generation session.
pub struct EkgSession<B: PairingBackend> {
    pub eon: u64,
    pub keypers: Vec<Address>,
    pub epoch_kg: EpochKeyGenerator<B>,
    pub epoch_secret_key_shares_index: usize,
}

impl<B: PairingBackend> EkgSession<B> {
    fn sync(&mut self, eon: &Eon<B>) {
        for event in &eon.epoch_secret_key_shares[self.epoch_secret_key_shares_index..] {
            let Some(sender) = keyper_index(&self.keypers, &event.sender) else {
                continue;
            };
            if self.epoch_kg.secret_key(event.epoch).is_some() {
                continue;
            }
            let msg = EpochSecretKeyShareMsg {
                eon: event.eon,
                epoch: event.epoch,
                sender,
                share: event.share,
            };
            if let Err(err) = self.epoch_kg.handle_epoch_secret_key_share(&msg) {
                warn!(eon = self.eon, sender, %err, "cannot handle epoch secret key share");
                continue;
            }
            if self.epoch_kg.secret_key(event.epoch).is_some() {
                info!(eon = self.eon, epoch = event.epoch, "epoch secret key generated");
            }
        }
        self.epoch_secret_key_shares_index = eon.epoch_secret_key_shares.len();
    }
}

/// The keyper's persistent protocol state, owned by exactly one Decider
/// at a time.
pub struct State<B: PairingBackend> {
    pub checkin_sent: bool,
    pub last_sent_batch_config_index: u64,
    pub last_eon_started: u64,
    pub dkgs: Vec<DkgSession<B>>,
    pub ekgs: Vec<EkgSession<B>>,
    /// The half step an execution tx is pending for, cleared once the
    /// chain advances past it.
    pub pending_half_step: Option<u64>,
    /// Half steps an appeal tx is pending for.
    pub pending_appeals: BTreeSet<u64>,
    pub last_epoch_secret_share_sent: u64,
}

impl<B: PairingBackend> Default for State<B> {
    fn default() -> Self {
        Self {
            checkin_sent: false,
            last_sent_batch_config_index: 0,
            last_eon_started: 0,
            dkgs: Vec::new(),
            ekgs: Vec::new(),
            pending_half_step: None,
            pending_appeals: BTreeSet::new(),
            last_epoch_secret_share_sent: 0,
        }
    }
}

/// Decides on the next actions to take based on the internal [`State`]
/// and the current observed hub and main chain state, for a single step.
///
/// Create a fresh Decider per step; the actions to run end up in
/// [`actions`](Decider::actions), ordered as they must be submitted.
pub struct Decider<'a, B: PairingBackend, C: PeerCipher, R: RngCore> {
    config: &'a KeyperConfig,
    cipher: &'a C,
    rng: &'a mut R,
    state: &'a mut State<B>,
    hub: &'a Hub<B>,
    main_chain: &'a MainChain,
    tx_source: Option<&'a dyn CipherTransactionSource>,
    appeal_authorizer: Option<&'a dyn AppealAuthorizer>,
    /// The actions decided on so far, in submission order.
    pub actions: Vec<Action<B>>,
}

impl<'a, B: PairingBackend, C: PeerCipher, R: RngCore> Decider<'a, B, C, R> {
    pub fn new(
        config: &'a KeyperConfig,
        cipher: &'a C,
        rng: &'a mut R,
        state: &'a mut State<B>,
        hub: &'a Hub<B>,
        main_chain: &'a MainChain,
    ) -> Self {
        Self {
            config,
            cipher,
            rng,
            state,
            hub,
            main_chain,
            tx_source: None,
            appeal_authorizer: None,
            actions: Vec::new(),
        }
    }

    pub fn with_transaction_source(mut self, source: &'a dyn CipherTransactionSource) -> Self {
        self.tx_source = Some(source);
        self
    }

    pub fn with_appeal_authorizer(mut self, authorizer: &'a dyn AppealAuthorizer) -> Self {
        self.appeal_authorizer = Some(authorizer);
        self
    }

    fn parts(&mut self) -> (&mut State<B>, &mut R, &mut Vec<Action<B>>) {
        let Self {
            state,
            rng,
            actions,
            ..
        } = self;
        (&mut **state, &mut **rng, actions)
    }

    fn add_action(&mut self, action: Action<B>) {
        debug!(action = %action, "decided");
        self.actions.push(action);
    }

    fn send_hub_message(&mut self, description: String, msg: Message<B>) {
        self.add_action(Action::SendHubMessage { description, msg });
    }

    /// Determines the next actions to run.
    #[instrument(level = "debug", skip_all, fields(address = %self.config.address))]
    pub fn decide(&mut self) {
        // Nothing to do unless we're registered as a keyper on the hub.
        if !self.hub.is_keyper(&self.config.address) {
            info!("not registered as keyper on the hub chain, nothing to do");
            return;
        }
        self.maybe_send_check_in();
        self.maybe_send_batch_config();
        self.maybe_start_dkg();
        self.handle_dkgs();
        self.handle_epoch_kg();
        self.maybe_execute_batch();
        self.maybe_appeal();
    }

    fn should_send_check_in(&self) -> bool {
        if self.state.checkin_sent {
            return false;
        }
        if self.hub.is_checked_in(&self.config.address) {
            return false;
        }
        self.hub.is_keyper(&self.config.address)
    }

    fn maybe_send_check_in(&mut self) {
        if !self.should_send_check_in() {
            return;
        }
        let msg = Message::CheckIn {
            validator_public_key: self.config.validator_public_key.clone(),
            encryption_public_key: self.cipher.public_key_bytes(),
        };
        self.send_hub_message("check-in".into(), msg);
        self.state.checkin_sent = true;
    }

    fn maybe_send_batch_config(&mut self) {
        let Some(last) = self.hub.batch_configs.last() else {
            info!("hub chain is not bootstrapped");
            return;
        };
        let config_index = last.config_index + 1;
        if config_index <= self.state.last_sent_batch_config_index {
            return; // already voted for this one
        }
        let Some(main_config) = self
            .main_chain
            .batch_configs
            .get(config_index as usize)
        else {
            return;
        };
        let msg = Message::BatchConfig {
            start_batch_index: main_config.start_batch_index,
            keypers: main_config.keypers.clone(),
            threshold: main_config.threshold,
            config_contract_address: self.config.config_contract_address,
            config_index,
            started: false,
            validators_updated: false,
        };
        self.send_hub_message(format!("batch config, index={config_index}"), msg);
        self.state.last_sent_batch_config_index = config_index;
    }

    /// Votes for starting a new eon at the given batch index. Not part
    /// of the regular step; exposed for the outer runtime.
    pub fn send_eon_start_vote(&mut self, start_batch_index: u64) {
        self.send_hub_message(
            format!("eon start vote, start_batch_index={start_batch_index}"),
            Message::EonStartVote { start_batch_index },
        );
    }

    fn maybe_start_dkg(&mut self) {
        let hub = self.hub;
        for eon in &hub.eons {
            if eon.eon > self.state.last_eon_started {
                self.start_dkg(eon);
                self.state.last_eon_started = eon.eon;
            }
        }
    }

    fn start_dkg(&mut self, eon: &Eon<B>) {
        let Some(batch_config) = self
            .hub
            .find_batch_config_by_batch_index(eon.start_batch_index)
        else {
            warn!(eon = eon.eon, "no batch config for newly started eon");
            return;
        };
        let Some(own_index) = keyper_index(&batch_config.keypers, &self.config.address) else {
            return; // not part of this eon's keyper set
        };
        match PureDkg::new(
            eon.eon,
            batch_config.keypers.len() as u64,
            batch_config.threshold,
            own_index,
        ) {
            Ok(pure) => {
                self.state
                    .dkgs
                    .push(DkgSession::new(eon.eon, batch_config.keypers.clone(), pure));
            }
            Err(err) => {
                error!(eon = eon.eon, %err, "cannot create key generation session");
            }
        }
    }

    fn handle_dkgs(&mut self) {
        let hub = self.hub;
        for i in 0..self.state.dkgs.len() {
            let eon_id = self.state.dkgs[i].eon;
            let Some(eon) = hub.find_eon(eon_id) else {
                // A session exists only for observed eons and the log is
                // append-only; this is a bug in the observer.
                error!(eon = eon_id, "observed eon disappeared");
                continue;
            };
            self.sync_dkg_with_eon(i, eon);
            self.send_poly_evals(i);
        }
    }

    fn sync_dkg_with_eon(&mut self, i: usize, eon: &Eon<B>) {
        let schedule = self.config.phase_schedule;
        let cipher = self.cipher;
        let phase_now = schedule.phase_at(self.hub.current_block, eon.start_height);

        if self.state.dkgs[i].pure.phase() == Phase::Off && phase_now >= Phase::Dealing {
            self.start_phase1_dealing(i);
        }
        {
            let dkg = &mut self.state.dkgs[i];
            dkg.sync_commitments(eon, &schedule);
            dkg.sync_poly_evals(eon, &schedule, cipher);
        }

        if self.state.dkgs[i].pure.phase() == Phase::Dealing && phase_now >= Phase::Accusing {
            self.start_phase2_accusing(i);
        }
        self.state.dkgs[i].sync_accusations(eon, &schedule);

        if self.state.dkgs[i].pure.phase() == Phase::Accusing && phase_now >= Phase::Apologizing {
            self.start_phase3_apologizing(i);
        }
        self.state.dkgs[i].sync_apologies(eon, &schedule);

        if self.state.dkgs[i].pure.phase() == Phase::Apologizing && phase_now >= Phase::Finalized {
            self.dkg_finalize(i);
        }
    }

    fn start_phase1_dealing(&mut self, i: usize) {
        let result = {
            let (state, rng, _) = self.parts();
            state.dkgs[i].pure.start_phase1_dealing(rng)
        };
        match result {
            Ok((gammas, poly_evals)) => {
                let session = &mut self.state.dkgs[i];
                session.outgoing_poly_evals = poly_evals;
                let eon = session.eon;
                self.send_hub_message(
                    format!("poly commitment, eon={eon}"),
                    Message::PolyCommitment { eon, gammas },
                );
            }
            Err(err) => error!(%err, "cannot start dealing phase"),
        }
    }

    fn start_phase2_accusing(&mut self, i: usize) {
        match self.state.dkgs[i].pure.start_phase2_accusing() {
            Ok(accusations) => {
                let session = &self.state.dkgs[i];
                let eon = session.eon;
                let count = accusations.len();
                let accused = accusations
                    .iter()
                    .map(|a| session.keypers[a.accused as usize])
                    .collect();
                self.send_hub_message(
                    format!("accusations, eon={eon}, count={count}"),
                    Message::Accusation { eon, accused },
                );
            }
            Err(err) => error!(%err, "cannot start accusing phase"),
        }
    }

    fn start_phase3_apologizing(&mut self, i: usize) {
        match self.state.dkgs[i].pure.start_phase3_apologizing() {
            Ok(apologies) => {
                let session = &self.state.dkgs[i];
                let eon = session.eon;
                let count = apologies.len();
                let accusers = apologies
                    .iter()
                    .map(|a| session.keypers[a.accuser as usize])
                    .collect();
                let poly_evals = apologies.iter().map(|a| a.eval).collect();
                self.send_hub_message(
                    format!("apologies, eon={eon}, count={count}"),
                    Message::Apology {
                        eon,
                        accusers,
                        poly_evals,
                    },
                );
            }
            Err(err) => error!(%err, "cannot start apologizing phase"),
        }
    }

    fn dkg_finalize(&mut self, i: usize) {
        let session = &mut self.state.dkgs[i];
        if let Err(err) = session.pure.finalize() {
            error!(eon = session.eon, %err, "cannot finalize key generation");
            return;
        }
        match session.pure.compute_result() {
            Ok(result) => {
                info!(
                    eon = session.eon,
                    qualified = result.qualified.len(),
                    "key generation finalized"
                );
                let ekg = EkgSession {
                    eon: session.eon,
                    keypers: session.keypers.clone(),
                    epoch_kg: EpochKeyGenerator::new(&result),
                    epoch_secret_key_shares_index: 0,
                };
                self.state.ekgs.push(ekg);
            }
            Err(err) => {
                error!(eon = session.eon, %err, "key generation failed");
            }
        }
    }

    /// Sends the queued poly evals that have become sendable: a poly
    /// eval can only be sent once the receiver's encryption key is
    /// known. Past the dealing phase it is too late; the queue is
    /// dropped with a warning and never retried.
    fn send_poly_evals(&mut self, i: usize) {
        if self.state.dkgs[i].outgoing_poly_evals.is_empty() {
            return;
        }
        if self.state.dkgs[i].pure.phase() > Phase::Dealing {
            warn!(
                eon = self.state.dkgs[i].eon,
                count = self.state.dkgs[i].outgoing_poly_evals.len(),
                "dealing phase is over, dropping queued poly eval messages"
            );
            self.state.dkgs[i].outgoing_poly_evals.clear();
            return;
        }

        let hub = self.hub;
        let cipher = self.cipher;
        let (state, rng, actions) = {
            let Self {
                state,
                rng,
                actions,
                ..
            } = self;
            (&mut **state, &mut **rng, actions)
        };
        let session = &mut state.dkgs[i];
        let eon = session.eon;

        let outgoing = std::mem::take(&mut session.outgoing_poly_evals);
        let mut still_queued = Vec::new();
        let mut receivers = Vec::new();
        let mut encrypted_evals = Vec::new();
        for msg in outgoing {
            let receiver = session.keypers[msg.receiver as usize];
            match hub.encryption_key(&receiver) {
                Some(key) => match cipher.encrypt_to(rng, key, &msg.eval.to_bytes_be()) {
                    Ok(ciphertext) => {
                        receivers.push(receiver);
                        encrypted_evals.push(ciphertext);
                    }
                    Err(err) => {
                        warn!(eon, %receiver, %err, "cannot encrypt poly eval");
                        still_queued.push(msg);
                    }
                },
                None => still_queued.push(msg),
            }
        }

        if !receivers.is_empty() {
            let description = format!(
                "poly evals, eon={eon}, {} receivers, {} still queued",
                receivers.len(),
                still_queued.len()
            );
            actions.push(Action::SendHubMessage {
                description,
                msg: Message::PolyEval {
                    eon,
                    receivers,
                    encrypted_evals,
                },
            });
            if still_queued.is_empty() {
                info!(eon, "sent all poly eval messages");
            }
        }
        session.outgoing_poly_evals = still_queued;
    }

    fn handle_epoch_kg(&mut self) {
        self.publish_epoch_secret_key_shares();
        self.sync_ekgs();
    }

    fn publish_epoch_secret_key_shares(&mut self) {
        let main_chain = self.main_chain;
        let block = main_chain.current_block;
        let Some(active_index) = main_chain.active_config_index(block) else {
            return;
        };
        let main_config = &main_chain.batch_configs[active_index];
        // Only publish once the hub has adopted the same config.
        if self
            .hub
            .find_batch_config_by_config_index(main_config.config_index)
            .is_none()
        {
            return;
        }

        let current_batch_index = main_config.batch_index(block);
        for batch_index in self.state.last_epoch_secret_share_sent..current_batch_index {
            self.publish_epoch_secret_key_share(batch_index);
        }
    }

    fn publish_epoch_secret_key_share(&mut self, batch_index: u64) {
        let epoch = batch_index + 1;
        let Some(eon) = self.hub.find_eon_by_batch_index(batch_index) else {
            return;
        };
        let eon_id = eon.eon;
        let Some(ekg) = self.state.ekgs.iter().find(|e| e.eon == eon_id) else {
            warn!(eon = eon_id, "no epoch key generator for eon");
            return;
        };
        let share = ekg.epoch_kg.compute_epoch_secret_key_share(epoch).share;
        self.send_hub_message(
            format!("epoch secret key share, epoch={epoch} in eon={eon_id}"),
            Message::EpochSecretKeyShare {
                eon: eon_id,
                epoch,
                share,
            },
        );
        self.state.last_epoch_secret_share_sent = epoch;
    }

    fn sync_ekgs(&mut self) {
        let hub = self.hub;
        for ekg in self.state.ekgs.iter_mut() {
            let Some(eon) = hub.find_eon(ekg.eon) else {
                error!(eon = ekg.eon, "observed eon disappeared");
                continue;
            };
            ekg.sync(eon);
        }
    }

    /// The number of main chain blocks to wait before sending an
    /// execution tx: keypers take turns as first proposer round-robin by
    /// half step, so not everyone submits the same tx at once.
    pub fn execution_delay(&self, half_step: u64) -> Result<u64, Error> {
        let batch_index = half_step / 2;
        let config = self
            .main_chain
            .config_for_batch_index(batch_index)
            .ok_or_else(|| Error::InvalidConfig("no active config for batch".into()))?;
        let own_index = config
            .keyper_index(&self.config.address)
            .ok_or_else(|| Error::InvalidConfig("not a keyper in the active config".into()))?;
        let place = (half_step + own_index) % config.keypers.len() as u64;
        Ok(place * self.config.execution_staggering)
    }

    fn maybe_execute_batch(&mut self) {
        let main_chain = self.main_chain;
        let Some(config) = main_chain.current_config() else {
            return; // nothing to execute while no config is active
        };
        let batch_index = config.batch_index(main_chain.current_block);

        let next_half_step = main_chain.num_execution_half_steps;
        if let Some(pending) = self.state.pending_half_step {
            if next_half_step > pending {
                // The chain moved past the half step our tx was for.
                self.state.pending_half_step = None;
            }
        }
        if next_half_step >= batch_index * 2 {
            return; // everything has been executed already
        }
        self.maybe_execute_half_step(next_half_step);
    }

    fn maybe_execute_half_step(&mut self, next_half_step: u64) {
        if self.state.pending_half_step.is_some() {
            // A tx executing this or another half step is still pending;
            // wait for it to confirm first.
            return;
        }
        let main_chain = self.main_chain;
        let batch_index = next_half_step / 2;
        let Some(config) = main_chain.config_for_batch_index(batch_index) else {
            return;
        };
        let Some(own_index) = config.keyper_index(&self.config.address) else {
            return; // only keypers execute
        };
        let delay = match self.execution_delay(next_half_step) {
            Ok(delay) => delay,
            Err(err) => {
                error!(%err, "cannot compute execution delay");
                return;
            }
        };
        let execution_block = config.batch_end_block(batch_index) + delay;
        if main_chain.current_block < execution_block {
            return; // wait for the keypers ahead of us first
        }

        let batch = main_chain
            .batches
            .get(&batch_index)
            .cloned()
            .unwrap_or(Batch {
                batch_index,
                ..Batch::default()
            });
        let action = if next_half_step % 2 == 0 {
            let transactions = self
                .tx_source
                .map(|source| source.transactions_for_batch(batch_index))
                .unwrap_or_default();
            Action::ExecuteCipherBatch {
                half_step: next_half_step,
                cipher_batch_hash: batch.encrypted_batch_hash,
                transactions,
                keyper_index: own_index,
            }
        } else {
            Action::ExecutePlainBatch {
                half_step: next_half_step,
                transactions: batch.plain_transactions,
            }
        };
        self.state.pending_half_step = Some(next_half_step);
        self.add_action(action);
    }

    /// Drops pending appeals that the main chain has meanwhile recorded
    /// as appealed.
    fn sync_pending_appeals(&mut self) {
        let main_chain = self.main_chain;
        self.state.pending_appeals.retain(|half_step| {
            !main_chain
                .accusations
                .iter()
                .any(|a| a.half_step == *half_step && a.appealed)
        });
    }

    fn maybe_appeal(&mut self) {
        self.sync_pending_appeals();

        let half_steps: Vec<u64> = self
            .main_chain
            .accusations_against(&self.config.address)
            .filter(|accusation| !accusation.appealed)
            .map(|accusation| accusation.half_step)
            .collect();
        for half_step in half_steps {
            if self.state.pending_appeals.contains(&half_step) {
                continue; // appeal tx still pending
            }
            match self.appeal_authorizer {
                Some(authorizer) => {
                    let authorization = authorizer.authorize(half_step);
                    self.state.pending_appeals.insert(half_step);
                    self.add_action(Action::Appeal { authorization });
                }
                None => {
                    debug!(half_step, "no appeal authorizer configured, leaving accusation open");
                }
            }
        }
    }
}
