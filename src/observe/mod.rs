//! Observed chain state consumed by the Decider.
//!
//! An external observer follows the hub chain (which carries the keyper
//! protocol messages) and the main chain (which hosts the executor and
//! slasher contracts) and maintains the structures in this module. The
//! core never mutates them; it reads monotone suffixes of the per-eon
//! event vectors and advances its own cursors.
//!
//! Events are totally ordered by `(height, sequence-within-block)`; the
//! observer appends them in that order. Cross-references between eons,
//! batch configs and keypers are by id, index and address, so the
//! structures stay acyclic.

use std::collections::BTreeMap;
use std::fmt;

use crate::{Gammas, PairingBackend, scheme::EpochSecretKeyShare};

/// A keyper's wall address, the stable identity on both chains.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Builds an address from a small integer, big-endian in the low
    /// bytes. Handy for tests and examples.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A dealer's commitment as observed on the hub chain.
pub struct CommitmentEvent<B: PairingBackend> {
    pub height: u64,
    pub sender: Address,
    pub eon: u64,
    pub gammas: Gammas<B>,
}

/// A batch of encrypted poly evals as observed on the hub chain. The
/// i-th ciphertext is addressed to the i-th receiver.
#[derive(Clone, Debug)]
pub struct PolyEvalEvent {
    pub height: u64,
    pub sender: Address,
    pub eon: u64,
    pub receivers: Vec<Address>,
    pub encrypted_evals: Vec<Vec<u8>>,
}

/// An accusation as observed on the hub chain.
#[derive(Clone, Debug)]
pub struct AccusationEvent {
    pub height: u64,
    pub sender: Address,
    pub eon: u64,
    pub accused: Vec<Address>,
}

/// An apology as observed on the hub chain. The i-th eval answers the
/// i-th accuser.
pub struct ApologyEvent<B: PairingBackend> {
    pub height: u64,
    pub sender: Address,
    pub eon: u64,
    pub accusers: Vec<Address>,
    pub poly_evals: Vec<B::Scalar>,
}

/// An epoch secret key share as observed on the hub chain.
pub struct EpochSecretKeyShareEvent<B: PairingBackend> {
    pub height: u64,
    pub sender: Address,
    pub eon: u64,
    pub epoch: u64,
    pub share: EpochSecretKeyShare<B>,
}

/// One eon as observed on the hub chain: the start event plus the
/// append-only event log of each category.
pub struct Eon<B: PairingBackend> {
    pub eon: u64,
    pub start_height: u64,
    pub start_batch_index: u64,
    pub commitments: Vec<CommitmentEvent<B>>,
    pub poly_evals: Vec<PolyEvalEvent>,
    pub accusations: Vec<AccusationEvent>,
    pub apologies: Vec<ApologyEvent<B>>,
    pub epoch_secret_key_shares: Vec<EpochSecretKeyShareEvent<B>>,
}

impl<B: PairingBackend> Eon<B> {
    pub fn new(eon: u64, start_height: u64, start_batch_index: u64) -> Self {
        Self {
            eon,
            start_height,
            start_batch_index,
            commitments: Vec::new(),
            poly_evals: Vec::new(),
            accusations: Vec::new(),
            apologies: Vec::new(),
            epoch_secret_key_shares: Vec::new(),
        }
    }
}

/// A batch config as voted onto the hub chain.
#[derive(Clone, Debug)]
pub struct HubBatchConfig {
    pub config_index: u64,
    pub start_batch_index: u64,
    pub keypers: Vec<Address>,
    pub threshold: u64,
}

/// The observed state of the hub chain.
pub struct Hub<B: PairingBackend> {
    pub current_block: u64,
    pub eons: Vec<Eon<B>>,
    pub batch_configs: Vec<HubBatchConfig>,
    /// Checked-in keypers and their registered encryption public keys.
    pub checked_in: BTreeMap<Address, Vec<u8>>,
}

impl<B: PairingBackend> Default for Hub<B> {
    fn default() -> Self {
        Self {
            current_block: 0,
            eons: Vec::new(),
            batch_configs: Vec::new(),
            checked_in: BTreeMap::new(),
        }
    }
}

impl<B: PairingBackend> Hub<B> {
    pub fn is_checked_in(&self, address: &Address) -> bool {
        self.checked_in.contains_key(address)
    }

    /// The registered encryption public key of a checked-in keyper.
    pub fn encryption_key(&self, address: &Address) -> Option<&[u8]> {
        self.checked_in.get(address).map(Vec::as_slice)
    }

    /// Whether the address is a keyper in any observed batch config.
    pub fn is_keyper(&self, address: &Address) -> bool {
        self.batch_configs
            .iter()
            .any(|config| config.keypers.contains(address))
    }

    pub fn find_eon(&self, eon: u64) -> Option<&Eon<B>> {
        self.eons.iter().find(|e| e.eon == eon)
    }

    pub fn find_eon_mut(&mut self, eon: u64) -> Option<&mut Eon<B>> {
        self.eons.iter_mut().find(|e| e.eon == eon)
    }

    /// The eon responsible for the given batch: the one with the highest
    /// start batch index not beyond it.
    pub fn find_eon_by_batch_index(&self, batch_index: u64) -> Option<&Eon<B>> {
        self.eons
            .iter()
            .filter(|e| e.start_batch_index <= batch_index)
            .max_by_key(|e| e.start_batch_index)
    }

    /// The batch config responsible for the given batch index.
    pub fn find_batch_config_by_batch_index(&self, batch_index: u64) -> Option<&HubBatchConfig> {
        self.batch_configs
            .iter()
            .rev()
            .find(|config| config.start_batch_index <= batch_index)
    }

    pub fn find_batch_config_by_config_index(&self, config_index: u64) -> Option<&HubBatchConfig> {
        self.batch_configs
            .iter()
            .find(|config| config.config_index == config_index)
    }
}

/// A batch config as deployed on the main chain's config contract.
#[derive(Clone, Debug)]
pub struct MainChainConfig {
    pub config_index: u64,
    pub start_batch_index: u64,
    pub start_block: u64,
    /// Number of main chain blocks per batch; zero marks an inactive
    /// config.
    pub batch_span_blocks: u64,
    pub keypers: Vec<Address>,
    pub threshold: u64,
}

impl MainChainConfig {
    pub fn is_active(&self) -> bool {
        self.batch_span_blocks > 0
    }

    /// The batch index active at the given block.
    pub fn batch_index(&self, block: u64) -> u64 {
        if !self.is_active() || block < self.start_block {
            return self.start_batch_index;
        }
        self.start_batch_index + (block - self.start_block) / self.batch_span_blocks
    }

    /// The first block after the given batch, i.e. the earliest block at
    /// which the batch can be executed.
    pub fn batch_end_block(&self, batch_index: u64) -> u64 {
        self.start_block + (batch_index - self.start_batch_index + 1) * self.batch_span_blocks
    }

    pub fn keyper_index(&self, address: &Address) -> Option<u64> {
        self.keypers
            .iter()
            .position(|k| k == address)
            .map(|i| i as u64)
    }
}

/// Contents of one batch on the main chain.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    pub batch_index: u64,
    pub encrypted_batch_hash: [u8; 32],
    pub plain_transactions: Vec<Vec<u8>>,
}

/// An accusation raised at the keyper slasher contract.
#[derive(Clone, Debug)]
pub struct HalfStepAccusation {
    pub half_step: u64,
    pub accused: Address,
    pub appealed: bool,
}

/// The observed state of the main chain.
#[derive(Default)]
pub struct MainChain {
    pub current_block: u64,
    pub batch_configs: Vec<MainChainConfig>,
    /// Number of half-steps the executor contract has processed.
    pub num_execution_half_steps: u64,
    pub batches: BTreeMap<u64, Batch>,
    pub accusations: Vec<HalfStepAccusation>,
}

impl MainChain {
    /// Index into `batch_configs` of the config active at the given
    /// block.
    pub fn active_config_index(&self, block: u64) -> Option<usize> {
        self.batch_configs
            .iter()
            .rposition(|config| config.is_active() && config.start_block <= block)
    }

    /// The config active at the current block.
    pub fn current_config(&self) -> Option<&MainChainConfig> {
        self.active_config_index(self.current_block)
            .map(|i| &self.batch_configs[i])
    }

    /// The active config responsible for the given batch index.
    pub fn config_for_batch_index(&self, batch_index: u64) -> Option<&MainChainConfig> {
        self.batch_configs
            .iter()
            .rev()
            .find(|config| config.is_active() && config.start_batch_index <= batch_index)
    }

    /// All accusations raised against the given address.
    pub fn accusations_against(&self, address: &Address) -> impl Iterator<Item = &HalfStepAccusation> {
        let address = *address;
        self.accusations
            .iter()
            .filter(move |accusation| accusation.accused == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PairingEngine;

    fn config(start_batch: u64, start_block: u64, span: u64) -> MainChainConfig {
        MainChainConfig {
            config_index: 0,
            start_batch_index: start_batch,
            start_block,
            batch_span_blocks: span,
            keypers: vec![Address::from_low_u64(1), Address::from_low_u64(2)],
            threshold: 2,
        }
    }

    #[test]
    fn batch_index_progression() {
        let cfg = config(10, 100, 5);
        assert_eq!(cfg.batch_index(99), 10);
        assert_eq!(cfg.batch_index(100), 10);
        assert_eq!(cfg.batch_index(104), 10);
        assert_eq!(cfg.batch_index(105), 11);
        assert_eq!(cfg.batch_end_block(10), 105);
        assert_eq!(cfg.batch_end_block(12), 115);
    }

    #[test]
    fn inactive_config_is_skipped() {
        let mut chain = MainChain::default();
        chain.batch_configs.push(config(0, 0, 5));
        chain.batch_configs.push(config(50, 200, 0));
        chain.current_block = 300;
        assert_eq!(chain.active_config_index(300), Some(0));
        assert!(chain.current_config().unwrap().is_active());
        assert_eq!(chain.config_for_batch_index(60).unwrap().start_batch_index, 0);
    }

    #[test]
    fn eon_lookup_by_batch_index() {
        let mut hub = Hub::<PairingEngine>::default();
        hub.eons.push(Eon::new(1, 0, 0));
        hub.eons.push(Eon::new(2, 500, 40));
        assert_eq!(hub.find_eon_by_batch_index(10).unwrap().eon, 1);
        assert_eq!(hub.find_eon_by_batch_index(40).unwrap().eon, 2);
        assert_eq!(hub.find_eon_by_batch_index(99).unwrap().eon, 2);
    }

    #[test]
    fn address_formatting() {
        let addr = Address::from_low_u64(0xabcd);
        assert_eq!(
            addr.to_string(),
            "0x000000000000000000000000000000000000abcd"
        );
    }
}
