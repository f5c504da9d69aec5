//! Keyper configuration.
//!
//! All configuration reaches the Decider explicitly through
//! [`KeyperConfig`]; there is no global state. The phase schedule is part
//! of the config so tests can compress phases.

use serde::{Deserialize, Serialize};

use crate::{Error, dkg::PhaseSchedule, observe::Address};

/// Static configuration of a single keyper.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyperConfig {
    /// The keyper's wall address, its identity in every roster.
    pub address: Address,
    /// Public key of the keyper's hub chain validator, registered at
    /// check-in.
    pub validator_public_key: Vec<u8>,
    /// Address of the config contract on the main chain.
    pub config_contract_address: Address,
    /// Number of main chain blocks each keyper waits per place in the
    /// execution round-robin.
    pub execution_staggering: u64,
    /// Phase boundaries of the key generation protocol.
    pub phase_schedule: PhaseSchedule,
}

impl KeyperConfig {
    /// Creates and validates a configuration.
    pub fn new(
        address: Address,
        validator_public_key: Vec<u8>,
        config_contract_address: Address,
        execution_staggering: u64,
    ) -> Result<Self, Error> {
        let config = Self {
            address,
            validator_public_key,
            config_contract_address,
            execution_staggering,
            phase_schedule: PhaseSchedule::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the phase schedule is monotone and the validator key
    /// is present.
    pub fn validate(&self) -> Result<(), Error> {
        let s = &self.phase_schedule;
        if !(s.off <= s.dealing && s.dealing <= s.accusing && s.accusing <= s.apologizing) {
            return Err(Error::InvalidConfig(
                "phase schedule offsets must be non-decreasing".into(),
            ));
        }
        if self.validator_public_key.is_empty() {
            return Err(Error::InvalidConfig("validator public key is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_validates() {
        let config = KeyperConfig::new(
            Address::from_low_u64(1),
            vec![0u8; 32],
            Address::from_low_u64(99),
            5,
        )
        .unwrap();
        assert_eq!(config.phase_schedule, PhaseSchedule::default());
    }

    #[test]
    fn non_monotone_schedule_is_rejected() {
        let mut config = KeyperConfig::new(
            Address::from_low_u64(1),
            vec![0u8; 32],
            Address::from_low_u64(99),
            5,
        )
        .unwrap();
        config.phase_schedule.accusing = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_validator_key_is_rejected() {
        assert!(
            KeyperConfig::new(
                Address::from_low_u64(1),
                Vec::new(),
                Address::from_low_u64(99),
                5
            )
            .is_err()
        );
    }
}
