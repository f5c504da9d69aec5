//! The distributed key generation protocol and the per-eon epoch key
//! generator.
//!
//! [`PureDkg`] is the side-effect-free per-participant state machine: it
//! consumes inbound protocol messages, produces outbound ones at the
//! phase transitions, and finalizes into a [`DkgResult`]. The phases form
//! a strict total order and only ever advance:
//!
//! ```text
//! Off < Dealing < Accusing < Apologizing < Finalized
//! ```
//!
//! Phase transitions are driven from the outside by block height via
//! [`PhaseSchedule`], so every keyper observing the same chain advances
//! identically.
//!
//! [`EpochKeyGenerator`] takes over after finalization: it publishes and
//! collects epoch secret key shares and assembles epoch secret keys once
//! threshold shares have arrived.

mod epochkg;
mod puredkg;

pub use epochkg::*;
pub use puredkg::*;

use std::fmt;

/// The phases of the key generation protocol, in protocol order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Off,
    Dealing,
    Accusing,
    Apologizing,
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Off => "off",
            Phase::Dealing => "dealing",
            Phase::Accusing => "accusing",
            Phase::Apologizing => "apologizing",
            Phase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Block-height offsets of the phase boundaries, relative to an eon's
/// start height.
///
/// The schedule is an explicit value rather than a constant so tests can
/// compress phases; it must be identical across all keypers of an eon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PhaseSchedule {
    /// Heights below `start + off` are before the protocol starts.
    pub off: u64,
    /// Heights below `start + dealing` are in the dealing phase.
    pub dealing: u64,
    /// Heights below `start + accusing` are in the accusing phase.
    pub accusing: u64,
    /// Heights below `start + apologizing` are in the apologizing phase;
    /// everything at or above is finalized.
    pub apologizing: u64,
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            off: 0,
            dealing: 30,
            accusing: 60,
            apologizing: 90,
        }
    }
}

impl PhaseSchedule {
    /// The phase active at `height` for an eon started at `start_height`.
    pub fn phase_at(&self, height: u64, start_height: u64) -> Phase {
        if height < start_height.saturating_add(self.off) {
            Phase::Off
        } else if height < start_height.saturating_add(self.dealing) {
            Phase::Dealing
        } else if height < start_height.saturating_add(self.accusing) {
            Phase::Accusing
        } else if height < start_height.saturating_add(self.apologizing) {
            Phase::Apologizing
        } else {
            Phase::Finalized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_totally_ordered() {
        assert!(Phase::Off < Phase::Dealing);
        assert!(Phase::Dealing < Phase::Accusing);
        assert!(Phase::Accusing < Phase::Apologizing);
        assert!(Phase::Apologizing < Phase::Finalized);
    }

    #[test]
    fn schedule_boundaries() {
        let schedule = PhaseSchedule::default();
        let start = 1000;
        assert_eq!(schedule.phase_at(999, start), Phase::Off);
        assert_eq!(schedule.phase_at(1000, start), Phase::Dealing);
        assert_eq!(schedule.phase_at(1029, start), Phase::Dealing);
        assert_eq!(schedule.phase_at(1030, start), Phase::Accusing);
        assert_eq!(schedule.phase_at(1059, start), Phase::Accusing);
        assert_eq!(schedule.phase_at(1060, start), Phase::Apologizing);
        assert_eq!(schedule.phase_at(1089, start), Phase::Apologizing);
        assert_eq!(schedule.phase_at(1090, start), Phase::Finalized);
        assert_eq!(schedule.phase_at(u64::MAX, start), Phase::Finalized);
    }
}
