//! Persisted treasury state

use serde::{Deserialize, Serialize};

use crate::clock::ClockState;
use crate::pool::{PoolKind, RewardPools};
use crate::schedule::PaySchedule;

/// Everything the treasury owns: pool rows, the clock singleton and the
/// current pay schedule. Restored wholesale when an action fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreasuryState {
    pub pools: RewardPools,

    /// `None` until `startclock` runs
    pub clock: Option<ClockState>,

    pub schedule: PaySchedule,
}

impl TreasuryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_amount(&self, kind: PoolKind) -> u64 {
        self.pools.amount(kind)
    }

    pub fn is_started(&self) -> bool {
        self.clock.is_some()
    }
}
