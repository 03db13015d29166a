//! Treasury clock state: epoch timers and cumulative counters

use serde::{Deserialize, Serialize};

use crate::config::TreasuryConfig;
use crate::error::{Result, TreasuryError};

/// Singleton row created by `startclock`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    /// Time of the last referrer payout batch that paid at least one entry
    pub last_referrer_payout: u64,

    /// Start time of the current pay schedule
    pub pay_sched_timer: u64,

    /// Cumulative producer payouts
    pub rewards_paid: u64,

    /// Cumulative currency minted into the reserve
    pub reserve_tokens_minted: u64,
}

impl ClockState {
    /// Fresh clock with back-dated timers so the first producer claim opens a
    /// schedule and the first referrer claim runs one second later.
    pub fn bootstrap(now: u64, config: &TreasuryConfig) -> Self {
        Self {
            last_referrer_payout: now.saturating_sub(config.referrer.window),
            pay_sched_timer: now.saturating_sub(config.schedule.epoch_duration),
            rewards_paid: 0,
            reserve_tokens_minted: 0,
        }
    }

    pub fn referrer_window_open(&self, now: u64, window: u64) -> bool {
        now > self.last_referrer_payout.saturating_add(window)
    }

    pub fn schedule_expired(&self, now: u64, epoch_duration: u64) -> bool {
        now >= self.pay_sched_timer.saturating_add(epoch_duration)
    }

    pub fn record_payout(&mut self, amount: u64) -> Result<()> {
        self.rewards_paid = self.rewards_paid.checked_add(amount).ok_or_else(|| {
            TreasuryError::InvariantViolation("rewards_paid overflow".to_string())
        })?;
        Ok(())
    }

    /// Adds to the minted-to-reserve counter, refusing to pass `max_reserve`
    pub fn record_mint(&mut self, amount: u64, max_reserve: u64) -> Result<()> {
        let minted = self
            .reserve_tokens_minted
            .checked_add(amount)
            .filter(|total| *total <= max_reserve)
            .ok_or_else(|| {
                TreasuryError::InvariantViolation(format!(
                    "minting {} would exceed reserve cap {} (already minted {})",
                    amount, max_reserve, self.reserve_tokens_minted
                ))
            })?;
        self.reserve_tokens_minted = minted;
        Ok(())
    }

    pub fn reserve_remaining(&self, max_reserve: u64) -> u64 {
        max_reserve.saturating_sub(self.reserve_tokens_minted)
    }
}
