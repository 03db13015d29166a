//! Block Producer Treasury
//!
//! Accumulates fee revenue into reward pools and pays it out:
//! - producers claim a vote-weighted share of the active pool once per epoch
//! - referrers (TPIDs) are paid in throttled batches once their rewards pass a threshold
//! - the foundation pool is paid whenever it crosses its threshold
//!
//! New currency is minted only to top the active pool up to a fixed target,
//! and never past a lifetime reserve cap.

pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod mint;
pub mod pool;
pub mod ports;
pub mod sandbox;
pub mod schedule;
pub mod service;
pub mod state;

pub use claims::{ClaimProcessor, ProducerClaimReceipt, ReferrerClaimReceipt, STATUS_OK};
pub use clock::ClockState;
pub use config::{
    AccountsConfig, MemoConfig, MintConfig, ReferrerConfig, ScheduleConfig, TreasuryConfig,
    SUF_PER_TOKEN,
};
pub use error::{ErrorKind, Result, TreasuryError};
pub use mint::MintGuard;
pub use pool::{PoolKind, RewardPool, RewardPools};
pub use ports::{
    Host, NameRegistry, ProducerInfo, ProducerRegistry, ResolvedName, TokenLedger, TpidEntry,
    TpidRegistry, Transactional,
};
pub use sandbox::{Sandbox, TransferRecord};
pub use schedule::{Allocation, PaySchedule, ScheduleStatus, VoteShareEntry};
pub use service::{Action, Treasury};
pub use state::TreasuryState;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_constants() {
        let config = TreasuryConfig::default();
        assert_eq!(SUF_PER_TOKEN, 1_000_000_000);
        assert_eq!(config.accounts.treasury, "fio.treasury");
        assert_eq!(
            config.schedule.standby_percent + config.schedule.active_tier_percent,
            100
        );
        assert!(config.schedule.active_tier_slots <= config.schedule.max_entries);
    }
}
