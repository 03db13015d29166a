//! Treasury configuration (treasury.toml)
//!
//! Every field has a default holding the production constants, so an empty
//! file (or no file at all) yields a working configuration.
//!
//! Example:
//! ```toml
//! foundation_threshold = 100
//!
//! [schedule]
//! epoch_duration = 86400
//!
//! [referrer]
//! window = 60
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, TreasuryError};

/// Smallest token unit per whole token (9 decimal places)
pub const SUF_PER_TOKEN: u64 = 1_000_000_000;

/// Top-level treasury configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryConfig {
    /// Foundation pool balance above which the whole pool is paid out
    pub foundation_threshold: u64,

    pub accounts: AccountsConfig,
    pub schedule: ScheduleConfig,
    pub mint: MintConfig,
    pub referrer: ReferrerConfig,
    pub memos: MemoConfig,
}

/// Well-known accounts the treasury talks to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Account holding treasury funds and authorizing its own actions
    pub treasury: String,

    /// Receiver of the foundation pool
    pub foundation: String,

    /// Accounts permitted to credit the reward pools
    pub credit_authorities: Vec<String>,
}

/// Pay schedule sizing and split policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds a pay schedule stays valid
    pub epoch_duration: u64,

    /// Maximum producers snapshotted into one schedule
    pub max_entries: usize,

    /// Top-tier slots; also the fixed denominator of the top-tier split
    pub active_tier_slots: usize,

    pub standby_percent: u64,
    pub active_tier_percent: u64,

    /// Fraction (1/n) of the bucket pool released into the active pool per schedule
    pub bucket_release_divisor: u64,
}

/// Minting bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintConfig {
    /// Target active pool balance; minting never tops the pool above it
    pub max_to_mint: u64,

    /// Lifetime cap on currency minted into the reserve
    pub max_reserve: u64,
}

/// Referrer (TPID) payout policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferrerConfig {
    /// Minimum seconds between two referrer payout batches
    pub window: u64,

    /// Accumulated rewards a referrer needs before it gets paid
    pub reward_max: u64,

    /// Maximum referrers paid per batch
    pub batch_limit: usize,
}

/// Transfer memos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoConfig {
    pub producer: String,
    pub referrer: String,
    pub foundation: String,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            foundation_threshold: 100,
            accounts: AccountsConfig::default(),
            schedule: ScheduleConfig::default(),
            mint: MintConfig::default(),
            referrer: ReferrerConfig::default(),
            memos: MemoConfig::default(),
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            treasury: "fio.treasury".to_string(),
            foundation: "fio.foundatn".to_string(),
            credit_authorities: vec![
                "fio.system".to_string(),
                "fio.token".to_string(),
                "fio.fee".to_string(),
                "fio.reqobt".to_string(),
                "fio.treasury".to_string(),
            ],
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            epoch_duration: 86_400,
            max_entries: 42,
            active_tier_slots: 21,
            standby_percent: 60,
            active_tier_percent: 40,
            bucket_release_divisor: 365,
        }
    }
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            max_to_mint: 50_000 * SUF_PER_TOKEN,
            max_reserve: 20_000_000 * SUF_PER_TOKEN,
        }
    }
}

impl Default for ReferrerConfig {
    fn default() -> Self {
        Self {
            window: 60,
            reward_max: 100_000,
            batch_limit: 100,
        }
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            producer: "Paying producer from treasury.".to_string(),
            referrer: "Paying TPID from treasury.".to_string(),
            foundation: "Paying foundation from treasury.".to_string(),
        }
    }
}

impl TreasuryConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: TreasuryConfig =
            toml::from_str(contents).map_err(|e| TreasuryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| TreasuryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TreasuryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let schedule = &self.schedule;

        if schedule.standby_percent + schedule.active_tier_percent != 100 {
            return Err(TreasuryError::Config(format!(
                "standby_percent ({}) and active_tier_percent ({}) must sum to 100",
                schedule.standby_percent, schedule.active_tier_percent
            )));
        }
        if schedule.max_entries == 0 || schedule.active_tier_slots == 0 {
            return Err(TreasuryError::Config(
                "max_entries and active_tier_slots must be non-zero".to_string(),
            ));
        }
        if schedule.active_tier_slots > schedule.max_entries {
            return Err(TreasuryError::Config(format!(
                "active_tier_slots ({}) exceeds max_entries ({})",
                schedule.active_tier_slots, schedule.max_entries
            )));
        }
        if schedule.bucket_release_divisor == 0 {
            return Err(TreasuryError::Config(
                "bucket_release_divisor must be non-zero".to_string(),
            ));
        }
        if schedule.epoch_duration == 0 {
            return Err(TreasuryError::Config("epoch_duration must be non-zero".to_string()));
        }
        if self.referrer.batch_limit == 0 {
            return Err(TreasuryError::Config("referrer batch_limit must be non-zero".to_string()));
        }
        if self.accounts.treasury.is_empty() || self.accounts.foundation.is_empty() {
            return Err(TreasuryError::Config(
                "treasury and foundation accounts must be set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_credit_authority(&self, account: &str) -> bool {
        self.accounts
            .credit_authorities
            .iter()
            .any(|authority| authority == account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = TreasuryConfig::default();
        config.validate().unwrap();

        assert_eq!(config.schedule.max_entries, 42);
        assert_eq!(config.schedule.active_tier_slots, 21);
        assert_eq!(config.referrer.reward_max, 100_000);
        assert_eq!(config.mint.max_to_mint, 50_000_000_000_000);
        assert!(config.is_credit_authority("fio.token"));
        assert!(!config.is_credit_authority("alice"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TreasuryConfig::from_toml_str(
            r#"
            foundation_threshold = 500

            [schedule]
            epoch_duration = 3600

            [accounts]
            credit_authorities = ["fees"]
            "#,
        )
        .unwrap();

        assert_eq!(config.foundation_threshold, 500);
        assert_eq!(config.schedule.epoch_duration, 3600);
        assert_eq!(config.schedule.max_entries, 42);
        assert_eq!(config.accounts.treasury, "fio.treasury");
        assert!(config.is_credit_authority("fees"));
        assert!(!config.is_credit_authority("fio.token"));
    }

    #[test]
    fn test_invalid_split_rejected() {
        let err = TreasuryConfig::from_toml_str(
            r#"
            [schedule]
            standby_percent = 70
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TreasuryError::Config(_)));
    }

    #[test]
    fn test_tier_larger_than_schedule_rejected() {
        let mut config = TreasuryConfig::default();
        config.schedule.active_tier_slots = 43;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_round_trip() {
        let mut config = TreasuryConfig::default();
        config.referrer.window = 120;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = TreasuryConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TreasuryConfig::load("/nonexistent/treasury.toml").unwrap_err();
        assert!(matches!(err, TreasuryError::Config(_)));
    }
}
