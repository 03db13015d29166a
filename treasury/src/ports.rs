//! Collaborator interfaces
//!
//! The treasury never embeds ledger or registry logic. It reads and writes
//! through these ports, and the hosting chain (or the in-memory `Sandbox`)
//! implements them.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Registered block producer as seen by the producer registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerInfo {
    pub owner: String,
    pub total_votes: f64,
    pub is_active: bool,
}

/// Owner of a name or address and when it lapses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedName {
    pub owner: String,
    pub expires_at: u64,
}

impl ResolvedName {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

/// Referrer row owned by the TPID registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpidEntry {
    pub address: String,
    pub accumulated_rewards: u64,
}

/// Fungible token ledger
pub trait TokenLedger {
    fn transfer(&mut self, from: &str, to: &str, amount: u64, memo: &str) -> Result<()>;

    /// Mints new currency into the treasury account
    fn mint(&mut self, amount: u64) -> Result<()>;
}

/// Read-only view of the validator set plus the missed-block reset callback
pub trait ProducerRegistry {
    /// Registered producers in registry order
    fn producers(&self) -> Vec<ProducerInfo>;

    /// Registry-wide vote weight
    fn total_voted_weight(&self) -> f64;

    fn is_producer(&self, owner: &str) -> bool {
        self.producers().iter().any(|producer| producer.owner == owner)
    }

    /// Clears the producer's missed-block counters after a payout
    fn reset_claim(&mut self, owner: &str) -> Result<()>;
}

/// Naming/identity registry
pub trait NameRegistry {
    fn resolve_owner(&self, name: &str) -> Option<ResolvedName>;
}

/// Referrer registry
pub trait TpidRegistry {
    /// Up to `limit` rows holding at least `min_rewards`, in registry order
    fn payable(&self, min_rewards: u64, limit: usize) -> Vec<TpidEntry>;

    /// Resets the referrer's accumulated rewards to zero
    fn mark_paid(&mut self, address: &str) -> Result<()>;
}

/// All-or-nothing execution of one action's collaborator side effects
pub trait Transactional {
    fn checkpoint(&mut self);
    fn rollback(&mut self);
    fn release(&mut self);
}

/// Everything the treasury needs from its hosting chain
pub trait Host: TokenLedger + ProducerRegistry + NameRegistry + TpidRegistry + Transactional {
    /// Current block time in seconds
    fn now(&self) -> u64;
}
