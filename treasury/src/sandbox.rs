//! In-memory host
//!
//! Implements every collaborator port over plain maps: token balances and
//! supply, the producer registry, the name registry and the referrer
//! registry, plus a settable block clock. Checkpoints are full copies of the
//! world, so a rolled-back action leaves no trace in balances or registries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, TreasuryError};
use crate::ports::{
    Host, NameRegistry, ProducerInfo, ProducerRegistry, ResolvedName, TokenLedger, TpidEntry,
    TpidRegistry, Transactional,
};

/// A completed token transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub memo: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct World {
    now: u64,
    treasury_account: String,
    balances: BTreeMap<String, u64>,
    supply: u64,
    max_supply: Option<u64>,
    producers: Vec<ProducerInfo>,
    names: BTreeMap<String, ResolvedName>,
    tpids: Vec<TpidEntry>,
    claim_resets: BTreeMap<String, u64>,
    transfers: Vec<TransferRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sandbox {
    world: World,
    #[serde(skip)]
    checkpoints: Vec<World>,
}

impl Sandbox {
    pub fn new(treasury_account: &str, now: u64) -> Self {
        Self {
            world: World {
                now,
                treasury_account: treasury_account.to_string(),
                ..Default::default()
            },
            checkpoints: Vec::new(),
        }
    }

    pub fn set_now(&mut self, now: u64) {
        self.world.now = now;
    }

    pub fn advance(&mut self, seconds: u64) {
        self.world.now = self.world.now.saturating_add(seconds);
    }

    /// Caps total supply; mints beyond it fail
    pub fn set_max_supply(&mut self, max_supply: u64) {
        self.world.max_supply = Some(max_supply);
    }

    /// Adds or replaces a producer, keeping registry order for new ones
    pub fn add_producer(&mut self, owner: &str, total_votes: f64, is_active: bool) {
        let info = ProducerInfo {
            owner: owner.to_string(),
            total_votes,
            is_active,
        };
        match self.world.producers.iter_mut().find(|p| p.owner == owner) {
            Some(existing) => *existing = info,
            None => self.world.producers.push(info),
        }
    }

    pub fn set_producer_active(&mut self, owner: &str, is_active: bool) {
        if let Some(producer) = self.world.producers.iter_mut().find(|p| p.owner == owner) {
            producer.is_active = is_active;
        }
    }

    pub fn register_name(&mut self, name: &str, owner: &str, expires_at: u64) {
        self.world.names.insert(
            name.to_string(),
            ResolvedName {
                owner: owner.to_string(),
                expires_at,
            },
        );
    }

    pub fn burn_name(&mut self, name: &str) {
        self.world.names.remove(name);
    }

    /// Adds to a referrer's accumulated rewards, creating the row if needed
    pub fn accrue_tpid(&mut self, address: &str, amount: u64) -> Result<()> {
        match self.world.tpids.iter_mut().find(|t| t.address == address) {
            Some(entry) => {
                entry.accumulated_rewards =
                    checked_sum(entry.accumulated_rewards, amount, address)?;
            }
            None => self.world.tpids.push(TpidEntry {
                address: address.to_string(),
                accumulated_rewards: amount,
            }),
        }
        Ok(())
    }

    /// Credits an account out of thin air, counted in supply
    pub fn fund(&mut self, account: &str, amount: u64) -> Result<()> {
        let supply = checked_sum(self.world.supply, amount, "supply")?;
        self.credit_balance(account, amount)?;
        self.world.supply = supply;
        Ok(())
    }

    pub fn balance(&self, account: &str) -> u64 {
        self.world.balances.get(account).copied().unwrap_or(0)
    }

    pub fn supply(&self) -> u64 {
        self.world.supply
    }

    pub fn treasury_account(&self) -> &str {
        &self.world.treasury_account
    }

    pub fn tpid_rewards(&self, address: &str) -> Option<u64> {
        self.world
            .tpids
            .iter()
            .find(|t| t.address == address)
            .map(|t| t.accumulated_rewards)
    }

    /// How many times the producer's missed-block counters were reset
    pub fn claim_resets(&self, owner: &str) -> u64 {
        self.world.claim_resets.get(owner).copied().unwrap_or(0)
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        &self.world.transfers
    }

    pub fn transfers_to(&self, account: &str) -> u64 {
        self.world
            .transfers
            .iter()
            .filter(|t| t.to == account)
            .map(|t| t.amount)
            .sum()
    }

    pub fn pending_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    fn credit_balance(&mut self, account: &str, amount: u64) -> Result<()> {
        let balance = checked_sum(self.balance(account), amount, account)?;
        self.world.balances.insert(account.to_string(), balance);
        Ok(())
    }
}

fn checked_sum(current: u64, amount: u64, what: &str) -> Result<u64> {
    current
        .checked_add(amount)
        .ok_or_else(|| TreasuryError::Collaborator(format!("{} overflow adding {}", what, amount)))
}

impl TokenLedger for Sandbox {
    fn transfer(&mut self, from: &str, to: &str, amount: u64, memo: &str) -> Result<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(TreasuryError::Collaborator(format!(
                "overdrawn balance: {} has {}, needs {}",
                from, available, amount
            )));
        }

        if from != to {
            self.credit_balance(to, amount)?;
            self.world.balances.insert(from.to_string(), available - amount);
        }
        self.world.transfers.push(TransferRecord {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            memo: memo.to_string(),
            timestamp: self.world.now,
        });
        Ok(())
    }

    fn mint(&mut self, amount: u64) -> Result<()> {
        let supply = checked_sum(self.world.supply, amount, "supply")?;
        if let Some(max_supply) = self.world.max_supply {
            if supply > max_supply {
                return Err(TreasuryError::Collaborator(format!(
                    "max supply exceeded: {} > {}",
                    supply, max_supply
                )));
            }
        }

        let treasury = self.world.treasury_account.clone();
        self.credit_balance(&treasury, amount)?;
        self.world.supply = supply;
        Ok(())
    }
}

impl ProducerRegistry for Sandbox {
    fn producers(&self) -> Vec<ProducerInfo> {
        self.world.producers.clone()
    }

    fn total_voted_weight(&self) -> f64 {
        self.world.producers.iter().map(|p| p.total_votes).sum()
    }

    fn is_producer(&self, owner: &str) -> bool {
        self.world.producers.iter().any(|p| p.owner == owner)
    }

    fn reset_claim(&mut self, owner: &str) -> Result<()> {
        if !self.is_producer(owner) {
            return Err(TreasuryError::Collaborator(format!(
                "{} is not a registered producer",
                owner
            )));
        }
        *self.world.claim_resets.entry(owner.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

impl NameRegistry for Sandbox {
    fn resolve_owner(&self, name: &str) -> Option<ResolvedName> {
        self.world.names.get(name).cloned()
    }
}

impl TpidRegistry for Sandbox {
    fn payable(&self, min_rewards: u64, limit: usize) -> Vec<TpidEntry> {
        self.world
            .tpids
            .iter()
            .filter(|t| t.accumulated_rewards >= min_rewards)
            .take(limit)
            .cloned()
            .collect()
    }

    fn mark_paid(&mut self, address: &str) -> Result<()> {
        let entry = self
            .world
            .tpids
            .iter_mut()
            .find(|t| t.address == address)
            .ok_or_else(|| TreasuryError::Collaborator(format!("unknown tpid {}", address)))?;
        entry.accumulated_rewards = 0;
        Ok(())
    }
}

impl Transactional for Sandbox {
    fn checkpoint(&mut self) {
        self.checkpoints.push(self.world.clone());
    }

    fn rollback(&mut self) {
        if let Some(world) = self.checkpoints.pop() {
            self.world = world;
        }
    }

    fn release(&mut self) {
        self.checkpoints.pop();
    }
}

impl Host for Sandbox {
    fn now(&self) -> u64 {
        self.world.now
    }
}
