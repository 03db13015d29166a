//! Data directory: the sandbox world and the treasury snapshot

use anyhow::{bail, Context, Result};
use std::path::Path;

use treasury::{Sandbox, Treasury, TreasuryConfig, TreasuryState};
use treasury_storage::Storage;

pub const WORLD_SNAPSHOT: &str = "world";
pub const TREASURY_SNAPSHOT: &str = "treasury";

const SAMPLE_NAME_LIFETIME: u64 = 365 * 86_400;

pub struct Workspace {
    storage: Storage,
    config: TreasuryConfig,
}

impl Workspace {
    pub fn open(data_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => TreasuryConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => TreasuryConfig::default(),
        };
        config.validate()?;

        let storage = Storage::open(data_dir)
            .with_context(|| format!("failed to open data dir {}", data_dir.display()))?;
        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &TreasuryConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.storage.snapshot_exists(WORLD_SNAPSHOT)
    }

    /// Writes a sample world and an empty treasury
    pub fn init(&self, now: u64, force: bool) -> Result<()> {
        if self.is_initialized() && !force {
            bail!(
                "{} already holds a world; pass --force to overwrite it",
                self.storage.data_dir().display()
            );
        }

        let world = sample_world(&self.config, now)?;
        self.storage.save_snapshot(WORLD_SNAPSHOT, &world)?;
        self.storage
            .save_snapshot(TREASURY_SNAPSHOT, &TreasuryState::new())?;
        log::info!(
            "Initialized world at {} in {}",
            now,
            self.storage.data_dir().display()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Treasury<Sandbox>> {
        if !self.is_initialized() {
            bail!(
                "no world in {}; run `treasury-cli init` first",
                self.storage.data_dir().display()
            );
        }

        let world: Sandbox = self
            .storage
            .load_snapshot(WORLD_SNAPSHOT)
            .context("failed to load world")?;
        let state: TreasuryState = if self.storage.snapshot_exists(TREASURY_SNAPSHOT) {
            self.storage
                .load_snapshot(TREASURY_SNAPSHOT)
                .context("failed to load treasury state")?
        } else {
            TreasuryState::new()
        };

        Ok(Treasury::from_state(self.config.clone(), state, world)?)
    }

    pub fn save(&self, treasury: Treasury<Sandbox>) -> Result<()> {
        let (state, world) = treasury.into_parts();
        self.storage.save_snapshot(TREASURY_SNAPSHOT, &state)?;
        self.storage.save_snapshot(WORLD_SNAPSHOT, &world)?;
        Ok(())
    }
}

/// Four producers (one on standby), their addresses, and one referrer over the payout threshold
pub fn sample_world(config: &TreasuryConfig, now: u64) -> Result<Sandbox> {
    let mut world = Sandbox::new(&config.accounts.treasury, now);
    let expires_at = now.saturating_add(SAMPLE_NAME_LIFETIME);

    let producers = [
        ("bp1", 4_000_000.0, true),
        ("bp2", 2_500_000.0, true),
        ("bp3", 1_500_000.0, true),
        ("bp4", 500_000.0, false),
    ];
    for (owner, votes, is_active) in producers {
        world.add_producer(owner, votes, is_active);
        world.register_name(&format!("{}@dapix", owner), owner, expires_at);
    }

    world.register_name("shop@dapix", "shop", expires_at);
    let referrer_rewards = config.referrer.reward_max.saturating_mul(3) / 2;
    world.accrue_tpid("shop@dapix", referrer_rewards)?;
    world.fund(&config.accounts.treasury, referrer_rewards)?;
    Ok(world)
}
