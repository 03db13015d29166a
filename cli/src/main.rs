//! Treasury CLI - drive the treasury against a local sandbox world

mod workspace;

use anyhow::Result;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use env_logger::Env;
use owo_colors::OwoColorize;
use serde_json::Value;
use std::path::PathBuf;

use treasury::{Action, Host, PoolKind, Sandbox, Treasury, SUF_PER_TOKEN};
use workspace::Workspace;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "treasury-cli")]
#[command(about = "Block producer treasury operator tool", version = VERSION)]
struct Cli {
    /// Directory holding the world and treasury snapshots
    #[arg(short, long, value_name = "DIR", default_value = "treasury-data")]
    data_dir: PathBuf,

    /// Path to a TOML treasury configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample world and an empty treasury
    Init {
        /// Overwrite an existing world
        #[arg(long)]
        force: bool,
    },

    /// Start the treasury clock
    Startclock,

    /// Claim producer rewards for an address
    Bpclaim {
        /// Address owned by the producer
        fio_address: String,

        /// Account submitting the claim
        #[arg(long)]
        actor: String,
    },

    /// Pay out the next batch of referrer rewards
    Tpidclaim {
        #[arg(long)]
        actor: String,
    },

    /// Credit a reward pool (active, bucket or foundation)
    Credit {
        pool: PoolKind,
        amount: u64,

        /// Crediting contract
        #[arg(long, default_value = "fio.fee")]
        actor: String,
    },

    /// Stamp the referrer payout timer
    Updateclock,

    /// Show pools, clock and pay schedule
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move the world's block time forward
    Advance { seconds: u64 },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let workspace = Workspace::open(&cli.data_dir, cli.config.as_deref())?;
    let treasury_account = workspace.config().accounts.treasury.clone();

    match cli.command {
        Commands::Init { force } => {
            let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
            workspace.init(now, force)?;
            println!(
                "{} World initialized in {}",
                "✓".green(),
                cli.data_dir.display()
            );
            Ok(())
        }

        Commands::Show { json } => {
            let treasury = workspace.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&treasury.state())?);
            } else {
                display(&treasury);
            }
            Ok(())
        }

        Commands::Advance { seconds } => {
            let treasury = workspace.load()?;
            let now = treasury.with_host_mut(|world| {
                world.advance(seconds);
                world.now()
            });
            println!("Block time: {}", format_time(now));
            workspace.save(treasury)
        }

        Commands::Startclock => apply(&workspace, |treasury| {
            Ok(treasury.dispatch(&treasury_account, &Action::StartClock)?)
        }),

        Commands::Updateclock => apply(&workspace, |treasury| {
            Ok(treasury.dispatch(&treasury_account, &Action::UpdateClock)?)
        }),

        Commands::Bpclaim { fio_address, actor } => apply(&workspace, |treasury| {
            let receipt = treasury.producer_claim(&actor, &fio_address, &actor)?;
            Ok(serde_json::to_value(receipt)?)
        }),

        Commands::Tpidclaim { actor } => apply(&workspace, |treasury| {
            let receipt = treasury.referrer_claim(&actor, &actor)?;
            Ok(serde_json::to_value(receipt)?)
        }),

        Commands::Credit {
            pool,
            amount,
            actor,
        } => apply(&workspace, |treasury| {
            credit(treasury, &treasury_account, &actor, pool, amount)
        }),
    }
}

/// Loads the workspace, runs one action and saves only if it succeeded
fn apply<F>(workspace: &Workspace, action: F) -> Result<()>
where
    F: FnOnce(&Treasury<Sandbox>) -> Result<Value>,
{
    let treasury = workspace.load()?;
    let response = action(&treasury)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    workspace.save(treasury)
}

/// The crediting contract forwards the tokens along with the pool update
fn credit(
    treasury: &Treasury<Sandbox>,
    treasury_account: &str,
    actor: &str,
    pool: PoolKind,
    amount: u64,
) -> Result<Value> {
    treasury.with_host_mut(|world| world.fund(treasury_account, amount))?;
    Ok(treasury.dispatch(actor, &credit_action(pool, amount))?)
}

fn credit_action(pool: PoolKind, amount: u64) -> Action {
    match pool {
        PoolKind::Active => Action::BpRewdUpdate { amount },
        PoolKind::Bucket => Action::BpPoolUpdate { amount },
        PoolKind::Foundation => Action::FdtnRwdUpdat { amount },
    }
}

fn display(treasury: &Treasury<Sandbox>) {
    let state = treasury.state();
    let now = treasury.with_host(|world| world.now());

    println!("\n📊 Treasury");
    println!("═══════════════════════════════════");
    println!("{}: {}", "Block time".yellow().bold(), format_time(now));

    println!("\n{}", "Pools".yellow().bold());
    for kind in PoolKind::ALL {
        println!(
            "  {:<12} {}",
            kind.to_string(),
            format_amount(state.pool_amount(kind)).green()
        );
    }

    println!("\n{}", "Clock".yellow().bold());
    match &state.clock {
        Some(clock) => {
            println!("  Pay schedule timer: {}", format_time(clock.pay_sched_timer));
            println!(
                "  Last referrer pay:  {}",
                format_time(clock.last_referrer_payout)
            );
            println!("  Rewards paid:       {}", format_amount(clock.rewards_paid));
            println!(
                "  Reserve minted:     {}",
                format_amount(clock.reserve_tokens_minted)
            );
        }
        None => println!("  {}", "not started".bright_black()),
    }

    println!(
        "\n{} ({:?}, {} entries)",
        "Pay schedule".yellow().bold(),
        treasury.schedule_status(),
        state.schedule.len()
    );
    for (i, entry) in state.schedule.entries().enumerate() {
        println!(
            "  {}. {:<12} {} (votes {})",
            i + 1,
            entry.owner,
            format_amount(entry.payout()).green(),
            entry.votes
        );
    }
    println!();
}

fn format_amount(amount: u64) -> String {
    format!(
        "{}.{:09} FIO",
        amount / SUF_PER_TOKEN,
        amount % SUF_PER_TOKEN
    )
}

fn format_time(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_claims() {
        let cli = Cli::try_parse_from([
            "treasury-cli",
            "bpclaim",
            "bp1@dapix",
            "--actor",
            "bp1",
        ])
        .unwrap();
        match cli.command {
            Commands::Bpclaim { fio_address, actor } => {
                assert_eq!(fio_address, "bp1@dapix");
                assert_eq!(actor, "bp1");
            }
            _ => panic!("expected bpclaim"),
        }
        assert_eq!(cli.data_dir, PathBuf::from("treasury-data"));

        assert!(Cli::try_parse_from(["treasury-cli", "tpidclaim"]).is_err());
    }

    #[test]
    fn test_parse_credit_pool_names() {
        let cli = Cli::try_parse_from(["treasury-cli", "credit", "bpbucketpool", "500"]).unwrap();
        match cli.command {
            Commands::Credit {
                pool,
                amount,
                actor,
            } => {
                assert_eq!(pool, PoolKind::Bucket);
                assert_eq!(amount, 500);
                assert_eq!(actor, "fio.fee");
            }
            _ => panic!("expected credit"),
        }

        assert!(Cli::try_parse_from(["treasury-cli", "credit", "savings", "1"]).is_err());
    }

    #[test]
    fn test_credit_action_mapping() {
        assert_eq!(
            credit_action(PoolKind::Foundation, 7).name(),
            "fdtnrwdupdat"
        );
        assert_eq!(credit_action(PoolKind::Active, 7).name(), "bprewdupdate");
    }

    #[test]
    fn test_failed_credit_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path(), None).unwrap();
        workspace.init(1_700_000_000, false).unwrap();
        let account = workspace.config().accounts.treasury.clone();

        let result = apply(&workspace, |treasury| {
            credit(treasury, &account, "fio.fee", PoolKind::Active, u64::MAX)
        });
        assert!(result.is_err());

        let treasury = workspace.load().unwrap();
        assert_eq!(treasury.pool_amount(PoolKind::Active), 0);
        assert_eq!(treasury.with_host(|world| world.balance(&account)), 150_000);

        apply(&workspace, |treasury| {
            credit(treasury, &account, "fio.fee", PoolKind::Bucket, 730)
        })
        .unwrap();
        let treasury = workspace.load().unwrap();
        assert_eq!(treasury.pool_amount(PoolKind::Bucket), 730);
        assert_eq!(treasury.with_host(|world| world.balance(&account)), 150_730);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_amount(1_500_000_000), "1.500000000 FIO");
        assert_eq!(format_amount(42), "0.000000042 FIO");
        assert_eq!(format_time(0), "1970-01-01 00:00:00 UTC");
    }
}
