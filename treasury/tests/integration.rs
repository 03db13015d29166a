use std::thread;

use treasury::*;

const NOW: u64 = 1_700_000_000;
const TREASURY: &str = "fio.treasury";

fn sandbox() -> Sandbox {
    let mut host = Sandbox::new(TREASURY, NOW);
    host.add_producer("bpa", 100.0, true);
    host.add_producer("bpb", 50.0, true);
    host.register_name("bpa@dapix", "bpa", NOW + 365 * 86_400);
    host.register_name("bpb@dapix", "bpb", NOW + 365 * 86_400);
    host
}

#[test]
fn test_treasury_basic_flow() {
    let mut config = TreasuryConfig::default();
    config.mint.max_to_mint = 0;

    let treasury = Treasury::new(config, sandbox()).unwrap();
    treasury.start_clock(TREASURY).unwrap();

    // Fee contract forwards 2100 units along with the matching pool credit
    treasury.with_host_mut(|host| host.fund(TREASURY, 2100).unwrap());
    treasury.credit_active_pool("fio.fee", 2100).unwrap();

    let receipt = treasury.producer_claim("bpa", "bpa@dapix", "bpa").unwrap();
    assert!(receipt.schedule_created);

    // 40% of 2100 over 21 slots = 40, plus 60% of 2100 * 100/150 = 840
    assert_eq!(receipt.amount, 880);
    assert_eq!(treasury.pool_amount(PoolKind::Active), 2100 - 880);
    treasury.with_host(|host| {
        assert_eq!(host.balance("bpa"), 880);
        assert_eq!(host.claim_resets("bpa"), 1);
    });
    assert_eq!(treasury.clock().unwrap().rewards_paid, 880);
}

#[test]
fn test_treasury_pool_credits() {
    let treasury = Treasury::new(TreasuryConfig::default(), sandbox()).unwrap();

    assert_eq!(treasury.credit_active_pool("fio.system", 10).unwrap(), 10);
    assert_eq!(treasury.credit_bucket_pool("fio.token", 20).unwrap(), 20);
    assert_eq!(treasury.credit_foundation_pool("fio.reqobt", 30).unwrap(), 30);
    assert_eq!(treasury.credit_foundation_pool(TREASURY, 5).unwrap(), 35);

    let err = treasury.credit_bucket_pool("bpa", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    assert_eq!(treasury.pools().total(), 65);
}

#[test]
fn test_concurrent_credits_are_serialized() {
    let treasury = Treasury::new(TreasuryConfig::default(), sandbox()).unwrap();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..250 {
                    treasury.credit_bucket_pool("fio.fee", 2).unwrap();
                }
            });
        }
    });

    assert_eq!(treasury.pool_amount(PoolKind::Bucket), 8 * 250 * 2);
}

#[test]
fn test_state_resumes_from_snapshot() {
    let mut config = TreasuryConfig::default();
    config.mint.max_to_mint = 0;

    let treasury = Treasury::new(config.clone(), sandbox()).unwrap();
    treasury.start_clock(TREASURY).unwrap();
    treasury.with_host_mut(|host| host.fund(TREASURY, 2100).unwrap());
    treasury.credit_active_pool("fio.fee", 2100).unwrap();
    treasury.producer_claim("bpa", "bpa@dapix", "bpa").unwrap();

    let (state, host) = treasury.into_parts();
    let json = serde_json::to_string(&state).unwrap();
    let restored: TreasuryState = serde_json::from_str(&json).unwrap();

    let resumed = Treasury::from_state(config, restored, host).unwrap();
    assert_eq!(resumed.schedule().len(), 1);

    let receipt = resumed.producer_claim("bpb", "bpb@dapix", "bpb").unwrap();
    assert!(!receipt.schedule_created);
    assert_eq!(receipt.amount, 40 + 420);
    assert!(resumed.schedule().is_empty());
}
