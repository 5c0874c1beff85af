use liquid_staking::rebalancer::{plan_stakes, sum_of, StakePlan};
use multiversx_sc::types::{BigUint, ManagedVec};
use multiversx_sc_scenario::api::StaticApi;

type Stakes = ManagedVec<StaticApi, BigUint<StaticApi>>;

fn stakes(values: &[u64]) -> Stakes {
    let mut result = ManagedVec::new();
    for value in values {
        result.push(BigUint::from(*value));
    }
    result
}

fn values(stakes: &Stakes) -> Vec<u64> {
    stakes.iter().map(|stake| stake.to_u64().unwrap()).collect()
}

fn plan(
    enabled: &[u64],
    disabled: &[u64],
    deposits: u64,
    redeems: u64,
    max_churn: u64,
) -> StakePlan<StaticApi> {
    plan_stakes(
        &stakes(enabled),
        &stakes(disabled),
        &BigUint::from(deposits),
        &BigUint::from(redeems),
        &BigUint::from(max_churn),
    )
}

#[test]
fn test_deposit_split_evenly_across_new_agents() {
    let result = plan(&[0, 0, 0], &[], 90, 0, 0);
    assert_eq!(values(&result.enabled), vec![30, 30, 30]);
    assert_eq!(result.carried_deposits, 0u64);
    assert_eq!(result.carried_redeems, 0u64);
}

#[test]
fn test_division_dust_goes_to_first_agent() {
    let result = plan(&[0, 0, 0], &[], 100, 0, 0);
    assert_eq!(values(&result.enabled), vec![34, 33, 33]);
}

#[test]
fn test_churn_budget_limits_convergence() {
    let converged = plan(&[1006, 0], &[], 1000, 0, 3);
    assert_eq!(values(&converged.enabled), vec![1003, 1003]);

    let limited = plan(&[1006, 0], &[], 1000, 0, 1);
    assert_eq!(values(&limited.enabled), vec![1005, 1001]);

    let frozen = plan(&[1006, 0], &[], 1000, 0, 0);
    assert_eq!(values(&frozen.enabled), vec![1006, 1000]);
}

#[test]
fn test_outflow_taken_from_most_loaded_agent() {
    let result = plan(&[60, 20], &[], 0, 20, 0);
    assert_eq!(values(&result.enabled), vec![40, 20]);
}

#[test]
fn test_redeems_drain_disabled_agents_first() {
    let result = plan(&[50, 50], &[30], 0, 20, 0);
    assert_eq!(values(&result.disabled), vec![10]);
    assert_eq!(values(&result.enabled), vec![50, 50]);
    assert_eq!(result.carried_redeems, 0u64);
}

#[test]
fn test_disabled_stake_moves_within_churn_budget() {
    let result = plan(&[50, 50], &[30], 0, 0, 10);
    assert_eq!(values(&result.disabled), vec![20]);
    assert_eq!(values(&result.enabled), vec![55, 55]);
}

#[test]
fn test_no_enabled_agents_carries_everything() {
    let result = plan(&[], &[10], 40, 25, 100);
    assert!(result.enabled.is_empty());
    assert_eq!(values(&result.disabled), vec![0]);
    assert_eq!(result.carried_deposits, 40u64);
    assert_eq!(result.carried_redeems, 15u64);
}

#[test]
fn test_uncovered_redeems_are_carried() {
    let result = plan(&[10], &[], 0, 25, 0);
    assert_eq!(values(&result.enabled), vec![0]);
    assert_eq!(result.carried_redeems, 15u64);
}

#[test]
fn test_stake_sum_is_conserved() {
    let cases: [(&[u64], &[u64], u64, u64, u64); 5] = [
        (&[7, 13, 29], &[], 101, 0, 5),
        (&[500, 0, 250], &[40], 0, 90, 1_000),
        (&[1, 1, 1, 1], &[3, 9], 17, 4, 2),
        (&[1_000_000, 3], &[], 0, 999_999, 0),
        (&[0, 0], &[100], 0, 0, 37),
    ];

    for (enabled, disabled, deposits, redeems, max_churn) in cases {
        let before: u64 = enabled.iter().chain(disabled.iter()).sum();
        let result = plan(enabled, disabled, deposits, redeems, max_churn);
        let after = sum_of(&result.enabled) + sum_of(&result.disabled);
        let covered = redeems - result.carried_redeems.to_u64().unwrap();
        assert_eq!(after, before + deposits - covered);
    }
}
