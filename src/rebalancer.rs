multiversx_sc::imports!();

use crate::pool::{min_of, saturating_sub};

/// Stakes after one era's rebalancing, in the same order as the inputs.
pub struct StakePlan<M: ManagedTypeApi> {
    pub enabled: ManagedVec<M, BigUint<M>>,
    pub disabled: ManagedVec<M, BigUint<M>>,
    /// Deposits no enabled agent could take
    pub carried_deposits: BigUint<M>,
    /// Redeems the agents could not cover
    pub carried_redeems: BigUint<M>,
}

/// Distributes `deposits` and `redeems` over the agents and moves at most
/// `max_churn` between them on top of that. The sum of stakes changes by exactly
/// the placed deposits minus the covered redeems.
pub fn plan_stakes<M: ManagedTypeApi>(
    enabled: &ManagedVec<M, BigUint<M>>,
    disabled: &ManagedVec<M, BigUint<M>>,
    deposits: &BigUint<M>,
    redeems: &BigUint<M>,
    max_churn: &BigUint<M>,
) -> StakePlan<M> {
    // ── Redeems drain disabled agents first ──
    let mut remaining_redeems = redeems.clone();
    let mut disabled_stakes = ManagedVec::new();
    for stake in disabled.iter() {
        let taken = min_of(&*stake, &remaining_redeems);
        remaining_redeems -= &taken;
        disabled_stakes.push(&*stake - &taken);
    }

    if enabled.is_empty() {
        return StakePlan {
            enabled: ManagedVec::new(),
            disabled: disabled_stakes,
            carried_deposits: deposits.clone(),
            carried_redeems: remaining_redeems,
        };
    }

    // ── Leftover disabled stake moves to the enabled set within the churn budget ──
    let mut churn_left = max_churn.clone();
    let mut drained = BigUint::zero();
    let mut drained_stakes = ManagedVec::new();
    for stake in disabled_stakes.iter() {
        let taken = min_of(&*stake, &churn_left);
        churn_left -= &taken;
        drained += &taken;
        drained_stakes.push(&*stake - &taken);
    }

    let enabled_sum = sum_of(enabled);
    let available = &enabled_sum + deposits + &drained;
    let carried_redeems = saturating_sub(&remaining_redeems, &available);
    let total = saturating_sub(&available, &remaining_redeems);
    let targets = even_targets(&total, enabled.len());

    let mut stakes = enabled.clone();
    if total >= enabled_sum {
        let mut inflow = &total - &enabled_sum;
        while inflow > 0u64 {
            let Some((index, deficit)) = widest_gap(&targets, &stakes) else {
                break;
            };
            let moved = min_of(&deficit, &inflow);
            inflow -= &moved;
            stakes = add_at(&stakes, index, &moved);
        }
    } else {
        let mut outflow = &enabled_sum - &total;
        while outflow > 0u64 {
            let Some((index, excess)) = widest_gap(&stakes, &targets) else {
                break;
            };
            let moved = min_of(&excess, &outflow);
            outflow -= &moved;
            stakes = sub_at(&stakes, index, &moved);
        }
    }

    // ── Churn: most loaded to least loaded, bounded by what is left ──
    while churn_left > 0u64 {
        let Some((from, excess)) = widest_gap(&stakes, &targets) else {
            break;
        };
        let Some((to, deficit)) = widest_gap(&targets, &stakes) else {
            break;
        };
        let moved = min_of(&min_of(&excess, &deficit), &churn_left);
        churn_left -= &moved;
        stakes = sub_at(&stakes, from, &moved);
        stakes = add_at(&stakes, to, &moved);
    }

    StakePlan {
        enabled: stakes,
        disabled: drained_stakes,
        carried_deposits: BigUint::zero(),
        carried_redeems,
    }
}

pub fn sum_of<M: ManagedTypeApi>(values: &ManagedVec<M, BigUint<M>>) -> BigUint<M> {
    let mut sum = BigUint::zero();
    for value in values.iter() {
        sum += &*value;
    }
    sum
}

/// `total / n` each; the remainder lands on the first agent.
fn even_targets<M: ManagedTypeApi>(total: &BigUint<M>, n: usize) -> ManagedVec<M, BigUint<M>> {
    let share = total / n as u64;
    let dust = total - &(&share * n as u64);
    let mut targets = ManagedVec::new();
    for i in 0..n {
        if i == 0 {
            targets.push(&share + &dust);
        } else {
            targets.push(share.clone());
        }
    }
    targets
}

/// Index with the largest positive `high[i] - low[i]`, first one on ties.
fn widest_gap<M: ManagedTypeApi>(
    high: &ManagedVec<M, BigUint<M>>,
    low: &ManagedVec<M, BigUint<M>>,
) -> Option<(usize, BigUint<M>)> {
    let mut best: Option<(usize, BigUint<M>)> = None;
    for i in 0..high.len() {
        let gap = saturating_sub(&*high.get(i), &*low.get(i));
        if gap == 0u64 {
            continue;
        }
        let wider = match &best {
            Some((_, widest)) => gap > *widest,
            None => true,
        };
        if wider {
            best = Some((i, gap));
        }
    }
    best
}

fn add_at<M: ManagedTypeApi>(
    values: &ManagedVec<M, BigUint<M>>,
    index: usize,
    amount: &BigUint<M>,
) -> ManagedVec<M, BigUint<M>> {
    let mut result = ManagedVec::new();
    for (i, value) in values.iter().enumerate() {
        if i == index {
            result.push(&*value + amount);
        } else {
            result.push((*value).clone());
        }
    }
    result
}

fn sub_at<M: ManagedTypeApi>(
    values: &ManagedVec<M, BigUint<M>>,
    index: usize,
    amount: &BigUint<M>,
) -> ManagedVec<M, BigUint<M>> {
    let mut result = ManagedVec::new();
    for (i, value) in values.iter().enumerate() {
        if i == index {
            result.push(saturating_sub(&*value, amount));
        } else {
            result.push((*value).clone());
        }
    }
    result
}
