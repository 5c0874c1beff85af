multiversx_sc::imports!();

use crate::errors::*;
use crate::types::PoolStats;
use crate::{BPS_DENOMINATOR, SHARE_PRICE_PRECISION};

/// Shares minted for `amount`. Bootstraps 1:1 while no shares exist.
pub fn shares_for_amount<M: ManagedTypeApi>(
    amount: &BigUint<M>,
    total_shares: &BigUint<M>,
    total_pooled: &BigUint<M>,
) -> BigUint<M> {
    if *total_shares == 0u64 || *total_pooled == 0u64 {
        return amount.clone();
    }
    amount * total_shares / total_pooled
}

pub fn amount_for_shares<M: ManagedTypeApi>(
    shares: &BigUint<M>,
    total_shares: &BigUint<M>,
    total_pooled: &BigUint<M>,
) -> BigUint<M> {
    if *total_shares == 0u64 {
        return BigUint::zero();
    }
    shares * total_pooled / total_shares
}

/// Shares worth `fee` once minted at the post-reward price.
/// `pooled_after` already includes the reward the fee was taken from.
pub fn fee_shares<M: ManagedTypeApi>(
    fee: &BigUint<M>,
    total_shares: &BigUint<M>,
    pooled_after: &BigUint<M>,
) -> BigUint<M> {
    if *fee == 0u64 || *total_shares == 0u64 || pooled_after <= fee {
        return BigUint::zero();
    }
    fee * total_shares / &(pooled_after - fee)
}

/// Floor of `amount * part / whole`; zero when `whole` is zero.
pub fn pro_rata<M: ManagedTypeApi>(
    amount: &BigUint<M>,
    part: &BigUint<M>,
    whole: &BigUint<M>,
) -> BigUint<M> {
    if *whole == 0u64 {
        return BigUint::zero();
    }
    amount * part / whole
}

pub fn min_of<M: ManagedTypeApi>(a: &BigUint<M>, b: &BigUint<M>) -> BigUint<M> {
    if a < b {
        a.clone()
    } else {
        b.clone()
    }
}

pub fn saturating_sub<M: ManagedTypeApi>(a: &BigUint<M>, b: &BigUint<M>) -> BigUint<M> {
    if a > b {
        a - b
    } else {
        BigUint::zero()
    }
}

#[multiversx_sc::module]
pub trait PoolModule: crate::config::ConfigModule + crate::withdrawal::WithdrawalModule {
    // ========================================================
    // ENDPOINT: deposit
    // ========================================================

    #[endpoint(deposit)]
    #[payable("EGLD")]
    fn deposit(&self) -> BigUint {
        self.require_not_paused();
        let caller = self.blockchain().get_caller();
        let amount = self.call_value().egld_value().clone_value();
        require!(amount > 0u64, ERR_INVALID_AMOUNT);

        let fund_raised = self.fund_raised_balance().get();
        require!(
            &fund_raised + &amount <= self.deposit_cap().get(),
            ERR_DEPOSIT_CAP_EXCEEDED
        );

        let total_shares = self.total_shares().get();
        require!(
            total_shares == 0u64 || fund_raised > 0u64,
            ERR_POOL_INSOLVENT
        );

        let shares = shares_for_amount(&amount, &total_shares, &fund_raised);
        require!(shares > 0u64, ERR_INVALID_AMOUNT);

        self.mint_shares(&caller, &shares);
        self.fund_raised_balance().update(|v| *v += &amount);
        self.buffered_deposits().update(|v| *v += &amount);
        self.stake_buffer().update(|v| *v += &amount);

        self.deposit_event(&caller, &amount, &shares);
        shares
    }

    // ========================================================
    // ENDPOINT: redeem
    // Burns shares now; the value waits in the withdrawal queue.
    // ========================================================

    #[endpoint(redeem)]
    fn redeem(&self, share_amount: BigUint) -> BigUint {
        self.require_not_paused();
        let caller = self.blockchain().get_caller();
        let holder_shares = self.shares(&caller).get();
        require!(
            share_amount > 0u64 && share_amount <= holder_shares,
            ERR_INSUFFICIENT_SHARES
        );

        let fund_raised = self.fund_raised_balance().get();
        let value = amount_for_shares(&share_amount, &self.total_shares().get(), &fund_raised);
        require!(value > 0u64, ERR_INVALID_AMOUNT);

        self.burn_shares(&caller, &share_amount);
        self.fund_raised_balance().set(&fund_raised - &value);
        self.enqueue_redeem(&caller, &value);

        self.redeem_event(&caller, &value, &share_amount);
        value
    }

    // ========================================================
    // Deltas reported by agents
    // ========================================================

    /// Grows the pool and pays the treasury/developers fee as freshly minted shares.
    fn apply_positive_delta(&self, reward: &BigUint) {
        self.fund_raised_balance().update(|v| *v += reward);
        let fund_raised = self.fund_raised_balance().get();

        let treasury_bps = self.treasury_fee_bps().get();
        let developers_bps = self.developers_fee_bps().get();
        let total_fee_bps = treasury_bps + developers_bps;
        let fee = reward * total_fee_bps / BPS_DENOMINATOR;

        let minted = fee_shares(&fee, &self.total_shares().get(), &fund_raised);
        if minted > 0u64 {
            let developers_shares = &minted * developers_bps / total_fee_bps;
            let treasury_shares = &minted - &developers_shares;
            self.mint_shares(&self.treasury().get(), &treasury_shares);
            self.mint_shares(&self.developers().get(), &developers_shares);
            self.fee_minted_event(&treasury_shares, &developers_shares, &fee);
        }

        self.rewards_applied_event(reward, &fund_raised);
    }

    /// Pool-side share of an agent loss. Split with the open redeem batch by value;
    /// the fund side is floored so the batch absorbs the dust. An open batch left
    /// with no value is retired.
    fn apply_negative_delta(&self, era: u64, loss: &BigUint) {
        let fund_raised = self.fund_raised_balance().get();
        let batch_value = self.open_batch_value().get();

        let mut fund_loss = pro_rata(loss, &fund_raised, &(&fund_raised + &batch_value));
        let mut batch_loss = loss - &fund_loss;
        if batch_loss > batch_value {
            fund_loss += &batch_loss - &batch_value;
            batch_loss = batch_value.clone();
        }
        let fund_loss = min_of(&fund_loss, &fund_raised);

        self.fund_raised_balance().set(&fund_raised - &fund_loss);
        let batch_value = &batch_value - &batch_loss;
        self.open_batch_value().set(&batch_value);
        if batch_value == 0u64 && self.open_batch_units().get() > 0u64 {
            self.retire_open_batch(era);
        }

        self.losses_applied_event(&fund_loss, &batch_loss);
    }

    fn mint_shares(&self, holder: &ManagedAddress, amount: &BigUint) {
        self.shares(holder).update(|s| *s += amount);
        self.total_shares().update(|ts| *ts += amount);
    }

    fn burn_shares(&self, holder: &ManagedAddress, amount: &BigUint) {
        self.shares(holder).update(|s| *s -= amount);
        self.total_shares().update(|ts| *ts -= amount);
    }

    // ========================================================
    // VIEWS
    // ========================================================

    #[view(getSharePrice)]
    fn get_share_price(&self) -> BigUint {
        let total_shares = self.total_shares().get();
        let precision = BigUint::from(SHARE_PRICE_PRECISION);
        if total_shares == 0u64 {
            return precision;
        }
        self.fund_raised_balance().get() * precision / total_shares
    }

    #[view(getTotalPooled)]
    fn get_total_pooled(&self) -> BigUint {
        self.fund_raised_balance().get()
    }

    #[view(getPooledBySharesAmount)]
    fn get_pooled_by_shares_amount(&self, shares: BigUint) -> BigUint {
        amount_for_shares(
            &shares,
            &self.total_shares().get(),
            &self.fund_raised_balance().get(),
        )
    }

    #[view(getSharesByPooledAmount)]
    fn get_shares_by_pooled_amount(&self, amount: BigUint) -> BigUint {
        shares_for_amount(
            &amount,
            &self.total_shares().get(),
            &self.fund_raised_balance().get(),
        )
    }

    #[view(getPoolStats)]
    fn get_pool_stats(&self) -> PoolStats<Self::Api> {
        PoolStats {
            fund_raised_balance: self.fund_raised_balance().get(),
            total_shares: self.total_shares().get(),
            buffered_deposits: self.buffered_deposits().get(),
            stake_buffer: self.stake_buffer().get(),
            carried_deposits: self.carried_deposits().get(),
            carried_redeems: self.carried_redeems().get(),
            share_price: self.get_share_price(),
        }
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("deposit")]
    fn deposit_event(
        &self,
        #[indexed] holder: &ManagedAddress,
        #[indexed] amount: &BigUint,
        shares: &BigUint,
    );

    #[event("redeem")]
    fn redeem_event(
        &self,
        #[indexed] holder: &ManagedAddress,
        #[indexed] amount: &BigUint,
        shares: &BigUint,
    );

    #[event("feeMinted")]
    fn fee_minted_event(
        &self,
        #[indexed] treasury_shares: &BigUint,
        #[indexed] developers_shares: &BigUint,
        fee: &BigUint,
    );

    #[event("rewardsApplied")]
    fn rewards_applied_event(&self, #[indexed] reward: &BigUint, fund_raised: &BigUint);

    #[event("lossesApplied")]
    fn losses_applied_event(&self, #[indexed] fund_loss: &BigUint, batch_loss: &BigUint);

    // ========================================================
    // STORAGE
    // ========================================================

    /// Value owned by share holders
    #[storage_mapper("fundRaisedBalance")]
    fn fund_raised_balance(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("totalShares")]
    fn total_shares(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("shares")]
    fn shares(&self, holder: &ManagedAddress) -> SingleValueMapper<BigUint>;

    /// Deposits since the last era flush
    #[storage_mapper("bufferedDeposits")]
    fn buffered_deposits(&self) -> SingleValueMapper<BigUint>;

    /// Pool funds held here and not yet sent to an agent
    #[storage_mapper("stakeBuffer")]
    fn stake_buffer(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("carriedDeposits")]
    fn carried_deposits(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("carriedRedeems")]
    fn carried_redeems(&self) -> SingleValueMapper<BigUint>;
}
