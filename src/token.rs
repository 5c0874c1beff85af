multiversx_sc::imports!();

use crate::errors::*;
use crate::pool::amount_for_shares;

/// Rebasing claim on the pool. Balances are quoted in pooled value and move as
/// rewards and losses land; transfers move shares.
#[multiversx_sc::module]
pub trait TokenModule:
    crate::config::ConfigModule + crate::withdrawal::WithdrawalModule + crate::pool::PoolModule
{
    #[endpoint(transferShares)]
    fn transfer_shares(&self, to: ManagedAddress, share_amount: BigUint) {
        self.require_not_paused();
        let caller = self.blockchain().get_caller();
        self.move_shares(&caller, &to, &share_amount);
    }

    #[endpoint(approve)]
    fn approve(&self, spender: ManagedAddress, share_amount: BigUint) {
        let caller = self.blockchain().get_caller();
        self.allowances(&caller, &spender).set(&share_amount);
        self.approval_event(&caller, &spender, &share_amount);
    }

    #[endpoint(transferSharesFrom)]
    fn transfer_shares_from(&self, from: ManagedAddress, to: ManagedAddress, share_amount: BigUint) {
        self.require_not_paused();
        let spender = self.blockchain().get_caller();
        let allowance = self.allowances(&from, &spender).get();
        require!(allowance >= share_amount, ERR_INSUFFICIENT_ALLOWANCE);

        self.allowances(&from, &spender).set(&allowance - &share_amount);
        self.move_shares(&from, &to, &share_amount);
    }

    fn move_shares(&self, from: &ManagedAddress, to: &ManagedAddress, share_amount: &BigUint) {
        require!(*share_amount > 0u64, ERR_INVALID_AMOUNT);
        require!(!to.is_zero(), ERR_INVALID_CONFIG);
        require!(self.shares(from).get() >= *share_amount, ERR_INSUFFICIENT_SHARES);

        self.shares(from).update(|s| *s -= share_amount);
        self.shares(to).update(|s| *s += share_amount);
        self.transfer_event(from, to, share_amount);
    }

    // ── Views ──

    #[view(balanceOf)]
    fn balance_of(&self, holder: ManagedAddress) -> BigUint {
        amount_for_shares(
            &self.shares(&holder).get(),
            &self.total_shares().get(),
            &self.fund_raised_balance().get(),
        )
    }

    #[view(sharesOf)]
    fn shares_of(&self, holder: ManagedAddress) -> BigUint {
        self.shares(&holder).get()
    }

    #[view(allowance)]
    fn allowance(&self, owner: ManagedAddress, spender: ManagedAddress) -> BigUint {
        self.allowances(&owner, &spender).get()
    }

    #[view(getTotalShares)]
    fn get_total_shares(&self) -> BigUint {
        self.total_shares().get()
    }

    #[event("transferShares")]
    fn transfer_event(
        &self,
        #[indexed] from: &ManagedAddress,
        #[indexed] to: &ManagedAddress,
        shares: &BigUint,
    );

    #[event("approval")]
    fn approval_event(
        &self,
        #[indexed] owner: &ManagedAddress,
        #[indexed] spender: &ManagedAddress,
        shares: &BigUint,
    );

    #[storage_mapper("allowances")]
    fn allowances(
        &self,
        owner: &ManagedAddress,
        spender: &ManagedAddress,
    ) -> SingleValueMapper<BigUint>;
}
