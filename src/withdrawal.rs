multiversx_sc::imports!();

use crate::errors::*;
use crate::pool::{min_of, saturating_sub};
use crate::types::{UnbondRequest, WithdrawalBatch, WithdrawalStats};

/// Redeemed value waiting for unbonded funds. Redeems of one era share an open batch;
/// sealed batches hold shares of a withdrawal pool so agent losses reach them pro rata.
#[multiversx_sc::module]
pub trait WithdrawalModule: crate::config::ConfigModule {
    // ========================================================
    // Queue operations
    // ========================================================

    fn enqueue_redeem(&self, holder: &ManagedAddress, value: &BigUint) {
        let open_id = self.batch_count().get();
        let open_value = self.open_batch_value().get();
        let open_units = self.open_batch_units().get();

        // a wiped open batch is retired on the spot, so units imply value here
        let units = if open_units == 0u64 {
            value.clone()
        } else {
            value * &open_units / &open_value
        };
        require!(units > 0u64, ERR_INVALID_AMOUNT);

        let mut requests = self.unbond_requests(holder);
        let len = requests.len();
        let mut merged = false;
        if len > 0 {
            let mut last = requests.get(len);
            if last.batch_id == open_id {
                last.units += &units;
                requests.set(len, &last);
                merged = true;
            }
        }
        if !merged {
            require!(
                (len as u64) < self.max_unbond_requests().get(),
                ERR_TOO_MANY_REQUESTS
            );
            requests.push(&UnbondRequest {
                batch_id: open_id,
                units: units.clone(),
            });
        }

        self.open_batch_value().update(|v| *v += value);
        self.open_batch_units().update(|u| *u += &units);

        self.redeem_queued_event(holder, open_id, &units, value);
    }

    /// Seals the open batch (if anything was redeemed) and fast-tracks up to `available`
    /// free pool funds into the withdrawal shortfall. Returns the amount fast-tracked.
    fn seal_open_batch(&self, era: u64, available: &BigUint) -> BigUint {
        let open_units = self.open_batch_units().get();
        let mut sealed = None;

        if open_units > 0u64 {
            let value = self.open_batch_value().get();
            let total_virtual = self.withdrawal_total_virtual().get();
            if total_virtual == 0u64 && self.withdrawal_total_shares().get() > 0u64 {
                self.write_off_withdrawal_pool();
            }
            let total_shares = self.withdrawal_total_shares().get();
            let shares = if total_shares == 0u64 {
                value.clone()
            } else {
                &value * &total_shares / &total_virtual
            };

            self.withdrawal_total_virtual().set(&total_virtual + &value);
            self.withdrawal_total_shares().set(&total_shares + &shares);

            sealed = Some(WithdrawalBatch {
                id: self.batch_count().get(),
                era,
                units: open_units,
                shares,
                unlock_era: era,
                released_value: BigUint::zero(),
                released: false,
            });
        }

        let total_virtual = self.withdrawal_total_virtual().get();
        let pending = self.withdrawal_pending_funds().get();
        let fast_tracked = min_of(available, &saturating_sub(&total_virtual, &pending));
        let pending = &pending + &fast_tracked;
        self.withdrawal_pending_funds().set(&pending);

        if let Some(mut batch) = sealed {
            if pending < total_virtual {
                batch.unlock_era = era + self.relay_spec().get().unbonding_delay;
            }
            let value = self.open_batch_value().get();
            self.batch_sealed_event(batch.id, era, &value, &batch.shares, batch.unlock_era);
            self.batches(batch.id).set(&batch);

            self.batch_count().update(|c| *c += 1);
            self.open_batch_value().clear();
            self.open_batch_units().clear();
        }

        fast_tracked
    }

    /// Releases head batches, oldest first, while they are unlocked and funded.
    fn advance_queue(&self, era: u64) {
        loop {
            let head = self.batch_head().get();
            if head >= self.batch_count().get() {
                break;
            }
            let mut batch = self.batches(head).get();
            if batch.unlock_era > era {
                break;
            }

            let total_virtual = self.withdrawal_total_virtual().get();
            let total_shares = self.withdrawal_total_shares().get();
            // last batch out takes the rounding dust
            let value = if batch.shares == 0u64 {
                BigUint::zero()
            } else if batch.shares >= total_shares {
                total_virtual.clone()
            } else {
                &batch.shares * &total_virtual / &total_shares
            };
            let pending = self.withdrawal_pending_funds().get();
            if pending < value {
                break;
            }

            self.withdrawal_total_virtual().set(&total_virtual - &value);
            self.withdrawal_total_shares()
                .set(saturating_sub(&total_shares, &batch.shares));
            self.withdrawal_pending_funds().set(&pending - &value);
            self.claimable_total().update(|c| *c += &value);

            batch.released = true;
            batch.released_value = value.clone();
            batch.shares = BigUint::zero();
            self.batches(head).set(&batch);
            self.batch_head().set(head + 1);

            self.batch_released_event(head, era, &value);
        }
    }

    /// Routes funds returned by an agent: the withdrawal shortfall first.
    /// Returns what is left over for the pool.
    fn fill_withdrawal_shortfall(&self, amount: &BigUint) -> BigUint {
        let shortfall = saturating_sub(
            &self.withdrawal_total_virtual().get(),
            &self.withdrawal_pending_funds().get(),
        );
        let taken = min_of(amount, &shortfall);
        if taken > 0u64 {
            self.withdrawal_pending_funds().update(|p| *p += &taken);
        }
        amount - &taken
    }

    /// Withdrawal-side share of an agent loss. Returns pending funds that no longer
    /// have a claim against them.
    fn apply_withdrawal_loss(&self, loss: &BigUint) -> BigUint {
        let total_virtual = self.withdrawal_total_virtual().get();
        let applied = min_of(loss, &total_virtual);
        let total_virtual = &total_virtual - &applied;
        self.withdrawal_total_virtual().set(&total_virtual);
        self.withdrawal_loss_event(&applied);
        if total_virtual == 0u64 {
            self.write_off_withdrawal_pool();
        }

        let pending = self.withdrawal_pending_funds().get();
        if pending > total_virtual {
            self.withdrawal_pending_funds().set(&total_virtual);
            return &pending - &total_virtual;
        }
        BigUint::zero()
    }

    /// Drops the shares of every unreleased batch once the pool holds no value,
    /// so batches sealed later do not share their value with them.
    fn write_off_withdrawal_pool(&self) {
        for batch_id in self.batch_head().get()..self.batch_count().get() {
            let mut batch = self.batches(batch_id).get();
            batch.shares = BigUint::zero();
            self.batches(batch_id).set(&batch);
        }
        self.withdrawal_total_shares().clear();
    }

    /// Seals an open batch whose whole value was lost. It keeps its place in the
    /// queue and releases at zero.
    fn retire_open_batch(&self, era: u64) {
        let batch = WithdrawalBatch {
            id: self.batch_count().get(),
            era,
            units: self.open_batch_units().get(),
            shares: BigUint::zero(),
            unlock_era: era,
            released_value: BigUint::zero(),
            released: false,
        };
        self.batch_sealed_event(batch.id, era, &BigUint::zero(), &batch.shares, era);
        self.batches(batch.id).set(&batch);

        self.batch_count().update(|c| *c += 1);
        self.open_batch_value().clear();
        self.open_batch_units().clear();
    }

    /// Current value of a batch. The open batch is valued directly; sealed ones
    /// through the withdrawal pool.
    fn batch_value(&self, batch_id: u64) -> BigUint {
        if batch_id == self.batch_count().get() {
            return self.open_batch_value().get();
        }
        if self.batches(batch_id).is_empty() {
            return BigUint::zero();
        }
        let batch = self.batches(batch_id).get();
        if batch.released {
            return batch.released_value;
        }
        let total_shares = self.withdrawal_total_shares().get();
        if total_shares == 0u64 {
            return BigUint::zero();
        }
        &batch.shares * &self.withdrawal_total_virtual().get() / &total_shares
    }

    fn request_value(&self, request: &UnbondRequest<Self::Api>) -> BigUint {
        let (batch_value, batch_units) = if request.batch_id == self.batch_count().get() {
            (self.open_batch_value().get(), self.open_batch_units().get())
        } else {
            let batch = self.batches(request.batch_id).get();
            (self.batch_value(request.batch_id), batch.units)
        };
        if batch_units == 0u64 {
            return BigUint::zero();
        }
        &request.units * &batch_value / &batch_units
    }

    fn is_request_released(&self, request: &UnbondRequest<Self::Api>) -> bool {
        request.batch_id < self.batch_head().get()
    }

    // ========================================================
    // ENDPOINT: claimUnbonded
    // ========================================================

    #[endpoint(claimUnbonded)]
    fn claim_unbonded(&self) -> BigUint {
        let caller = self.blockchain().get_caller();
        let mut requests = self.unbond_requests(&caller);
        let len = requests.len();

        // released batches form a prefix of the holder's requests
        let mut released_count = 0usize;
        let mut amount = BigUint::zero();
        for i in 1..=len {
            let request = requests.get(i);
            if !self.is_request_released(&request) {
                break;
            }
            amount += self.request_value(&request);
            released_count += 1;
        }
        require!(released_count > 0, ERR_NOTHING_TO_CLAIM);

        for i in (released_count + 1)..=len {
            let request = requests.get(i);
            requests.set(i - released_count, &request);
        }
        for _ in 0..released_count {
            requests.swap_remove(requests.len());
        }

        if amount > 0u64 {
            self.claimable_total().update(|c| *c -= &amount);
            self.send().direct_egld(&caller, &amount);
        }

        self.unbonded_claimed_event(&caller, &amount);
        amount
    }

    // ========================================================
    // VIEWS
    // ========================================================

    /// (waiting, claimable) for a holder
    #[view(getUnbonded)]
    fn get_unbonded(&self, holder: ManagedAddress) -> MultiValue2<BigUint, BigUint> {
        let mut waiting = BigUint::zero();
        let mut claimable = BigUint::zero();
        for request in self.unbond_requests(&holder).iter() {
            let value = self.request_value(&request);
            if self.is_request_released(&request) {
                claimable += value;
            } else {
                waiting += value;
            }
        }
        (waiting, claimable).into()
    }

    #[view(getUnbondRequests)]
    fn get_unbond_requests(
        &self,
        holder: ManagedAddress,
    ) -> MultiValueEncoded<UnbondRequest<Self::Api>> {
        let mut result = MultiValueEncoded::new();
        for request in self.unbond_requests(&holder).iter() {
            result.push(request);
        }
        result
    }

    #[view(getBatch)]
    fn get_batch(&self, batch_id: u64) -> OptionalValue<WithdrawalBatch<Self::Api>> {
        if self.batches(batch_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.batches(batch_id).get())
        }
    }

    #[view(getBatchValue)]
    fn get_batch_value(&self, batch_id: u64) -> BigUint {
        self.batch_value(batch_id)
    }

    #[view(getWithdrawalStats)]
    fn get_withdrawal_stats(&self) -> WithdrawalStats<Self::Api> {
        WithdrawalStats {
            total_virtual: self.withdrawal_total_virtual().get(),
            total_shares: self.withdrawal_total_shares().get(),
            pending_funds: self.withdrawal_pending_funds().get(),
            claimable_total: self.claimable_total().get(),
            head_batch_id: self.batch_head().get(),
            open_batch_id: self.batch_count().get(),
            open_batch_value: self.open_batch_value().get(),
            open_batch_units: self.open_batch_units().get(),
        }
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("redeemQueued")]
    fn redeem_queued_event(
        &self,
        #[indexed] holder: &ManagedAddress,
        #[indexed] batch_id: u64,
        #[indexed] units: &BigUint,
        value: &BigUint,
    );

    #[event("batchSealed")]
    fn batch_sealed_event(
        &self,
        #[indexed] batch_id: u64,
        #[indexed] era: u64,
        #[indexed] value: &BigUint,
        #[indexed] shares: &BigUint,
        unlock_era: u64,
    );

    #[event("batchReleased")]
    fn batch_released_event(&self, #[indexed] batch_id: u64, #[indexed] era: u64, value: &BigUint);

    #[event("unbondedClaimed")]
    fn unbonded_claimed_event(&self, #[indexed] holder: &ManagedAddress, amount: &BigUint);

    #[event("withdrawalLoss")]
    fn withdrawal_loss_event(&self, loss: &BigUint);

    // ========================================================
    // STORAGE
    // ========================================================

    /// Value owed to sealed, unreleased batches
    #[storage_mapper("withdrawalTotalVirtual")]
    fn withdrawal_total_virtual(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("withdrawalTotalShares")]
    fn withdrawal_total_shares(&self) -> SingleValueMapper<BigUint>;

    /// Funds on hand reserved for sealed batches
    #[storage_mapper("withdrawalPendingFunds")]
    fn withdrawal_pending_funds(&self) -> SingleValueMapper<BigUint>;

    /// Released and not yet claimed
    #[storage_mapper("claimableTotal")]
    fn claimable_total(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("openBatchValue")]
    fn open_batch_value(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("openBatchUnits")]
    fn open_batch_units(&self) -> SingleValueMapper<BigUint>;

    /// Id of the open batch; sealed batches are `batchHead..batchCount`
    #[storage_mapper("batchCount")]
    fn batch_count(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("batchHead")]
    fn batch_head(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("batches")]
    fn batches(&self, batch_id: u64) -> SingleValueMapper<WithdrawalBatch<Self::Api>>;

    #[storage_mapper("unbondRequests")]
    fn unbond_requests(&self, holder: &ManagedAddress) -> VecMapper<UnbondRequest<Self::Api>>;
}
