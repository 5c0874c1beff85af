multiversx_sc::imports!();

use crate::pool::{min_of, pro_rata, saturating_sub};
use crate::rebalancer::plan_stakes;
use crate::types::{AgentReport, AgentState, BondingAgent, StakeStatus};

/// Ties the ledger, the queue and the agents together: one flush per era and one
/// applied fact per agent per era.
#[multiversx_sc::module]
pub trait CoordinatorModule:
    crate::config::ConfigModule
    + crate::withdrawal::WithdrawalModule
    + crate::pool::PoolModule
    + crate::bridge::BridgeModule
    + crate::agents::AgentsModule
{
    // ========================================================
    // Era flush: queue, fast-track, then stakes
    // ========================================================

    fn flush_era(&self, era: u64) {
        self.advance_queue(era);

        let sealed_value = self.open_batch_value().get();
        let buffer = self.stake_buffer().get();
        let fast_tracked = self.seal_open_batch(era, &buffer);
        self.stake_buffer().set(&buffer - &fast_tracked);

        let deposits = self.buffered_deposits().get() + self.carried_deposits().get();
        let redeems = &sealed_value + &self.carried_redeems().get();

        let mut enabled_ids: ManagedVec<u64> = ManagedVec::new();
        let mut enabled_stakes: ManagedVec<BigUint> = ManagedVec::new();
        let mut disabled_ids: ManagedVec<u64> = ManagedVec::new();
        let mut disabled_stakes: ManagedVec<BigUint> = ManagedVec::new();
        for agent_id in self.agent_ids().iter() {
            let agent = self.agents(agent_id).get();
            match agent.state {
                AgentState::Paused => {}
                AgentState::Disabled => {
                    disabled_ids.push(agent_id);
                    disabled_stakes.push(agent.stake);
                }
                _ => {
                    enabled_ids.push(agent_id);
                    enabled_stakes.push(agent.stake);
                }
            }
        }

        let plan = plan_stakes(
            &enabled_stakes,
            &disabled_stakes,
            &deposits,
            &redeems,
            &self.max_allowable_difference().get(),
        );

        self.write_stakes(&enabled_ids, &plan.enabled);
        self.write_stakes(&disabled_ids, &plan.disabled);
        self.carried_deposits().set(&plan.carried_deposits);
        self.carried_redeems().set(&plan.carried_redeems);
        self.buffered_deposits().clear();

        self.era_flushed_event(era, &deposits, &redeems, &fast_tracked);
    }

    fn write_stakes(&self, ids: &ManagedVec<u64>, stakes: &ManagedVec<BigUint>) {
        for (i, agent_id) in ids.iter().enumerate() {
            let mut agent = self.agents(agent_id).get();
            agent.stake = (*stakes.get(i)).clone();
            self.agents(agent_id).set(&agent);
        }
    }

    // ========================================================
    // Applying a finalized agent report
    // ========================================================

    fn apply_agent_report(&self, era: u64, agent_id: u64, report: &AgentReport<Self::Api>) {
        let mut agent = self.agents(agent_id).get();

        // ── Downward transfer completed ──
        if agent.transfer_downward_balance > 0u64
            && agent.received_downward_balance >= agent.transfer_downward_balance
        {
            let received = agent.received_downward_balance.clone();
            let requested = agent.transfer_downward_balance.clone();
            agent.received_downward_balance = BigUint::zero();
            agent.transfer_downward_balance = BigUint::zero();
            agent.cached_total_balance = saturating_sub(&agent.cached_total_balance, &requested);
            agent.borrow = saturating_sub(&agent.borrow, &received);

            let leftover = self.fill_withdrawal_shortfall(&received);
            self.stake_buffer().update(|b| *b += &leftover);
            self.downward_completed_event(agent_id, &requested, &received);
        }

        // ── Upward transfer arrived on the stash ──
        if agent.transfer_upward_balance > 0u64
            && report.total_balance >= &agent.cached_total_balance + &agent.transfer_upward_balance
        {
            agent.transfer_upward_balance = BigUint::zero();
        }

        // ── Rewards and losses ──
        let observed = agent.observed_value(report);
        if observed > agent.borrow {
            let reward = &observed - &agent.borrow;
            agent.stake += &reward;
            agent.borrow += &reward;
            self.apply_positive_delta(&reward);
        } else if observed < agent.borrow {
            let loss = &agent.borrow - &observed;
            self.socialize_loss(era, &mut agent, &loss);
        }

        agent.record_report(era, report);
        if agent.state != AgentState::Paused {
            self.issue_instructions(&mut agent, report);
        }

        self.agents(agent_id).set(&agent);
        self.report_applied_event(era, agent_id, &report.total_balance, &agent.stake, &agent.borrow);
    }

    /// Splits an agent loss between the pool and the withdrawal queue by their
    /// claims on the agent. The pool side is floored.
    fn socialize_loss(&self, era: u64, agent: &mut BondingAgent<Self::Api>, loss: &BigUint) {
        let loss = min_of(loss, &agent.borrow);
        let pool_claim = min_of(&agent.stake, &agent.borrow);
        let pool_loss = pro_rata(&loss, &pool_claim, &agent.borrow);
        let withdrawal_loss = &loss - &pool_loss;

        if pool_loss > 0u64 {
            self.apply_negative_delta(era, &pool_loss);
        }
        if withdrawal_loss > 0u64 {
            let unclaimed = self.apply_withdrawal_loss(&withdrawal_loss);
            self.stake_buffer().update(|b| *b += &unclaimed);
        }

        agent.stake = saturating_sub(&agent.stake, &pool_loss);
        agent.borrow -= &loss;
        self.loss_socialized_event(agent.id, &pool_loss, &withdrawal_loss);
    }

    // ========================================================
    // Per-agent instructions: move the remote balance toward `stake`
    // ========================================================

    fn issue_instructions(&self, agent: &mut BondingAgent<Self::Api>, report: &AgentReport<Self::Api>) {
        let remote = &report.total_balance + &agent.transfer_upward_balance;
        let mut free = agent.free_balance.clone();

        if remote <= agent.stake {
            let buffer = self.stake_buffer().get();
            let amount = min_of(&(&agent.stake - &remote), &buffer);
            if amount > 0u64 {
                self.stake_buffer().set(&buffer - &amount);
                agent.borrow += &amount;
                agent.transfer_upward_balance += &amount;
                self.send_transfer_upward(agent.id, &agent.stash, &amount);
            }
        } else {
            let mut surplus = &remote - &agent.stake;

            let down = min_of(&free, &surplus);
            if down > 0u64 {
                free -= &down;
                surplus -= &down;
                agent.transfer_downward_balance += &down;
                self.send_transfer_downward(agent.id, &agent.stash, &down);
            }

            if surplus > 0u64 && agent.withdrawable_balance > 0u64 {
                agent.withdraw_requested = true;
                self.send_withdraw(agent.id, &agent.stash);
            }

            // whatever is unlocking already comes back without a new unbond
            let uncovered = saturating_sub(&surplus, &agent.unlocking_balance);
            let unbond = min_of(&uncovered, &agent.active_balance);
            if unbond > 0u64 {
                agent.pending_unbonds = unbond.clone();
                self.send_unbond(agent.id, &agent.stash, &unbond);
            }
        }

        self.bond_free(agent, &free);

        if agent.state == AgentState::Disabled
            && agent.stake == 0u64
            && report.status == StakeStatus::Nominator
        {
            self.send_chill(agent.id, &agent.stash);
        }
    }

    fn bond_free(&self, agent: &mut BondingAgent<Self::Api>, free: &BigUint) {
        agent.pending_bonds = BigUint::zero();
        if *free == 0u64 {
            return;
        }
        let first_bond = agent.active_balance == 0u64;
        if first_bond && *free < self.relay_spec().get().min_nominator_bond {
            return;
        }

        agent.pending_bonds = free.clone();
        if self.bonding_enabled().get() {
            self.send_bond(agent.id, &agent.stash, free);
        }
    }

    // ========================================================
    // ENDPOINT: setBondingEnabled
    // ========================================================

    #[endpoint(setBondingEnabled)]
    fn set_bonding_enabled(&self, enabled: bool) {
        self.require_owner();
        let was_enabled = self.bonding_enabled().get();
        self.bonding_enabled().set(enabled);
        self.bonding_toggled_event(enabled);
        if !enabled || was_enabled {
            return;
        }

        for agent_id in self.agent_ids().iter() {
            let agent = self.agents(agent_id).get();
            if agent.pending_bonds > 0u64 && agent.state != AgentState::Paused {
                self.send_bond(agent_id, &agent.stash, &agent.pending_bonds);
            }
        }
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("eraFlushed")]
    fn era_flushed_event(
        &self,
        #[indexed] era: u64,
        #[indexed] deposits: &BigUint,
        #[indexed] redeems: &BigUint,
        fast_tracked: &BigUint,
    );

    #[event("reportApplied")]
    fn report_applied_event(
        &self,
        #[indexed] era: u64,
        #[indexed] agent_id: u64,
        #[indexed] total_balance: &BigUint,
        #[indexed] stake: &BigUint,
        borrow: &BigUint,
    );

    #[event("downwardCompleted")]
    fn downward_completed_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] requested: &BigUint,
        received: &BigUint,
    );

    #[event("lossSocialized")]
    fn loss_socialized_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] pool_loss: &BigUint,
        withdrawal_loss: &BigUint,
    );

    #[event("bondingToggled")]
    fn bonding_toggled_event(&self, #[indexed] enabled: bool);
}
