multiversx_sc::imports!();

use crate::errors::*;
use crate::types::{AgentReport, AgentState, BondingAgent};

impl<M: ManagedTypeApi> BondingAgent<M> {
    pub fn new(id: u64, stash: ManagedBuffer<M>, controller: ManagedBuffer<M>) -> Self {
        BondingAgent {
            id,
            stash,
            controller,
            state: AgentState::New,
            stake: BigUint::zero(),
            borrow: BigUint::zero(),
            cached_total_balance: BigUint::zero(),
            free_balance: BigUint::zero(),
            active_balance: BigUint::zero(),
            unlocking_balance: BigUint::zero(),
            withdrawable_balance: BigUint::zero(),
            pending_bonds: BigUint::zero(),
            pending_unbonds: BigUint::zero(),
            withdraw_requested: false,
            transfer_upward_balance: BigUint::zero(),
            transfer_downward_balance: BigUint::zero(),
            received_downward_balance: BigUint::zero(),
            last_reported_era: 0,
        }
    }

    /// Value the agent should hold on the relay network once every in-flight
    /// transfer has landed.
    pub fn observed_value(&self, report: &AgentReport<M>) -> BigUint<M> {
        &report.total_balance + &self.transfer_upward_balance + &self.transfer_downward_balance
    }

    pub fn has_funds(&self) -> bool {
        self.stake > 0u64
            || self.borrow > 0u64
            || self.transfer_upward_balance > 0u64
            || self.transfer_downward_balance > 0u64
            || self.received_downward_balance > 0u64
    }

    /// Copies the finalized balances. Disabled and paused agents keep their
    /// administrative state.
    pub fn record_report(&mut self, era: u64, report: &AgentReport<M>) {
        let locked = &report.active_balance + &report.unlocking_balance;
        self.free_balance = if report.total_balance > locked {
            &report.total_balance - &locked
        } else {
            BigUint::zero()
        };
        self.active_balance = report.active_balance.clone();
        self.unlocking_balance = report.unlocking_balance.clone();
        self.withdrawable_balance = report.withdrawable_balance.clone();
        self.cached_total_balance = report.total_balance.clone();
        self.last_reported_era = era;
        self.pending_unbonds = BigUint::zero();
        self.withdraw_requested = false;

        if self.state.is_enabled() {
            self.state = report.status.into();
        }
    }
}

#[multiversx_sc::module]
pub trait AgentsModule: crate::config::ConfigModule + crate::bridge::BridgeModule {
    // ========================================================
    // Registry lifecycle (owner)
    // ========================================================

    #[endpoint(addAgent)]
    fn add_agent(&self, stash: ManagedBuffer, controller: ManagedBuffer) -> u64 {
        self.require_owner();
        require!(!stash.is_empty(), ERR_INVALID_CONFIG);
        require!(self.agent_by_stash(&stash).is_empty(), ERR_AGENT_EXISTS);

        let agent_id = self.agent_count().get() + 1u64;
        let agent = BondingAgent::new(agent_id, stash.clone(), controller);

        self.agents(agent_id).set(&agent);
        self.agent_ids().insert(agent_id);
        self.agent_by_stash(&stash).set(agent_id);
        self.agent_count().set(agent_id);

        self.agent_added_event(agent_id, &stash);
        agent_id
    }

    #[endpoint(disableAgent)]
    fn disable_agent(&self, agent_id: u64) {
        self.require_owner();
        let mut agent = self.require_agent(agent_id);
        require!(agent.state != AgentState::Paused, ERR_AGENT_PAUSED);
        require!(agent.state != AgentState::Disabled, ERR_AGENT_STATE);
        self.set_agent_state(&mut agent, AgentState::Disabled);
    }

    #[endpoint(enableAgent)]
    fn enable_agent(&self, agent_id: u64) {
        self.require_owner();
        let mut agent = self.require_agent(agent_id);
        require!(agent.state == AgentState::Disabled, ERR_AGENT_STATE);
        self.set_agent_state(&mut agent, AgentState::Idle);
    }

    /// Emergency stop: the agent is frozen until resumed.
    #[endpoint(pauseAgent)]
    fn pause_agent(&self, agent_id: u64) {
        self.require_owner();
        let mut agent = self.require_agent(agent_id);
        require!(agent.state != AgentState::Paused, ERR_AGENT_STATE);
        self.set_agent_state(&mut agent, AgentState::Paused);
    }

    #[endpoint(resumeAgent)]
    fn resume_agent(&self, agent_id: u64) {
        self.require_owner();
        let mut agent = self.require_agent(agent_id);
        require!(agent.state == AgentState::Paused, ERR_AGENT_STATE);
        self.set_agent_state(&mut agent, AgentState::Idle);
    }

    #[endpoint(removeAgent)]
    fn remove_agent(&self, agent_id: u64) {
        self.require_owner();
        let agent = self.require_agent(agent_id);
        require!(agent.state == AgentState::Disabled, ERR_AGENT_STATE);
        require!(!agent.has_funds(), ERR_AGENT_HAS_FUNDS);

        self.agents(agent_id).clear();
        self.agent_ids().swap_remove(&agent_id);
        self.agent_by_stash(&agent.stash).clear();

        self.agent_removed_event(agent_id, &agent.stash);
    }

    // ========================================================
    // Relay-side instructions (owner)
    // ========================================================

    #[endpoint(nominateBatch)]
    fn nominate_batch(
        &self,
        nominations: MultiValueEncoded<MultiValue2<u64, ManagedVec<ManagedBuffer>>>,
    ) {
        self.require_owner();
        let max_validators = self.relay_spec().get().max_validators_per_agent;

        for nomination in nominations.into_iter() {
            let (agent_id, validators) = nomination.into_tuple();
            let agent = self.require_agent(agent_id);
            require!(agent.state.is_enabled(), ERR_AGENT_STATE);
            require!(!validators.is_empty(), ERR_INVALID_CONFIG);
            require!(
                validators.len() as u64 <= max_validators,
                ERR_TOO_MANY_VALIDATORS
            );
            self.send_nominate(agent_id, &agent.stash, &validators);
        }
    }

    #[endpoint(chillAgent)]
    fn chill_agent(&self, agent_id: u64) {
        self.require_owner();
        let agent = self.require_agent(agent_id);
        require!(agent.state != AgentState::Paused, ERR_AGENT_PAUSED);
        self.send_chill(agent_id, &agent.stash);
    }

    // ========================================================
    // ENDPOINT: receiveDownward
    // Relay returns funds the pool asked for with a downward transfer.
    // ========================================================

    #[endpoint(receiveDownward)]
    #[payable("EGLD")]
    fn receive_downward(&self, agent_id: u64) {
        let caller = self.blockchain().get_caller();
        require!(caller == self.relay_address().get(), ERR_NOT_RELAY);
        let payment = self.call_value().egld_value().clone_value();
        require!(payment > 0u64, ERR_INVALID_AMOUNT);

        let mut agent = self.require_agent(agent_id);
        require!(agent.transfer_downward_balance > 0u64, ERR_NO_TRANSFER_PENDING);

        agent.received_downward_balance += &payment;
        self.agents(agent_id).set(&agent);

        self.downward_received_event(agent_id, &payment, &agent.received_downward_balance);
    }

    // ── Helpers ──

    fn require_agent(&self, agent_id: u64) -> BondingAgent<Self::Api> {
        require!(!self.agents(agent_id).is_empty(), ERR_UNKNOWN_AGENT);
        self.agents(agent_id).get()
    }

    fn set_agent_state(&self, agent: &mut BondingAgent<Self::Api>, state: AgentState) {
        agent.state = state;
        self.agents(agent.id).set(&*agent);
        self.agent_state_changed_event(agent.id, state);
    }

    // ========================================================
    // VIEWS
    // ========================================================

    #[view(getAgent)]
    fn get_agent(&self, agent_id: u64) -> OptionalValue<BondingAgent<Self::Api>> {
        if self.agents(agent_id).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.agents(agent_id).get())
        }
    }

    #[view(getAgentIds)]
    fn get_agent_ids(&self) -> MultiValueEncoded<u64> {
        let mut result = MultiValueEncoded::new();
        for agent_id in self.agent_ids().iter() {
            result.push(agent_id);
        }
        result
    }

    #[view(findAgent)]
    fn find_agent(&self, stash: ManagedBuffer) -> OptionalValue<u64> {
        if self.agent_by_stash(&stash).is_empty() {
            OptionalValue::None
        } else {
            OptionalValue::Some(self.agent_by_stash(&stash).get())
        }
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("agentAdded")]
    fn agent_added_event(&self, #[indexed] agent_id: u64, #[indexed] stash: &ManagedBuffer);

    #[event("agentStateChanged")]
    fn agent_state_changed_event(&self, #[indexed] agent_id: u64, #[indexed] state: AgentState);

    #[event("agentRemoved")]
    fn agent_removed_event(&self, #[indexed] agent_id: u64, #[indexed] stash: &ManagedBuffer);

    #[event("downwardReceived")]
    fn downward_received_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] amount: &BigUint,
        received_total: &BigUint,
    );

    // ========================================================
    // STORAGE
    // ========================================================

    #[storage_mapper("agents")]
    fn agents(&self, agent_id: u64) -> SingleValueMapper<BondingAgent<Self::Api>>;

    /// Registry order; the rebalancer walks agents in this order
    #[storage_mapper("agentIds")]
    fn agent_ids(&self) -> UnorderedSetMapper<u64>;

    #[storage_mapper("agentByStash")]
    fn agent_by_stash(&self, stash: &ManagedBuffer) -> SingleValueMapper<u64>;

    #[storage_mapper("agentCount")]
    fn agent_count(&self) -> SingleValueMapper<u64>;
}
