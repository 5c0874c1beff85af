multiversx_sc::imports!();
multiversx_sc::derive_imports!();

// ============================================================
// Agent State: lifecycle of a bonding agent
// ============================================================

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Debug)]
pub enum AgentState {
    /// Registered, no finalized report yet.
    New,
    /// Reported, bonded funds (if any) are not nominating.
    Idle,
    Nominator,
    Chill,
    /// Receives no new stake; drained toward zero.
    Disabled,
    /// Frozen: no reports, no instructions, excluded from rebalancing.
    Paused,
}

impl AgentState {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AgentState::Disabled | AgentState::Paused)
    }
}

/// Staking status of the stash as seen on the relay network.
#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Copy, PartialEq, Debug)]
pub enum StakeStatus {
    Idle,
    Nominator,
    Chill,
}

impl From<StakeStatus> for AgentState {
    fn from(status: StakeStatus) -> Self {
        match status {
            StakeStatus::Idle => AgentState::Idle,
            StakeStatus::Nominator => AgentState::Nominator,
            StakeStatus::Chill => AgentState::Chill,
        }
    }
}

// ============================================================
// Bonding Agent: one remote stash, owned by the registry
// ============================================================

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Debug)]
pub struct BondingAgent<M: ManagedTypeApi> {
    pub id: u64,
    pub stash: ManagedBuffer<M>,
    pub controller: ManagedBuffer<M>,
    pub state: AgentState,
    /// Pool's target allocation on this agent
    pub stake: BigUint<M>,
    /// Everything attributed to this agent: pool claim, withdrawal claim, in-flight transfers
    pub borrow: BigUint<M>,
    /// Stash total as of the last applied report
    pub cached_total_balance: BigUint<M>,
    pub free_balance: BigUint<M>,
    pub active_balance: BigUint<M>,
    pub unlocking_balance: BigUint<M>,
    pub withdrawable_balance: BigUint<M>,
    pub pending_bonds: BigUint<M>,
    pub pending_unbonds: BigUint<M>,
    pub withdraw_requested: bool,
    pub transfer_upward_balance: BigUint<M>,
    pub transfer_downward_balance: BigUint<M>,
    pub received_downward_balance: BigUint<M>,
    pub last_reported_era: u64,
}

// ============================================================
// Oracle
// ============================================================

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Debug)]
pub struct AgentReport<M: ManagedTypeApi> {
    pub status: StakeStatus,
    /// free + active + unlocking on the stash
    pub total_balance: BigUint<M>,
    pub active_balance: BigUint<M>,
    pub unlocking_balance: BigUint<M>,
    /// Part of `unlocking_balance` past the unbonding delay
    pub withdrawable_balance: BigUint<M>,
}

impl<M: ManagedTypeApi> PartialEq for AgentReport<M> {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.total_balance == other.total_balance
            && self.active_balance == other.active_balance
            && self.unlocking_balance == other.unlocking_balance
            && self.withdrawable_balance == other.withdrawable_balance
    }
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Debug)]
pub struct ReportTally<M: ManagedTypeApi> {
    pub report: AgentReport<M>,
    pub votes: u64,
}

// ============================================================
// Withdrawal queue
// ============================================================

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Debug)]
pub struct WithdrawalBatch<M: ManagedTypeApi> {
    pub id: u64,
    /// Era in which the batch was sealed
    pub era: u64,
    pub units: BigUint<M>,
    /// Shares of the withdrawal pool; zero once released
    pub shares: BigUint<M>,
    pub unlock_era: u64,
    pub released_value: BigUint<M>,
    pub released: bool,
}

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Debug)]
pub struct UnbondRequest<M: ManagedTypeApi> {
    pub batch_id: u64,
    pub units: BigUint<M>,
}

// ============================================================
// Configuration and stats views
// ============================================================

#[type_abi]
#[derive(TopEncode, TopDecode, NestedEncode, NestedDecode, Clone, Debug)]
pub struct RelaySpec<M: ManagedTypeApi> {
    pub max_validators_per_agent: u64,
    pub min_nominator_bond: BigUint<M>,
    pub unbonding_delay: u64,
}

#[type_abi]
#[derive(TopEncode, TopDecode, Clone, Debug)]
pub struct ProtocolConfig<M: ManagedTypeApi> {
    pub owner: ManagedAddress<M>,
    pub relay: ManagedAddress<M>,
    pub treasury: ManagedAddress<M>,
    pub developers: ManagedAddress<M>,
    pub deposit_cap: BigUint<M>,
    pub max_allowable_difference: BigUint<M>,
    pub treasury_fee_bps: u64,
    pub developers_fee_bps: u64,
    pub max_unbond_requests: u64,
    pub bonding_enabled: bool,
    pub paused: bool,
    pub relay_spec: RelaySpec<M>,
}

#[type_abi]
#[derive(TopEncode, TopDecode, Clone, Debug)]
pub struct PoolStats<M: ManagedTypeApi> {
    pub fund_raised_balance: BigUint<M>,
    pub total_shares: BigUint<M>,
    pub buffered_deposits: BigUint<M>,
    pub stake_buffer: BigUint<M>,
    pub carried_deposits: BigUint<M>,
    pub carried_redeems: BigUint<M>,
    pub share_price: BigUint<M>,
}

#[type_abi]
#[derive(TopEncode, TopDecode, Clone, Debug)]
pub struct WithdrawalStats<M: ManagedTypeApi> {
    pub total_virtual: BigUint<M>,
    pub total_shares: BigUint<M>,
    pub pending_funds: BigUint<M>,
    pub claimable_total: BigUint<M>,
    pub head_batch_id: u64,
    pub open_batch_id: u64,
    pub open_batch_value: BigUint<M>,
    pub open_batch_units: BigUint<M>,
}

/// Both sides of the conservation equation, for monitoring.
#[type_abi]
#[derive(TopEncode, TopDecode, Clone, Debug)]
pub struct AccountingSnapshot<M: ManagedTypeApi> {
    /// fund + open batch + queued withdrawals
    pub claims: BigUint<M>,
    /// agent borrows + stake buffer + withdrawal funds on hand
    pub backing: BigUint<M>,
    pub total_stake: BigUint<M>,
    pub total_borrow: BigUint<M>,
}
