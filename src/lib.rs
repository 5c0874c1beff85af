#![no_std]

multiversx_sc::imports!();

pub mod agents;
pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod oracle;
pub mod pool;
pub mod rebalancer;
pub mod token;
pub mod types;
pub mod withdrawal;

use errors::ERR_INVALID_CONFIG;
use types::{AccountingSnapshot, RelaySpec};

// ============================================================
// Constants
// ============================================================

/// Basis points denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Share price is quoted with 18 decimals
pub const SHARE_PRICE_PRECISION: u64 = 1_000_000_000_000_000_000;

const DEFAULT_TREASURY_FEE_BPS: u64 = 800;
const DEFAULT_DEVELOPERS_FEE_BPS: u64 = 200;

/// Open withdrawal requests a single holder may keep
const DEFAULT_MAX_UNBOND_REQUESTS: u64 = 35;

const DEFAULT_MAX_VALIDATORS_PER_AGENT: u64 = 16;

/// Eras between an unbond and the funds becoming withdrawable
const DEFAULT_UNBONDING_DELAY: u64 = 28;

const DEFAULT_QUORUM: u64 = 1;

// ============================================================
// Contract
// ============================================================

#[multiversx_sc::contract]
pub trait LiquidStaking:
    config::ConfigModule
    + withdrawal::WithdrawalModule
    + pool::PoolModule
    + token::TokenModule
    + bridge::BridgeModule
    + agents::AgentsModule
    + coordinator::CoordinatorModule
    + oracle::OracleModule
{
    // ========================================================
    // Init / Upgrade
    // ========================================================

    #[init]
    fn init(
        &self,
        relay_address: ManagedAddress,
        treasury: ManagedAddress,
        developers: ManagedAddress,
        deposit_cap: BigUint,
        max_allowable_difference: BigUint,
        era_duration: u64,
    ) {
        require!(deposit_cap > 0u64, ERR_INVALID_CONFIG);
        require!(era_duration > 0, ERR_INVALID_CONFIG);

        self.owner().set(self.blockchain().get_caller());
        self.relay_address().set(&relay_address);
        self.treasury().set(&treasury);
        self.developers().set(&developers);
        self.deposit_cap().set(&deposit_cap);
        self.max_allowable_difference().set(&max_allowable_difference);

        self.treasury_fee_bps().set(DEFAULT_TREASURY_FEE_BPS);
        self.developers_fee_bps().set(DEFAULT_DEVELOPERS_FEE_BPS);
        self.max_unbond_requests().set(DEFAULT_MAX_UNBOND_REQUESTS);
        self.relay_spec().set(RelaySpec {
            max_validators_per_agent: DEFAULT_MAX_VALIDATORS_PER_AGENT,
            min_nominator_bond: BigUint::zero(),
            unbonding_delay: DEFAULT_UNBONDING_DELAY,
        });
        self.bonding_enabled().set(true);
        self.paused().set(false);

        self.anchor_era().set(0u64);
        self.anchor_timestamp().set(self.blockchain().get_block_timestamp());
        self.era_duration().set(era_duration);
        self.quorum().set(DEFAULT_QUORUM);

        self.total_shares().set(BigUint::zero());
    }

    #[upgrade]
    fn upgrade(&self) {}

    // ========================================================
    // VIEW: getAccountingSnapshot
    // Claims on the pool against the funds backing them.
    // ========================================================

    #[view(getAccountingSnapshot)]
    fn get_accounting_snapshot(&self) -> AccountingSnapshot<Self::Api> {
        let mut total_stake = BigUint::zero();
        let mut total_borrow = BigUint::zero();
        for agent_id in self.agent_ids().iter() {
            let agent = self.agents(agent_id).get();
            total_stake += &agent.stake;
            total_borrow += &agent.borrow;
        }

        let claims = self.fund_raised_balance().get()
            + self.open_batch_value().get()
            + self.withdrawal_total_virtual().get();
        let backing = &total_borrow
            + &self.stake_buffer().get()
            + self.withdrawal_pending_funds().get();

        AccountingSnapshot {
            claims,
            backing,
            total_stake,
            total_borrow,
        }
    }
}
