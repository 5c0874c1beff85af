#![allow(dead_code)]

use liquid_staking::agents::AgentsModule;
use liquid_staking::config::ConfigModule;
use liquid_staking::coordinator::CoordinatorModule;
use liquid_staking::oracle::OracleModule;
use liquid_staking::pool::PoolModule;
use liquid_staking::types::{AgentReport, AgentState, StakeStatus};
use liquid_staking::withdrawal::WithdrawalModule;
use liquid_staking::LiquidStaking;
use multiversx_sc_scenario::api::DebugApi;
use multiversx_sc_scenario::imports::*;

pub const OWNER: TestAddress = TestAddress::new("owner");
pub const RELAY: TestAddress = TestAddress::new("relay");
pub const TREASURY: TestAddress = TestAddress::new("treasury");
pub const DEVELOPERS: TestAddress = TestAddress::new("developers");
pub const ORACLE_1: TestAddress = TestAddress::new("oracle-1");
pub const ORACLE_2: TestAddress = TestAddress::new("oracle-2");
pub const ORACLE_3: TestAddress = TestAddress::new("oracle-3");
pub const ALICE: TestAddress = TestAddress::new("alice");
pub const BOB: TestAddress = TestAddress::new("bob");

pub const SC: TestSCAddress = TestSCAddress::new("liquid-staking");
pub const CODE_PATH: MxscPath = MxscPath::new("output/liquid-staking.mxsc.json");

pub const UNIT: u64 = 1_000_000_000;
pub const ERA_DURATION: u64 = 21_600;
pub const START_TIMESTAMP: u64 = 1_000_000;
pub const UNBONDING_DELAY: u64 = 2;
pub const USER_BALANCE: u64 = 5_000_000_000_000_000_000;
pub const RELAY_BALANCE: u64 = 5_000_000_000_000_000_000;

pub fn world() -> ScenarioWorld {
    let mut blockchain = ScenarioWorld::new();
    blockchain.register_contract(CODE_PATH, liquid_staking::ContractBuilder);
    blockchain
}

pub fn big(value: &BigUint<DebugApi>) -> u64 {
    value.to_u64().unwrap()
}

/// Plain copy of an agent's accounting, readable outside a whitebox closure.
#[derive(Clone, Debug)]
pub struct AgentView {
    pub state: AgentState,
    pub stake: u64,
    pub borrow: u64,
    pub cached_total_balance: u64,
    pub free_balance: u64,
    pub active_balance: u64,
    pub pending_bonds: u64,
    pub pending_unbonds: u64,
    pub withdraw_requested: bool,
    pub transfer_upward_balance: u64,
    pub transfer_downward_balance: u64,
    pub received_downward_balance: u64,
    pub last_reported_era: u64,
}

/// A stash on the simulated relay network.
#[derive(Clone, Debug, Default)]
pub struct Stash {
    pub agent_id: u64,
    pub free: u64,
    pub active: u64,
    /// (unlock era, amount)
    pub unlocking: Vec<(u64, u64)>,
    pub synced_era: u64,
}

impl Stash {
    pub fn unlocking_total(&self) -> u64 {
        self.unlocking.iter().map(|(_, amount)| amount).sum()
    }

    pub fn withdrawable(&self, era: u64) -> u64 {
        self.unlocking
            .iter()
            .filter(|(unlock_era, _)| *unlock_era <= era)
            .map(|(_, amount)| amount)
            .sum()
    }

    pub fn total(&self) -> u64 {
        self.free + self.active + self.unlocking_total()
    }

    pub fn report(&self, era: u64) -> (StakeStatus, u64, u64, u64, u64) {
        let status = if self.active > 0 {
            StakeStatus::Nominator
        } else {
            StakeStatus::Idle
        };
        (
            status,
            self.total(),
            self.active,
            self.unlocking_total(),
            self.withdrawable(era),
        )
    }
}

/// Contract plus a minimal relay network that follows the contract's instructions.
pub struct Harness {
    pub world: ScenarioWorld,
    pub era: u64,
    pub stashes: Vec<Stash>,
}

impl Harness {
    pub fn new(deposit_cap: u64, max_allowable_difference: u64) -> Self {
        let mut world = world();
        world.account(OWNER).nonce(1).balance(UNIT);
        world.account(RELAY).nonce(1).balance(RELAY_BALANCE);
        world.account(TREASURY).nonce(1);
        world.account(DEVELOPERS).nonce(1);
        world.account(ORACLE_1).nonce(1);
        world.account(ORACLE_2).nonce(1);
        world.account(ORACLE_3).nonce(1);
        world.account(ALICE).nonce(1).balance(USER_BALANCE);
        world.account(BOB).nonce(1).balance(USER_BALANCE);
        world.current_block().block_timestamp(START_TIMESTAMP);

        world
            .tx()
            .from(OWNER)
            .raw_deploy()
            .code(CODE_PATH)
            .new_address(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                sc.init(
                    RELAY.to_managed_address(),
                    TREASURY.to_managed_address(),
                    DEVELOPERS.to_managed_address(),
                    BigUint::from(deposit_cap),
                    BigUint::from(max_allowable_difference),
                    ERA_DURATION,
                );
            });

        world
            .tx()
            .from(OWNER)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                sc.set_relay_spec(16, BigUint::zero(), UNBONDING_DELAY);
                sc.add_oracle_member(ORACLE_1.to_managed_address());
            });

        Harness {
            world,
            era: 0,
            stashes: Vec::new(),
        }
    }

    pub fn add_agent(&mut self, stash: &str) -> u64 {
        let mut agent_id = 0;
        let stash_name = stash.to_string();
        self.world
            .tx()
            .from(OWNER)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                agent_id = sc.add_agent(
                    ManagedBuffer::from(stash_name.as_str()),
                    ManagedBuffer::from("controller"),
                );
            });
        self.stashes.push(Stash {
            agent_id,
            ..Default::default()
        });
        agent_id
    }

    pub fn add_oracle_member(&mut self, member: TestAddress) {
        self.world
            .tx()
            .from(OWNER)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                sc.add_oracle_member(member.to_managed_address());
            });
    }

    pub fn set_quorum(&mut self, quorum: u64) {
        self.world
            .tx()
            .from(OWNER)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                sc.set_quorum(quorum);
            });
    }

    pub fn deposit(&mut self, from: TestAddress, amount: u64) -> u64 {
        let mut shares = 0;
        self.world
            .tx()
            .from(from)
            .to(SC)
            .egld(amount)
            .whitebox(liquid_staking::contract_obj, |sc| {
                shares = big(&sc.deposit());
            });
        shares
    }

    pub fn redeem(&mut self, from: TestAddress, share_amount: u64) -> u64 {
        let mut value = 0;
        self.world
            .tx()
            .from(from)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                value = big(&sc.redeem(BigUint::from(share_amount)));
            });
        value
    }

    pub fn claim(&mut self, from: TestAddress) -> u64 {
        let mut amount = 0;
        self.world
            .tx()
            .from(from)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                amount = big(&sc.claim_unbonded());
            });
        amount
    }

    /// Moves the block clock to the start of the next era.
    pub fn advance_era(&mut self) {
        self.era += 1;
        self.world
            .current_block()
            .block_timestamp(START_TIMESTAMP + self.era * ERA_DURATION);
    }

    /// One full era: rewards (or losses) hit the stashes, every stash is reported
    /// by `ORACLE_1`, and the relay carries out whatever the contract asked for.
    pub fn new_era(&mut self, deltas: &[i64]) {
        self.advance_era();
        for (index, delta) in deltas.iter().enumerate() {
            self.apply_delta(index, *delta);
        }
        for index in 0..self.stashes.len() {
            self.submit_report(ORACLE_1, index);
            self.relay_sync(index);
        }
    }

    pub fn apply_delta(&mut self, index: usize, delta: i64) {
        let stash = &mut self.stashes[index];
        if delta >= 0 {
            if stash.active > 0 {
                stash.active += delta as u64;
            } else {
                stash.free += delta as u64;
            }
        } else {
            // slashes hit bonded funds first, then the youngest unlocking chunks
            let mut loss = delta.unsigned_abs();
            let taken = loss.min(stash.active);
            stash.active -= taken;
            loss -= taken;
            for (_, amount) in stash.unlocking.iter_mut().rev() {
                let taken = loss.min(*amount);
                *amount -= taken;
                loss -= taken;
            }
            stash.unlocking.retain(|(_, amount)| *amount > 0);
            stash.free -= loss;
        }
    }

    pub fn submit_report(&mut self, oracle: TestAddress, index: usize) {
        let era = self.era;
        let agent_id = self.stashes[index].agent_id;
        let (status, total, active, unlocking, withdrawable) = self.stashes[index].report(era);
        self.world
            .tx()
            .from(oracle)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                sc.submit_report(
                    era,
                    agent_id,
                    AgentReport {
                        status,
                        total_balance: BigUint::from(total),
                        active_balance: BigUint::from(active),
                        unlocking_balance: BigUint::from(unlocking),
                        withdrawable_balance: BigUint::from(withdrawable),
                    },
                );
            });
    }

    /// Applies the instructions the contract recorded on the agent after its report.
    pub fn relay_sync(&mut self, index: usize) {
        let era = self.era;
        let agent_id = self.stashes[index].agent_id;
        let view = self.agent(agent_id);
        if view.last_reported_era != era || self.stashes[index].synced_era == era {
            return;
        }
        self.stashes[index].synced_era = era;
        let bonding_enabled = self.bonding_enabled();

        let down = view.transfer_downward_balance - view.received_downward_balance;
        {
            let stash = &mut self.stashes[index];
            stash.free -= down;
            if bonding_enabled && view.pending_bonds > 0 {
                stash.free -= view.pending_bonds;
                stash.active += view.pending_bonds;
            }
            if view.pending_unbonds > 0 {
                stash.active -= view.pending_unbonds;
                stash.unlocking.push((era + UNBONDING_DELAY, view.pending_unbonds));
            }
            if view.withdraw_requested {
                let withdrawn = stash.withdrawable(era);
                stash.unlocking.retain(|(unlock_era, _)| *unlock_era > era);
                stash.free += withdrawn;
            }
            stash.free += view.transfer_upward_balance;
        }

        if down > 0 {
            self.world
                .tx()
                .from(RELAY)
                .to(SC)
                .egld(down)
                .whitebox(liquid_staking::contract_obj, |sc| {
                    sc.receive_downward(agent_id);
                });
        }
    }

    /// Re-enables bonding; the relay bonds whatever was parked while it was off.
    pub fn set_bonding_enabled(&mut self, enabled: bool) {
        self.world
            .tx()
            .from(OWNER)
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                sc.set_bonding_enabled(enabled);
            });
        if !enabled {
            return;
        }
        for index in 0..self.stashes.len() {
            let view = self.agent(self.stashes[index].agent_id);
            let stash = &mut self.stashes[index];
            if view.pending_bonds > 0 && stash.free >= view.pending_bonds {
                stash.free -= view.pending_bonds;
                stash.active += view.pending_bonds;
            }
        }
    }

    pub fn agent(&mut self, agent_id: u64) -> AgentView {
        let mut view = None;
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                let agent = sc.agents(agent_id).get();
                view = Some(AgentView {
                    state: agent.state,
                    stake: big(&agent.stake),
                    borrow: big(&agent.borrow),
                    cached_total_balance: big(&agent.cached_total_balance),
                    free_balance: big(&agent.free_balance),
                    active_balance: big(&agent.active_balance),
                    pending_bonds: big(&agent.pending_bonds),
                    pending_unbonds: big(&agent.pending_unbonds),
                    withdraw_requested: agent.withdraw_requested,
                    transfer_upward_balance: big(&agent.transfer_upward_balance),
                    transfer_downward_balance: big(&agent.transfer_downward_balance),
                    received_downward_balance: big(&agent.received_downward_balance),
                    last_reported_era: agent.last_reported_era,
                });
            });
        view.unwrap()
    }

    pub fn bonding_enabled(&mut self) -> bool {
        let mut enabled = false;
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                enabled = sc.bonding_enabled().get();
            });
        enabled
    }

    pub fn fund_raised(&mut self) -> u64 {
        let mut value = 0;
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                value = big(&sc.fund_raised_balance().get());
            });
        value
    }

    pub fn shares_of(&mut self, holder: TestAddress) -> u64 {
        let mut value = 0;
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                value = big(&sc.shares(&holder.to_managed_address()).get());
            });
        value
    }

    /// (waiting, claimable)
    pub fn unbonded(&mut self, holder: TestAddress) -> (u64, u64) {
        let mut result = (0, 0);
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                let (waiting, claimable) = sc.get_unbonded(holder.to_managed_address()).into_tuple();
                result = (big(&waiting), big(&claimable));
            });
        result
    }

    pub fn withdrawal_total_virtual(&mut self) -> u64 {
        let mut value = 0;
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                value = big(&sc.withdrawal_total_virtual().get());
            });
        value
    }

    /// Asserts `claims == backing` within `tolerance`.
    pub fn check_conservation(&mut self, tolerance: u64) {
        self.world
            .query()
            .to(SC)
            .whitebox(liquid_staking::contract_obj, |sc| {
                let snapshot = sc.get_accounting_snapshot();
                let claims = big(&snapshot.claims);
                let backing = big(&snapshot.backing);
                assert!(
                    claims.abs_diff(backing) <= tolerance,
                    "claims {claims} backing {backing}"
                );
            });
    }
}
