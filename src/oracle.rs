multiversx_sc::imports!();

use crate::errors::*;
use crate::types::{AgentReport, AgentState, ReportTally};

/// Oracle members vote on each agent's remote balance once per era. Identical
/// reports are tallied; the first tally to reach the quorum becomes the era's fact
/// for that agent.
#[multiversx_sc::module]
pub trait OracleModule:
    crate::config::ConfigModule
    + crate::withdrawal::WithdrawalModule
    + crate::pool::PoolModule
    + crate::bridge::BridgeModule
    + crate::agents::AgentsModule
    + crate::coordinator::CoordinatorModule
{
    // ========================================================
    // ENDPOINT: submitReport
    // ========================================================

    #[endpoint(submitReport)]
    fn submit_report(&self, era: u64, agent_id: u64, report: AgentReport<Self::Api>) {
        let caller = self.blockchain().get_caller();
        require!(
            self.oracle_members().contains(&caller),
            ERR_UNAUTHORIZED_REPORTER
        );
        let agent = self.require_agent(agent_id);

        let reporting_era = self.reporting_era().get();
        require!(
            era >= reporting_era && era <= self.current_era(),
            ERR_STALE_ERA
        );
        if era > reporting_era {
            self.begin_era(era);
        }

        require!(agent.state != AgentState::Paused, ERR_AGENT_PAUSED);
        require!(
            !self.agent_reporters(agent_id).contains(&caller),
            ERR_ALREADY_REPORTED
        );
        self.agent_reporters(agent_id).insert(caller.clone());
        self.report_submitted_event(era, agent_id, &caller);

        if self.finalized_agents().contains(&agent_id) {
            return;
        }

        let votes = self.tally_report(agent_id, &report);
        if votes >= self.quorum().get() {
            self.finalize_report(era, agent_id, &report);
        }
    }

    /// Adds one vote for `report` and returns its tally.
    fn tally_report(&self, agent_id: u64, report: &AgentReport<Self::Api>) -> u64 {
        let mut tallies = self.report_tallies(agent_id);
        for i in 1..=tallies.len() {
            let mut tally = tallies.get(i);
            if tally.report == *report {
                tally.votes += 1;
                tallies.set(i, &tally);
                return tally.votes;
            }
        }
        tallies.push(&ReportTally {
            report: report.clone(),
            votes: 1,
        });
        1
    }

    fn finalize_report(&self, era: u64, agent_id: u64, report: &AgentReport<Self::Api>) {
        self.finalized_agents().insert(agent_id);
        self.report_finalized_event(era, agent_id, &report.total_balance);
        self.apply_agent_report(era, agent_id, report);
    }

    /// Opens `era` for reporting and runs the era flush.
    fn begin_era(&self, era: u64) {
        for agent_id in self.agent_ids().iter() {
            self.report_tallies(agent_id).clear();
            self.agent_reporters(agent_id).clear();
        }
        self.finalized_agents().clear();
        self.reporting_era().set(era);

        self.era_started_event(era);
        self.flush_era(era);
    }

    // ========================================================
    // Membership and quorum (owner)
    // ========================================================

    #[endpoint(addOracleMember)]
    fn add_oracle_member(&self, member: ManagedAddress) {
        self.require_owner();
        require!(!member.is_zero(), ERR_INVALID_CONFIG);
        require!(self.oracle_members().insert(member.clone()), ERR_MEMBER_EXISTS);
        self.oracle_member_added_event(&member);
    }

    #[endpoint(removeOracleMember)]
    fn remove_oracle_member(&self, member: ManagedAddress) {
        self.require_owner();
        require!(self.oracle_members().contains(&member), ERR_MEMBER_NOT_FOUND);
        require!(
            (self.oracle_members().len() as u64) > self.quorum().get(),
            ERR_INVALID_QUORUM
        );
        self.oracle_members().swap_remove(&member);
        self.oracle_member_removed_event(&member);
    }

    /// Lowering the quorum finalizes every waiting agent whose leading tally
    /// already meets it.
    #[endpoint(setQuorum)]
    fn set_quorum(&self, quorum: u64) {
        self.require_owner();
        require!(
            quorum >= 1 && quorum <= self.oracle_members().len() as u64,
            ERR_INVALID_QUORUM
        );
        let previous = self.quorum().get();
        self.quorum().set(quorum);
        self.quorum_changed_event(previous, quorum);

        if quorum >= previous {
            return;
        }
        let era = self.reporting_era().get();
        for agent_id in self.agent_ids().iter() {
            if self.finalized_agents().contains(&agent_id) {
                continue;
            }
            if self.agents(agent_id).get().state == AgentState::Paused {
                continue;
            }
            if let Some(report) = self.leading_report(agent_id, quorum) {
                self.finalize_report(era, agent_id, &report);
            }
        }
    }

    fn leading_report(&self, agent_id: u64, quorum: u64) -> Option<AgentReport<Self::Api>> {
        let mut leading: Option<ReportTally<Self::Api>> = None;
        for tally in self.report_tallies(agent_id).iter() {
            let leads = match &leading {
                Some(best) => tally.votes > best.votes,
                None => true,
            };
            if leads {
                leading = Some(tally);
            }
        }
        leading
            .filter(|tally| tally.votes >= quorum)
            .map(|tally| tally.report)
    }

    #[endpoint(setAnchorEra)]
    fn set_anchor_era(&self, anchor_era: u64, anchor_timestamp: u64, era_duration: u64) {
        self.require_owner();
        require!(era_duration > 0, ERR_INVALID_CONFIG);
        self.anchor_era().set(anchor_era);
        self.anchor_timestamp().set(anchor_timestamp);
        self.era_duration().set(era_duration);
        self.anchor_era_changed_event(anchor_era, anchor_timestamp, era_duration);
    }

    fn current_era(&self) -> u64 {
        let now = self.blockchain().get_block_timestamp();
        let anchor_timestamp = self.anchor_timestamp().get();
        let elapsed = now.saturating_sub(anchor_timestamp);
        self.anchor_era().get() + elapsed / self.era_duration().get()
    }

    // ========================================================
    // VIEWS
    // ========================================================

    #[view(getCurrentEra)]
    fn get_current_era(&self) -> u64 {
        self.current_era()
    }

    #[view(getReportingEra)]
    fn get_reporting_era(&self) -> u64 {
        self.reporting_era().get()
    }

    #[view(getQuorum)]
    fn get_quorum(&self) -> u64 {
        self.quorum().get()
    }

    #[view(getOracleMembers)]
    fn get_oracle_members(&self) -> MultiValueEncoded<ManagedAddress> {
        let mut result = MultiValueEncoded::new();
        for member in self.oracle_members().iter() {
            result.push(member);
        }
        result
    }

    /// (reporting era, whether `member` already reported `agent_id` in it)
    #[view(isReportedLastEra)]
    fn is_reported_last_era(&self, member: ManagedAddress, agent_id: u64) -> MultiValue2<u64, bool> {
        let era = self.reporting_era().get();
        (era, self.agent_reporters(agent_id).contains(&member)).into()
    }

    #[view(isFinalized)]
    fn is_finalized(&self, agent_id: u64) -> bool {
        self.finalized_agents().contains(&agent_id)
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("reportSubmitted")]
    fn report_submitted_event(
        &self,
        #[indexed] era: u64,
        #[indexed] agent_id: u64,
        #[indexed] reporter: &ManagedAddress,
    );

    #[event("reportFinalized")]
    fn report_finalized_event(&self, #[indexed] era: u64, #[indexed] agent_id: u64, total_balance: &BigUint);

    #[event("eraStarted")]
    fn era_started_event(&self, #[indexed] era: u64);

    #[event("oracleMemberAdded")]
    fn oracle_member_added_event(&self, #[indexed] member: &ManagedAddress);

    #[event("oracleMemberRemoved")]
    fn oracle_member_removed_event(&self, #[indexed] member: &ManagedAddress);

    #[event("anchorEraChanged")]
    fn anchor_era_changed_event(
        &self,
        #[indexed] anchor_era: u64,
        #[indexed] anchor_timestamp: u64,
        era_duration: u64,
    );

    #[event("quorumChanged")]
    fn quorum_changed_event(&self, #[indexed] previous: u64, #[indexed] quorum: u64);

    // ========================================================
    // STORAGE
    // ========================================================

    #[storage_mapper("oracleMembers")]
    fn oracle_members(&self) -> UnorderedSetMapper<ManagedAddress>;

    #[storage_mapper("quorum")]
    fn quorum(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("anchorEra")]
    fn anchor_era(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("anchorTimestamp")]
    fn anchor_timestamp(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("eraDuration")]
    fn era_duration(&self) -> SingleValueMapper<u64>;

    /// Era currently accepting reports
    #[storage_mapper("reportingEra")]
    fn reporting_era(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("reportTallies")]
    fn report_tallies(&self, agent_id: u64) -> VecMapper<ReportTally<Self::Api>>;

    #[storage_mapper("agentReporters")]
    fn agent_reporters(&self, agent_id: u64) -> UnorderedSetMapper<ManagedAddress>;

    #[storage_mapper("finalizedAgents")]
    fn finalized_agents(&self) -> UnorderedSetMapper<u64>;
}
