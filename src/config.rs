multiversx_sc::imports!();

use crate::errors::*;
use crate::types::{ProtocolConfig, RelaySpec};
use crate::BPS_DENOMINATOR;

#[multiversx_sc::module]
pub trait ConfigModule {
    // ========================================================
    // Owner-only setters
    // ========================================================

    #[endpoint(setFee)]
    fn set_fee(&self, treasury_bps: u64, developers_bps: u64) {
        self.require_owner();
        require!(
            treasury_bps <= BPS_DENOMINATOR && developers_bps <= BPS_DENOMINATOR,
            ERR_FEE_DONT_ADD_UP
        );
        let total = treasury_bps + developers_bps;
        require!(total > 0 && total <= BPS_DENOMINATOR, ERR_FEE_DONT_ADD_UP);

        self.treasury_fee_bps().set(treasury_bps);
        self.developers_fee_bps().set(developers_bps);
        self.fee_changed_event(treasury_bps, developers_bps);
    }

    #[endpoint(setDepositCap)]
    fn set_deposit_cap(&self, cap: BigUint) {
        self.require_owner();
        require!(cap > 0u64, ERR_INVALID_CONFIG);
        self.deposit_cap().set(&cap);
        self.deposit_cap_changed_event(&cap);
    }

    #[endpoint(setMaxAllowableDifference)]
    fn set_max_allowable_difference(&self, value: BigUint) {
        self.require_owner();
        self.max_allowable_difference().set(&value);
        self.max_allowable_difference_changed_event(&value);
    }

    #[endpoint(setRelaySpec)]
    fn set_relay_spec(
        &self,
        max_validators_per_agent: u64,
        min_nominator_bond: BigUint,
        unbonding_delay: u64,
    ) {
        self.require_owner();
        require!(max_validators_per_agent > 0, ERR_INVALID_CONFIG);
        require!(unbonding_delay > 0, ERR_INVALID_CONFIG);
        self.relay_spec_changed_event(max_validators_per_agent, &min_nominator_bond, unbonding_delay);
        self.relay_spec().set(RelaySpec {
            max_validators_per_agent,
            min_nominator_bond,
            unbonding_delay,
        });
    }

    #[endpoint(setRelayAddress)]
    fn set_relay_address(&self, relay: ManagedAddress) {
        self.require_owner();
        require!(!relay.is_zero(), ERR_INVALID_CONFIG);
        self.relay_address_changed_event(&relay);
        self.relay_address().set(relay);
    }

    #[endpoint(setTreasury)]
    fn set_treasury(&self, treasury: ManagedAddress) {
        self.require_owner();
        require!(!treasury.is_zero(), ERR_INVALID_CONFIG);
        self.treasury_changed_event(&treasury);
        self.treasury().set(treasury);
    }

    #[endpoint(setDevelopers)]
    fn set_developers(&self, developers: ManagedAddress) {
        self.require_owner();
        require!(!developers.is_zero(), ERR_INVALID_CONFIG);
        self.developers_changed_event(&developers);
        self.developers().set(developers);
    }

    #[endpoint(setMaxUnbondRequests)]
    fn set_max_unbond_requests(&self, value: u64) {
        self.require_owner();
        require!(value > 0, ERR_INVALID_CONFIG);
        self.max_unbond_requests().set(value);
        self.max_unbond_requests_changed_event(value);
    }

    #[endpoint(setPaused)]
    fn set_paused(&self, paused: bool) {
        self.require_owner();
        self.paused().set(paused);
        self.paused_event(paused);
    }

    #[endpoint(setOwner)]
    fn set_owner(&self, new_owner: ManagedAddress) {
        self.require_owner();
        require!(!new_owner.is_zero(), ERR_INVALID_CONFIG);
        self.owner_changed_event(&self.owner().get(), &new_owner);
        self.owner().set(new_owner);
    }

    #[view(getConfig)]
    fn get_config(&self) -> ProtocolConfig<Self::Api> {
        ProtocolConfig {
            owner: self.owner().get(),
            relay: self.relay_address().get(),
            treasury: self.treasury().get(),
            developers: self.developers().get(),
            deposit_cap: self.deposit_cap().get(),
            max_allowable_difference: self.max_allowable_difference().get(),
            treasury_fee_bps: self.treasury_fee_bps().get(),
            developers_fee_bps: self.developers_fee_bps().get(),
            max_unbond_requests: self.max_unbond_requests().get(),
            bonding_enabled: self.bonding_enabled().get(),
            paused: self.paused().get(),
            relay_spec: self.relay_spec().get(),
        }
    }

    fn require_owner(&self) {
        require!(self.blockchain().get_caller() == self.owner().get(), ERR_UNAUTHORIZED);
    }

    fn require_not_paused(&self) {
        require!(!self.paused().get(), ERR_PAUSED);
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("feeChanged")]
    fn fee_changed_event(&self, #[indexed] treasury_bps: u64, #[indexed] developers_bps: u64);

    #[event("depositCapChanged")]
    fn deposit_cap_changed_event(&self, #[indexed] cap: &BigUint);

    #[event("paused")]
    fn paused_event(&self, #[indexed] paused: bool);

    #[event("maxAllowableDifferenceChanged")]
    fn max_allowable_difference_changed_event(&self, #[indexed] value: &BigUint);

    #[event("relaySpecChanged")]
    fn relay_spec_changed_event(
        &self,
        #[indexed] max_validators_per_agent: u64,
        #[indexed] min_nominator_bond: &BigUint,
        #[indexed] unbonding_delay: u64,
    );

    #[event("relayAddressChanged")]
    fn relay_address_changed_event(&self, #[indexed] relay: &ManagedAddress);

    #[event("treasuryChanged")]
    fn treasury_changed_event(&self, #[indexed] treasury: &ManagedAddress);

    #[event("developersChanged")]
    fn developers_changed_event(&self, #[indexed] developers: &ManagedAddress);

    #[event("maxUnbondRequestsChanged")]
    fn max_unbond_requests_changed_event(&self, #[indexed] value: u64);

    #[event("ownerChanged")]
    fn owner_changed_event(
        &self,
        #[indexed] previous: &ManagedAddress,
        #[indexed] owner: &ManagedAddress,
    );

    // ========================================================
    // STORAGE
    // ========================================================

    #[storage_mapper("owner")]
    fn owner(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("paused")]
    fn paused(&self) -> SingleValueMapper<bool>;

    #[storage_mapper("relayAddress")]
    fn relay_address(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("treasury")]
    fn treasury(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("developers")]
    fn developers(&self) -> SingleValueMapper<ManagedAddress>;

    #[storage_mapper("treasuryFeeBps")]
    fn treasury_fee_bps(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("developersFeeBps")]
    fn developers_fee_bps(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("depositCap")]
    fn deposit_cap(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("maxAllowableDifference")]
    fn max_allowable_difference(&self) -> SingleValueMapper<BigUint>;

    #[storage_mapper("maxUnbondRequests")]
    fn max_unbond_requests(&self) -> SingleValueMapper<u64>;

    #[storage_mapper("bondingEnabled")]
    fn bonding_enabled(&self) -> SingleValueMapper<bool>;

    #[storage_mapper("relaySpec")]
    fn relay_spec(&self) -> SingleValueMapper<RelaySpec<Self::Api>>;
}
