multiversx_sc::imports!();

/// Instructions for the relay network. The relayer follows these events and acts
/// on the stash; only upward transfers carry funds from here.
#[multiversx_sc::module]
pub trait BridgeModule: crate::config::ConfigModule {
    fn send_transfer_upward(&self, agent_id: u64, stash: &ManagedBuffer, amount: &BigUint) {
        let relay = self.relay_address().get();
        self.send().direct_egld(&relay, amount);
        self.transfer_upward_event(agent_id, stash, amount);
    }

    fn send_transfer_downward(&self, agent_id: u64, stash: &ManagedBuffer, amount: &BigUint) {
        self.transfer_downward_event(agent_id, stash, amount);
    }

    fn send_bond(&self, agent_id: u64, stash: &ManagedBuffer, amount: &BigUint) {
        self.bond_event(agent_id, stash, amount);
    }

    fn send_unbond(&self, agent_id: u64, stash: &ManagedBuffer, amount: &BigUint) {
        self.unbond_event(agent_id, stash, amount);
    }

    fn send_withdraw(&self, agent_id: u64, stash: &ManagedBuffer) {
        self.withdraw_event(agent_id, stash);
    }

    fn send_nominate(
        &self,
        agent_id: u64,
        stash: &ManagedBuffer,
        validators: &ManagedVec<ManagedBuffer>,
    ) {
        self.nominate_event(agent_id, stash, validators);
    }

    fn send_chill(&self, agent_id: u64, stash: &ManagedBuffer) {
        self.chill_event(agent_id, stash);
    }

    // ========================================================
    // EVENTS
    // ========================================================

    #[event("transferUpward")]
    fn transfer_upward_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] stash: &ManagedBuffer,
        amount: &BigUint,
    );

    #[event("transferDownward")]
    fn transfer_downward_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] stash: &ManagedBuffer,
        amount: &BigUint,
    );

    #[event("bond")]
    fn bond_event(&self, #[indexed] agent_id: u64, #[indexed] stash: &ManagedBuffer, amount: &BigUint);

    #[event("unbond")]
    fn unbond_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] stash: &ManagedBuffer,
        amount: &BigUint,
    );

    #[event("withdrawUnbonded")]
    fn withdraw_event(&self, #[indexed] agent_id: u64, #[indexed] stash: &ManagedBuffer);

    #[event("nominate")]
    fn nominate_event(
        &self,
        #[indexed] agent_id: u64,
        #[indexed] stash: &ManagedBuffer,
        validators: &ManagedVec<ManagedBuffer>,
    );

    #[event("chill")]
    fn chill_event(&self, #[indexed] agent_id: u64, #[indexed] stash: &ManagedBuffer);
}
