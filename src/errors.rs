pub const ERR_UNAUTHORIZED: &str = "ERR_UNAUTHORIZED";
pub const ERR_PAUSED: &str = "ERR_PAUSED";
pub const ERR_INVALID_AMOUNT: &str = "ERR_INVALID_AMOUNT";
pub const ERR_INVALID_CONFIG: &str = "ERR_INVALID_CONFIG";
pub const ERR_FEE_DONT_ADD_UP: &str = "ERR_FEE_DONT_ADD_UP";
pub const ERR_DEPOSIT_CAP_EXCEEDED: &str = "ERR_DEPOSIT_CAP_EXCEEDED";
pub const ERR_POOL_INSOLVENT: &str = "ERR_POOL_INSOLVENT";
pub const ERR_INSUFFICIENT_SHARES: &str = "ERR_INSUFFICIENT_SHARES";
pub const ERR_INSUFFICIENT_ALLOWANCE: &str = "ERR_INSUFFICIENT_ALLOWANCE";
pub const ERR_NOTHING_TO_CLAIM: &str = "ERR_NOTHING_TO_CLAIM";
pub const ERR_TOO_MANY_REQUESTS: &str = "ERR_TOO_MANY_REQUESTS";

pub const ERR_UNAUTHORIZED_REPORTER: &str = "ERR_UNAUTHORIZED_REPORTER";
pub const ERR_STALE_ERA: &str = "ERR_STALE_ERA";
pub const ERR_ALREADY_REPORTED: &str = "ERR_ALREADY_REPORTED";
pub const ERR_INVALID_QUORUM: &str = "ERR_INVALID_QUORUM";
pub const ERR_MEMBER_EXISTS: &str = "ERR_MEMBER_EXISTS";
pub const ERR_MEMBER_NOT_FOUND: &str = "ERR_MEMBER_NOT_FOUND";

pub const ERR_UNKNOWN_AGENT: &str = "ERR_UNKNOWN_AGENT";
pub const ERR_AGENT_EXISTS: &str = "ERR_AGENT_EXISTS";
pub const ERR_AGENT_PAUSED: &str = "ERR_AGENT_PAUSED";
pub const ERR_AGENT_STATE: &str = "ERR_AGENT_STATE";
pub const ERR_AGENT_HAS_FUNDS: &str = "ERR_AGENT_HAS_FUNDS";
pub const ERR_TOO_MANY_VALIDATORS: &str = "ERR_TOO_MANY_VALIDATORS";
pub const ERR_NOT_RELAY: &str = "ERR_NOT_RELAY";
pub const ERR_NO_TRANSFER_PENDING: &str = "ERR_NO_TRANSFER_PENDING";
