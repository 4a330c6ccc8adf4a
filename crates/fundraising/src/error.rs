//! Ledger error model.
//!
//! Every variant is a distinct, identifiable rejection. A rejected operation
//! never leaves partial state behind.

use thiserror::Error;

use fundraising_core::{Amount, Identity};

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("donation of {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: Amount, minimum: Amount },

    #[error("invalid receiver: the null identity cannot receive donations")]
    InvalidReceiver,

    #[error("receiver {0} is not an active fundraiser")]
    FundraiserNotActive(Identity),

    /// Withdrawal by a caller that is not currently an active fundraiser.
    #[error("{0} is not an active fundraiser and cannot withdraw")]
    NotAuthorized(Identity),

    #[error("fundraiser {0} has no funds to withdraw")]
    NothingToWithdraw(Identity),

    #[error("{0} is not the administrator")]
    NotAdmin(Identity),

    #[error("invalid fundraiser address: the null identity")]
    InvalidAddress,

    #[error("fundraiser {0} already active")]
    AlreadyActive(Identity),

    #[error("fundraiser {0} already inactive")]
    AlreadyInactive(Identity),

    /// Value sent other than through `donate`.
    #[error("direct transfer of {value} rejected, use donate")]
    DirectTransferRejected { value: Amount },

    #[error("outbound transfer of {amount} to {fundraiser} failed: {reason}")]
    OutboundTransferFailed {
        fundraiser: Identity,
        amount: Amount,
        reason: String,
    },

    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}

impl LedgerError {
    pub fn overflow(msg: impl Into<String>) -> Self {
        Self::Overflow(msg.into())
    }
}
