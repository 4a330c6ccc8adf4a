//! Fundraising ledger (event-sourced custody of donations).
//!
//! Administrators authorize fundraisers, donors send value to active fundraisers
//! with a message, and fundraisers withdraw what they have accumulated.
//! Pure domain logic plus the seams to the outside world: payouts, notification
//! publishing and configuration.

pub mod config;
pub mod donation;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod payout;
pub mod summary;

pub use config::{ConfigError, LedgerConfig};
pub use donation::{DonationHistory, DonationRecord, DonationRole};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{
    ActivateFundraiser, AGGREGATE_TYPE, CallContext, DeactivateFundraiser, Donate,
    DonationRecorded, FundraiserActivated, FundraiserDeactivated, FundsWithdrawn, Ledger,
    LedgerCommand, LedgerEvent, MINIMUM_DONATION, Withdraw,
};
pub use notify::{LedgerNotifier, NotifyError};
pub use payout::{InMemoryWallets, Payout, PayoutError};
pub use summary::{DeploymentInfo, DonorSummary, FundraiserSummary};

pub use fundraising_core::{Amount, Identity, LedgerId};
