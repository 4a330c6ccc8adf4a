//! Outbound value transfer used by withdrawals.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use fundraising_core::{Amount, Identity};

use crate::ledger::Ledger;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayoutError {
    #[error("recipient {0} cannot accept funds")]
    Rejected(Identity),

    #[error("payout failed: {0}")]
    Failed(String),
}

/// Sends withdrawn value to a fundraiser.
///
/// The transfer runs after the ledger has already zeroed the fundraiser's
/// balance, and it gets the ledger back as `&mut` so a recipient may call into
/// it again before returning. Returning an error rolls the whole withdrawal back.
pub trait Payout {
    fn transfer(
        &mut self,
        ledger: &mut Ledger,
        to: Identity,
        amount: Amount,
    ) -> Result<(), PayoutError>;
}

impl<F> Payout for F
where
    F: FnMut(&mut Ledger, Identity, Amount) -> Result<(), PayoutError>,
{
    fn transfer(
        &mut self,
        ledger: &mut Ledger,
        to: Identity,
        amount: Amount,
    ) -> Result<(), PayoutError> {
        self(ledger, to, amount)
    }
}

/// In-memory recipient wallets for tests/dev.
///
/// Credits every payout to the recipient; identities marked with
/// [`InMemoryWallets::refuse_funds`] reject incoming value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryWallets {
    balances: HashMap<Identity, Amount>,
    refusing: HashSet<Identity>,
}

impl InMemoryWallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, identity: Identity) -> Amount {
        self.balances.get(&identity).copied().unwrap_or_default()
    }

    pub fn refuse_funds(&mut self, identity: Identity) {
        self.refusing.insert(identity);
    }

    pub fn accept_funds(&mut self, identity: Identity) {
        self.refusing.remove(&identity);
    }
}

impl Payout for InMemoryWallets {
    fn transfer(
        &mut self,
        _ledger: &mut Ledger,
        to: Identity,
        amount: Amount,
    ) -> Result<(), PayoutError> {
        if self.refusing.contains(&to) {
            return Err(PayoutError::Rejected(to));
        }
        let wallet = self.balances.entry(to).or_default();
        *wallet = wallet
            .checked_add(amount)
            .ok_or_else(|| PayoutError::Failed(format!("wallet of {to} would overflow")))?;
        Ok(())
    }
}
