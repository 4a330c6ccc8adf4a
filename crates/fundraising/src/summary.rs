//! Read models over a ledger for reporting tools.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fundraising_core::{Amount, Identity, LedgerId};

use crate::donation::DonationRole;
use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Snapshot of one fundraiser's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraiserSummary {
    pub fundraiser: Identity,
    pub active: bool,
    pub total_raised: Amount,
    pub balance: Amount,
    pub donations_received: usize,
}

/// Snapshot of one donor's giving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorSummary {
    pub donor: Identity,
    pub donations_made: usize,
    pub total_donated: Amount,
    pub by_fundraiser: BTreeMap<Identity, Amount>,
}

/// What a deployment looked like when it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub ledger_id: LedgerId,
    pub administrator: Identity,
    pub minimum_donation: Amount,
    pub active_fundraisers: Vec<Identity>,
    pub captured_at: DateTime<Utc>,
}

impl DeploymentInfo {
    pub fn capture(ledger: &Ledger, captured_at: DateTime<Utc>) -> Self {
        Self {
            ledger_id: ledger.id_typed(),
            administrator: ledger.administrator(),
            minimum_donation: ledger.minimum_donation(),
            active_fundraisers: ledger.active_fundraisers(),
            captured_at,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Ledger {
    pub fn fundraiser_summary(&self, fundraiser: Identity) -> FundraiserSummary {
        FundraiserSummary {
            fundraiser,
            active: self.is_active(fundraiser),
            total_raised: self.total_raised(fundraiser),
            balance: self.balance(fundraiser),
            donations_received: self.donation_count(fundraiser, DonationRole::Fundraiser),
        }
    }

    /// Summaries of every identity that has ever been a fundraiser, sorted.
    pub fn fundraiser_summaries(&self) -> Vec<FundraiserSummary> {
        self.known_fundraisers()
            .into_iter()
            .map(|f| self.fundraiser_summary(f))
            .collect()
    }

    pub fn donor_summary(&self, donor: Identity) -> Result<DonorSummary, LedgerError> {
        let donations = self.donations_of(donor, DonationRole::Donor);

        let mut by_fundraiser: BTreeMap<Identity, Amount> = BTreeMap::new();
        for record in donations {
            let entry = by_fundraiser.entry(record.fundraiser).or_default();
            *entry = entry
                .checked_add(record.amount)
                .ok_or_else(|| LedgerError::overflow("donor total per fundraiser"))?;
        }
        let total_donated = Amount::try_sum(donations.iter().map(|r| r.amount))
            .map_err(|e| LedgerError::overflow(e.to_string()))?;

        Ok(DonorSummary {
            donor,
            donations_made: donations.len(),
            total_donated,
            by_fundraiser,
        })
    }
}
