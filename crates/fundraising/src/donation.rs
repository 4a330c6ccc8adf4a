//! Donation records and the two-way history index.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fundraising_core::{Amount, Identity};

/// One recorded donation (immutable once recorded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub donor: Identity,
    pub fundraiser: Identity,
    pub amount: Amount,
    /// Free-form message from the donor; may be empty.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Which side of a donation a history query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationRole {
    Donor,
    Fundraiser,
}

/// Append-only donation history, indexed by donor and by fundraiser.
///
/// Both indices hold the same `Arc`, so the donor view and the fundraiser view of
/// a donation can never disagree. Nothing hands out mutable access to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationHistory {
    by_donor: HashMap<Identity, Vec<Arc<DonationRecord>>>,
    by_fundraiser: HashMap<Identity, Vec<Arc<DonationRecord>>>,
    len: usize,
}

impl DonationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to both indices.
    pub fn record(&mut self, record: DonationRecord) -> Arc<DonationRecord> {
        let record = Arc::new(record);
        self.by_donor
            .entry(record.donor)
            .or_default()
            .push(Arc::clone(&record));
        self.by_fundraiser
            .entry(record.fundraiser)
            .or_default()
            .push(Arc::clone(&record));
        self.len += 1;
        record
    }

    /// Full ordered history of `identity` in `role` (empty if unknown).
    pub fn of(&self, identity: Identity, role: DonationRole) -> &[Arc<DonationRecord>] {
        let index = match role {
            DonationRole::Donor => &self.by_donor,
            DonationRole::Fundraiser => &self.by_fundraiser,
        };
        index.get(&identity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, identity: Identity, role: DonationRole) -> usize {
        self.of(identity, role).len()
    }

    /// Total number of donations recorded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: u8) -> Identity {
        Identity::from_bytes([n; 20])
    }

    fn record(donor: u8, fundraiser: u8, whole: u64) -> DonationRecord {
        DonationRecord {
            donor: identity(donor),
            fundraiser: identity(fundraiser),
            amount: Amount::from_whole(whole),
            message: format!("{donor}->{fundraiser}"),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn record_is_visible_from_both_sides() {
        let mut history = DonationHistory::new();
        let stored = history.record(record(1, 2, 5));

        let by_donor = history.of(identity(1), DonationRole::Donor);
        let by_fundraiser = history.of(identity(2), DonationRole::Fundraiser);
        assert_eq!(by_donor.len(), 1);
        assert_eq!(by_fundraiser.len(), 1);
        assert!(Arc::ptr_eq(&by_donor[0], &by_fundraiser[0]));
        assert!(Arc::ptr_eq(&by_donor[0], &stored));
    }

    #[test]
    fn roles_are_indexed_independently() {
        let mut history = DonationHistory::new();
        history.record(record(1, 2, 1));

        assert_eq!(history.count(identity(1), DonationRole::Fundraiser), 0);
        assert_eq!(history.count(identity(2), DonationRole::Donor), 0);
        assert!(history.of(identity(9), DonationRole::Donor).is_empty());
    }

    #[test]
    fn histories_keep_insertion_order() {
        let mut history = DonationHistory::new();
        history.record(record(1, 2, 1));
        history.record(record(3, 2, 2));
        history.record(record(1, 4, 3));

        let to_two: Vec<_> = history
            .of(identity(2), DonationRole::Fundraiser)
            .iter()
            .map(|r| r.donor)
            .collect();
        assert_eq!(to_two, vec![identity(1), identity(3)]);

        let from_one: Vec<_> = history
            .of(identity(1), DonationRole::Donor)
            .iter()
            .map(|r| r.amount)
            .collect();
        assert_eq!(from_one, vec![Amount::from_whole(1), Amount::from_whole(3)]);
        assert_eq!(history.len(), 3);
    }
}
