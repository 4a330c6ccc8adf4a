use chrono::{DateTime, Utc};

/// A committed ledger change as subscribers see it.
///
/// Ledger events are facts: once a donation, withdrawal or authorization change
/// is committed, its event is never edited, only published (possibly more than
/// once) and replayed to rebuild a ledger.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Name reporters route on, e.g. `fundraising.ledger.donation_recorded`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version; bumped when an event's fields change.
    fn version(&self) -> u32;

    /// Ledger time of the change. Non-decreasing within one ledger.
    fn occurred_at(&self) -> DateTime<Utc>;
}
