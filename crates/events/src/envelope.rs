use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundraising_core::LedgerId;

use crate::Event;

/// Envelope for an event, containing stream metadata.
///
/// This is the unit published to subscribers.
///
/// - `sequence_number` increases by one per event within a ledger stream, starting at 1.
/// - `event_type` / `event_version` are copied from the payload so consumers can
///   route without matching on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    ledger_id: LedgerId,
    aggregate_type: String,

    /// Monotonically increasing position in the ledger stream.
    sequence_number: u64,

    event_type: String,
    event_version: u32,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        ledger_id: LedgerId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        event_type: impl Into<String>,
        event_version: u32,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            ledger_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: event_type.into(),
            event_version,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, taking type name and schema version from the event itself.
    pub fn wrap(
        ledger_id: LedgerId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self::new(
            Uuid::now_v7(),
            ledger_id,
            aggregate_type,
            sequence_number,
            payload.event_type(),
            payload.version(),
            payload,
        )
    }
}
