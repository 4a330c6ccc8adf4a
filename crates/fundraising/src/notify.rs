//! Publishing committed ledger events to subscribers.
//!
//! ```text
//! ledger operation → outbox (committed) → LedgerNotifier::flush → EventBus → reporters
//! ```
//!
//! Events are committed before they are published. If the bus fails, the
//! undelivered events go back into the ledger's outbox and the next `flush`
//! retries them, so delivery is at-least-once.

use thiserror::Error;
use tracing::{debug, warn};

use fundraising_events::{Event, EventBus, EventEnvelope};

use crate::ledger::{AGGREGATE_TYPE, Ledger, LedgerEvent};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to publish {event_type}: {reason}")]
    Publish {
        event_type: &'static str,
        reason: String,
    },
}

/// Wraps ledger events in envelopes and publishes them on a bus.
///
/// Sequence numbers start at 1 and increase by one per published event.
#[derive(Debug)]
pub struct LedgerNotifier<B> {
    bus: B,
    next_sequence: u64,
}

impl<B> LedgerNotifier<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            next_sequence: 1,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Sequence number the next published event will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

impl<B> LedgerNotifier<B>
where
    B: EventBus<EventEnvelope<LedgerEvent>>,
{
    /// Publish every pending event of `ledger`, oldest first.
    ///
    /// Returns how many were published.
    pub fn flush(&mut self, ledger: &mut Ledger) -> Result<usize, NotifyError> {
        let mut pending = ledger.take_events().into_iter();
        let mut published = 0;

        while let Some(event) = pending.next() {
            let event_type = event.event_type();
            let envelope =
                EventEnvelope::wrap(ledger.id_typed(), AGGREGATE_TYPE, self.next_sequence, event);

            if let Err(err) = self.bus.publish(envelope.clone()) {
                warn!(event_type, sequence = self.next_sequence, %err, "publish failed, requeueing");
                let mut undelivered = vec![envelope.into_payload()];
                undelivered.extend(pending);
                ledger.requeue_events(undelivered);
                return Err(NotifyError::Publish {
                    event_type,
                    reason: err.to_string(),
                });
            }

            debug!(event_type, sequence = self.next_sequence, "event published");
            self.next_sequence += 1;
            published += 1;
        }

        Ok(published)
    }
}
