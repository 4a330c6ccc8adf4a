use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fundraising_core::{Aggregate, AggregateRoot, Amount, Identity, LedgerId};
use fundraising_events::Event;

use crate::donation::{DonationHistory, DonationRecord, DonationRole};
use crate::error::{LedgerError, LedgerResult};
use crate::payout::Payout;

/// Smallest accepted donation: 0.0001 of a whole unit.
pub const MINIMUM_DONATION: Amount = Amount::from_units(100_000_000_000_000);

/// Aggregate type name used on published envelopes.
pub const AGGREGATE_TYPE: &str = "fundraising.ledger";

/// Who is calling, with how much attached value, and when.
///
/// The surrounding environment serializes calls; this is what it hands the
/// ledger for each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Identity,
    pub value: Amount,
    pub at: DateTime<Utc>,
}

impl CallContext {
    pub fn new(caller: Identity, at: DateTime<Utc>) -> Self {
        Self {
            caller,
            value: Amount::ZERO,
            at,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Per-fundraiser state. Created on first activation, never removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FundraiserAccount {
    active: bool,
    /// Withdrawable amount.
    balance: Amount,
    /// Lifetime sum of donations received; withdrawals never reduce it.
    total_raised: Amount,
}

/// Command: Donate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donate {
    pub donor: Identity,
    pub fundraiser: Identity,
    pub amount: Amount,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Withdraw (always the caller's own balance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub fundraiser: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateFundraiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateFundraiser {
    pub caller: Identity,
    pub fundraiser: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateFundraiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateFundraiser {
    pub caller: Identity,
    pub fundraiser: Identity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Donate(Donate),
    Withdraw(Withdraw),
    ActivateFundraiser(ActivateFundraiser),
    DeactivateFundraiser(DeactivateFundraiser),
}

/// Event: DonationRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecorded {
    pub donor: Identity,
    pub fundraiser: Identity,
    pub amount: Amount,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FundsWithdrawn. `amount` is the fundraiser's whole balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsWithdrawn {
    pub fundraiser: Identity,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FundraiserActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraiserActivated {
    pub fundraiser: Identity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FundraiserDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraiserDeactivated {
    pub fundraiser: Identity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    DonationRecorded(DonationRecorded),
    FundsWithdrawn(FundsWithdrawn),
    FundraiserActivated(FundraiserActivated),
    FundraiserDeactivated(FundraiserDeactivated),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::DonationRecorded(_) => "fundraising.ledger.donation_recorded",
            LedgerEvent::FundsWithdrawn(_) => "fundraising.ledger.funds_withdrawn",
            LedgerEvent::FundraiserActivated(_) => "fundraising.ledger.fundraiser_activated",
            LedgerEvent::FundraiserDeactivated(_) => "fundraising.ledger.fundraiser_deactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::DonationRecorded(e) => e.occurred_at,
            LedgerEvent::FundsWithdrawn(e) => e.occurred_at,
            LedgerEvent::FundraiserActivated(e) => e.occurred_at,
            LedgerEvent::FundraiserDeactivated(e) => e.occurred_at,
        }
    }
}

impl LedgerEvent {
    fn occurred_at_mut(&mut self) -> &mut DateTime<Utc> {
        match self {
            LedgerEvent::DonationRecorded(e) => &mut e.occurred_at,
            LedgerEvent::FundsWithdrawn(e) => &mut e.occurred_at,
            LedgerEvent::FundraiserActivated(e) => &mut e.occurred_at,
            LedgerEvent::FundraiserDeactivated(e) => &mut e.occurred_at,
        }
    }
}

/// What an in-flight withdrawal needs to be undone.
#[derive(Debug, Clone, Copy)]
struct PendingWithdrawal {
    fundraiser: Identity,
    amount: Amount,
    version: u64,
    last_event_at: Option<DateTime<Utc>>,
}

/// Aggregate root: Ledger.
///
/// Holds the administrator, the fundraiser authorization set with per-fundraiser
/// balances, the two-way donation history and the total value in custody.
///
/// Invariants after every operation:
/// - `balance(f) <= total_raised(f)` for every fundraiser
/// - `total_raised(f)` is the sum of donations addressed to `f`
/// - `custody_balance()` is the sum of all fundraiser balances
/// - the null identity is never in the authorization set
///
/// Committed events are kept in an outbox until [`Ledger::take_events`] drains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    id: LedgerId,
    administrator: Identity,
    fundraisers: HashMap<Identity, FundraiserAccount>,
    donations: DonationHistory,
    custody: Amount,
    last_event_at: Option<DateTime<Utc>>,
    version: u64,
    outbox: Vec<LedgerEvent>,
}

impl Ledger {
    /// Create a ledger; `ctx.caller` becomes the administrator.
    ///
    /// Each initial fundraiser is activated in order as if by
    /// [`Ledger::activate_fundraiser`], so a null identity fails with
    /// `InvalidAddress` and a duplicate with `AlreadyActive`. Nothing is
    /// returned on failure.
    pub fn new(
        id: LedgerId,
        ctx: &CallContext,
        initial_fundraisers: &[Identity],
    ) -> LedgerResult<Self> {
        ensure_no_value(ctx)?;
        if ctx.caller.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }

        let mut ledger = Self::rehydrate(id, ctx.caller, std::iter::empty());
        for &fundraiser in initial_fundraisers {
            ledger.activate_fundraiser(ctx, fundraiser)?;
        }

        info!(
            ledger_id = %id,
            administrator = %ctx.caller,
            fundraisers = initial_fundraisers.len(),
            "ledger created"
        );
        Ok(ledger)
    }

    /// Rebuild a ledger from previously committed events.
    ///
    /// The outbox starts empty: replayed events are not notified again.
    pub fn rehydrate<'a, I>(id: LedgerId, administrator: Identity, events: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEvent>,
    {
        let mut ledger = Self {
            id,
            administrator,
            fundraisers: HashMap::new(),
            donations: DonationHistory::new(),
            custody: Amount::ZERO,
            last_event_at: None,
            version: 0,
            outbox: Vec::new(),
        };
        for event in events {
            ledger.apply(event);
        }
        ledger
    }

    pub fn id_typed(&self) -> LedgerId {
        self.id
    }

    /// Record a donation of `ctx.value` from `ctx.caller` to `fundraiser`.
    ///
    /// Checks, first failure wins: minimum amount, null receiver, active receiver.
    pub fn donate(
        &mut self,
        ctx: &CallContext,
        fundraiser: Identity,
        message: impl Into<String>,
    ) -> LedgerResult<()> {
        let command = LedgerCommand::Donate(Donate {
            donor: ctx.caller,
            fundraiser,
            amount: ctx.value,
            message: message.into(),
            occurred_at: ctx.at,
        });
        let events = self.handle(&command).inspect_err(|err| {
            debug!(donor = %ctx.caller, %fundraiser, amount = %ctx.value, %err, "donation rejected");
        })?;
        self.commit(events);

        info!(donor = %ctx.caller, %fundraiser, amount = %ctx.value, "donation recorded");
        Ok(())
    }

    /// Withdraw the caller's whole balance through `payout`.
    ///
    /// The balance is zeroed before `payout` runs, so a re-entrant withdrawal
    /// from inside the payout finds nothing to withdraw. If the payout fails,
    /// only this withdrawal is undone and `OutboundTransferFailed` is returned.
    /// Anything re-entrant calls completed stays committed, since their own
    /// payouts have already gone out.
    ///
    /// The `FundsWithdrawn` event enters the outbox once the payout succeeds.
    pub fn withdraw<P>(&mut self, ctx: &CallContext, payout: &mut P) -> LedgerResult<Amount>
    where
        P: Payout + ?Sized,
    {
        ensure_no_value(ctx)?;

        let command = LedgerCommand::Withdraw(Withdraw {
            fundraiser: ctx.caller,
            occurred_at: ctx.at,
        });
        let events = self.handle(&command).inspect_err(|err| {
            debug!(fundraiser = %ctx.caller, %err, "withdrawal rejected");
        })?;
        let amount = self.balance(ctx.caller);

        let pending = PendingWithdrawal {
            fundraiser: ctx.caller,
            amount,
            version: self.version,
            last_event_at: self.last_event_at,
        };
        for event in &events {
            self.apply(event);
        }

        if let Err(err) = payout.transfer(self, ctx.caller, amount) {
            self.undo_withdrawal(pending);
            warn!(fundraiser = %ctx.caller, %amount, %err, "payout failed, withdrawal rolled back");
            return Err(LedgerError::OutboundTransferFailed {
                fundraiser: ctx.caller,
                amount,
                reason: err.to_string(),
            });
        }

        for mut event in events {
            // Re-entrant events may have moved the clock forward.
            let at = event.occurred_at_mut();
            *at = self.next_timestamp(*at);
            self.outbox.push(event);
        }

        info!(fundraiser = %ctx.caller, %amount, "funds withdrawn");
        Ok(amount)
    }

    /// Administrator only: authorize `fundraiser` to receive and withdraw.
    pub fn activate_fundraiser(
        &mut self,
        ctx: &CallContext,
        fundraiser: Identity,
    ) -> LedgerResult<()> {
        ensure_no_value(ctx)?;

        let command = LedgerCommand::ActivateFundraiser(ActivateFundraiser {
            caller: ctx.caller,
            fundraiser,
            occurred_at: ctx.at,
        });
        let events = self.handle(&command).inspect_err(|err| {
            debug!(caller = %ctx.caller, %fundraiser, %err, "activation rejected");
        })?;
        self.commit(events);

        info!(%fundraiser, "fundraiser activated");
        Ok(())
    }

    /// Administrator only: revoke authorization. Balances and history are kept.
    pub fn deactivate_fundraiser(
        &mut self,
        ctx: &CallContext,
        fundraiser: Identity,
    ) -> LedgerResult<()> {
        ensure_no_value(ctx)?;

        let command = LedgerCommand::DeactivateFundraiser(DeactivateFundraiser {
            caller: ctx.caller,
            fundraiser,
            occurred_at: ctx.at,
        });
        let events = self.handle(&command).inspect_err(|err| {
            debug!(caller = %ctx.caller, %fundraiser, %err, "deactivation rejected");
        })?;
        self.commit(events);

        info!(%fundraiser, "fundraiser deactivated");
        Ok(())
    }

    /// A bare value transfer (with or without data). Always rejected: value only
    /// enters through [`Ledger::donate`].
    pub fn receive_transfer(&self, ctx: &CallContext, data: &[u8]) -> LedgerResult<()> {
        warn!(
            caller = %ctx.caller,
            value = %ctx.value,
            data_len = data.len(),
            "direct transfer rejected"
        );
        Err(LedgerError::DirectTransferRejected { value: ctx.value })
    }

    pub fn administrator(&self) -> Identity {
        self.administrator
    }

    pub fn minimum_donation(&self) -> Amount {
        MINIMUM_DONATION
    }

    pub fn is_active(&self, identity: Identity) -> bool {
        self.fundraisers.get(&identity).is_some_and(|a| a.active)
    }

    pub fn total_raised(&self, identity: Identity) -> Amount {
        self.fundraisers
            .get(&identity)
            .map(|a| a.total_raised)
            .unwrap_or_default()
    }

    pub fn balance(&self, identity: Identity) -> Amount {
        self.fundraisers
            .get(&identity)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    pub fn donation_count(&self, identity: Identity, role: DonationRole) -> usize {
        self.donations.count(identity, role)
    }

    pub fn donations_of(&self, identity: Identity, role: DonationRole) -> &[Arc<DonationRecord>] {
        self.donations.of(identity, role)
    }

    /// Total value held by the ledger (sum of all fundraiser balances).
    pub fn custody_balance(&self) -> Amount {
        self.custody
    }

    /// Currently active fundraisers, sorted.
    pub fn active_fundraisers(&self) -> Vec<Identity> {
        let mut active: Vec<Identity> = self
            .fundraisers
            .iter()
            .filter(|(_, a)| a.active)
            .map(|(id, _)| *id)
            .collect();
        active.sort();
        active
    }

    /// Every identity that has ever been activated, sorted.
    pub fn known_fundraisers(&self) -> Vec<Identity> {
        let mut known: Vec<Identity> = self.fundraisers.keys().copied().collect();
        known.sort();
        known
    }

    /// Committed events not yet taken for notification.
    pub fn pending_events(&self) -> &[LedgerEvent] {
        &self.outbox
    }

    /// Drain committed events for notification.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Put events that could not be delivered back at the front of the outbox.
    pub(crate) fn requeue_events(&mut self, mut events: Vec<LedgerEvent>) {
        events.append(&mut self.outbox);
        self.outbox = events;
    }

    fn commit(&mut self, events: Vec<LedgerEvent>) {
        for event in events {
            self.apply(&event);
            self.outbox.push(event);
        }
    }

    /// Reverse the effects of a withdrawal whose payout failed.
    ///
    /// Balances and custody are credited back rather than restored, so changes
    /// made by re-entrant calls in the meantime are kept.
    fn undo_withdrawal(&mut self, pending: PendingWithdrawal) {
        if let Some(account) = self.fundraisers.get_mut(&pending.fundraiser) {
            account.balance = account.balance.saturating_add(pending.amount);
        }
        self.custody = self.custody.saturating_add(pending.amount);

        // The withdrawal itself accounted for exactly one version step.
        let reentrant_events = self.version.saturating_sub(pending.version + 1);
        self.version = self.version.saturating_sub(1);
        if reentrant_events == 0 {
            self.last_event_at = pending.last_event_at;
        }
    }

    fn active_account(&self, identity: Identity) -> Option<&FundraiserAccount> {
        self.fundraisers.get(&identity).filter(|a| a.active)
    }

    /// Event time, never earlier than the previous event.
    fn next_timestamp(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_event_at {
            Some(last) if last > at => last,
            _ => at,
        }
    }

    fn ensure_admin(&self, caller: Identity) -> Result<(), LedgerError> {
        if caller != self.administrator {
            return Err(LedgerError::NotAdmin(caller));
        }
        Ok(())
    }

    fn handle_donate(&self, cmd: &Donate) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.amount < MINIMUM_DONATION {
            return Err(LedgerError::BelowMinimum {
                amount: cmd.amount,
                minimum: MINIMUM_DONATION,
            });
        }
        if cmd.fundraiser.is_zero() {
            return Err(LedgerError::InvalidReceiver);
        }
        let account = self
            .active_account(cmd.fundraiser)
            .ok_or(LedgerError::FundraiserNotActive(cmd.fundraiser))?;

        // Balance never exceeds total raised, so checking the total covers both.
        account
            .total_raised
            .checked_add(cmd.amount)
            .ok_or_else(|| LedgerError::overflow("fundraiser total raised"))?;
        self.custody
            .checked_add(cmd.amount)
            .ok_or_else(|| LedgerError::overflow("ledger custody"))?;

        Ok(vec![LedgerEvent::DonationRecorded(DonationRecorded {
            donor: cmd.donor,
            fundraiser: cmd.fundraiser,
            amount: cmd.amount,
            message: cmd.message.clone(),
            occurred_at: self.next_timestamp(cmd.occurred_at),
        })])
    }

    fn handle_withdraw(&self, cmd: &Withdraw) -> Result<Vec<LedgerEvent>, LedgerError> {
        let account = self
            .active_account(cmd.fundraiser)
            .ok_or(LedgerError::NotAuthorized(cmd.fundraiser))?;
        if account.balance.is_zero() {
            return Err(LedgerError::NothingToWithdraw(cmd.fundraiser));
        }

        Ok(vec![LedgerEvent::FundsWithdrawn(FundsWithdrawn {
            fundraiser: cmd.fundraiser,
            amount: account.balance,
            occurred_at: self.next_timestamp(cmd.occurred_at),
        })])
    }

    fn handle_activate(&self, cmd: &ActivateFundraiser) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_admin(cmd.caller)?;
        if cmd.fundraiser.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        if self.is_active(cmd.fundraiser) {
            return Err(LedgerError::AlreadyActive(cmd.fundraiser));
        }

        Ok(vec![LedgerEvent::FundraiserActivated(FundraiserActivated {
            fundraiser: cmd.fundraiser,
            occurred_at: self.next_timestamp(cmd.occurred_at),
        })])
    }

    fn handle_deactivate(
        &self,
        cmd: &DeactivateFundraiser,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_admin(cmd.caller)?;
        if cmd.fundraiser.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        if !self.is_active(cmd.fundraiser) {
            return Err(LedgerError::AlreadyInactive(cmd.fundraiser));
        }

        Ok(vec![LedgerEvent::FundraiserDeactivated(FundraiserDeactivated {
            fundraiser: cmd.fundraiser,
            occurred_at: self.next_timestamp(cmd.occurred_at),
        })])
    }
}

fn ensure_no_value(ctx: &CallContext) -> Result<(), LedgerError> {
    if !ctx.value.is_zero() {
        return Err(LedgerError::DirectTransferRejected { value: ctx.value });
    }
    Ok(())
}

impl AggregateRoot for Ledger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::DonationRecorded(e) => {
                let account = self.fundraisers.entry(e.fundraiser).or_default();
                // Overflow is ruled out in handle_donate.
                account.balance = account.balance.saturating_add(e.amount);
                account.total_raised = account.total_raised.saturating_add(e.amount);
                self.custody = self.custody.saturating_add(e.amount);
                self.donations.record(DonationRecord {
                    donor: e.donor,
                    fundraiser: e.fundraiser,
                    amount: e.amount,
                    message: e.message.clone(),
                    timestamp: e.occurred_at,
                });
            }
            LedgerEvent::FundsWithdrawn(e) => {
                let account = self.fundraisers.entry(e.fundraiser).or_default();
                // Subtracting keeps replay correct when donations landed during the payout.
                account.balance = account.balance.saturating_sub(e.amount);
                self.custody = self.custody.saturating_sub(e.amount);
            }
            LedgerEvent::FundraiserActivated(e) => {
                self.fundraisers.entry(e.fundraiser).or_default().active = true;
            }
            LedgerEvent::FundraiserDeactivated(e) => {
                if let Some(account) = self.fundraisers.get_mut(&e.fundraiser) {
                    account.active = false;
                }
            }
        }

        self.last_event_at = Some(self.next_timestamp(event.occurred_at()));
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::Donate(cmd) => self.handle_donate(cmd),
            LedgerCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
            LedgerCommand::ActivateFundraiser(cmd) => self.handle_activate(cmd),
            LedgerCommand::DeactivateFundraiser(cmd) => self.handle_deactivate(cmd),
        }
    }
}
