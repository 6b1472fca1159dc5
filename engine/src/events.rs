//! Domain events and their derived-write subscribers.
//!
//! A database mutation emits one [`DomainEvent`]; each registered
//! [`Subscriber`] turns it into [`Effects`], the rows it wants written.
//! Subscribers are pure so each can be tested on its own; the database
//! applies the combined effects after dispatch.

use crate::audit::{AuditEvent, AuditLog, ClockState};
use crate::ledger::{Account, GlEntry};
use crate::receipt::render_receipt;
use crate::records::{Staff, Transaction};
use crate::Timestamp;

/// Something that happened at the terminal.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    TransactionCreated { transaction: Transaction },
    StaffClockedIn { before: Staff, after: Staff },
    StaffClockedOut { before: Staff, after: Staff },
}

/// Derived writes produced in response to one event.
#[derive(Debug, Clone, Default)]
pub struct Effects {
    pub audits: Vec<AuditLog>,
    pub ledger: Vec<GlEntry>,
    /// Rendered receipt payloads, handed back to the caller for printing.
    pub receipts: Vec<Vec<u8>>,
}

impl Effects {
    pub fn merge(&mut self, other: Effects) {
        self.audits.extend(other.audits);
        self.ledger.extend(other.ledger);
        self.receipts.extend(other.receipts);
    }

    pub fn is_empty(&self) -> bool {
        self.audits.is_empty() && self.ledger.is_empty() && self.receipts.is_empty()
    }
}

/// Reacts to a domain event with derived writes. `now` is the caller's
/// clock; subscribers never read time or storage themselves.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &DomainEvent, now: Timestamp) -> Effects;
}

fn clock_state(staff: &Staff) -> ClockState {
    ClockState {
        clocked_in: staff.clocked_in,
        shift_start: staff.shift_start,
    }
}

/// Appends one audit row per observed action.
pub struct AuditTrail;

impl Subscriber for AuditTrail {
    fn on_event(&self, event: &DomainEvent, now: Timestamp) -> Effects {
        let mut effects = Effects::default();
        match event {
            DomainEvent::TransactionCreated { transaction } => {
                effects.audits.push(AuditLog::new(
                    "system",
                    now,
                    AuditEvent::TransactionCreate {
                        before: None,
                        after: Box::new(transaction.clone()),
                    },
                ));
            }
            DomainEvent::StaffClockedIn { before, after } => {
                effects.audits.push(AuditLog::new(
                    after.id.clone(),
                    now,
                    AuditEvent::StaffClockIn {
                        before: clock_state(before),
                        after: clock_state(after),
                    },
                ));
            }
            DomainEvent::StaffClockedOut { before, after } => {
                effects.audits.push(AuditLog::new(
                    after.id.clone(),
                    now,
                    AuditEvent::StaffClockOut {
                        before: clock_state(before),
                        after: clock_state(after),
                    },
                ));
            }
        }
        effects
    }
}

/// Posts the balanced pair for each purchase: Inventory gains the
/// material, Cash pays the supplier out.
pub struct LedgerPoster;

impl Subscriber for LedgerPoster {
    fn on_event(&self, event: &DomainEvent, _now: Timestamp) -> Effects {
        let mut effects = Effects::default();
        if let DomainEvent::TransactionCreated { transaction } = event {
            effects.ledger.push(GlEntry::debit(
                transaction.id.clone(),
                Account::Inventory,
                transaction.total,
                transaction.timestamp,
            ));
            effects.ledger.push(GlEntry::credit(
                transaction.id.clone(),
                Account::Cash,
                transaction.total,
                transaction.timestamp,
            ));
        }
        effects
    }
}

/// Renders the printable receipt for each purchase.
pub struct ReceiptPrinter;

impl Subscriber for ReceiptPrinter {
    fn on_event(&self, event: &DomainEvent, _now: Timestamp) -> Effects {
        let mut effects = Effects::default();
        if let DomainEvent::TransactionCreated { transaction } = event {
            effects.receipts.push(render_receipt(transaction));
        }
        effects
    }
}

/// The stock subscriber set: audit trail, ledger posting, receipt.
pub fn default_subscribers() -> Vec<Box<dyn Subscriber>> {
    vec![
        Box::new(AuditTrail),
        Box::new(LedgerPoster),
        Box::new(ReceiptPrinter),
    ]
}
