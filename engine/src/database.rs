//! The terminal's local database.
//!
//! One [`Collection`] per record kind, all persisted through the same
//! [`BlobStore`]. The database is constructed explicitly and passed by
//! reference to whatever needs it; there is no process-wide instance.
//! Mutations that other parts of the system care about go through the
//! event-subscriber seam in [`crate::events`].

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::audit::{seed_audits, AuditLog};
use crate::collection::Collection;
use crate::events::{default_subscribers, DomainEvent, Effects, Subscriber};
use crate::ledger::{seed_gl_entries, GlEntry};
use crate::records::{
    seed_materials, seed_staff, Material, NewTransaction, Setting, Staff, Transaction,
};
use crate::selector::Selector;
use crate::storage::BlobStore;
use crate::{Error, Result, Timestamp};

/// Round to two decimals, the precision stored totals carry.
fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// The terminal's local store.
pub struct Database {
    pub transactions: Collection<Transaction>,
    pub materials: Collection<Material>,
    pub staff: Collection<Staff>,
    pub settings: Collection<Setting>,
    pub audit_logs: Collection<AuditLog>,
    pub gl_entries: Collection<GlEntry>,
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl Database {
    /// Open the database over `store`, seeding any empty collection with
    /// the stock fixtures. `now` anchors seed timestamps.
    pub fn open(store: Arc<dyn BlobStore>, now: Timestamp) -> Result<Self> {
        let db = Self {
            transactions: Collection::open(store.clone()),
            materials: Collection::open(store.clone()),
            staff: Collection::open(store.clone()),
            settings: Collection::open(store.clone()),
            audit_logs: Collection::open(store.clone()),
            gl_entries: Collection::open(store),
            subscribers: default_subscribers(),
        };
        db.seed_if_empty(now)?;
        Ok(db)
    }

    /// Replace the subscriber set. Hosts that handle printing or auditing
    /// differently swap their own in; the default set is
    /// [`default_subscribers`].
    pub fn with_subscribers(mut self, subscribers: Vec<Box<dyn Subscriber>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    fn seed_if_empty(&self, now: Timestamp) -> Result<()> {
        if self.materials.count() == 0 {
            debug!("seeding material catalogue");
            self.materials.bulk_insert(seed_materials())?;
        }
        if self.staff.count() == 0 {
            debug!("seeding staff roster");
            self.staff.bulk_insert(seed_staff(now))?;
        }
        if self.audit_logs.count() == 0 {
            debug!("seeding audit trail");
            self.audit_logs.bulk_insert(seed_audits(now))?;
        }
        if self.gl_entries.count() == 0 {
            debug!("seeding general ledger");
            self.gl_entries.bulk_insert(seed_gl_entries(now))?;
        }
        Ok(())
    }

    fn dispatch(&self, event: &DomainEvent, now: Timestamp) -> Effects {
        let mut effects = Effects::default();
        for subscriber in &self.subscribers {
            effects.merge(subscriber.on_event(event, now));
        }
        effects
    }

    /// Write the audit and ledger rows a dispatch produced, returning the
    /// rendered receipts for the caller to print.
    fn apply_effects(&self, effects: Effects) -> Result<Vec<Vec<u8>>> {
        if !effects.audits.is_empty() {
            self.audit_logs.bulk_insert(effects.audits)?;
        }
        if !effects.ledger.is_empty() {
            self.gl_entries.bulk_insert(effects.ledger)?;
        }
        Ok(effects.receipts)
    }

    /// Insert a fully formed transaction and its derived writes: the
    /// transaction row first, then audit and ledger rows. Rendered
    /// receipts come back to the caller.
    ///
    /// Collections are not a transactional group; a failure partway
    /// leaves the earlier writes applied.
    pub fn insert_transaction(
        &self,
        transaction: Transaction,
        now: Timestamp,
    ) -> Result<Vec<Vec<u8>>> {
        let event = DomainEvent::TransactionCreated {
            transaction: transaction.clone(),
        };
        let effects = self.dispatch(&event, now);
        self.transactions.insert(transaction)?;
        self.apply_effects(effects)
    }

    /// Validate and price a draft purchase, then insert it.
    ///
    /// Rejections happen before any write: the material must exist, the
    /// weight must be a positive finite number, and the supplier id must
    /// not be blank. The total is `weight * current price`, rounded to
    /// cents.
    pub fn record_purchase(
        &self,
        draft: NewTransaction,
        now: Timestamp,
    ) -> Result<(Transaction, Vec<Vec<u8>>)> {
        if draft.supplier_id.trim().is_empty() {
            return Err(Error::Validation("supplier id is required".into()));
        }
        if !draft.weight.is_finite() || draft.weight <= 0.0 {
            return Err(Error::Validation(
                "weight must be greater than zero".into(),
            ));
        }
        let material = self
            .materials
            .find_one(&draft.material_id)
            .ok_or_else(|| Error::UnknownMaterial(draft.material_id.clone()))?
            .into_doc();

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            material_id: material.id.clone(),
            material_name: material.name.clone(),
            weight: draft.weight,
            price_per_kg: material.current_price,
            total: round_to_cents(draft.weight * material.current_price),
            supplier_id: draft.supplier_id,
            timestamp: now,
            signature_data: draft.signature_data,
            deleted: false,
        };
        let receipts = self.insert_transaction(transaction.clone(), now)?;
        Ok((transaction, receipts))
    }

    /// Clock a staff member in, opening a shift at `now`.
    pub fn clock_in(&self, staff_id: &str, now: Timestamp) -> Result<Staff> {
        self.set_clock_state(staff_id, true, Some(now), now)
    }

    /// Clock a staff member out, closing the shift.
    pub fn clock_out(&self, staff_id: &str, now: Timestamp) -> Result<Staff> {
        self.set_clock_state(staff_id, false, None, now)
    }

    fn set_clock_state(
        &self,
        staff_id: &str,
        clocked_in: bool,
        shift_start: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<Staff> {
        let mut handle = self
            .staff
            .find_one(staff_id)
            .ok_or_else(|| Error::NotFound(staff_id.to_string()))?;
        let before = handle.doc().clone();
        handle.patch(|member| {
            member.clocked_in = clocked_in;
            member.shift_start = shift_start;
        })?;
        let after = handle.doc().clone();

        let event = if clocked_in {
            DomainEvent::StaffClockedIn {
                before,
                after: after.clone(),
            }
        } else {
            DomainEvent::StaffClockedOut {
                before,
                after: after.clone(),
            }
        };
        self.apply_effects(self.dispatch(&event, now))?;
        Ok(after)
    }

    /// Transactions created after `watermark`, in storage order.
    pub fn transactions_since(&self, watermark: Timestamp) -> Vec<Transaction> {
        self.transactions
            .find()
            .filter(Selector::new().gt("timestamp", watermark))
            .exec()
    }

    /// Audit rows created after `watermark`, in storage order.
    pub fn audits_since(&self, watermark: Timestamp) -> Vec<AuditLog> {
        self.audit_logs
            .find()
            .filter(Selector::new().gt("timestamp", watermark))
            .exec()
    }
}
