//! General ledger rows derived from terminal activity.
//!
//! Double-entry convention: every posting is a pair of rows whose debit
//! and credit totals match. A single row carries exactly one non-zero
//! side, which the constructors guarantee; nothing validates rows after
//! construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collection::Document;
use crate::records::is_false;
use crate::{RecordId, Timestamp};

/// Ledger accounts used by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Account {
    Inventory,
    Cash,
    Revenue,
    Expenses,
}

/// One general-ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlEntry {
    pub id: RecordId,
    pub transaction_id: String,
    pub account: Account,
    pub debit: f64,
    pub credit: f64,
    pub timestamp: Timestamp,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl GlEntry {
    /// A debit row; the credit side is zero.
    pub fn debit(
        transaction_id: impl Into<String>,
        account: Account,
        amount: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            account,
            debit: amount,
            credit: 0.0,
            timestamp,
            deleted: false,
        }
    }

    /// A credit row; the debit side is zero.
    pub fn credit(
        transaction_id: impl Into<String>,
        account: Account,
        amount: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            account,
            debit: 0.0,
            credit: amount,
            timestamp,
            deleted: false,
        }
    }
}

impl Document for GlEntry {
    const NAME: &'static str = "gl_entries";

    fn id(&self) -> &str {
        &self.id
    }

    fn deleted(&self) -> bool {
        self.deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }
}

/// Ledger rows seeded into an empty store: two settled purchases and one
/// expense, each a balanced pair. `now` anchors the timestamps.
pub fn seed_gl_entries(now: Timestamp) -> Vec<GlEntry> {
    vec![
        GlEntry::debit("seed-tx-1", Account::Inventory, 1305.0, now - 500_000),
        GlEntry::credit("seed-tx-1", Account::Cash, 1305.0, now - 500_000),
        GlEntry::debit("seed-tx-2", Account::Inventory, 455.0, now - 400_000),
        GlEntry::credit("seed-tx-2", Account::Cash, 455.0, now - 400_000),
        GlEntry::debit("seed-expense-1", Account::Expenses, 5350.75, now - 300_000),
        GlEntry::credit("seed-expense-1", Account::Cash, 5350.75, now - 300_000),
    ]
}
