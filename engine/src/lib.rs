//! # Baler Engine
//!
//! The domain core of the Baler buyback terminal: typed collections over
//! pluggable blob storage, derived-write subscribers (audit trail, general
//! ledger, receipts), the scale line protocol, and the wire types of the
//! sync protocol.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches disk or network; storage goes
//!   through the [`BlobStore`] seam and time is always passed in
//! - **Typed records**: every collection holds one concrete record kind,
//!   persisted in the terminal's camelCase wire format
//! - **Testable**: collections run over [`MemoryStore`] with no mocks
//! - **Portable**: hosts decide where blobs live and when syncs run
//!
//! ## Core Concepts
//!
//! ### Collections
//!
//! A [`Collection`] is an id-keyed array of one record kind with
//! insert/upsert, selector queries (equality, `$gt`, `$gte`), one-field
//! sort, and limit. Soft-deleted rows stay in storage and are excluded at
//! query time. Every mutation rewrites the collection's full blob.
//!
//! ### The database
//!
//! [`Database`] owns the terminal's six collections and seeds an empty
//! store with the stock catalogue, roster, audit trail, and ledger.
//! Inserting a purchase dispatches a [`DomainEvent`] to the registered
//! [`Subscriber`]s; the stock set writes one audit row, posts a balanced
//! debit/credit pair, and renders an ESC/POS-style receipt.
//!
//! ### Sync
//!
//! Remote exchange is last-write-wins by whole-document replacement:
//! [`merge_by_id`] realizes the server side, and [`protocol`] carries the
//! pull/push/auth/session wire types both ends share.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use baler_engine::{Database, MemoryStore, NewTransaction};
//!
//! let store = Arc::new(MemoryStore::new());
//! let db = Database::open(store, 1_700_000_000_000).unwrap();
//!
//! let draft = NewTransaction {
//!     material_id: "copper-bright".into(),
//!     weight: 10.0,
//!     supplier_id: "S1".into(),
//!     signature_data: None,
//! };
//! let (tx, receipts) = db.record_purchase(draft, 1_700_000_000_000).unwrap();
//!
//! assert_eq!(tx.total, 1305.0);
//! assert_eq!(receipts.len(), 1);
//! assert_eq!(db.audit_logs.count(), 4); // three seeded rows plus this purchase
//! ```

pub mod audit;
pub mod collection;
pub mod database;
pub mod error;
pub mod events;
pub mod ledger;
pub mod merge;
pub mod protocol;
pub mod receipt;
pub mod records;
pub mod scale;
pub mod selector;
pub mod storage;

// Re-export main types at crate root
pub use audit::{AuditEvent, AuditLog, ClockState};
pub use collection::{Collection, DocHandle, Document, Query};
pub use database::Database;
pub use error::Error;
pub use events::{
    default_subscribers, AuditTrail, DomainEvent, Effects, LedgerPoster, ReceiptPrinter,
    Subscriber,
};
pub use ledger::{Account, GlEntry};
pub use merge::{merge_by_id, MergeStats};
pub use protocol::{
    LoginRequest, LoginResponse, PullResponse, PushAck, Role, SessionInfo, UserInfo,
    ValidateResponse,
};
pub use receipt::render_receipt;
pub use records::{Material, NewTransaction, Setting, Staff, StaffRole, Transaction};
pub use scale::{FrameParser, ScaleStatus};
pub use selector::{compare_values, Selector, SortDirection};
pub use storage::{storage_key, BlobStore, MemoryStore, STORAGE_PREFIX};

pub use error::Result;

/// Type aliases for clarity
pub type RecordId = String;
pub type Timestamp = i64;
