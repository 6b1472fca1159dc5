//! Baler Client
//!
//! Host-side companion to [`baler_engine`] for point-of-sale terminals:
//! durable file storage for the local collections, the background sync
//! loop against a Baler sync server, and the weighbridge scale monitor.
//!
//! The engine stays pure; everything impure lives here. A terminal
//! wires the pieces together like this:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use baler_client::{FileStore, HttpTransport, ScaleMonitor, SyncEngine};
//! use baler_engine::Database;
//! use chrono::Utc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileStore::open("./data")?);
//! let db = Arc::new(Database::open(store, Utc::now().timestamp_millis())?);
//!
//! let transport = Arc::new(HttpTransport::new("http://localhost:3000")?);
//! let sync = Arc::new(SyncEngine::new(db.clone(), transport));
//! let _sync_loop = sync.clone().start();
//!
//! let scale = ScaleMonitor::new();
//! scale.connect_mock().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod scale;
pub mod storage;
pub mod sync;
pub mod transport;

pub use error::{SyncError, TransportError};
pub use scale::ScaleMonitor;
pub use storage::FileStore;
pub use sync::{SyncEngine, SyncOutcome, SyncReport, SyncStatus, SYNC_PERIOD};
pub use transport::{HttpTransport, SyncTransport};

pub use error::Result;
