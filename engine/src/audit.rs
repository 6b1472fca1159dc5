//! Audit trail records.
//!
//! Every audited action is a tagged [`AuditEvent`] variant with a
//! structured payload, serialized as the `action` / `data` pair the rest
//! of the fleet stores. The trail is append-only from the application's
//! point of view.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collection::Document;
use crate::records::{is_false, Transaction};
use crate::{RecordId, Timestamp};

/// Time-clock state captured on either side of a clock-in/out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockState {
    pub clocked_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_start: Option<Timestamp>,
}

/// Audited actions, tagged by their wire action name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data")]
pub enum AuditEvent {
    /// A purchase was recorded at the terminal. `before` is empty for a
    /// fresh record.
    #[serde(rename = "transaction.create")]
    TransactionCreate {
        before: Option<Box<Transaction>>,
        after: Box<Transaction>,
    },

    /// A staff member started a shift.
    #[serde(rename = "staff.clock_in")]
    StaffClockIn {
        before: ClockState,
        after: ClockState,
    },

    /// A staff member ended a shift.
    #[serde(rename = "staff.clock_out")]
    StaffClockOut {
        before: ClockState,
        after: ClockState,
    },

    /// Successful login, with the address it came from.
    #[serde(rename = "login.success")]
    LoginSuccess { ip: String },

    /// Terminal session started.
    #[serde(rename = "system.startup")]
    SystemStartup { message: String },
}

impl AuditEvent {
    /// The wire action name of this event.
    pub fn action(&self) -> &'static str {
        match self {
            AuditEvent::TransactionCreate { .. } => "transaction.create",
            AuditEvent::StaffClockIn { .. } => "staff.clock_in",
            AuditEvent::StaffClockOut { .. } => "staff.clock_out",
            AuditEvent::LoginSuccess { .. } => "login.success",
            AuditEvent::SystemStartup { .. } => "system.startup",
        }
    }
}

/// One audit trail row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: RecordId,
    pub timestamp: Timestamp,
    /// `"system"` or a staff id.
    pub user_id: String,
    #[serde(flatten)]
    pub event: AuditEvent,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl AuditLog {
    /// New audit row with a generated id.
    pub fn new(user_id: impl Into<String>, timestamp: Timestamp, event: AuditEvent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            user_id: user_id.into(),
            event,
            deleted: false,
        }
    }
}

impl Document for AuditLog {
    const NAME: &'static str = "audit_logs";

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

/// Audit rows seeded into an empty store. `now` anchors the timestamps.
pub fn seed_audits(now: Timestamp) -> Vec<AuditLog> {
    vec![
        AuditLog::new(
            "system",
            now - 86_400_000,
            AuditEvent::SystemStartup {
                message: "System initialized".into(),
            },
        ),
        AuditLog::new(
            "staff-02",
            now - 3_600_000,
            AuditEvent::LoginSuccess {
                ip: "192.168.1.100".into(),
            },
        ),
        AuditLog::new(
            "staff-03",
            now - 1_800_000,
            AuditEvent::StaffClockIn {
                before: ClockState {
                    clocked_in: false,
                    shift_start: None,
                },
                after: ClockState {
                    clocked_in: true,
                    shift_start: None,
                },
            },
        ),
    ]
}
