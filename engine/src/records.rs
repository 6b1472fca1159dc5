//! Record kinds captured at the buyback terminal.
//!
//! Field names follow the persisted wire format (camelCase, `_deleted`
//! tombstone flag omitted when false), so blobs written by earlier
//! deployments of the terminal parse unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::Document;
use crate::{RecordId, Timestamp};

/// `skip_serializing_if` helper for the `_deleted` flag.
pub(crate) fn is_false(v: &bool) -> bool {
    !*v
}

/// A completed buyback purchase at the weighbridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: RecordId,
    pub material_id: String,
    pub material_name: String,
    /// Net weight in kilograms.
    pub weight: f64,
    pub price_per_kg: f64,
    /// `weight * price_per_kg`, rounded to cents at creation time and
    /// never re-validated afterwards.
    pub total: f64,
    pub supplier_id: String,
    /// Milliseconds since the epoch.
    pub timestamp: Timestamp,
    /// Supplier signature capture, as a data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_data: Option<String>,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl Document for Transaction {
    const NAME: &'static str = "transactions";

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

/// Draft purchase, before pricing, id assignment, and timestamping.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub material_id: String,
    pub weight: f64,
    pub supplier_id: String,
    pub signature_data: Option<String>,
}

/// Catalogue entry for a purchasable material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: RecordId,
    pub name: String,
    /// Buyback price per kilogram.
    pub current_price: f64,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

/// Staff roster roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffRole {
    Operator,
    Manager,
    Driver,
    Admin,
}

/// Staff roster entry with time-clock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: RecordId,
    pub name: String,
    pub role: StaffRole,
    pub clocked_in: bool,
    /// Start of the current shift; null while clocked out.
    pub shift_start: Option<Timestamp>,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl Document for Staff {
    const NAME: &'static str = "staff";

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

impl Document for Material {
    const NAME: &'static str = "materials";

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

/// Free-form key/value setting. The id mirrors the key so settings fit
/// the id-keyed collection contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: RecordId,
    pub key: String,
    pub value: Value,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        Self {
            id: key.clone(),
            key,
            value,
            deleted: false,
        }
    }
}

impl Document for Setting {
    const NAME: &'static str = "settings";

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

/// Material catalogue seeded into an empty store.
pub fn seed_materials() -> Vec<Material> {
    fn material(id: &str, name: &str, current_price: f64) -> Material {
        Material {
            id: id.into(),
            name: name.into(),
            current_price,
            deleted: false,
        }
    }

    vec![
        material("copper-bright", "Copper (Bright)", 130.5),
        material("copper-heavy", "Copper (Heavy)", 120.0),
        material("aluminium-cast", "Aluminium (Cast)", 22.75),
        material("aluminium-extruded", "Aluminium (Extruded)", 25.0),
        material("brass", "Brass", 75.2),
        material("stainless-steel", "Stainless Steel", 15.5),
        material("lead", "Lead", 20.0),
        material("pvc-cable", "PVC Cable", 35.8),
    ]
}

/// Staff roster seeded into an empty store. `now` anchors the open shifts.
pub fn seed_staff(now: Timestamp) -> Vec<Staff> {
    fn member(
        id: &str,
        name: &str,
        role: StaffRole,
        clocked_in: bool,
        shift_start: Option<Timestamp>,
    ) -> Staff {
        Staff {
            id: id.into(),
            name: name.into(),
            role,
            clocked_in,
            shift_start,
            deleted: false,
        }
    }

    vec![
        member("staff-01", "John Doe", StaffRole::Operator, false, None),
        member(
            "staff-02",
            "Jane Smith",
            StaffRole::Manager,
            true,
            Some(now - 3_600_000),
        ),
        member(
            "staff-03",
            "Mike Ross",
            StaffRole::Operator,
            true,
            Some(now - 7_200_000),
        ),
        member("staff-04", "Sarah Connor", StaffRole::Driver, false, None),
        member("staff-05", "Admin User", StaffRole::Admin, false, None),
    ]
}
