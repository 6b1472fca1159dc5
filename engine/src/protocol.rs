//! Wire types shared by the terminal and the sync server.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Response to a pull: the remote's full document set for one kind.
///
/// `last_pulled_rev` is the server's clock at the pull, echoed for status
/// display. It is not a cursor; pulls always return the full set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse<T> {
    pub documents: Vec<T>,
    pub last_pulled_rev: Timestamp,
}

/// Acknowledgement for a push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAck {
    pub success: bool,
    pub message: String,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub role: Role,
}

/// Response to a token validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Chat session registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
}

/// Access roles issued at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Manager,
    Operator,
    Driver,
    #[serde(rename = "HR Admin")]
    HrAdmin,
}

impl Role {
    /// Navigation paths this role may open.
    pub fn permitted_paths(&self) -> &'static [&'static str] {
        match self {
            Role::Owner => &[
                "/",
                "/pos",
                "/finance",
                "/hr",
                "/logistics",
                "/compliance",
                "/marketplace",
                "/chat",
                "/settings",
                "/portal",
            ],
            Role::Manager => &[
                "/",
                "/pos",
                "/finance",
                "/hr",
                "/logistics",
                "/chat",
                "/settings",
            ],
            Role::Operator => &["/pos", "/hr", "/chat", "/settings"],
            Role::Driver => &["/logistics", "/chat", "/settings"],
            Role::HrAdmin => &["/hr", "/chat", "/settings"],
        }
    }

    pub fn can_access(&self, path: &str) -> bool {
        self.permitted_paths().contains(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_wire_names_include_spaced_variant() {
        assert_eq!(serde_json::to_value(Role::Owner).unwrap(), json!("Owner"));
        assert_eq!(
            serde_json::to_value(Role::HrAdmin).unwrap(),
            json!("HR Admin")
        );

        let parsed: Role = serde_json::from_value(json!("HR Admin")).unwrap();
        assert_eq!(parsed, Role::HrAdmin);
    }

    #[test]
    fn permissions_follow_the_navigation_map() {
        assert!(Role::Owner.can_access("/portal"));
        assert!(Role::Manager.can_access("/finance"));
        assert!(!Role::Manager.can_access("/portal"));
        assert!(Role::Operator.can_access("/pos"));
        assert!(!Role::Operator.can_access("/finance"));
        assert!(Role::Driver.can_access("/logistics"));
        assert!(!Role::Driver.can_access("/pos"));
        assert!(Role::HrAdmin.can_access("/hr"));
        assert!(!Role::HrAdmin.can_access("/"));
    }

    #[test]
    fn pull_response_round_trip() {
        let response: PullResponse<serde_json::Value> = serde_json::from_value(json!({
            "documents": [{"id": "tx-1"}],
            "last_pulled_rev": 1_700_000_000_000_i64,
        }))
        .unwrap();
        assert_eq!(response.documents.len(), 1);
        assert_eq!(response.last_pulled_rev, 1_700_000_000_000);
    }

    #[test]
    fn validate_response_omits_role_when_invalid() {
        let invalid = ValidateResponse {
            valid: false,
            role: None,
        };
        assert_eq!(
            serde_json::to_value(&invalid).unwrap(),
            json!({"valid": false})
        );

        let valid = ValidateResponse {
            valid: true,
            role: Some(Role::Manager),
        };
        assert_eq!(
            serde_json::to_value(&valid).unwrap(),
            json!({"valid": true, "role": "Manager"})
        );
    }

    #[test]
    fn session_info_uses_camel_case() {
        let session = SessionInfo {
            id: "s-1".into(),
            title: "Chat 2024-01-01".into(),
            created_at: 1_000,
            last_active: 2_000,
        };
        assert_eq!(
            serde_json::to_value(&session).unwrap(),
            json!({
                "id": "s-1",
                "title": "Chat 2024-01-01",
                "createdAt": 1_000,
                "lastActive": 2_000,
            })
        );
    }
}
