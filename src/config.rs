//! Client configuration and the caller's session.

use serde::{Deserialize, Serialize};

use crate::aggregate::Role;
use crate::error::Result;
use crate::rental::{RentalId, UserId};

/// Configuration for the remote rental store.
///
/// Endpoint paths are relative to `base_url`. Paths that address a single
/// rental contain an `{id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.example.com/api`
    pub base_url: String,

    /// Timeout for each API call in milliseconds
    pub timeout_ms: u64,

    /// Seller accept/reject
    pub seller_action_path: String,

    /// Seller advance to collected/completed
    pub seller_status_path: String,

    pub buyer_rentals_path: String,
    pub seller_rentals_path: String,
    pub admin_rentals_path: String,
    pub seller_earnings_path: String,

    /// Buyer creates a new request
    pub create_rental_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 10_000,
            seller_action_path: "/seller/rental-requests/{id}/action".to_string(),
            seller_status_path: "/seller/rental-requests/{id}/status".to_string(),
            buyer_rentals_path: "/buyer/rental-requests".to_string(),
            seller_rentals_path: "/seller/rental-requests".to_string(),
            admin_rentals_path: "/admin/rentals".to_string(),
            seller_earnings_path: "/seller/earnings".to_string(),
            create_rental_path: "/buyer/rental-requests".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fill the `{id}` placeholder of a per-rental path.
    pub fn rental_path(template: &str, id: &RentalId) -> String {
        template.replace("{id}", id)
    }
}

/// Who is making the calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub user_id: UserId,
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role, user_id: impl Into<UserId>) -> Self {
        Self {
            token: token.into(),
            role,
            user_id: user_id.into(),
        }
    }
}

// token stays out of logs
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ClientConfig::from_json(r#"{"base_url": "https://api.test", "timeout_ms": 2500}"#)
            .unwrap();
        assert_eq!(config.base_url, "https://api.test");
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.admin_rentals_path, "/admin/rentals");
    }

    #[test]
    fn test_rental_path() {
        let config = ClientConfig::default();
        assert_eq!(
            ClientConfig::rental_path(&config.seller_status_path, &RentalId::from("r-9")),
            "/seller/rental-requests/r-9/status"
        );
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::new("secret-token", Role::Seller, "u-1");
        let shown = format!("{:?}", session);
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("u-1"));
    }
}
