//! Caller Context
//!
//! Identity of the caller, resolved once at the HTTP boundary and passed
//! into handlers already validated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role granted to a caller or stored on a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Context for a request, used for authorization and tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerContext {
    /// API key ID used for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<Uuid>,

    /// User bound to the API key, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Role granted to the caller
    pub role: Role,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl CallerContext {
    /// Create a context for the given role
    pub fn new(role: Role) -> Self {
        Self {
            api_key_id: None,
            user_id: None,
            role,
            correlation_id: None,
        }
    }

    pub fn with_api_key(mut self, api_key_id: Uuid) -> Self {
        self.api_key_id = Some(api_key_id);
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail unless the caller holds the admin role.
    pub fn require_admin(&self) -> Result<(), AdminRequired> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AdminRequired { role: self.role })
        }
    }
}

/// Raised when a non-admin caller reaches an admin-only operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Admin role required (caller has role {role})")]
pub struct AdminRequired {
    pub role: Role,
}
