//! Roles, admin roles, and the per-route capability matrix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Base role carried by every user and every token.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}

/// Internal staff role; only meaningful when the base role is `admin`.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SupportAgent,
    OpsAdmin,
    ManagementCeo,
}

impl AdminRole {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::SupportAgent => "support_agent",
            Self::OpsAdmin => "ops_admin",
            Self::ManagementCeo => "management_ceo",
        }
    }

    /// Capability matrix: which admin roles may exercise which capability.
    pub(crate) const fn allows(self, capability: Capability) -> bool {
        match capability {
            Capability::Read => true,
            Capability::SupportAction => {
                matches!(self, Self::SupportAgent | Self::OpsAdmin)
            }
            Capability::OpsAction => matches!(self, Self::OpsAdmin),
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "support_agent" => Ok(Self::SupportAgent),
            "ops_admin" => Ok(Self::OpsAdmin),
            "management_ceo" => Ok(Self::ManagementCeo),
            other => Err(anyhow::anyhow!("unknown admin role: {other}")),
        }
    }
}

/// Permission level an admin route declares at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Read,
    SupportAction,
    OpsAction,
}
