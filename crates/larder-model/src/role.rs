// SPDX-License-Identifier: Apache-2.0

use crate::item::ParseError;
use serde::{Deserialize, Serialize};

/// Coarse two-tier permission model. Both tiers are shared secrets, not
/// per-user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseError::InvalidFormat("role must be one of 'user', 'admin'")),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Create and delete are reserved for the admin tier.
    #[must_use]
    pub const fn can_manage(self) -> bool {
        matches!(self, Self::Admin)
    }
}
