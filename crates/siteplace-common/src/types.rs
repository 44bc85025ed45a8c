//! Core type definitions for Siteplace
//!
//! This module defines the identifiers and the byte-capacity model shared
//! by the catalog, the quota ledger and the selectors.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a storage site
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, From, Into)]
pub struct SiteId(Uuid);

impl SiteId {
    /// Derive a stable ID from a site name
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl fmt::Debug for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiteId({})", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account owning a placement decision
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Create a new account name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the account name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Quota group: a named set of sites sharing one account-level limit.
///
/// The name is the site expression the group was declared with.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct QuotaGroup(String);

impl QuotaGroup {
    /// Create a new quota group identifier
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the group name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuotaGroup {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Remaining byte capacity of a site, either bounded or unlimited.
///
/// A bounded value may be negative when recorded usage already exceeds
/// the configured limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// No limit applies
    Unlimited,
    /// Bytes left before the limit is reached
    Bytes(i64),
}

impl Capacity {
    /// `true` if at least `need` bytes are left
    #[must_use]
    pub fn covers(&self, need: i128) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Bytes(b) => i128::from(*b) >= need,
        }
    }

    /// `true` if strictly more than `need` bytes are left
    #[must_use]
    pub fn exceeds(&self, need: i128) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Bytes(b) => i128::from(*b) > need,
        }
    }

    /// `true` if any bytes are left
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.exceeds(0)
    }

    /// Subtract `amount` bytes; unlimited stays unlimited
    pub fn consume(&mut self, amount: u64) {
        if let Self::Bytes(b) = self {
            *b = b.saturating_sub(i64::try_from(amount).unwrap_or(i64::MAX));
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::Bytes(b) => write!(f, "{b}"),
        }
    }
}
