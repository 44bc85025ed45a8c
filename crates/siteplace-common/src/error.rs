//! Error types for Siteplace
//!
//! This module defines the common error types used throughout the system.

use thiserror::Error;

/// Common result type for Siteplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Siteplace
#[derive(Debug, Error)]
pub enum Error {
    // Capacity errors
    #[error("insufficient target sites: have {available}, need {required}")]
    InsufficientTargetRses { available: usize, required: usize },

    #[error("insufficient space on target sites: have {available}, need {required}")]
    RseOverQuota { available: usize, required: usize },

    #[error("insufficient account limit on target sites: have {available}, need {required}")]
    InsufficientAccountLimit { available: usize, required: usize },

    // Weighting errors
    /// A weight, price or availability attribute that is not a finite,
    /// non-negative number. Negative values are rejected like non-numeric ones.
    #[error("site {site} has a non-number specified for the weight '{attribute}': {value:?}")]
    InvalidRuleWeight {
        site: String,
        attribute: String,
        value: String,
    },

    #[error("no eligible candidates: {0}")]
    NoEligibleCandidates(String),

    // Collaborator errors
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a no-eligible-candidates error
    pub fn no_eligible(msg: impl Into<String>) -> Self {
        Self::NoEligibleCandidates(msg.into())
    }

    /// Check if this error reports a shortage of usable targets.
    ///
    /// A caller may retry these with relaxed constraints (fewer copies,
    /// a wider expression); every other kind is a hard failure.
    #[must_use]
    pub const fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientTargetRses { .. }
                | Self::RseOverQuota { .. }
                | Self::InsufficientAccountLimit { .. }
                | Self::NoEligibleCandidates(_)
        )
    }

    /// Short stable name of the error kind, for logs and CLI output
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientTargetRses { .. } => "InsufficientTargetRSEs",
            Self::RseOverQuota { .. } => "RSEOverQuota",
            Self::InsufficientAccountLimit { .. } => "InsufficientAccountLimit",
            Self::InvalidRuleWeight { .. } => "InvalidRuleWeight",
            Self::NoEligibleCandidates(_) => "NoEligibleCandidates",
            Self::Catalog(_) => "CatalogError",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::Configuration(_) => "ConfigurationError",
            Self::Serialization(_) => "SerializationError",
        }
    }
}
