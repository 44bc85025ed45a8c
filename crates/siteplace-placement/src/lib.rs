//! Siteplace Placement - quota-aware replica placement
//!
//! This crate chooses the storage sites that receive the copies of a piece
//! of data. Candidates are narrowed by account quota and free space, then
//! drawn at random with a per-site weight.
//!
//! # Weighting modes
//!
//! ## Uniform
//! Every candidate weighs 1.
//!
//! ## Attribute
//! The weight is the numeric value of a named site attribute; sites without
//! it are ignored.
//!
//! ## Cost
//! The weight is the inverse of the monetary cost of placing the data on a
//! cost-bearing site, refined by an availability-aware local search.
//!
//! # Example
//! ```ignore
//! use siteplace_placement::{MemoryCatalog, SelectionRequest, SelectorOptions, SiteSelector};
//!
//! let raw = catalog.resolve_expression("tier=1")?;
//! let mut selector = SiteSelector::new(&catalog, &raw, SelectorOptions::new("jdoe", 2))?;
//! for size in file_sizes {
//!     let picks = selector.select(&SelectionRequest::new(size))?;
//! }
//! ```

pub mod candidate;
pub mod catalog;
pub mod cost;
pub mod draw;
pub mod expression;
pub mod ledger;
pub mod memory;
pub mod pipeline;
pub mod resolve;
pub mod selector;
pub mod strategy;
pub mod weighted;

pub use candidate::{CandidateSite, Pricing, SitePick, WeightingMode};
pub use catalog::{GlobalQuotaLimit, RawCandidate, SiteCatalog};
pub use cost::{CostStrategy, PricedSite, heuristic_placement};
pub use ledger::{LedgerEntry, QuotaLedger};
pub use memory::{AccountRecord, CatalogSnapshot, MemoryCatalog, SiteRecord};
pub use pipeline::SelectionRequest;
pub use resolve::{Resolution, ResolveOptions, resolve_expression, resolve_expression_with_config};
pub use selector::{CandidateSnapshot, SelectorOptions, SiteSelector};
pub use strategy::{SelectionStrategy, Strategy};
pub use weighted::WeightedStrategy;
