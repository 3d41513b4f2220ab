//! # promo-types
//!
//! Shared domain types for the PromoSensei system.
//!
//! This crate defines the data structures used throughout the pipeline:
//! - Offer records: scraped promotional deals, keyed by their link
//! - Offer metadata: the structured fields stored alongside each indexed offer
//! - Configuration: layered config loading for paths and retrieval settings

pub mod config;
pub mod error;
pub mod offer;

pub use config::PromoConfig;
pub use error::PromoError;
pub use offer::{OfferMetadata, OfferRecord, NOT_AVAILABLE};
