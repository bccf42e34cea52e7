//! Assertion issuance.
//!
//! A single issuance call flows through three stages:
//!
//! 1. [`negotiate`] picks the NameID format from the configured list
//! 2. [`AttributeSpec::resolve_values`] pulls attribute values off the principal
//! 3. [`AssertionBuilder`] assembles, signs and optionally encrypts the result

mod attributes;
mod builder;
mod format;
mod request;

pub use attributes::AttributeSpec;
pub use builder::{AssertionBuilder, CLOCK_SKEW_SECS, SUBJECT_CONFIRMATION_SECS};
pub use format::{expand_format_name, negotiate, NameIdFormatSpec};
pub use request::{AssertionRequest, DEFAULT_EXPIRY_SECS};
