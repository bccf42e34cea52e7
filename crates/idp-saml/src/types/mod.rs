//! SAML 2.0 types and data structures.
//!
//! The typed assertion model, name identifiers and protocol constants.

mod assertion;
mod constants;
mod name_id;

pub use assertion::*;
pub use constants::*;
pub use name_id::*;
