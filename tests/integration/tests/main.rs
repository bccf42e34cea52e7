//! End-to-End Integration Tests
//!
//! These tests drive the public API of the identity provider crates:
//! configuration, assertion issuance, signing, verification and response
//! wrapping, with the PEM fixtures under `tests/fixtures`.

mod common;
mod assertion_issuance;
mod response_flow;
mod signature_roundtrip;
