//! # idp-crypto
//!
//! Cryptographic primitives for the SAML identity provider using aws-lc-rs.
//!
//! - Digests: SHA-256/384/512, plus SHA-1 for certificate fingerprints
//! - RSA PKCS#1 v1.5 signing and verification (XML-DSig `rsa-sha*`)
//! - X.509 certificate handling: PEM/DER, public keys, fingerprints, validity
//!
//! SHA-1 is never offered as a signature algorithm. It survives only because
//! certificate fingerprints are still commonly exchanged in SHA-1 form.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod certificate;
pub mod hash;
pub mod rsa;
pub mod signature;

pub use algorithm::{HashAlgorithm, RsaAlgorithm};
pub use certificate::{normalize_fingerprint, pem_to_der, Certificate};
pub use hash::{hash, sha1, sha256, sha384, sha512};
pub use rsa::{rsa_sign, rsa_verify};
pub use signature::SignatureError;
