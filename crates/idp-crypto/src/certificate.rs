//! X.509 certificate handling.
//!
//! Certificates travel as PEM in configuration and as bare base64 DER inside
//! `ds:X509Certificate`. Trust is anchored on a fingerprint supplied by the
//! relying party, so fingerprint rendering and comparison live here too.

use base64::{engine::general_purpose::STANDARD, Engine};
use x509_parser::prelude::*;

use crate::algorithm::HashAlgorithm;
use crate::hash::hash;
use crate::signature::SignatureError;

/// Extracts the DER payload of the first PEM block labelled `label`.
///
/// Returns `None` when no such block is present or the text is not PEM.
#[must_use]
pub fn pem_to_der(text: &str, label: &str) -> Option<Vec<u8>> {
    ::pem::parse_many(text)
        .ok()?
        .into_iter()
        .find(|block| block.tag() == label)
        .map(|block| block.contents().to_vec())
}

/// Reduces a fingerprint to lowercase hex digits.
///
/// Accepts `AB:CD:..`, `abcd..`, `AB CD ..` and `ab-cd-..`. Any other
/// character makes the fingerprint unusable and yields `None`.
#[must_use]
pub fn normalize_fingerprint(fingerprint: &str) -> Option<String> {
    let mut digits = String::with_capacity(fingerprint.len());
    for c in fingerprint.trim().chars() {
        match c {
            c if c.is_ascii_hexdigit() => digits.push(c.to_ascii_lowercase()),
            ':' | ' ' | '-' => {}
            _ => return None,
        }
    }
    Some(digits)
}

/// A DER-encoded X.509 certificate known to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wraps DER bytes after checking that they parse as a certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, SignatureError> {
        let der = der.into();
        X509Certificate::from_der(&der)
            .map_err(|e| SignatureError::InvalidCertificate(format!("{e}")))?;
        Ok(Self { der })
    }

    /// Parses a `CERTIFICATE` PEM block.
    ///
    /// # Errors
    ///
    /// Returns an error if no certificate block is present or it does not parse.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        let der = pem_to_der(pem, "CERTIFICATE").ok_or_else(|| {
            SignatureError::InvalidCertificate("no CERTIFICATE PEM block".to_string())
        })?;
        Self::from_der(der)
    }

    /// Parses base64 DER, ignoring embedded whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not base64 or not a certificate.
    pub fn from_base64(encoded: &str) -> Result<Self, SignatureError> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let der = STANDARD
            .decode(compact)
            .map_err(|e| SignatureError::InvalidCertificate(format!("invalid base64: {e}")))?;
        Self::from_der(der)
    }

    /// Raw DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Base64 DER, as carried in `ds:X509Certificate`.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.der)
    }

    fn parsed(&self) -> Result<X509Certificate<'_>, SignatureError> {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| SignatureError::InvalidCertificate(format!("{e}")))
    }

    /// Returns the subject public key bits (PKCS#1 `RSAPublicKey` for RSA).
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed.
    pub fn public_key(&self) -> Result<Vec<u8>, SignatureError> {
        let cert = self.parsed()?;
        Ok(cert.public_key().subject_public_key.data.to_vec())
    }

    /// Subject distinguished name, for log lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed.
    pub fn subject(&self) -> Result<String, SignatureError> {
        Ok(self.parsed()?.subject().to_string())
    }

    /// Checks the validity window against a Unix timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed.
    pub fn is_valid_at(&self, unix_seconds: i64) -> Result<bool, SignatureError> {
        let cert = self.parsed()?;
        let validity = cert.validity();
        Ok(validity.not_before.timestamp() <= unix_seconds
            && unix_seconds <= validity.not_after.timestamp())
    }

    /// Colon-separated uppercase hex digest of the DER encoding.
    #[must_use]
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> String {
        hash(algorithm, &self.der)
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Compares against an expected fingerprint in any common rendering.
    ///
    /// The digest is inferred from the fingerprint length; unknown lengths
    /// never match.
    #[must_use]
    pub fn matches_fingerprint(&self, expected: &str) -> bool {
        let Some(expected) = normalize_fingerprint(expected) else {
            return false;
        };
        let Some(algorithm) = HashAlgorithm::from_hex_len(expected.len()) else {
            return false;
        };
        hex::encode(hash(algorithm, &self.der)) == expected
    }
}
