//! SAML error types.
//!
//! Issuance failures (configuration, signing) are fatal to the call. The
//! verification reasons (`SignatureInvalid`, `XmlParse`, `MissingElement`)
//! are folded into a `false` trust decision by the soft verifier.

use thiserror::Error;

use crate::types::status_codes;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Configuration is missing something the operation needs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid issuance request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// XML serialization error.
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// The external encryptor reported a failure.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns the SAML status code for this error.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_)
            | Self::XmlParse(_)
            | Self::SignatureInvalid(_)
            | Self::Base64Decode(_) => status_codes::REQUESTER,
            _ => status_codes::RESPONDER,
        }
    }

    /// True for errors describing an untrusted or malformed inbound document,
    /// as opposed to a local failure to issue.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::SignatureInvalid(_)
                | Self::XmlParse(_)
                | Self::MissingElement(_)
                | Self::Base64Decode(_)
        )
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<idp_crypto::SignatureError> for SamlError {
    fn from(err: idp_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}
