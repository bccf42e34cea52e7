//! Per-call issuance inputs.

use crate::encryption::EncryptionOptions;
use crate::error::{SamlError, SamlResult};
use crate::signature::SignatureAlgorithm;
use crate::types::AuthnContextClass;

/// Assertion lifetime used when the caller does not choose one.
pub const DEFAULT_EXPIRY_SECS: u32 = 60 * 60;

/// Everything one issuance needs besides the principal and configuration.
#[derive(Debug, Clone)]
pub struct AssertionRequest {
    /// Derives the assertion `ID` (`"_" + reference_id`).
    pub reference_id: String,
    /// Issuer entity ID.
    pub issuer_uri: String,
    /// Relying party entity ID.
    pub audience_uri: String,
    /// ID of the request being answered.
    pub saml_request_id: String,
    /// Assertion consumer service URL.
    pub acs_url: String,
    /// Overrides the configured signature algorithm.
    pub signature_algorithm: Option<SignatureAlgorithm>,
    /// `AuthnContextClassRef` value.
    pub authn_context_class_ref: String,
    /// NameID format asked for by the relying party.
    pub name_id_format: Option<String>,
    /// Assertion lifetime in seconds.
    pub expiry: u32,
    /// Session lifetime in seconds; `Some(0)` disables `SessionNotOnOrAfter`
    /// and `None` defers to the configuration.
    pub session_expiry: Option<u32>,
    /// Recipient encryption settings.
    pub encryption: Option<EncryptionOptions>,
}

impl AssertionRequest {
    /// Creates a request with default lifetime and password-over-TLS context.
    pub fn new(reference_id: impl Into<String>, issuer_uri: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            issuer_uri: issuer_uri.into(),
            audience_uri: String::new(),
            saml_request_id: String::new(),
            acs_url: String::new(),
            signature_algorithm: None,
            authn_context_class_ref: AuthnContextClass::PasswordProtectedTransport.uri().to_string(),
            name_id_format: None,
            expiry: DEFAULT_EXPIRY_SECS,
            session_expiry: None,
            encryption: None,
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience_uri: impl Into<String>) -> Self {
        self.audience_uri = audience_uri.into();
        self
    }

    /// Sets the answered request ID.
    #[must_use]
    pub fn in_response_to(mut self, saml_request_id: impl Into<String>) -> Self {
        self.saml_request_id = saml_request_id.into();
        self
    }

    /// Sets the ACS URL.
    #[must_use]
    pub fn with_acs_url(mut self, acs_url: impl Into<String>) -> Self {
        self.acs_url = acs_url.into();
        self
    }

    /// Overrides the signature algorithm.
    #[must_use]
    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = Some(algorithm);
        self
    }

    /// Sets the authentication context class.
    #[must_use]
    pub fn with_authn_context(mut self, class_ref: impl Into<String>) -> Self {
        self.authn_context_class_ref = class_ref.into();
        self
    }

    /// Requests a NameID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = Some(format.into());
        self
    }

    /// Sets the assertion lifetime.
    #[must_use]
    pub const fn with_expiry(mut self, secs: u32) -> Self {
        self.expiry = secs;
        self
    }

    /// Sets the session lifetime.
    #[must_use]
    pub const fn with_session_expiry(mut self, secs: u32) -> Self {
        self.session_expiry = Some(secs);
        self
    }

    /// Enables encryption for the recipient.
    #[must_use]
    pub fn with_encryption(mut self, options: EncryptionOptions) -> Self {
        self.encryption = Some(options);
        self
    }

    /// The assertion `ID`.
    #[must_use]
    pub fn assertion_id(&self) -> String {
        format!("_{}", self.reference_id)
    }

    /// Checks the request can produce a well-formed assertion.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] for an empty reference ID.
    pub fn validate(&self) -> SamlResult<()> {
        if self.reference_id.is_empty() {
            return Err(SamlError::InvalidRequest("reference ID is empty".to_string()));
        }
        Ok(())
    }
}
