//! SAML Response wrapping.
//!
//! Places an issued assertion (plain or encrypted) inside a successful
//! `samlp:Response` addressed to the assertion consumer service.

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::assertion::AssertionRequest;
use crate::config::IdpConfig;
use crate::error::SamlResult;
use crate::signature::{SignaturePlacement, XmlSigner};
use crate::types::{consents, format_instant, status_codes, SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::xml::{ElementName, XmlDocument, XmlElement};

#[derive(Debug, Clone)]
enum ResponseContent {
    Assertion(XmlElement),
    Encrypted(XmlElement),
}

/// Builds a `samlp:Response` carrying one assertion.
#[derive(Debug, Clone)]
pub struct ResponseBuilder<'a> {
    config: &'a IdpConfig,
    request: &'a AssertionRequest,
    response_id: String,
    now: DateTime<Utc>,
    content: ResponseContent,
}

impl<'a> ResponseBuilder<'a> {
    /// Response around a (signed or unsigned) assertion document.
    #[must_use]
    pub fn new(config: &'a IdpConfig, request: &'a AssertionRequest, assertion: XmlDocument) -> Self {
        Self::with_content(config, request, ResponseContent::Assertion(assertion.root))
    }

    /// Response around encryptor output, wrapped in `saml:EncryptedAssertion`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::XmlParse`] when `encrypted_data` is not XML.
    pub fn encrypted(
        config: &'a IdpConfig,
        request: &'a AssertionRequest,
        encrypted_data: &str,
    ) -> SamlResult<Self> {
        let encrypted = XmlDocument::parse(encrypted_data)?;
        Ok(Self::with_content(config, request, ResponseContent::Encrypted(encrypted.root)))
    }

    fn with_content(config: &'a IdpConfig, request: &'a AssertionRequest, content: ResponseContent) -> Self {
        Self {
            config,
            request,
            response_id: format!("_{}", Uuid::new_v4()),
            now: Utc::now().trunc_subsecs(0),
            content,
        }
    }

    /// Overrides the generated response ID.
    #[must_use]
    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = id.into();
        self
    }

    /// Pins the issuance instant.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now.trunc_subsecs(0);
        self
    }

    /// The response `ID`.
    #[must_use]
    pub fn response_id(&self) -> &str {
        &self.response_id
    }

    /// Unsigned response document.
    #[must_use]
    pub fn raw(&self) -> XmlDocument {
        let payload = match &self.content {
            ResponseContent::Assertion(assertion) => assertion.clone(),
            ResponseContent::Encrypted(data) => XmlElement::new("saml:EncryptedAssertion").with_child(data.clone()),
        };

        let root = XmlElement::new("samlp:Response")
            .with_attr("xmlns:samlp", SAMLP_NS)
            .with_attr("xmlns:saml", SAML_NS)
            .with_attr("ID", self.response_id.as_str())
            .with_attr("Version", SAML_VERSION)
            .with_attr("IssueInstant", format_instant(&self.now))
            .with_attr("Destination", self.request.acs_url.as_str())
            .with_attr("Consent", consents::UNSPECIFIED)
            .with_attr("InResponseTo", self.request.saml_request_id.as_str())
            .with_child(XmlElement::new("saml:Issuer").with_text(self.request.issuer_uri.as_str()))
            .with_child(
                XmlElement::new("samlp:Status").with_child(
                    XmlElement::new("samlp:StatusCode").with_attr("Value", status_codes::SUCCESS),
                ),
            )
            .with_child(payload);

        XmlDocument::new(root)
    }

    /// Response signed with the configured key, the signature placed right
    /// after `saml:Issuer`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Configuration`] without signing
    /// credentials, or any signing failure.
    pub fn signed(&self) -> SamlResult<XmlDocument> {
        let signer = self.config.signer(self.request.signature_algorithm)?;
        self.signed_with(&signer)
    }

    /// Response signed with an explicit signer.
    ///
    /// # Errors
    ///
    /// Fails as [`XmlSigner::sign_document`] does.
    pub fn signed_with(&self, signer: &XmlSigner) -> SamlResult<XmlDocument> {
        let placement = SignaturePlacement::after(ElementName::new(SAML_NS, "Issuer"));
        let signed = signer.sign_document(&self.raw(), &placement)?;
        tracing::debug!(id = %self.response_id, destination = %self.request.acs_url, "signed response");
        Ok(signed)
    }
}
