//! Assertion assembly.

use chrono::{DateTime, Duration, SubsecRound, Utc};

use super::{negotiate, AssertionRequest, AttributeSpec, NameIdFormatSpec};
use crate::config::IdpConfig;
use crate::encryption::AssertionEncryptor;
use crate::error::{SamlError, SamlResult};
use crate::principal::Principal;
use crate::signature::{SignaturePlacement, XmlSigner};
use crate::types::{
    Assertion, AttributeStatement, AuthnStatement, Conditions, NameId, Subject, SubjectConfirmation,
    SubjectConfirmationData, SAML_NS, SAML_VERSION,
};
use crate::xml::{ElementName, XmlDocument};

/// Tolerance subtracted from `Conditions/@NotBefore`.
pub const CLOCK_SKEW_SECS: i64 = 5;

/// Lifetime of the bearer subject confirmation.
pub const SUBJECT_CONFIRMATION_SECS: i64 = 3 * 60;

/// Builds one assertion for one principal.
///
/// The NameID format is negotiated and the issuance instant captured when
/// the builder is created; every output method reuses both, so the raw,
/// signed and encrypted forms describe the same assertion.
pub struct AssertionBuilder<'a> {
    config: &'a IdpConfig,
    request: &'a AssertionRequest,
    principal: &'a dyn Principal,
    name_id_format: &'a NameIdFormatSpec,
    now: DateTime<Utc>,
}

impl std::fmt::Debug for AssertionBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionBuilder")
            .field("id", &self.request.assertion_id())
            .field("name_id_format", &self.name_id_format.name)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl<'a> AssertionBuilder<'a> {
    /// Creates a builder, negotiating the NameID format.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] for an empty reference ID and
    /// [`SamlError::Configuration`] when no NameID format is configured.
    pub fn new(
        config: &'a IdpConfig,
        request: &'a AssertionRequest,
        principal: &'a dyn Principal,
    ) -> SamlResult<Self> {
        request.validate()?;
        let name_id_format = negotiate(&config.name_id_formats, request.name_id_format.as_deref())?;

        Ok(Self {
            config,
            request,
            principal,
            name_id_format,
            now: Utc::now().trunc_subsecs(0),
        })
    }

    /// Pins the issuance instant (truncated to whole seconds).
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now.trunc_subsecs(0);
        self
    }

    /// The issuance instant.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// The negotiated NameID format.
    #[must_use]
    pub const fn name_id_format(&self) -> &NameIdFormatSpec {
        self.name_id_format
    }

    /// Session lifetime: the request's, else the configured default.
    #[must_use]
    pub fn session_expiry(&self) -> u32 {
        self.request.session_expiry.unwrap_or(self.config.session_expiry)
    }

    /// Typed assertion model.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingElement`] when the principal yields no
    /// value for the negotiated NameID format.
    pub fn assertion(&self) -> SamlResult<Assertion> {
        let id = self.request.assertion_id();
        let now = self.now;

        let name_id_value = self.name_id_format.value_for(self.principal).ok_or_else(|| {
            SamlError::MissingElement(format!("NameID value for format {}", self.name_id_format.name))
        })?;

        let subject = Subject::new(NameId::with_format(name_id_value, self.name_id_format.name.as_str()))
            .with_confirmation(SubjectConfirmation::bearer().with_data(SubjectConfirmationData {
                in_response_to: Some(self.request.saml_request_id.clone()),
                not_on_or_after: Some(now + Duration::seconds(SUBJECT_CONFIRMATION_SECS)),
                recipient: Some(self.request.acs_url.clone()),
            }));

        let conditions = Conditions::window(
            now - Duration::seconds(CLOCK_SKEW_SECS),
            now + Duration::seconds(i64::from(self.request.expiry)),
        )
        .with_audience(self.request.audience_uri.as_str());

        let session_expiry = self.session_expiry();
        let authn_statement = AuthnStatement {
            authn_instant: now,
            session_index: Some(id.clone()),
            session_not_on_or_after: (session_expiry != 0)
                .then(|| now + Duration::seconds(i64::from(session_expiry))),
            authn_context_class_ref: self.request.authn_context_class_ref.clone(),
        };

        Ok(Assertion {
            id,
            version: SAML_VERSION.to_string(),
            issue_instant: now,
            issuer: self.request.issuer_uri.clone(),
            subject,
            conditions,
            authn_statement,
            attribute_statement: self.attribute_statement(),
        })
    }

    fn attribute_statement(&self) -> Option<AttributeStatement> {
        let overridden = self.principal.asserted_attributes();
        let specs: &[AttributeSpec] = overridden.as_deref().unwrap_or(&self.config.attributes);
        if specs.is_empty() {
            return None;
        }

        Some(AttributeStatement {
            attributes: specs.iter().map(|spec| spec.to_attribute(self.principal)).collect(),
        })
    }

    /// Unsigned assertion document.
    ///
    /// # Errors
    ///
    /// Fails as [`Self::assertion`] does.
    pub fn raw(&self) -> SamlResult<XmlDocument> {
        let assertion = self.assertion()?;
        tracing::debug!(
            id = %assertion.id,
            audience = %self.request.audience_uri,
            format = %self.name_id_format.name,
            "issued assertion"
        );
        Ok(assertion.to_document())
    }

    /// Assertion signed with the configured key, the signature placed right
    /// after `Issuer`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] without signing credentials, or
    /// any signing failure.
    pub fn signed(&self) -> SamlResult<XmlDocument> {
        let signer = self.config.signer(self.request.signature_algorithm)?;
        self.signed_with(&signer)
    }

    /// Assertion signed with an explicit signer.
    ///
    /// # Errors
    ///
    /// Fails as [`XmlSigner::sign_document`] does.
    pub fn signed_with(&self, signer: &XmlSigner) -> SamlResult<XmlDocument> {
        let placement = SignaturePlacement::after(ElementName::new(SAML_NS, "Issuer"));
        signer.sign_document(&self.raw()?, &placement)
    }

    /// Encrypts the signed (`sign == true`) or unsigned assertion for the
    /// request's recipient, returning the encryptor's output.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] when the request carries no
    /// encryption options; encryptor failures pass through.
    pub fn encrypt(&self, sign: bool, encryptor: &dyn AssertionEncryptor) -> SamlResult<String> {
        let options = self.request.encryption.as_ref().ok_or_else(|| {
            SamlError::Configuration("encryption requested without encryption options".to_string())
        })?;

        let document = if sign { self.signed()? } else { self.raw()? };
        encryptor.encrypt(&document.to_xml()?, options)
    }
}
