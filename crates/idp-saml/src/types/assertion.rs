//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer. The
//! structs mirror the schema; [`Assertion::to_element`] renders them in
//! schema order with every element in the default (assertion) namespace.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{attribute_name_formats, confirmation_methods, NameId, SAML_NS};
use crate::xml::{XmlDocument, XmlElement};

/// Renders an instant as SAML expects: UTC, whole seconds, `Z` suffix.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    pub subject: Subject,

    /// Conditions that must be evaluated for the assertion to be valid.
    pub conditions: Conditions,

    /// Authentication statement describing how the subject authenticated.
    pub authn_statement: AuthnStatement,

    /// Attribute statement containing attributes about the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_statement: Option<AttributeStatement>,
}

impl Assertion {
    /// `<Assertion>` and its statements, in schema order.
    #[must_use]
    pub fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("Assertion")
            .with_attr("xmlns", SAML_NS)
            .with_attr("ID", self.id.as_str())
            .with_attr("IssueInstant", format_instant(&self.issue_instant))
            .with_attr("Version", self.version.as_str())
            .with_child(XmlElement::new("Issuer").with_text(self.issuer.as_str()))
            .with_child(self.subject.to_element())
            .with_child(self.conditions.to_element())
            .with_child(self.authn_statement.to_element());

        if let Some(statement) = &self.attribute_statement {
            element.push_child(statement.to_element());
        }
        element
    }

    /// The assertion as a standalone document.
    #[must_use]
    pub fn to_document(&self) -> XmlDocument {
        XmlDocument::new(self.to_element())
    }
}

/// Subject of an assertion.
///
/// Identifies the principal that is the subject of all statements in the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier for the subject.
    pub name_id: NameId,

    /// Subject confirmation data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// Creates a new subject with a name ID.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id,
            subject_confirmations: Vec::new(),
        }
    }

    /// Adds a subject confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.subject_confirmations.push(confirmation);
        self
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("Subject").with_child(self.name_id.to_element());
        for confirmation in &self.subject_confirmations {
            element.push_child(confirmation.to_element());
        }
        element
    }
}

/// Subject confirmation.
///
/// Information that allows the assertion consumer to confirm the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method.
    pub method: String,

    /// Additional confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// Creates a bearer confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: confirmation_methods::BEARER.to_string(),
            subject_confirmation_data: None,
        }
    }

    /// Sets the confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.subject_confirmation_data = Some(data);
        self
    }

    fn to_element(&self) -> XmlElement {
        let mut element =
            XmlElement::new("SubjectConfirmation").with_attr("Method", self.method.as_str());
        if let Some(data) = &self.subject_confirmation_data {
            element.push_child(data.to_element());
        }
        element
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// The request ID that this assertion responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// Time after which the subject can no longer be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// The location to which the assertion can be presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl SubjectConfirmationData {
    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("SubjectConfirmationData");
        if let Some(in_response_to) = &self.in_response_to {
            element.set_attr("InResponseTo", in_response_to.as_str());
        }
        if let Some(not_on_or_after) = &self.not_on_or_after {
            element.set_attr("NotOnOrAfter", format_instant(not_on_or_after));
        }
        if let Some(recipient) = &self.recipient {
            element.set_attr("Recipient", recipient.as_str());
        }
        element
    }
}

/// Conditions for assertion validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Time at or after which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audience restrictions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience_restrictions: Vec<AudienceRestriction>,
}

impl Conditions {
    /// Creates conditions for the window `[not_before, not_on_or_after)`.
    #[must_use]
    pub fn window(not_before: DateTime<Utc>, not_on_or_after: DateTime<Utc>) -> Self {
        Self {
            not_before: Some(not_before),
            not_on_or_after: Some(not_on_or_after),
            audience_restrictions: Vec::new(),
        }
    }

    /// Adds an audience restriction.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience_restrictions.push(AudienceRestriction {
            audiences: vec![audience.into()],
        });
        self
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("Conditions");
        if let Some(not_before) = &self.not_before {
            element.set_attr("NotBefore", format_instant(not_before));
        }
        if let Some(not_on_or_after) = &self.not_on_or_after {
            element.set_attr("NotOnOrAfter", format_instant(not_on_or_after));
        }
        for restriction in &self.audience_restrictions {
            let mut restriction_element = XmlElement::new("AudienceRestriction");
            for audience in &restriction.audiences {
                restriction_element.push_child(XmlElement::new("Audience").with_text(audience.as_str()));
            }
            element.push_child(restriction_element);
        }
        element
    }
}

/// Audience restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// List of valid audiences.
    pub audiences: Vec<String>,
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// Time of authentication.
    pub authn_instant: DateTime<Utc>,

    /// Session index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// Session expiry; absent when sessions do not expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_not_on_or_after: Option<DateTime<Utc>>,

    /// Authentication context class reference URI.
    pub authn_context_class_ref: String,
}

impl AuthnStatement {
    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("AuthnStatement")
            .with_attr("AuthnInstant", format_instant(&self.authn_instant));
        if let Some(session_index) = &self.session_index {
            element.set_attr("SessionIndex", session_index.as_str());
        }
        if let Some(expiry) = &self.session_not_on_or_after {
            element.set_attr("SessionNotOnOrAfter", format_instant(expiry));
        }
        element.with_child(
            XmlElement::new("AuthnContext").with_child(
                XmlElement::new("AuthnContextClassRef")
                    .with_text(self.authn_context_class_ref.as_str()),
            ),
        )
    }
}

/// Attribute statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStatement {
    /// List of attributes.
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("AttributeStatement");
        for attribute in &self.attributes {
            element.push_child(attribute.to_element());
        }
        element
    }
}

/// SAML attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,

    /// Attribute name format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_format: Option<String>,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// Attribute values, possibly none.
    #[serde(default)]
    pub values: Vec<String>,
}

impl Attribute {
    /// Creates an attribute with the URI name format.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            name_format: Some(attribute_name_formats::URI.to_string()),
            friendly_name: None,
            values,
        }
    }

    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("Attribute").with_attr("Name", self.name.as_str());
        if let Some(format) = &self.name_format {
            element.set_attr("NameFormat", format.as_str());
        }
        if let Some(friendly_name) = &self.friendly_name {
            element.set_attr("FriendlyName", friendly_name.as_str());
        }
        for value in &self.values {
            element.push_child(XmlElement::new("AttributeValue").with_text(value.as_str()));
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NameIdFormat, SAML_VERSION};
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn assertion() -> Assertion {
        let now = instant();
        Assertion {
            id: "_abc123".to_string(),
            version: SAML_VERSION.to_string(),
            issue_instant: now,
            issuer: "https://idp.example".to_string(),
            subject: Subject::new(NameId::with_format("alice@example.com", NameIdFormat::Email.uri())),
            conditions: Conditions::window(now, now + chrono::Duration::hours(1))
                .with_audience("https://sp.example"),
            authn_statement: AuthnStatement {
                authn_instant: now,
                session_index: Some("_abc123".to_string()),
                session_not_on_or_after: None,
                authn_context_class_ref: "urn:oasis:names:tc:SAML:2.0:ac:classes:Password"
                    .to_string(),
            },
            attribute_statement: None,
        }
    }

    #[test]
    fn instants_use_second_precision() {
        assert_eq!(format_instant(&instant()), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn children_follow_schema_order() {
        let mut assertion = assertion();
        assertion.attribute_statement = Some(AttributeStatement {
            attributes: vec![Attribute::new("email", vec!["a@example.com".to_string()])],
        });

        let element = assertion.to_element();
        let order: Vec<_> = element.child_elements().map(XmlElement::local_name).collect();
        assert_eq!(
            order,
            ["Issuer", "Subject", "Conditions", "AuthnStatement", "AttributeStatement"]
        );
        assert_eq!(element.attr("xmlns"), Some(SAML_NS));
        assert_eq!(element.attr("Version"), Some("2.0"));
    }

    #[test]
    fn session_expiry_is_optional() {
        let element = assertion().to_element();
        let statement = element.child("AuthnStatement").unwrap();
        assert_eq!(statement.attr("SessionIndex"), Some("_abc123"));
        assert_eq!(statement.attr("SessionNotOnOrAfter"), None);
    }

    #[test]
    fn attribute_without_values_is_still_rendered() {
        let element = Attribute::new("groups", Vec::new()).to_element();
        assert_eq!(element.attr("Name"), Some("groups"));
        assert_eq!(element.attr("NameFormat"), Some(attribute_name_formats::URI));
        assert_eq!(element.child_elements().count(), 0);
    }

    #[test]
    fn renders_assertion_document() {
        let assertion = assertion();
        let document = assertion.to_document().to_xml().unwrap();
        assert!(document.starts_with(r#"<Assertion xmlns="urn:oasis:names:tc:SAML:2.0:assertion" ID="_abc123""#));
        assert!(document.contains("<Audience>https://sp.example</Audience>"));
    }
}
