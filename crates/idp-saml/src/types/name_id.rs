//! SAML Name ID types.
//!
//! Name identifiers are used to identify subjects in SAML assertions.

use serde::{Deserialize, Serialize};

use crate::xml::XmlElement;

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format URI of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
        }
    }

    /// Creates a name ID with an explicit format URI.
    #[must_use]
    pub fn with_format(value: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: Some(format.into()),
        }
    }

    /// `<NameID>` in the default (assertion) namespace.
    #[must_use]
    pub fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("NameID");
        if let Some(format) = &self.format {
            element.set_attr("Format", format.as_str());
        }
        element.with_text(self.value.as_str())
    }
}
