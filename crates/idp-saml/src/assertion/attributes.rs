//! Attribute definitions and value resolution.

use crate::principal::{self, Principal, ValueExtractor};
use crate::types::{attribute_name_formats, Attribute};

/// One asserted attribute.
///
/// `Name` defaults to the friendly name and `NameFormat` to the URI
/// format. Without a getter the friendly name is queried on the principal.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Emitted as `FriendlyName`.
    pub friendly_name: String,
    /// Overrides `Name`.
    pub name: Option<String>,
    /// Overrides `NameFormat`.
    pub name_format: Option<String>,
    /// Source of the values.
    pub getter: Option<ValueExtractor>,
}

impl AttributeSpec {
    /// Attribute resolved by querying `friendly_name`.
    pub fn new(friendly_name: impl Into<String>) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            name: None,
            name_format: None,
            getter: None,
        }
    }

    /// Sets the `Name` attribute.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the `NameFormat` attribute.
    #[must_use]
    pub fn with_name_format(mut self, name_format: impl Into<String>) -> Self {
        self.name_format = Some(name_format.into());
        self
    }

    /// Sets the value source.
    #[must_use]
    pub fn with_getter(mut self, getter: ValueExtractor) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Ordered values for `principal`. Never fails; unanswered queries
    /// yield an empty list.
    #[must_use]
    pub fn resolve_values(&self, principal: &dyn Principal) -> Vec<String> {
        match &self.getter {
            Some(getter) => getter.extract(principal),
            None => principal::query(principal, &self.friendly_name),
        }
    }

    /// Typed `<Attribute>` with resolved values.
    #[must_use]
    pub fn to_attribute(&self, principal: &dyn Principal) -> Attribute {
        Attribute {
            name: self.name.clone().unwrap_or_else(|| self.friendly_name.clone()),
            name_format: Some(
                self.name_format
                    .clone()
                    .unwrap_or_else(|| attribute_name_formats::URI.to_string()),
            ),
            friendly_name: Some(self.friendly_name.clone()),
            values: self.resolve_values(principal),
        }
    }
}
