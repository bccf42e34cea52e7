//! The subject of an assertion, as seen by the issuer.
//!
//! Integrations expose their user objects through [`Principal`]: a named
//! attribute query plus an optional override of the asserted attribute
//! list. A query the principal cannot answer yields no values.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::assertion::AttributeSpec;

/// One or many values returned for an attribute query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// A scalar value.
    Single(String),
    /// An ordered list of values.
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// Flattens into an ordered list.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        match self {
            Self::Single(value) => vec![value],
            Self::Multiple(values) => values,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// A subject the identity provider can issue assertions for.
pub trait Principal {
    /// Answers a named attribute query. Names arrive in snake_case.
    fn attribute(&self, name: &str) -> Option<AttributeValue>;

    /// Attribute definitions that replace the configured defaults.
    fn asserted_attributes(&self) -> Option<Vec<AttributeSpec>> {
        None
    }
}

/// Callback form of a [`ValueExtractor`].
pub type ExtractorFn = dyn Fn(&dyn Principal) -> Option<AttributeValue> + Send + Sync;

/// How a value is pulled out of a principal.
#[derive(Clone)]
pub enum ValueExtractor {
    /// Invoked with the principal.
    Callback(Arc<ExtractorFn>),
    /// Symbolic attribute name, converted to snake_case and queried.
    Query(String),
}

impl ValueExtractor {
    /// Wraps a closure.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&dyn Principal) -> Option<AttributeValue> + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Symbolic query.
    pub fn query(name: impl Into<String>) -> Self {
        Self::Query(name.into())
    }

    /// Ordered values for `principal`; empty when nothing answers.
    #[must_use]
    pub fn extract(&self, principal: &dyn Principal) -> Vec<String> {
        match self {
            Self::Callback(f) => f(principal).map(AttributeValue::into_values).unwrap_or_default(),
            Self::Query(name) => query(principal, name),
        }
    }
}

impl fmt::Debug for ValueExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Query(name) => f.debug_tuple("Query").field(name).finish(),
        }
    }
}

pub(crate) fn query(principal: &dyn Principal, name: &str) -> Vec<String> {
    if name.is_empty() {
        return Vec::new();
    }
    principal
        .attribute(&to_snake_case(name))
        .map(AttributeValue::into_values)
        .unwrap_or_default()
}

/// `emailAddress` -> `email_address`, `HTTPCode` -> `http_code`,
/// `first-name` -> `first_name`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
            Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
            _ => false,
        };
        if boundary && !out.ends_with('_') {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Map-backed principal for hosts without a richer user type.
#[derive(Debug, Clone, Default)]
pub struct SimplePrincipal {
    attributes: HashMap<String, AttributeValue>,
    asserted: Option<Vec<AttributeSpec>>,
}

impl SimplePrincipal {
    /// Creates a principal with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, keyed by its snake_case name.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(to_snake_case(name), value.into());
        self
    }

    /// Overrides the configured attribute list for this principal.
    #[must_use]
    pub fn with_asserted_attributes(mut self, specs: Vec<AttributeSpec>) -> Self {
        self.asserted = Some(specs);
        self
    }
}

impl Principal for SimplePrincipal {
    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes.get(name).cloned()
    }

    fn asserted_attributes(&self) -> Option<Vec<AttributeSpec>> {
        self.asserted.clone()
    }
}
