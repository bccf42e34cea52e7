//! Namespace prefix bindings.

use std::collections::BTreeMap;

use super::node::XmlElement;
use crate::types::XML_NS;

/// Prefix bindings in effect at some point of the tree.
///
/// The default namespace is stored under the empty prefix. An empty URI
/// records an `xmlns=""` undeclaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceScope {
    bindings: BTreeMap<String, String>,
}

impl NamespaceScope {
    /// Empty scope, as seen by a document root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope inside `element`: these bindings plus its own declarations.
    #[must_use]
    pub fn enter(&self, element: &XmlElement) -> Self {
        let mut scope = self.clone();
        for (name, value) in &element.attributes {
            if let Some(prefix) = declared_prefix(name) {
                scope.bind(prefix, value);
            }
        }
        scope
    }

    /// Adds or replaces a binding.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Namespace URI for `prefix` (`""` for the default namespace).
    ///
    /// `xml` is always bound. An undeclared default namespace resolves to `None`.
    #[must_use]
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.bindings
            .get(prefix)
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }

    /// The binding exactly as declared, including `xmlns=""`.
    pub(crate) fn declared(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// All bindings ordered by prefix, default namespace first.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

/// Prefix declared by a namespace attribute: `xmlns` gives `""`,
/// `xmlns:ds` gives `"ds"`, anything else `None`.
#[must_use]
pub(crate) fn declared_prefix(attribute_name: &str) -> Option<&str> {
    if attribute_name == "xmlns" {
        Some("")
    } else {
        attribute_name.strip_prefix("xmlns:")
    }
}
