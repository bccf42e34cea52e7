//! XML Canonicalization 1.0, exclusive and inclusive.
//!
//! Operates on a whole subtree. Callers that need a transform applied first
//! (the enveloped-signature transform) edit a copy of the tree beforehand.

use std::collections::BTreeMap;

use super::namespace::{declared_prefix, NamespaceScope};
use super::node::{XmlElement, XmlNode};
use crate::error::{SamlError, SamlResult};
use crate::signature::CanonicalizationAlgorithm;

/// Canonicalizes `element` and its subtree.
///
/// `inherited` holds the bindings in effect around `element` (its parent's
/// scope). The inclusive algorithms render them on the apex; the exclusive
/// ones only render what is visibly used.
///
/// # Errors
///
/// Returns [`SamlError::XmlParse`] for a prefix with no binding.
pub fn canonicalize(
    element: &XmlElement,
    inherited: &NamespaceScope,
    algorithm: CanonicalizationAlgorithm,
) -> SamlResult<String> {
    let canonicalizer = Canonicalizer {
        exclusive: algorithm.is_exclusive(),
        with_comments: algorithm.with_comments(),
    };
    let mut out = String::new();
    canonicalizer.write_element(element, inherited, &NamespaceScope::new(), &mut out)?;
    Ok(out)
}

struct Canonicalizer {
    exclusive: bool,
    with_comments: bool,
}

impl Canonicalizer {
    fn write_element(
        &self,
        element: &XmlElement,
        inherited: &NamespaceScope,
        rendered: &NamespaceScope,
        out: &mut String,
    ) -> SamlResult<()> {
        let scope = inherited.enter(element);
        let mut rendered = rendered.clone();

        out.push('<');
        out.push_str(&element.name);

        for (prefix, uri) in self.namespaces_to_consider(element, &scope)? {
            if rendered.declared(&prefix).unwrap_or("") == uri {
                continue;
            }
            if prefix.is_empty() {
                out.push_str(" xmlns=\"");
            } else {
                out.push_str(" xmlns:");
                out.push_str(&prefix);
                out.push_str("=\"");
            }
            escape_attribute(&uri, out);
            out.push('"');
            rendered.bind(&prefix, &uri);
        }

        let mut attributes = Vec::new();
        for (name, value) in &element.attributes {
            if declared_prefix(name).is_some() {
                continue;
            }
            let (namespace, local) = match name.split_once(':') {
                Some((prefix, local)) => (resolve(&scope, prefix)?, local),
                None => ("", name.as_str()),
            };
            attributes.push((namespace, local, name.as_str(), value.as_str()));
        }
        attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        for (_, _, name, value) in attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_attribute(value, out);
            out.push('"');
        }
        out.push('>');

        for child in &element.children {
            match child {
                XmlNode::Element(child) => self.write_element(child, &scope, &rendered, out)?,
                XmlNode::Text(text) => escape_text(text, out),
                XmlNode::Comment(comment) if self.with_comments => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
                XmlNode::Comment(_) => {}
            }
        }

        out.push_str("</");
        out.push_str(&element.name);
        out.push('>');
        Ok(())
    }

    /// Candidate namespace nodes, ordered by prefix with the default first.
    fn namespaces_to_consider(
        &self,
        element: &XmlElement,
        scope: &NamespaceScope,
    ) -> SamlResult<BTreeMap<String, String>> {
        let mut namespaces = BTreeMap::new();

        if !self.exclusive {
            for (prefix, uri) in scope.bindings() {
                namespaces.insert(prefix.to_string(), uri.to_string());
            }
            return Ok(namespaces);
        }

        // Visibly utilized: the element's own prefix and those of its attributes.
        let element_prefix = element.prefix().unwrap_or("");
        let uri = if element_prefix.is_empty() {
            scope.declared("").unwrap_or("")
        } else {
            resolve(scope, element_prefix)?
        };
        namespaces.insert(element_prefix.to_string(), uri.to_string());

        for (name, _) in &element.attributes {
            if declared_prefix(name).is_some() {
                continue;
            }
            if let Some((prefix, _)) = name.split_once(':') {
                if prefix != "xml" {
                    namespaces.insert(prefix.to_string(), resolve(scope, prefix)?.to_string());
                }
            }
        }
        Ok(namespaces)
    }
}

fn resolve<'s>(scope: &'s NamespaceScope, prefix: &str) -> SamlResult<&'s str> {
    scope
        .resolve(prefix)
        .ok_or_else(|| SamlError::XmlParse(format!("unbound namespace prefix '{prefix}'")))
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}
