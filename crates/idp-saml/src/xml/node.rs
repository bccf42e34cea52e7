//! Element tree.

use std::str::FromStr;

use super::namespace::NamespaceScope;
use super::{reader, writer};
use crate::error::{SamlError, SamlResult};

/// Position of an element below some ancestor, as child-node indexes.
///
/// The empty path designates the ancestor itself.
pub type NodePath = Vec<usize>;

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Child element.
    Element(XmlElement),
    /// Character data, unescaped.
    Text(String),
    /// Comment body.
    Comment(String),
}

/// Namespace-qualified element name used to locate siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementName {
    /// Namespace URI.
    pub namespace: String,
    /// Local name.
    pub local_name: String,
}

impl ElementName {
    /// Creates a qualified name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }
}

/// Where to put a node relative to an anchor sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Immediately before the anchor.
    Before,
    /// Immediately after the anchor.
    After,
}

/// An element with its qualified name kept as written (`prefix:local`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name.
    pub name: String,
    /// Attributes in document order, namespace declarations included.
    pub attributes: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.push_child(child);
        self
    }

    /// Appends a child element.
    pub fn push_child(&mut self, child: Self) {
        self.children.push(XmlNode::Element(child));
    }

    /// Replaces the value of an existing attribute or appends a new one.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Attribute value by qualified name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Prefix of the qualified name, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Local part of the qualified name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Namespace of this element given its in-scope bindings.
    #[must_use]
    pub fn namespace<'s>(&self, scope: &'s NamespaceScope) -> Option<&'s str> {
        scope.resolve(self.prefix().unwrap_or(""))
    }

    /// True when the element has the given name, resolved through `scope`
    /// (the bindings in effect at this element).
    #[must_use]
    pub fn is_named(&self, scope: &NamespaceScope, name: &ElementName) -> bool {
        self.local_name() == name.local_name && self.namespace(scope) == Some(name.namespace.as_str())
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First direct child element with the given local name.
    #[must_use]
    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|c| c.local_name() == local_name)
    }

    /// Concatenated text of the direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Element at `path` below this one.
    #[must_use]
    pub fn element_at(&self, path: &[usize]) -> Option<&XmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get(index)? {
                XmlNode::Element(element) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get_mut(index)? {
                XmlNode::Element(element) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Detaches the node at `path`. The empty path cannot be removed.
    pub fn remove_at(&mut self, path: &[usize]) -> Option<XmlNode> {
        let (last, parent_path) = path.split_last()?;
        let parent = self.element_at_mut(parent_path)?;
        (*last < parent.children.len()).then(|| parent.children.remove(*last))
    }

    /// Bindings in effect at the element at `path`, including its own
    /// declarations. `inherited` is the scope around this element.
    #[must_use]
    pub fn scope_at(&self, path: &[usize], inherited: &NamespaceScope) -> Option<NamespaceScope> {
        let mut scope = inherited.enter(self);
        let mut current = self;
        for &index in path {
            current = match current.children.get(index)? {
                XmlNode::Element(element) => element,
                _ => return None,
            };
            scope = scope.enter(current);
        }
        Some(scope)
    }

    /// Visits this element and every descendant element in document order.
    pub fn walk<F>(&self, inherited: &NamespaceScope, mut visit: F)
    where
        F: FnMut(&XmlElement, &NamespaceScope, &[usize]),
    {
        let mut path = Vec::new();
        self.walk_inner(inherited, &mut path, &mut visit);
    }

    fn walk_inner<F>(&self, inherited: &NamespaceScope, path: &mut NodePath, visit: &mut F)
    where
        F: FnMut(&XmlElement, &NamespaceScope, &[usize]),
    {
        let scope = inherited.enter(self);
        visit(self, &scope, path.as_slice());
        for (index, node) in self.children.iter().enumerate() {
            if let XmlNode::Element(child) = node {
                path.push(index);
                child.walk_inner(&scope, path, visit);
                path.pop();
            }
        }
    }

    /// Paths of all elements (self included) with the given qualified name.
    #[must_use]
    pub fn find_all(&self, inherited: &NamespaceScope, name: &ElementName) -> Vec<NodePath> {
        let mut found = Vec::new();
        self.walk(inherited, |element, scope, path| {
            if element.is_named(scope, name) {
                found.push(path.to_vec());
            }
        });
        found
    }

    /// Paths of all elements (self included) whose `attribute` equals `value`.
    #[must_use]
    pub fn find_by_attr(&self, attribute: &str, value: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        self.walk(&NamespaceScope::new(), |element, _, path| {
            if element.attr(attribute) == Some(value) {
                found.push(path.to_vec());
            }
        });
        found
    }

    /// Inserts `node` before or after the first direct child named `anchor`.
    ///
    /// `scope` is the set of bindings in effect at this element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingElement`] when no such child exists.
    pub fn insert_relative(
        &mut self,
        scope: &NamespaceScope,
        anchor: &ElementName,
        position: InsertPosition,
        node: XmlElement,
    ) -> SamlResult<()> {
        let index = self
            .children
            .iter()
            .position(|child| match child {
                XmlNode::Element(element) => element.is_named(&scope.enter(element), anchor),
                _ => false,
            })
            .ok_or_else(|| {
                SamlError::MissingElement(format!(
                    "{{{}}}{} under {}",
                    anchor.namespace, anchor.local_name, self.name
                ))
            })?;

        let at = match position {
            InsertPosition::Before => index,
            InsertPosition::After => index + 1,
        };
        self.children.insert(at, XmlNode::Element(node));
        Ok(())
    }
}

/// A parsed or built document: a single root element.
///
/// Serialization never emits an XML declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// Document element.
    pub root: XmlElement,
}

impl XmlDocument {
    /// Wraps a root element.
    #[must_use]
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// Parses a document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed input or a DOCTYPE, and
    /// [`SamlError::MissingElement`] when there is no root element.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        reader::parse(xml).map(Self::new)
    }

    /// Serializes the document without declaration or added whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlWrite`] if the writer fails.
    pub fn to_xml(&self) -> SamlResult<String> {
        writer::write(&self.root)
    }
}

impl FromStr for XmlDocument {
    type Err = SamlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
