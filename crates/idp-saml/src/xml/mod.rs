//! XML document model.
//!
//! Signing needs an element tree it fully controls: exact serialization,
//! namespace scoping for canonicalization, and structural edits such as
//! removing an enveloped signature or inserting one beside a named sibling.
//! Parsing and serialization are delegated to `quick-xml`.
//!
//! - [`XmlDocument`] / [`XmlElement`] / [`XmlNode`] - the tree
//! - [`NamespaceScope`] - prefix bindings in effect at an element
//! - [`canonicalize`] - exclusive and inclusive C14N 1.0

mod c14n;
mod namespace;
mod node;
mod reader;
mod writer;

pub use c14n::canonicalize;
pub use namespace::NamespaceScope;
pub use node::{ElementName, InsertPosition, NodePath, XmlDocument, XmlElement, XmlNode};
