//! SAML 2.0 identity provider core.
//!
//! This crate issues signed SAML 2.0 assertions and responses, and decides
//! whether an inbound signed document was produced by a trusted party:
//!
//! - **NameID negotiation** - Pick the subject identifier format and value
//! - **Attribute resolution** - Pull attribute values from an opaque principal
//! - **Assertion issuance** - Build the assertion with its validity windows
//! - **XML signature** - Enveloped XML-DSig signing and validation
//! - **Encryption hand-off** - Wrap a finished assertion via a pluggable encryptor
//!
//! # Architecture
//!
//! - [`types`] - Typed SAML model and protocol constants
//! - [`xml`] - Element tree, parsing, serialization and canonicalization
//! - [`signature`] - XML signature signing and validation
//! - [`principal`] - The capability trait integrations implement for subjects
//! - [`config`] - Immutable identity provider configuration
//! - [`assertion`] - Format negotiation, attribute resolution and the builder
//! - [`encryption`] - Encryption options and the encryptor seam
//! - [`response`] - `samlp:Response` wrapping
//! - [`error`] - Error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use idp_saml::{AssertionBuilder, AssertionRequest};
//!
//! let request = AssertionRequest::new("abc123", "https://idp.example")
//!     .with_audience("https://sp.example")
//!     .with_acs_url("https://sp.example/acs");
//! let xml = AssertionBuilder::new(&config, &request, &user)?.signed()?.to_xml()?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assertion;
pub mod config;
pub mod encryption;
pub mod error;
pub mod principal;
pub mod response;
pub mod signature;
pub mod types;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use assertion::{AssertionBuilder, AssertionRequest, AttributeSpec, NameIdFormatSpec};
pub use config::{ConfigCell, IdpConfig, IdpSettings, SigningCredentials};
pub use encryption::{AssertionEncryptor, EncryptionOptions};
pub use error::{SamlError, SamlResult};
pub use principal::{AttributeValue, Principal, SimplePrincipal, ValueExtractor};
pub use response::ResponseBuilder;
pub use signature::{SignatureAlgorithm, SignatureConfig, SignaturePlacement, XmlSignatureValidator, XmlSigner};
pub use types::*;
pub use xml::XmlDocument;
