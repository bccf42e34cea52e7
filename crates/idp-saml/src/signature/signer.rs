//! XML Signature creation.
//!
//! Produces an enveloped `ds:Signature` over the document root, which is
//! referenced through its `ID` attribute. The reference is resolved on the
//! element tree itself, so the document needs no DTD to declare `ID` as an
//! identifier attribute.

use base64::{engine::general_purpose::STANDARD, Engine};
use idp_crypto::{pem_to_der, Certificate};

use crate::error::{SamlError, SamlResult};
use crate::types::{transforms, XMLDSIG_NS};
use crate::xml::{canonicalize, ElementName, InsertPosition, NamespaceScope, XmlDocument, XmlElement};

use super::SignatureConfig;

/// Where the signature goes among the root's children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignaturePlacement {
    /// Last child of the root.
    #[default]
    Append,
    /// Beside the first direct child with the given name.
    Relative {
        /// Sibling to position against.
        anchor: ElementName,
        /// Before or after the sibling.
        position: InsertPosition,
    },
}

impl SignaturePlacement {
    /// Immediately after the named child.
    #[must_use]
    pub fn after(anchor: ElementName) -> Self {
        Self::Relative {
            anchor,
            position: InsertPosition::After,
        }
    }

    /// Immediately before the named child.
    #[must_use]
    pub fn before(anchor: ElementName) -> Self {
        Self::Relative {
            anchor,
            position: InsertPosition::Before,
        }
    }
}

/// XML document signer.
///
/// Signs SAML documents using the configured private key.
#[derive(Clone)]
pub struct XmlSigner {
    /// The private key in DER format.
    private_key_der: Vec<u8>,
    /// The X.509 certificate published in `KeyInfo`.
    certificate: Option<Certificate>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl std::fmt::Debug for XmlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlSigner")
            .field("certificate", &self.certificate.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl XmlSigner {
    /// Creates a new signer with an RSA private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_der` - The private key in DER format (PKCS#1 or PKCS#8)
    /// * `certificate` - Certificate to publish in the signature's `KeyInfo`
    #[must_use]
    pub fn new(private_key_der: Vec<u8>, certificate: Option<Certificate>) -> Self {
        Self {
            private_key_der,
            certificate,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a new signer from PEM-encoded key and certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the key PEM has no private key block or the
    /// certificate PEM does not parse.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let private_key_der = pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Crypto("Invalid private key PEM".to_string()))?;

        let certificate = certificate_pem.map(Certificate::from_pem).transpose()?;

        Ok(Self::new(private_key_der, certificate))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Active signature configuration.
    #[must_use]
    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// Certificate published with each signature.
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Signs the document root.
    ///
    /// The returned document equals the input except for the one inserted
    /// `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] when the root has no `ID`, the
    /// algorithm is refused or the key is unusable, and
    /// [`SamlError::MissingElement`] when the placement anchor is absent.
    pub fn sign_document(
        &self,
        document: &XmlDocument,
        placement: &SignaturePlacement,
    ) -> SamlResult<XmlDocument> {
        let root = &document.root;
        let reference_id = root
            .attr("ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                SamlError::SignatureCreation(format!("<{}> has no ID attribute", root.name))
            })?;

        let algorithm = self.config.algorithm;
        let (Some(rsa), Some(digest_alg)) = (algorithm.rsa(), algorithm.digest()) else {
            return Err(SamlError::SignatureCreation(format!(
                "Unsupported signature algorithm: {algorithm:?}"
            )));
        };

        // The unsigned root is exactly what the enveloped transform yields.
        let canonical_root = canonicalize(root, &NamespaceScope::new(), self.config.canonicalization)?;
        let digest = idp_crypto::hash(digest_alg, canonical_root.as_bytes());

        let signed_info = build_signed_info(reference_id, &STANDARD.encode(digest), &self.config);

        let mut signature = XmlElement::new("ds:Signature").with_attr("xmlns:ds", XMLDSIG_NS);
        let signature_scope = NamespaceScope::new().enter(root).enter(&signature);
        let canonical_signed_info =
            canonicalize(&signed_info, &signature_scope, self.config.canonicalization)?;

        let signature_value = idp_crypto::rsa_sign(&self.private_key_der, canonical_signed_info.as_bytes(), rsa)
            .map_err(|e| SamlError::SignatureCreation(format!("RSA signing failed: {e}")))?;

        signature.push_child(signed_info);
        signature.push_child(
            XmlElement::new("ds:SignatureValue").with_text(STANDARD.encode(signature_value)),
        );
        if let (true, Some(certificate)) = (self.config.include_certificate, &self.certificate) {
            signature.push_child(key_info(certificate));
        }

        let mut signed = document.clone();
        match placement {
            SignaturePlacement::Append => signed.root.push_child(signature),
            SignaturePlacement::Relative { anchor, position } => {
                let scope = NamespaceScope::new().enter(&signed.root);
                signed.root.insert_relative(&scope, anchor, *position, signature)?;
            }
        }

        tracing::debug!(
            "signed <{}> ID={} with {}",
            signed.root.name,
            reference_id,
            algorithm.uri()
        );
        Ok(signed)
    }

    /// Parses, signs and serializes `xml`.
    ///
    /// # Errors
    ///
    /// Fails as [`Self::sign_document`] does, or when `xml` does not parse.
    pub fn sign(&self, xml: &str, placement: &SignaturePlacement) -> SamlResult<String> {
        let document = XmlDocument::parse(xml)?;
        self.sign_document(&document, placement)?.to_xml()
    }
}

fn build_signed_info(reference_id: &str, digest_b64: &str, config: &SignatureConfig) -> XmlElement {
    let transforms = XmlElement::new("ds:Transforms")
        .with_child(
            XmlElement::new("ds:Transform").with_attr("Algorithm", transforms::ENVELOPED_SIGNATURE),
        )
        .with_child(XmlElement::new("ds:Transform").with_attr("Algorithm", config.canonicalization.uri()));

    let reference = XmlElement::new("ds:Reference")
        .with_attr("URI", format!("#{reference_id}"))
        .with_child(transforms)
        .with_child(XmlElement::new("ds:DigestMethod").with_attr("Algorithm", config.algorithm.digest_uri()))
        .with_child(XmlElement::new("ds:DigestValue").with_text(digest_b64));

    XmlElement::new("ds:SignedInfo")
        .with_child(
            XmlElement::new("ds:CanonicalizationMethod")
                .with_attr("Algorithm", config.canonicalization.uri()),
        )
        .with_child(XmlElement::new("ds:SignatureMethod").with_attr("Algorithm", config.algorithm.uri()))
        .with_child(reference)
}

fn key_info(certificate: &Certificate) -> XmlElement {
    XmlElement::new("ds:KeyInfo").with_child(
        XmlElement::new("ds:X509Data")
            .with_child(XmlElement::new("ds:X509Certificate").with_text(certificate.to_base64())),
    )
}
