//! XML Signature validation.
//!
//! Trust is anchored on the fingerprint of the certificate embedded in the
//! signature. [`XmlSignatureValidator::validate`] reports why a document is
//! rejected; [`XmlSignatureValidator::has_valid_signature`] folds every
//! failure into `false`.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use idp_crypto::{Certificate, HashAlgorithm, RsaAlgorithm};

use crate::error::{SamlError, SamlResult};
use crate::types::{transforms, XMLDSIG_NS};
use crate::xml::{canonicalize, ElementName, NamespaceScope, NodePath, XmlDocument, XmlElement};

use super::{digest_from_uri, CanonicalizationAlgorithm, SignatureAlgorithm, XmlSignature};

/// Where the first `ds:Signature` sits and what it says.
struct LocatedSignature<'a> {
    path: NodePath,
    scope: NamespaceScope,
    signed_info: &'a XmlElement,
    signature: XmlSignature,
    reference: ReferenceSpec,
}

struct ReferenceSpec {
    enveloped: bool,
    canonicalization: CanonicalizationAlgorithm,
    digest: HashAlgorithm,
}

/// XML signature validator.
#[derive(Debug, Clone)]
pub struct XmlSignatureValidator {
    /// Attributes that act as element identifiers for `#id` references.
    id_attributes: Vec<String>,
    /// Whether the certificate's validity window is enforced.
    check_validity_period: bool,
}

impl Default for XmlSignatureValidator {
    fn default() -> Self {
        Self {
            id_attributes: vec!["ID".to_string(), "Id".to_string()],
            check_validity_period: true,
        }
    }
}

impl XmlSignatureValidator {
    /// Creates a validator that resolves references through `ID` and `Id`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the certificate validity window check.
    #[must_use]
    pub const fn check_validity_period(mut self, check: bool) -> Self {
        self.check_validity_period = check;
        self
    }

    /// Soft validation: `true` only when the document carries a signature
    /// that covers the document root and verifies under a certificate
    /// matching `fingerprint`.
    ///
    /// The document is serialized and parsed again first, so the check runs
    /// against exactly what would be sent. A valid signature over some inner
    /// element says nothing about the rest of the document and is refused.
    #[must_use]
    pub fn has_valid_signature(&self, document: &XmlDocument, fingerprint: &str) -> bool {
        if !document.is_signed() {
            return false;
        }

        let outcome = document
            .to_xml()
            .and_then(|xml| XmlDocument::parse(&xml))
            .and_then(|reparsed| self.verify(&reparsed, fingerprint));

        match outcome {
            Ok((signature, target)) if target.is_empty() => {
                tracing::debug!("signature accepted for reference {}", signature.reference_uri);
                true
            }
            Ok((signature, _)) => {
                tracing::debug!(
                    "signature rejected: reference {} does not cover the document root",
                    signature.reference_uri
                );
                false
            }
            Err(e) => {
                tracing::debug!("signature rejected: {}", e);
                false
            }
        }
    }

    /// [`Self::has_valid_signature`] over serialized XML; unparsable input is
    /// simply untrusted.
    #[must_use]
    pub fn verify_xml(&self, xml: &str, fingerprint: &str) -> bool {
        match XmlDocument::parse(xml) {
            Ok(document) => self.has_valid_signature(&document, fingerprint),
            Err(e) => {
                tracing::debug!("signature rejected: {}", e);
                false
            }
        }
    }

    /// Validates the first signature in the document.
    ///
    /// The reference may point at any element; callers trusting only a
    /// subtree must check [`XmlSignature::reference_uri`] themselves.
    ///
    /// # Errors
    ///
    /// Returns the first reason the signature cannot be trusted.
    pub fn validate(&self, document: &XmlDocument, fingerprint: &str) -> SamlResult<XmlSignature> {
        self.verify(document, fingerprint).map(|(signature, _)| signature)
    }

    /// Verifies the first signature and returns it with the path of the
    /// element its reference resolved to.
    fn verify(&self, document: &XmlDocument, fingerprint: &str) -> SamlResult<(XmlSignature, NodePath)> {
        let root = &document.root;

        // Extract the signature element
        let located = locate_signature(root)?;

        // Check if the algorithm is allowed
        let rsa = self.check_algorithm(located.signature.algorithm)?;

        // Find the certificate to use for validation
        let certificate = self.find_certificate(&located.signature, fingerprint)?;

        // Verify the digest
        let target = self.verify_digest(root, &located)?;

        // Verify the signature
        verify_signature(&located, &certificate, rsa)?;

        Ok((located.signature, target))
    }

    fn check_algorithm(&self, algorithm: SignatureAlgorithm) -> SamlResult<RsaAlgorithm> {
        if algorithm.is_deprecated() {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }
        algorithm.rsa().ok_or_else(|| {
            SamlError::SignatureInvalid(format!("unsupported signature algorithm {algorithm:?}"))
        })
    }

    fn find_certificate(&self, signature: &XmlSignature, fingerprint: &str) -> SamlResult<Certificate> {
        let encoded = signature
            .x509_certificate
            .as_deref()
            .ok_or_else(|| SamlError::MissingElement("ds:X509Certificate".to_string()))?;

        let certificate = Certificate::from_base64(encoded)
            .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;

        if !certificate.matches_fingerprint(fingerprint) {
            return Err(SamlError::SignatureInvalid(
                "certificate fingerprint does not match".to_string(),
            ));
        }

        if self.check_validity_period && !certificate.is_valid_at(Utc::now().timestamp())? {
            return Err(SamlError::SignatureInvalid(
                "certificate is outside its validity period".to_string(),
            ));
        }

        Ok(certificate)
    }

    fn resolve_reference(&self, root: &XmlElement, uri: &str) -> SamlResult<NodePath> {
        if uri.is_empty() {
            return Ok(NodePath::new());
        }
        let id = uri
            .strip_prefix('#')
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::SignatureInvalid(format!("unsupported reference URI {uri}")))?;

        let mut matches: Vec<NodePath> = self
            .id_attributes
            .iter()
            .flat_map(|attribute| root.find_by_attr(attribute, id))
            .collect();
        matches.sort();
        matches.dedup();

        match matches.len() {
            0 => Err(SamlError::MissingElement(format!("element with ID {id}"))),
            1 => Ok(matches.remove(0)),
            _ => Err(SamlError::SignatureInvalid(format!("ID {id} is not unique"))),
        }
    }

    fn verify_digest(&self, root: &XmlElement, located: &LocatedSignature<'_>) -> SamlResult<NodePath> {
        let target_path = self.resolve_reference(root, &located.signature.reference_uri)?;
        let mut target = root
            .element_at(&target_path)
            .cloned()
            .ok_or_else(|| SamlError::MissingElement("referenced element".to_string()))?;

        if located.reference.enveloped {
            if let Some(relative) = located.path.strip_prefix(target_path.as_slice()) {
                target.remove_at(relative);
            }
        }

        let inherited = match target_path.split_last() {
            Some((_, parent)) => root
                .scope_at(parent, &NamespaceScope::new())
                .ok_or_else(|| SamlError::MissingElement("referenced element".to_string()))?,
            None => NamespaceScope::new(),
        };

        let canonical = canonicalize(&target, &inherited, located.reference.canonicalization)?;
        let computed = idp_crypto::hash(located.reference.digest, canonical.as_bytes());
        let expected = STANDARD.decode(strip_whitespace(&located.signature.digest_value))?;

        if computed != expected {
            return Err(SamlError::SignatureInvalid("digest mismatch".to_string()));
        }
        Ok(target_path)
    }
}

fn verify_signature(
    located: &LocatedSignature<'_>,
    certificate: &Certificate,
    algorithm: RsaAlgorithm,
) -> SamlResult<()> {
    let canonical_signed_info = canonicalize(
        located.signed_info,
        &located.scope,
        located.signature.canonicalization,
    )?;
    let signature_value = STANDARD.decode(strip_whitespace(&located.signature.signature_value))?;
    let public_key = certificate.public_key()?;

    if !idp_crypto::rsa_verify(
        &public_key,
        canonical_signed_info.as_bytes(),
        &signature_value,
        algorithm,
    )? {
        return Err(SamlError::SignatureInvalid(
            "signature value does not match".to_string(),
        ));
    }
    Ok(())
}

fn locate_signature(root: &XmlElement) -> SamlResult<LocatedSignature<'_>> {
    let path = root
        .find_all(&NamespaceScope::new(), &ElementName::new(XMLDSIG_NS, "Signature"))
        .into_iter()
        .next()
        .ok_or_else(|| SamlError::MissingElement("ds:Signature".to_string()))?;
    let element = root
        .element_at(&path)
        .ok_or_else(|| SamlError::MissingElement("ds:Signature".to_string()))?;
    let scope = root
        .scope_at(&path, &NamespaceScope::new())
        .ok_or_else(|| SamlError::MissingElement("ds:Signature".to_string()))?;

    let signed_info = ds_child(element, &scope, "SignedInfo")?;
    let info_scope = scope.enter(signed_info);

    let canonicalization = algorithm_attr(signed_info, &info_scope, "CanonicalizationMethod")?;
    let canonicalization = CanonicalizationAlgorithm::from_uri(canonicalization).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unsupported canonicalization {canonicalization}"))
    })?;

    let algorithm = algorithm_attr(signed_info, &info_scope, "SignatureMethod")?;
    let algorithm = SignatureAlgorithm::from_uri(algorithm).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unsupported signature method {algorithm}"))
    })?;

    let references = ds_children(signed_info, &info_scope, "Reference");
    let [reference] = references.as_slice() else {
        return Err(SamlError::SignatureInvalid(format!(
            "expected one Reference, found {}",
            references.len()
        )));
    };
    let reference = *reference;
    let reference_scope = info_scope.enter(reference);

    let mut spec = ReferenceSpec {
        enveloped: false,
        canonicalization: CanonicalizationAlgorithm::C14N,
        digest: HashAlgorithm::Sha256,
    };
    if let Ok(transform_list) = ds_child(reference, &reference_scope, "Transforms") {
        let list_scope = reference_scope.enter(transform_list);
        for transform in ds_children(transform_list, &list_scope, "Transform") {
            let uri = transform.attr("Algorithm").unwrap_or_default();
            if uri == transforms::ENVELOPED_SIGNATURE {
                spec.enveloped = true;
            } else if let Some(c14n) = CanonicalizationAlgorithm::from_uri(uri) {
                spec.canonicalization = c14n;
            } else {
                return Err(SamlError::SignatureInvalid(format!("unsupported transform {uri}")));
            }
        }
    }

    let digest_uri = algorithm_attr(reference, &reference_scope, "DigestMethod")?;
    spec.digest = digest_from_uri(digest_uri).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unsupported digest method {digest_uri}"))
    })?;
    let digest_value = ds_child(reference, &reference_scope, "DigestValue")?.text();
    let signature_value = ds_child(element, &scope, "SignatureValue")?.text();

    let x509_certificate = ds_child(element, &scope, "KeyInfo").ok().and_then(|key_info| {
        key_info
            .find_all(&scope, &ElementName::new(XMLDSIG_NS, "X509Certificate"))
            .first()
            .and_then(|p| key_info.element_at(p))
            .map(XmlElement::text)
    });

    Ok(LocatedSignature {
        path,
        scope,
        signed_info,
        signature: XmlSignature {
            algorithm,
            canonicalization,
            reference_uri: reference.attr("URI").unwrap_or_default().to_string(),
            digest_value,
            signature_value,
            x509_certificate,
        },
        reference: spec,
    })
}

/// Direct children of `parent` named `local` in the XML-DSig namespace.
fn ds_children<'a>(parent: &'a XmlElement, scope: &NamespaceScope, local: &str) -> Vec<&'a XmlElement> {
    let name = ElementName::new(XMLDSIG_NS, local);
    parent
        .child_elements()
        .filter(|child| child.is_named(&scope.enter(child), &name))
        .collect()
}

fn ds_child<'a>(parent: &'a XmlElement, scope: &NamespaceScope, local: &str) -> SamlResult<&'a XmlElement> {
    ds_children(parent, scope, local)
        .into_iter()
        .next()
        .ok_or_else(|| SamlError::MissingElement(format!("ds:{local}")))
}

fn algorithm_attr<'a>(parent: &'a XmlElement, scope: &NamespaceScope, local: &str) -> SamlResult<&'a str> {
    ds_child(parent, scope, local)?
        .attr("Algorithm")
        .ok_or_else(|| SamlError::MissingElement(format!("ds:{local}/@Algorithm")))
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

impl XmlDocument {
    /// True when a `Signature` element in the XML-DSig namespace appears
    /// anywhere in the document.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self
            .root
            .find_all(&NamespaceScope::new(), &ElementName::new(XMLDSIG_NS, "Signature"))
            .is_empty()
    }

    /// Soft trust decision against a certificate fingerprint, with the
    /// default validator. Never fails; every problem yields `false`.
    #[must_use]
    pub fn has_valid_signature(&self, fingerprint: &str) -> bool {
        XmlSignatureValidator::default().has_valid_signature(self, fingerprint)
    }
}
