//! Signature creation and verification tests.

use idp_saml::xml::XmlDocument;
use idp_saml::{
    AssertionBuilder, SignatureAlgorithm, SignatureConfig, SignaturePlacement, SigningCredentials,
    XmlSignatureValidator, XmlSigner,
};

use crate::common::{TestEnv, OTHER_CERT_PEM, OTHER_KEY_PEM};

fn signed_assertion(env: &TestEnv) -> anyhow::Result<String> {
    let request = env.request();
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.signed()?;
    Ok(document.to_xml()?)
}

/// Tests that a signed assertion verifies against either fingerprint form.
#[test]
fn test_sign_then_verify() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let xml = signed_assertion(&env)?;
    let document: XmlDocument = xml.parse()?;

    assert!(document.is_signed());
    assert!(document.has_valid_signature(&env.sha256_fingerprint));
    assert!(document.has_valid_signature(&env.sha1_fingerprint));
    assert!(document.has_valid_signature(&env.sha1_fingerprint.replace(':', "").to_lowercase()));
    Ok(())
}

/// Tests that the signature sits between Issuer and Subject.
#[test]
fn test_signature_position() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let document: XmlDocument = signed_assertion(&env)?.parse()?;

    let order: Vec<_> = document.root.child_elements().map(|c| c.name.as_str()).collect();
    assert_eq!(order[..3], ["Issuer", "ds:Signature", "Subject"]);
    Ok(())
}

/// Tests that an unsigned document is never trusted.
#[test]
fn test_unsigned_is_untrusted() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request();
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.raw()?;

    assert!(!document.is_signed());
    assert!(!document.has_valid_signature(&env.sha256_fingerprint));
    Ok(())
}

/// Tests that altering one signed character breaks trust.
#[test]
fn test_tampered_name_id() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let xml = signed_assertion(&env)?;
    assert!(xml.contains("alice@example.com"));

    let tampered: XmlDocument = xml.replacen("alice@example.com", "alicf@example.com", 1).parse()?;
    assert!(tampered.is_signed());
    assert!(!tampered.has_valid_signature(&env.sha256_fingerprint));

    let err = XmlSignatureValidator::new()
        .validate(&tampered, &env.sha256_fingerprint)
        .unwrap_err();
    assert!(err.is_verification_failure());
    Ok(())
}

/// Tests that the wrong fingerprint yields false rather than an error.
#[test]
fn test_wrong_fingerprint() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let document: XmlDocument = signed_assertion(&env)?.parse()?;
    let other = idp_crypto::Certificate::from_pem(OTHER_CERT_PEM)?;

    assert!(!document.has_valid_signature(&other.fingerprint(idp_crypto::HashAlgorithm::Sha256)));
    assert!(!document.has_valid_signature("not-a-fingerprint"));
    assert!(!document.has_valid_signature(""));
    Ok(())
}

/// Tests that a signature by another key pair is not trusted.
#[test]
fn test_foreign_key_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request();
    let foreign = SigningCredentials::from_pem(OTHER_KEY_PEM, OTHER_CERT_PEM)?.create_signer(SignatureConfig::default());
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.signed_with(&foreign)?;

    assert!(document.is_signed());
    assert!(!document.has_valid_signature(&env.sha256_fingerprint));
    Ok(())
}

/// Tests every supported algorithm and the refusal of SHA-1.
#[test]
fn test_signature_algorithms() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    for algorithm in [
        SignatureAlgorithm::RsaSha256,
        SignatureAlgorithm::RsaSha384,
        SignatureAlgorithm::RsaSha512,
    ] {
        let request = env.request().with_signature_algorithm(algorithm);
        let document = AssertionBuilder::new(&env.config, &request, &env.user)?.signed()?;
        assert!(
            document.has_valid_signature(&env.sha256_fingerprint),
            "{algorithm:?} signature should verify"
        );
    }

    let request = env.request().with_signature_algorithm(SignatureAlgorithm::RsaSha1);
    assert!(AssertionBuilder::new(&env.config, &request, &env.user)?.signed().is_err());
    Ok(())
}

/// Tests signing an arbitrary element with relative placement.
#[test]
fn test_generic_document_signing() -> anyhow::Result<()> {
    use idp_saml::xml::{ElementName, InsertPosition};

    let env = TestEnv::new()?;
    let signer = XmlSigner::from_pem(crate::common::IDP_KEY_PEM, Some(crate::common::IDP_CERT_PEM))?;
    let xml = r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" ID="_meta" entityID="https://idp.example"><md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"/></md:EntityDescriptor>"#;

    let placement = SignaturePlacement::Relative {
        anchor: ElementName::new("urn:oasis:names:tc:SAML:2.0:metadata", "IDPSSODescriptor"),
        position: InsertPosition::Before,
    };
    let signed = signer.sign(xml, &placement)?;
    assert!(signed.starts_with("<md:EntityDescriptor"));
    assert!(!signed.starts_with("<?xml"));

    let validator = XmlSignatureValidator::new();
    assert!(validator.verify_xml(&signed, &env.sha1_fingerprint));

    let document: XmlDocument = signed.parse()?;
    let order: Vec<_> = document.root.child_elements().map(|c| c.local_name()).collect();
    assert_eq!(order, ["Signature", "IDPSSODescriptor"]);
    Ok(())
}
