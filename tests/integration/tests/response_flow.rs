//! Response wrapping and encryption hand-off tests.

use std::sync::Mutex;

use idp_saml::xml::XmlDocument;
use idp_saml::{
    AssertionBuilder, AssertionEncryptor, EncryptionOptions, ResponseBuilder, SamlError, SamlResult,
};

use crate::common::{TestEnv, OTHER_CERT_PEM};

/// Stand-in for an XML Encryption implementation: records its input and
/// returns a fixed `EncryptedData` element.
#[derive(Default)]
struct RecordingEncryptor {
    inputs: Mutex<Vec<String>>,
}

impl AssertionEncryptor for RecordingEncryptor {
    fn encrypt(&self, xml: &str, options: &EncryptionOptions) -> SamlResult<String> {
        self.inputs
            .lock()
            .map_err(|_| SamlError::Encryption("poisoned".to_string()))?
            .push(xml.to_string());
        Ok(format!(
            r#"<xenc:EncryptedData xmlns:xenc="http://www.w3.org/2001/04/xmlenc#"><xenc:EncryptionMethod Algorithm="{}"/></xenc:EncryptedData>"#,
            options.block_encryption.uri()
        ))
    }
}

/// Tests a signed response around a signed assertion.
#[test]
fn test_signed_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request();
    let assertion = AssertionBuilder::new(&env.config, &request, &env.user)?.signed()?;

    let response = ResponseBuilder::new(&env.config, &request, assertion).signed()?;
    let xml = response.to_xml()?;
    assert!(xml.starts_with("<samlp:Response"));

    let reparsed: XmlDocument = xml.parse()?;
    assert!(reparsed.has_valid_signature(&env.sha256_fingerprint));

    let order: Vec<_> = reparsed.root.child_elements().map(|c| c.name.as_str()).collect();
    assert_eq!(order, ["saml:Issuer", "ds:Signature", "samlp:Status", "Assertion"]);
    Ok(())
}

/// Tests that encryption without options is a configuration error.
#[test]
fn test_encryption_requires_options() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request();
    let encryptor = RecordingEncryptor::default();

    let err = AssertionBuilder::new(&env.config, &request, &env.user)?
        .encrypt(true, &encryptor)
        .unwrap_err();
    assert!(matches!(err, SamlError::Configuration(_)));
    Ok(())
}

/// Tests the encrypted assertion flow end to end.
#[test]
fn test_encrypted_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let recipient = idp_crypto::Certificate::from_pem(OTHER_CERT_PEM)?;
    let request = env.request().with_encryption(EncryptionOptions::new(recipient));
    let encryptor = RecordingEncryptor::default();

    let builder = AssertionBuilder::new(&env.config, &request, &env.user)?;
    let encrypted = builder.encrypt(true, &encryptor)?;
    builder.encrypt(false, &encryptor)?;

    {
        let inputs = encryptor.inputs.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        assert_eq!(inputs.len(), 2);

        let signed: XmlDocument = inputs[0].parse()?;
        assert!(signed.has_valid_signature(&env.sha256_fingerprint));
        let unsigned: XmlDocument = inputs[1].parse()?;
        assert!(!unsigned.is_signed());
    }

    let response = ResponseBuilder::encrypted(&env.config, &request, &encrypted)?.signed()?;
    let wrapper = response
        .root
        .child("EncryptedAssertion")
        .ok_or_else(|| anyhow::anyhow!("missing EncryptedAssertion"))?;
    assert_eq!(wrapper.name, "saml:EncryptedAssertion");
    assert!(response.root.child("Assertion").is_none());
    assert!(response.has_valid_signature(&env.sha256_fingerprint));
    Ok(())
}
