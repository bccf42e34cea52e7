//! Common test utilities and fixtures.

use idp_crypto::{Certificate, HashAlgorithm};
use idp_saml::{
    AssertionRequest, AttributeSpec, AttributeValue, IdpConfig, NameIdFormatSpec, Principal, SigningCredentials,
    ValueExtractor,
};

pub const IDP_KEY_PEM: &str = include_str!("../../fixtures/idp-key.pem");
pub const IDP_CERT_PEM: &str = include_str!("../../fixtures/idp-cert.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../../fixtures/other-key.pem");
pub const OTHER_CERT_PEM: &str = include_str!("../../fixtures/other-cert.pem");

/// A host-side user type exposed through [`Principal`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub groups: Vec<String>,
}

impl Principal for User {
    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "id" => Some(self.id.clone().into()),
            "email" => Some(self.email.clone().into()),
            "display_name" => Some(self.display_name.clone().into()),
            "groups" => Some(self.groups.clone().into()),
            _ => None,
        }
    }
}

/// Test environment: configuration, a user and the trusted fingerprints.
pub struct TestEnv {
    pub config: IdpConfig,
    pub user: User,
    pub sha1_fingerprint: String,
    pub sha256_fingerprint: String,
}

impl TestEnv {
    /// Creates a new test environment signing with the IdP fixture key.
    pub fn new() -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("idp_saml=debug")
            .with_test_writer()
            .try_init();

        let config = IdpConfig::new()
            .with_name_id_format(NameIdFormatSpec::query("email_address", "email"))
            .with_name_id_format(NameIdFormatSpec::query("persistent", "id"))
            .with_attribute(AttributeSpec::new("emailAddress").with_getter(ValueExtractor::query("email")))
            .with_attribute(AttributeSpec::new("displayName"))
            .with_attribute(
                AttributeSpec::new("groups")
                    .with_getter(ValueExtractor::callback(|principal| principal.attribute("groups"))),
            )
            .with_attribute(AttributeSpec::new("phoneNumber"))
            .with_signing(SigningCredentials::from_pem(IDP_KEY_PEM, IDP_CERT_PEM)?);

        let certificate = Certificate::from_pem(IDP_CERT_PEM)?;

        Ok(Self {
            config,
            user: User {
                id: "u-1001".to_string(),
                email: "alice@example.com".to_string(),
                display_name: "Alice Example".to_string(),
                groups: vec!["admins".to_string(), "staff".to_string()],
            },
            sha1_fingerprint: certificate.fingerprint(HashAlgorithm::Sha1),
            sha256_fingerprint: certificate.fingerprint(HashAlgorithm::Sha256),
        })
    }

    /// A typical SP-initiated request.
    pub fn request(&self) -> AssertionRequest {
        AssertionRequest::new("abc123", "https://idp.example")
            .with_audience("https://sp.example")
            .in_response_to("_request-1")
            .with_acs_url("https://sp.example/saml/acs")
    }
}
