//! Identity provider configuration.
//!
//! [`IdpConfig`] is built once, in code or from TOML settings, and read
//! concurrently afterwards. Hosts that want a process-wide value can park
//! it in a [`ConfigCell`].

use std::sync::{Arc, OnceLock};

use idp_crypto::{pem_to_der, Certificate};
use serde::{Deserialize, Serialize};

use crate::assertion::{AttributeSpec, NameIdFormatSpec};
use crate::error::{SamlError, SamlResult};
use crate::principal::ValueExtractor;
use crate::signature::{SignatureAlgorithm, SignatureConfig, XmlSigner};

// ============================================================================
// Signing credentials
// ============================================================================

/// Key pair used to sign assertions and responses.
#[derive(Clone)]
pub struct SigningCredentials {
    /// Private key in DER format (PKCS#8 or PKCS#1).
    private_key_der: Vec<u8>,
    /// Certificate published in `KeyInfo`.
    certificate: Certificate,
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("certificate", &self.certificate.subject().unwrap_or_default())
            .finish_non_exhaustive()
    }
}

impl SigningCredentials {
    /// Creates credentials from a DER key and its certificate.
    #[must_use]
    pub fn new(private_key_der: Vec<u8>, certificate: Certificate) -> Self {
        Self {
            private_key_der,
            certificate,
        }
    }

    /// Creates credentials from PEM text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] when either PEM block is missing
    /// or the certificate does not parse.
    pub fn from_pem(private_key_pem: &str, certificate_pem: &str) -> SamlResult<Self> {
        let private_key_der = pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Configuration("signing key is not a PEM private key".to_string()))?;
        let certificate = Certificate::from_pem(certificate_pem)
            .map_err(|e| SamlError::Configuration(format!("signing certificate: {e}")))?;
        Ok(Self::new(private_key_der, certificate))
    }

    /// The signing certificate.
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Creates an `XmlSigner` from these credentials.
    #[must_use]
    pub fn create_signer(&self, config: SignatureConfig) -> XmlSigner {
        XmlSigner::new(self.private_key_der.clone(), Some(self.certificate.clone())).with_config(config)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Immutable identity provider configuration.
#[derive(Debug, Clone, Default)]
pub struct IdpConfig {
    /// Supported NameID formats; the first is the default.
    pub name_id_formats: Vec<NameIdFormatSpec>,

    /// Attributes asserted when the principal does not override them.
    pub attributes: Vec<AttributeSpec>,

    /// Session lifetime in seconds; `0` means sessions do not expire.
    pub session_expiry: u32,

    /// Signing key pair.
    pub signing: Option<SigningCredentials>,

    /// Default signature settings.
    pub signature: SignatureConfig,
}

impl IdpConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses TOML settings into a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] for malformed settings.
    pub fn from_toml_str(toml: &str) -> SamlResult<Self> {
        IdpSettings::from_toml_str(toml)?.into_config()
    }

    /// Adds a supported NameID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: NameIdFormatSpec) -> Self {
        self.name_id_formats.push(format);
        self
    }

    /// Adds a default asserted attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Sets the default session lifetime.
    #[must_use]
    pub const fn with_session_expiry(mut self, secs: u32) -> Self {
        self.session_expiry = secs;
        self
    }

    /// Sets the signing key pair.
    #[must_use]
    pub fn with_signing(mut self, credentials: SigningCredentials) -> Self {
        self.signing = Some(credentials);
        self
    }

    /// Sets the default signature settings.
    #[must_use]
    pub const fn with_signature_config(mut self, signature: SignatureConfig) -> Self {
        self.signature = signature;
        self
    }

    /// Signer for the configured key, optionally with another algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] when no signing key is configured.
    pub fn signer(&self, algorithm: Option<SignatureAlgorithm>) -> SamlResult<XmlSigner> {
        let credentials = self
            .signing
            .as_ref()
            .ok_or_else(|| SamlError::Configuration("no signing credentials configured".to_string()))?;

        let mut config = self.signature;
        if let Some(algorithm) = algorithm {
            config.algorithm = algorithm;
        }
        Ok(credentials.create_signer(config))
    }
}

/// Once-initialized holder for a process-wide configuration.
#[derive(Debug, Default)]
pub struct ConfigCell {
    inner: OnceLock<Arc<IdpConfig>>,
}

impl ConfigCell {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Stores the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] if the cell is already set.
    pub fn set(&self, config: IdpConfig) -> SamlResult<()> {
        self.inner
            .set(Arc::new(config))
            .map_err(|_| SamlError::Configuration("configuration already initialized".to_string()))
    }

    /// The stored configuration, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<IdpConfig>> {
        self.inner.get().cloned()
    }

    /// Returns the stored configuration, initializing it with `init` first
    /// if needed.
    pub fn get_or_init(&self, init: impl FnOnce() -> IdpConfig) -> Arc<IdpConfig> {
        Arc::clone(self.inner.get_or_init(|| Arc::new(init())))
    }
}

// ============================================================================
// Settings
// ============================================================================

/// NameID format entry in a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdFormatSettings {
    /// Short name (`email_address`, `persistent`, ...) or URN.
    pub name: String,
    /// Principal attribute holding the value.
    pub attribute: String,
}

/// Attribute entry in a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSettings {
    /// `FriendlyName`.
    pub friendly_name: String,
    /// `Name` override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `NameFormat` override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_format: Option<String>,
    /// Principal attribute queried for the values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter: Option<String>,
}

/// PEM signing material in a settings file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningSettings {
    /// PEM private key.
    pub private_key_pem: String,
    /// PEM certificate.
    pub certificate_pem: String,
}

impl std::fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSettings").finish_non_exhaustive()
    }
}

/// Serializable form of [`IdpConfig`].
///
/// ```toml
/// session_expiry = 86400
///
/// [signature]
/// algorithm = "rsa-sha256"
/// canonicalization = "exclusive-c14n"
///
/// [[name_id_formats]]
/// name = "email_address"
/// attribute = "email"
///
/// [[attributes]]
/// friendly_name = "emailAddress"
/// getter = "email"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpSettings {
    /// Supported NameID formats, default first.
    pub name_id_formats: Vec<NameIdFormatSettings>,
    /// Default asserted attributes.
    pub attributes: Vec<AttributeSettings>,
    /// Session lifetime in seconds.
    pub session_expiry: u32,
    /// Signature defaults.
    pub signature: SignatureConfig,
    /// Signing key pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningSettings>,
}

impl IdpSettings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] for invalid TOML or unknown values.
    pub fn from_toml_str(toml: &str) -> SamlResult<Self> {
        toml::from_str(toml).map_err(|e| SamlError::Configuration(format!("invalid settings: {e}")))
    }

    /// Builds the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] when the signing material is invalid.
    pub fn into_config(self) -> SamlResult<IdpConfig> {
        let signing = self
            .signing
            .map(|s| SigningCredentials::from_pem(&s.private_key_pem, &s.certificate_pem))
            .transpose()?;

        let name_id_formats: Vec<NameIdFormatSpec> = self
            .name_id_formats
            .into_iter()
            .map(|f| NameIdFormatSpec::query(&f.name, f.attribute))
            .collect();

        let attributes = self
            .attributes
            .into_iter()
            .map(|a| AttributeSpec {
                friendly_name: a.friendly_name,
                name: a.name,
                name_format: a.name_format,
                getter: a.getter.map(ValueExtractor::Query),
            })
            .collect();

        if name_id_formats.is_empty() {
            tracing::warn!("settings declare no NameID formats; issuance will be refused");
        }

        let config = IdpConfig {
            name_id_formats,
            attributes,
            session_expiry: self.session_expiry,
            signing,
            signature: self.signature,
        };
        tracing::debug!(
            formats = config.name_id_formats.len(),
            attributes = config.attributes.len(),
            signing = config.signing.is_some(),
            "identity provider configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::CanonicalizationAlgorithm;
    use crate::testing;
    use crate::types::NameIdFormat;

    fn settings_toml() -> String {
        format!(
            r#"
session_expiry = 86400

[signature]
algorithm = "rsa-sha512"
canonicalization = "c14n"

[[name_id_formats]]
name = "email_address"
attribute = "email"

[[name_id_formats]]
name = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent"
attribute = "id"

[[attributes]]
friendly_name = "emailAddress"
name = "urn:oid:0.9.2342.19200300.100.1.3"
getter = "email"

[signing]
private_key_pem = """{}"""
certificate_pem = """{}"""
"#,
            testing::KEY_PEM,
            testing::CERT_PEM
        )
    }

    #[test]
    fn toml_settings_build_config() {
        let config = IdpConfig::from_toml_str(&settings_toml()).unwrap();

        assert_eq!(config.session_expiry, 86400);
        assert_eq!(config.signature.algorithm, SignatureAlgorithm::RsaSha512);
        assert_eq!(config.signature.canonicalization, CanonicalizationAlgorithm::C14N);
        assert!(config.signature.include_certificate);

        let names: Vec<_> = config.name_id_formats.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, [NameIdFormat::Email.uri(), NameIdFormat::Persistent.uri()]);

        assert_eq!(config.attributes.len(), 1);
        assert_eq!(config.attributes[0].name.as_deref(), Some("urn:oid:0.9.2342.19200300.100.1.3"));
        assert!(config.signing.is_some());
    }

    #[test]
    fn empty_settings_are_valid() {
        let config = IdpConfig::from_toml_str("").unwrap();
        assert!(config.name_id_formats.is_empty());
        assert_eq!(config.session_expiry, 0);
        assert_eq!(config.signature, SignatureConfig::default());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = IdpConfig::from_toml_str("[signature]\nalgorithm = \"dsa-sha1\"").unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }

    #[test]
    fn bad_signing_material_is_rejected() {
        let toml = "[signing]\nprivate_key_pem = \"nope\"\ncertificate_pem = \"nope\"";
        let err = IdpConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }

    #[test]
    fn signer_requires_credentials() {
        let err = IdpConfig::new().signer(None).unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }

    #[test]
    fn signer_algorithm_override() {
        let config = IdpConfig::new().with_signing(SigningCredentials::from_pem(testing::KEY_PEM, testing::CERT_PEM).unwrap());
        let signer = config.signer(Some(SignatureAlgorithm::RsaSha384)).unwrap();
        assert_eq!(signer.config().algorithm, SignatureAlgorithm::RsaSha384);
        assert_eq!(config.signer(None).unwrap().config().algorithm, SignatureAlgorithm::RsaSha256);
    }

    #[test]
    fn config_cell_initializes_once() {
        let cell = ConfigCell::new();
        assert!(cell.get().is_none());

        cell.set(IdpConfig::new().with_session_expiry(60)).unwrap();
        assert!(cell.set(IdpConfig::new()).is_err());

        let first = cell.get_or_init(IdpConfig::new);
        assert_eq!(first.session_expiry, 60);
    }

    #[test]
    fn config_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IdpConfig>();
        assert_send_sync::<ConfigCell>();
    }
}
