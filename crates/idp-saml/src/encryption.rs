//! Assertion encryption hand-off.
//!
//! The cipher work is done by the host through [`AssertionEncryptor`]; this
//! module only carries the recipient settings to it.

use idp_crypto::Certificate;

use crate::error::SamlResult;

/// XML Encryption block cipher for the assertion body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockEncryption {
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-256 in CBC mode.
    #[default]
    Aes256Cbc,
    /// AES-128 in GCM mode.
    Aes128Gcm,
    /// AES-256 in GCM mode.
    Aes256Gcm,
}

impl BlockEncryption {
    /// Algorithm URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Aes128Cbc => "http://www.w3.org/2001/04/xmlenc#aes128-cbc",
            Self::Aes256Cbc => "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
            Self::Aes128Gcm => "http://www.w3.org/2009/xmlenc11#aes128-gcm",
            Self::Aes256Gcm => "http://www.w3.org/2009/xmlenc11#aes256-gcm",
        }
    }
}

/// Key transport algorithm wrapping the content key for the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyTransport {
    /// RSA-OAEP with MGF1 and SHA-1 digest.
    #[default]
    RsaOaepMgf1p,
    /// RSA-OAEP (XML Encryption 1.1).
    RsaOaep,
}

impl KeyTransport {
    /// Algorithm URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaOaepMgf1p => "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p",
            Self::RsaOaep => "http://www.w3.org/2009/xmlenc11#rsa-oaep",
        }
    }
}

/// Recipient settings for an encrypted assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionOptions {
    /// Relying party's encryption certificate.
    pub certificate: Certificate,
    /// Content cipher.
    pub block_encryption: BlockEncryption,
    /// Key wrap algorithm.
    pub key_transport: KeyTransport,
}

impl EncryptionOptions {
    /// Options with the default ciphers.
    #[must_use]
    pub fn new(certificate: Certificate) -> Self {
        Self {
            certificate,
            block_encryption: BlockEncryption::default(),
            key_transport: KeyTransport::default(),
        }
    }

    /// Sets the content cipher.
    #[must_use]
    pub const fn with_block_encryption(mut self, block_encryption: BlockEncryption) -> Self {
        self.block_encryption = block_encryption;
        self
    }

    /// Sets the key wrap algorithm.
    #[must_use]
    pub const fn with_key_transport(mut self, key_transport: KeyTransport) -> Self {
        self.key_transport = key_transport;
        self
    }
}

/// Encrypts serialized assertions.
pub trait AssertionEncryptor {
    /// Encrypts `xml` for the recipient described by `options`, returning
    /// the `xenc:EncryptedData` element as XML text.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`crate::SamlError::Encryption`].
    fn encrypt(&self, xml: &str, options: &EncryptionOptions) -> SamlResult<String>;
}
