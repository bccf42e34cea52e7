//! RSA PKCS#1 v1.5 signing and verification.
//!
//! XML-DSig deployments still overwhelmingly expect `rsa-sha256`, so every
//! SHA-2 width is accepted here.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};

use crate::algorithm::RsaAlgorithm;
use crate::signature::SignatureError;

/// Signs data with an RSA private key.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#1 or PKCS#8)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns an error if the key cannot be parsed or signing fails.
pub fn rsa_sign(
    key_der: &[u8],
    data: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut signature = vec![0u8; key_pair.public_modulus_len()];

    let padding = match algorithm {
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
    };

    key_pair
        .sign(padding, &rng, data, &mut signature)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(signature)
}

/// Verifies an RSA signature.
///
/// `public_key_der` is the PKCS#1 `RSAPublicKey` carried in a certificate's
/// subject public key bit string (see [`crate::Certificate::public_key`]).
///
/// Returns `Ok(false)` when the signature does not match.
///
/// # Errors
///
/// Reserved for failures to run the check at all; a mismatching signature is
/// not an error.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<bool, SignatureError> {
    use aws_lc_rs::signature::{
        RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    };

    if public_key_der.is_empty() {
        return Err(SignatureError::Verification("empty public key".to_string()));
    }

    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Rs256 => &RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Rs384 => &RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Rs512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::{pem_to_der, Certificate};

    const KEY_PEM: &str = include_str!("../../../tests/fixtures/idp-key.pem");
    const CERT_PEM: &str = include_str!("../../../tests/fixtures/idp-cert.pem");
    const OTHER_CERT_PEM: &str = include_str!("../../../tests/fixtures/other-cert.pem");

    fn key_der() -> Vec<u8> {
        pem_to_der(KEY_PEM, "PRIVATE KEY").expect("fixture key")
    }

    #[test]
    fn sign_then_verify_with_certificate_key() {
        let cert = Certificate::from_pem(CERT_PEM).unwrap();
        let public_key = cert.public_key().unwrap();

        for alg in [RsaAlgorithm::Rs256, RsaAlgorithm::Rs384, RsaAlgorithm::Rs512] {
            let sig = rsa_sign(&key_der(), b"signed info", alg).unwrap();
            assert_eq!(sig.len(), 256, "2048-bit modulus");
            assert!(rsa_verify(&public_key, b"signed info", &sig, alg).unwrap());
        }
    }

    #[test]
    fn tampered_data_does_not_verify() {
        let cert = Certificate::from_pem(CERT_PEM).unwrap();
        let sig = rsa_sign(&key_der(), b"original", RsaAlgorithm::Rs256).unwrap();

        let ok = rsa_verify(&cert.public_key().unwrap(), b"tampered", &sig, RsaAlgorithm::Rs256)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn foreign_key_does_not_verify() {
        let other = Certificate::from_pem(OTHER_CERT_PEM).unwrap();
        let sig = rsa_sign(&key_der(), b"data", RsaAlgorithm::Rs256).unwrap();

        let ok = rsa_verify(&other.public_key().unwrap(), b"data", &sig, RsaAlgorithm::Rs256)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn garbage_key_is_rejected() {
        let err = rsa_sign(b"not a key", b"data", RsaAlgorithm::Rs256).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidKey(_)));
    }
}
