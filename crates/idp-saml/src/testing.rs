//! Shared fixtures for unit tests.

use crate::signature::XmlSigner;

pub const KEY_PEM: &str = include_str!("../../../tests/fixtures/idp-key.pem");
pub const CERT_PEM: &str = include_str!("../../../tests/fixtures/idp-cert.pem");
pub const OTHER_CERT_PEM: &str = include_str!("../../../tests/fixtures/other-cert.pem");

pub const SHA1_FINGERPRINT: &str = "D2:F0:2B:55:7D:4E:77:46:3C:F4:AA:26:93:23:3E:8C:7F:25:F8:D5";
pub const SHA256_FINGERPRINT: &str =
    "91:CD:CE:03:C8:ED:28:10:DD:67:4F:B1:8C:64:4E:15:FB:E6:55:AC:78:30:3C:D4:4C:48:C6:E7:9A:D7:85:78";

pub fn signer() -> XmlSigner {
    XmlSigner::from_pem(KEY_PEM, Some(CERT_PEM)).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
