//! Assertion issuance tests.

use chrono::{TimeZone, Utc};
use idp_saml::xml::XmlElement;
use idp_saml::{AssertionBuilder, AttributeSpec, IdpConfig, NameIdFormat, SamlError};

use crate::common::TestEnv;

fn child<'a>(element: &'a XmlElement, path: &[&str]) -> &'a XmlElement {
    path.iter().fold(element, |current, name| {
        current
            .child(name)
            .unwrap_or_else(|| panic!("<{}> has no <{name}>", current.name))
    })
}

/// Tests the identity fields of a freshly issued assertion.
#[test]
fn test_assertion_identity() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request().with_expiry(3600);
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.raw()?;
    let root = &document.root;

    assert_eq!(root.name, "Assertion");
    assert_eq!(root.attr("xmlns"), Some("urn:oasis:names:tc:SAML:2.0:assertion"));
    assert_eq!(root.attr("ID"), Some("_abc123"));
    assert_eq!(root.attr("Version"), Some("2.0"));
    assert_eq!(child(root, &["Issuer"]).text(), "https://idp.example");

    let audiences: Vec<_> = child(root, &["Conditions", "AudienceRestriction"])
        .child_elements()
        .map(|audience| audience.text())
        .collect();
    assert_eq!(audiences, ["https://sp.example"]);

    let order: Vec<_> = root.child_elements().map(|c| c.local_name()).collect();
    assert_eq!(
        order,
        ["Issuer", "Subject", "Conditions", "AuthnStatement", "AttributeStatement"]
    );
    Ok(())
}

/// Tests the validity windows against a pinned issuance instant.
#[test]
fn test_validity_windows() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request().with_expiry(60 * 60).with_session_expiry(8 * 60 * 60);
    let issued = Utc.with_ymd_and_hms(2031, 3, 15, 9, 30, 0).unwrap();
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?
        .with_now(issued)
        .raw()?;
    let root = &document.root;

    assert_eq!(root.attr("IssueInstant"), Some("2031-03-15T09:30:00Z"));

    let conditions = child(root, &["Conditions"]);
    assert_eq!(conditions.attr("NotBefore"), Some("2031-03-15T09:29:55Z"));
    assert_eq!(conditions.attr("NotOnOrAfter"), Some("2031-03-15T10:30:00Z"));

    let data = child(root, &["Subject", "SubjectConfirmation", "SubjectConfirmationData"]);
    assert_eq!(data.attr("NotOnOrAfter"), Some("2031-03-15T09:33:00Z"));
    assert_eq!(data.attr("InResponseTo"), Some("_request-1"));
    assert_eq!(data.attr("Recipient"), Some("https://sp.example/saml/acs"));

    let statement = child(root, &["AuthnStatement"]);
    assert_eq!(statement.attr("AuthnInstant"), Some("2031-03-15T09:30:00Z"));
    assert_eq!(statement.attr("SessionIndex"), Some("_abc123"));
    assert_eq!(statement.attr("SessionNotOnOrAfter"), Some("2031-03-15T17:30:00Z"));
    assert_eq!(
        child(statement, &["AuthnContext", "AuthnContextClassRef"]).text(),
        "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport"
    );
    Ok(())
}

/// Tests that a zero session lifetime omits SessionNotOnOrAfter.
#[test]
fn test_zero_session_expiry() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request().with_session_expiry(0);
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.raw()?;

    assert_eq!(child(&document.root, &["AuthnStatement"]).attr("SessionNotOnOrAfter"), None);
    Ok(())
}

/// Tests NameID negotiation for supported and unsupported formats.
#[test]
fn test_name_id_negotiation() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let request = env.request().with_name_id_format(NameIdFormat::Persistent.uri());
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.raw()?;
    let name_id = child(&document.root, &["Subject", "NameID"]);
    assert_eq!(name_id.attr("Format"), Some(NameIdFormat::Persistent.uri()));
    assert_eq!(name_id.text(), "u-1001");

    let request = env.request().with_name_id_format(NameIdFormat::X509SubjectName.uri());
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.raw()?;
    let name_id = child(&document.root, &["Subject", "NameID"]);
    assert_eq!(name_id.attr("Format"), Some(NameIdFormat::Email.uri()));
    assert_eq!(name_id.text(), "alice@example.com");
    Ok(())
}

/// Tests attribute resolution through queries, callbacks and missing data.
#[test]
fn test_attribute_statement() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.request();
    let document = AssertionBuilder::new(&env.config, &request, &env.user)?.raw()?;
    let attributes: Vec<_> = child(&document.root, &["AttributeStatement"]).child_elements().collect();

    let values = |element: &XmlElement| -> Vec<String> {
        element.child_elements().map(|value| value.text()).collect()
    };

    assert_eq!(attributes.len(), 4);
    assert_eq!(attributes[0].attr("FriendlyName"), Some("emailAddress"));
    assert_eq!(values(attributes[0]), ["alice@example.com"]);
    assert_eq!(attributes[1].attr("Name"), Some("displayName"));
    assert_eq!(values(attributes[1]), ["Alice Example"]);
    assert_eq!(values(attributes[2]), ["admins", "staff"]);

    // The user has no phone number: the attribute is present but empty.
    assert_eq!(attributes[3].attr("Name"), Some("phoneNumber"));
    assert!(values(attributes[3]).is_empty());
    Ok(())
}

/// Tests that issuance fails cleanly without any NameID format.
#[test]
fn test_missing_name_id_formats() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let config = IdpConfig::new().with_attribute(AttributeSpec::new("email"));
    let request = env.request();

    let err = AssertionBuilder::new(&config, &request, &env.user).unwrap_err();
    assert!(matches!(err, SamlError::Configuration(_)));
    assert_eq!(err.status_code(), "urn:oasis:names:tc:SAML:2.0:status:Responder");
    Ok(())
}

/// Tests configuration loaded from TOML settings.
#[test]
fn test_config_from_toml() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let config = IdpConfig::from_toml_str(
        r#"
session_expiry = 3600

[[name_id_formats]]
name = "persistent"
attribute = "id"

[[attributes]]
friendly_name = "mail"
getter = "email"
"#,
    )?;

    let request = env.request();
    let document = AssertionBuilder::new(&config, &request, &env.user)?.raw()?;
    let root = &document.root;

    let name_id = child(root, &["Subject", "NameID"]);
    assert_eq!(name_id.attr("Format"), Some(NameIdFormat::Persistent.uri()));
    assert_eq!(name_id.text(), "u-1001");
    assert!(child(root, &["AuthnStatement"]).attr("SessionNotOnOrAfter").is_some());
    assert_eq!(
        child(root, &["AttributeStatement", "Attribute", "AttributeValue"]).text(),
        "alice@example.com"
    );
    Ok(())
}
