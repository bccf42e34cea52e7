//! NameID format negotiation.

use crate::error::{SamlError, SamlResult};
use crate::principal::{Principal, ValueExtractor};
use crate::types::NameIdFormat;

/// A supported NameID format and how its value is read off a principal.
#[derive(Debug, Clone)]
pub struct NameIdFormatSpec {
    /// Format URN, emitted as `NameID/@Format`.
    pub name: String,
    /// Source of the `NameID` text.
    pub extractor: ValueExtractor,
}

impl NameIdFormatSpec {
    /// Creates a format entry. Short names such as `email_address` are
    /// expanded to their URNs.
    pub fn new(name: &str, extractor: ValueExtractor) -> Self {
        Self {
            name: expand_format_name(name),
            extractor,
        }
    }

    /// Format whose value is the named principal attribute.
    pub fn query(name: &str, attribute: impl Into<String>) -> Self {
        Self::new(name, ValueExtractor::query(attribute))
    }

    /// First non-empty value the extractor yields.
    #[must_use]
    pub fn value_for(&self, principal: &dyn Principal) -> Option<String> {
        self.extractor
            .extract(principal)
            .into_iter()
            .find(|value| !value.is_empty())
    }
}

/// Expands a short format name to its URN; other names pass through.
#[must_use]
pub fn expand_format_name(name: &str) -> String {
    NameIdFormat::from_short_name(name).map_or_else(|| name.to_string(), |format| format.uri().to_string())
}

/// Picks the entry named `requested`, falling back to the first entry.
///
/// # Errors
///
/// Returns [`SamlError::Configuration`] when `formats` is empty.
pub fn negotiate<'a>(
    formats: &'a [NameIdFormatSpec],
    requested: Option<&str>,
) -> SamlResult<&'a NameIdFormatSpec> {
    let default = formats
        .first()
        .ok_or_else(|| SamlError::Configuration("no NameID formats configured".to_string()))?;

    let chosen = requested
        .and_then(|name| formats.iter().find(|format| format.name == name))
        .unwrap_or(default);

    if let Some(name) = requested.filter(|name| *name != chosen.name) {
        tracing::debug!("requested NameID format {name} unsupported, using {}", chosen.name);
    }
    Ok(chosen)
}
