//! Parsing through `quick-xml`'s pull reader.

use std::borrow::Cow;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::node::{XmlElement, XmlNode};
use crate::error::{SamlError, SamlResult};

/// Deepest element nesting accepted from input; every tree pass recurses.
const MAX_DEPTH: usize = 256;

/// Parses `xml` into its root element.
///
/// Whitespace is preserved. Line endings and literal whitespace in
/// attribute values are normalized the way any XML processor would, while
/// character references survive as written. DOCTYPE declarations are
/// refused outright, so no entity or ID-attribute declarations can alter
/// what gets verified.
pub(crate) fn parse(xml: &str) -> SamlResult<XmlElement> {
    let xml = normalize_line_endings(xml);
    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                check_depth(&stack)?;
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                check_depth(&stack)?;
                let element = element_from(&start)?;
                close(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SamlError::XmlParse("unexpected closing tag".to_string()))?;
                close(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?.into_owned();
                push_text(&mut stack, text)?;
            }
            Event::CData(data) => {
                let text = utf8(&data.into_inner())?;
                push_text(&mut stack, text)?;
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Comment(utf8(&comment)?));
                }
            }
            Event::DocType(_) => {
                return Err(SamlError::XmlParse(
                    "document type declarations are not accepted".to_string(),
                ));
            }
            Event::Decl(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(SamlError::XmlParse(format!("unclosed element {}", open.name)));
    }
    root.ok_or_else(|| SamlError::MissingElement("document root element".to_string()))
}

fn element_from(start: &BytesStart<'_>) -> SamlResult<XmlElement> {
    let mut element = XmlElement::new(utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let name = utf8(attribute.key.as_ref())?;
        let raw = utf8(&attribute.value)?.replace(['\t', '\n', '\r'], " ");
        let value = unescape(&raw).map_err(quick_xml::Error::from)?.into_owned();
        element.attributes.push((name, value));
    }
    Ok(element)
}

fn check_depth(stack: &[XmlElement]) -> SamlResult<()> {
    if stack.len() >= MAX_DEPTH {
        return Err(SamlError::XmlParse(format!(
            "element nesting exceeds {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

// `\r\n` and a lone `\r` both become `\n` before any markup is read.
fn normalize_line_endings(xml: &str) -> Cow<'_, str> {
    if xml.contains('\r') {
        Cow::Owned(xml.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(xml)
    }
}

fn close(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(SamlError::XmlParse("multiple root elements".to_string()));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: String) -> SamlResult<()> {
    let Some(parent) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(SamlError::XmlParse("text outside the root element".to_string()));
    };

    if let Some(XmlNode::Text(previous)) = parent.children.last_mut() {
        previous.push_str(&text);
    } else {
        parent.children.push(XmlNode::Text(text));
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> SamlResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SamlError::XmlParse(format!("invalid UTF-8: {e}")))
}
