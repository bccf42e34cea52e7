//! Serialization through `quick-xml`'s writer.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;

use super::node::{XmlElement, XmlNode};
use crate::error::{SamlError, SamlResult};

/// Writes `root` and its subtree with no declaration and no indentation.
pub(crate) fn write(root: &XmlElement) -> SamlResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner()).map_err(|e| SamlError::XmlWrite(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> SamlResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute(Attribute {
            key: QName(name.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => {
                let escaped = escape(text.as_str()).replace('\r', "&#xD;");
                emit(writer, Event::Text(BytesText::from_escaped(escaped)))?;
            }
            XmlNode::Comment(comment) => {
                emit(writer, Event::Comment(BytesText::from_escaped(comment.as_str())))?;
            }
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SamlResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SamlError::XmlWrite(e.to_string()))
}

// Whitespace characters are written as references so that attribute-value
// normalization in the receiving parser leaves them intact.
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}
