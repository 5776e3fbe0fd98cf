//! XML → JSON conversion for directory responses.
//!
//! Elements become objects keyed by child name, leaf elements become strings,
//! attributes are stored as `@name` and mixed text as `#text`. A child name that
//! repeats becomes an array, so a list with a single element comes out as a bare
//! object. `extract_items` undoes that asymmetry.

use quick_xml::encoding::Decoder;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use tracing::warn;

use super::DirectoryError;
use crate::models::recipient::RawDirectoryEntry;

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn finish(self) -> (String, Value) {
        let text = self.text.trim();
        if self.children.is_empty() {
            return (self.name, Value::String(text.to_string()));
        }
        let mut children = self.children;
        if !text.is_empty() {
            children.insert("#text".to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(children))
    }
}

fn xml_err(e: impl std::fmt::Display) -> DirectoryError {
    DirectoryError::Xml(e.to_string())
}

fn utf8(bytes: &[u8]) -> Result<&str, DirectoryError> {
    std::str::from_utf8(bytes).map_err(xml_err)
}

/// Adds `value` under `name`, turning repeated names into arrays.
fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Appends the text of a general reference. Unknown named entities are kept verbatim.
fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<(), DirectoryError> {
    if let Some(ch) = reference.resolve_char_ref().map_err(xml_err)? {
        text.push(ch);
        return Ok(());
    }
    let name = reference.decode().map_err(xml_err)?;
    match resolve_predefined_entity(&name) {
        Some(resolved) => text.push_str(resolved),
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
    Ok(())
}

fn open_frame(start: &BytesStart<'_>, decoder: Decoder) -> Result<Frame, DirectoryError> {
    let name = start.local_name();
    let mut frame = Frame::new(utf8(name.as_ref())?.to_string());
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let local = attr.key.local_name();
        let key = utf8(local.as_ref())?;
        let value = attr.decode_and_unescape_value(decoder).map_err(xml_err)?;
        frame
            .children
            .insert(format!("@{key}"), Value::String(value.into_owned()));
    }
    Ok(frame)
}

/// Parses an XML document into `{ "<root>": <value> }`.
pub fn parse_document(xml: &str) -> Result<Value, DirectoryError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        match event {
            Event::Start(ref e) => stack.push(open_frame(e, reader.decoder())?),
            Event::Empty(ref e) => {
                let (name, value) = open_frame(e, reader.decoder())?.finish();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| DirectoryError::Xml("unbalanced end tag".to_string()))?;
                let (name, value) = frame.finish();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Text(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.xml_content().map_err(xml_err)?);
                }
            }
            Event::CData(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.decode().map_err(xml_err)?);
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    push_reference(&mut frame.text, e)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DirectoryError::Xml("unexpected end of document".to_string()));
    }

    let (name, value) = root.ok_or_else(|| DirectoryError::Xml("empty document".to_string()))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

/// Normalizes a list that may have been collapsed to a single value.
pub fn one_or_many(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        single => vec![single],
    }
}

/// Follows `path` (e.g. `response.items.item`) and returns the records there.
/// An empty container element yields an empty list.
pub fn extract_items(document: &Value, path: &str) -> Result<Vec<RawDirectoryEntry>, DirectoryError> {
    let missing = || DirectoryError::MissingItems(path.to_string());
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let (last, parents) = segments.split_last().ok_or_else(missing)?;

    let mut current = document;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get(*segment).ok_or_else(missing)?,
            Value::String(s) if s.is_empty() => return Ok(Vec::new()),
            _ => return Err(missing()),
        };
    }

    let items = match current {
        Value::Object(map) => map.get(*last).cloned().unwrap_or(Value::Null),
        Value::String(s) if s.is_empty() => Value::Null,
        _ => return Err(missing()),
    };

    Ok(one_or_many(items)
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(RawDirectoryEntry(fields)),
            Value::String(s) if s.is_empty() => None,
            other => {
                warn!("Skipping non-record directory item: {other}");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PATH: &str = "response.items.item";

    #[test]
    fn test_multiple_items_become_array() {
        let xml = r#"<?xml version="1.0"?>
            <response>
              <items>
                <item><fullName>Maria Rossi</fullName><mail>m.rossi@x.com</mail></item>
                <item><fullName>Luca Bianchi</fullName><mail/></item>
              </items>
            </response>"#;
        let doc = parse_document(xml).unwrap();
        let items = extract_items(&doc, PATH).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text("fullName"), Some("Maria Rossi"));
        assert_eq!(items[1].text("mail"), Some(""));
    }

    #[test]
    fn test_single_item_is_bare_object_in_document() {
        let xml = "<response><items><item><fullName>Maria Rossi</fullName><mail>m@x.com</mail></item></items></response>";
        let doc = parse_document(xml).unwrap();
        assert!(doc["response"]["items"]["item"].is_object());
    }

    #[test]
    fn test_single_item_normalized_to_one_entry() {
        let xml = "<response><items><item><fullName>Maria Rossi</fullName><mail>m@x.com</mail></item></items></response>";
        let doc = parse_document(xml).unwrap();
        let items = extract_items(&doc, PATH).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text("mail"), Some("m@x.com"));
    }

    #[test]
    fn test_empty_container_yields_no_items() {
        let doc = parse_document("<response><items/></response>").unwrap();
        assert!(extract_items(&doc, PATH).unwrap().is_empty());
    }

    #[test]
    fn test_missing_container_is_an_error() {
        let doc = parse_document("<response><people/></response>").unwrap();
        assert!(matches!(
            extract_items(&doc, PATH),
            Err(DirectoryError::MissingItems(_))
        ));
    }

    #[test]
    fn test_entities_and_cdata_are_decoded() {
        let xml = "<response><items><item><fullName>Ana &amp; Co</fullName><mail><![CDATA[a&c@x.com]]></mail></item></items></response>";
        let doc = parse_document(xml).unwrap();
        let items = extract_items(&doc, PATH).unwrap();
        assert_eq!(items[0].text("fullName"), Some("Ana & Co"));
        assert_eq!(items[0].text("mail"), Some("a&c@x.com"));
    }

    #[test]
    fn test_attributes_and_namespaces() {
        let xml = r#"<hr:response xmlns:hr="urn:hr"><hr:items><hr:item id="7"><hr:fullName>Eva Neri</hr:fullName></hr:item></hr:items></hr:response>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(
            doc["response"]["items"]["item"],
            json!({"@id": "7", "fullName": "Eva Neri"})
        );
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(parse_document("<response><items></response>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_one_or_many() {
        assert_eq!(one_or_many(Value::Null).len(), 0);
        assert_eq!(one_or_many(json!({"a": "b", "c": "d"})).len(), 1);
        assert_eq!(one_or_many(json!([{"a": 1}, {"a": 2}])).len(), 2);
    }

    #[test]
    fn test_character_references_in_text_and_attributes() {
        let xml = r#"<response><items><item dept="R&amp;D &#x41;"><fullName>Caf&#233; &#x41;gency &unknown;</fullName></item></items></response>"#;
        let doc = parse_document(xml).unwrap();
        let item = &doc["response"]["items"]["item"];
        assert_eq!(item["@dept"], "R&D A");
        assert_eq!(item["fullName"], "Café Agency &unknown;");
    }

    #[test]
    fn test_invalid_character_reference_is_an_error() {
        let xml = "<response><items><item><fullName>&#xZZ;</fullName></item></items></response>";
        assert!(matches!(parse_document(xml), Err(DirectoryError::Xml(_))));
    }
}
