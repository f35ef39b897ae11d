use crate::error::DocumentParseError;
use crate::field::Field;
use crate::record::MetadataRecord;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

pub const METADATA_FILE_NAME: &str = "ComicInfo.xml";
pub const ROOT_ELEMENT: &str = "ComicInfo";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const SCHEMA_ATTRIBUTES: &str = concat!(
    r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
    r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#
);
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn malformed(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> DocumentParseError {
    DocumentParseError::Malformed {
        position: reader.buffer_position() as u64,
        message: err.to_string(),
    }
}

/// Parses a metadata document. Children of the root element whose tag maps to
/// a known field and whose text is not blank become record entries; other
/// elements are skipped.
pub fn decode(bytes: &[u8]) -> Result<MetadataRecord, DocumentParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text =
        std::str::from_utf8(bytes).map_err(|e| DocumentParseError::Encoding(e.to_string()))?;

    let mut reader = Reader::from_str(text);
    let mut record = MetadataRecord::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut current: Option<Field> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                depth += 1;
                if depth == 1 {
                    seen_root = true;
                } else if depth == 2 {
                    current = std::str::from_utf8(element.local_name().as_ref())
                        .ok()
                        .and_then(Field::from_tag);
                    buffer.clear();
                }
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    seen_root = true;
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(field) = current.take() {
                        if !buffer.trim().is_empty() {
                            record.set(field, std::mem::take(&mut buffer));
                        }
                    }
                    buffer.clear();
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(content)) if depth == 2 => {
                let content = content.unescape().map_err(|e| malformed(&reader, e))?;
                buffer.push_str(&content);
            }
            Ok(Event::CData(content)) if depth == 2 => {
                buffer.push_str(&String::from_utf8_lossy(&content));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(malformed(&reader, err)),
        }
    }

    if depth != 0 {
        return Err(DocumentParseError::Unclosed);
    }
    if !seen_root {
        return Err(DocumentParseError::MissingRoot);
    }
    Ok(record)
}

/// Values that survive encoding. Blank values are dropped; a literal `"0"` is
/// always kept.
fn is_retained(value: &str) -> bool {
    value == "0" || !value.trim().is_empty()
}

/// Serializes a record. Output depends only on the record: elements are
/// ordered by tag name and the layout is fixed.
pub fn encode(record: &MetadataRecord) -> Vec<u8> {
    let mut elements: Vec<(&str, &str)> = record
        .iter()
        .filter(|(_, value)| is_retained(value))
        .map(|(field, value)| (field.tag(), value))
        .collect();
    elements.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::with_capacity(256);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    out.push_str(&format!("<{ROOT_ELEMENT} {SCHEMA_ATTRIBUTES}>\n"));
    for (tag, value) in elements {
        out.push_str(&format!("  <{tag}>{}</{tag}>\n", escape(value)));
    }
    out.push_str(&format!("</{ROOT_ELEMENT}>\n"));
    out.into_bytes()
}
