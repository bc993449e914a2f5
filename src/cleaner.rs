//! Extracts `*:encoded` elements (typically `content:encoded`) from an XML
//! document and reduces their HTML payload to plain text.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Value};
use tracing::error;

pub const NO_ENCODED_ELEMENTS: &str = "No encoded elements found.";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedElement {
    /// Qualified name, e.g. `content:encoded`.
    pub name: String,
    pub text: String,
}

impl EncodedElement {
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }
}

/// Every element whose name ends in `:encoded`, with the text it encloses.
/// Markup nested inside the element counts as a word break. A malformed
/// document yields nothing.
pub fn detect_encoded(xml: &str) -> Vec<EncodedElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut found = Vec::new();
    let mut current: Option<EncodedElement> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(element) = current.as_mut() {
                    depth += 1;
                    element.text.push(' ');
                } else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name.ends_with(":encoded") {
                        current = Some(EncodedElement {
                            name,
                            text: String::new(),
                        });
                        depth = 1;
                    }
                }
            }
            Ok(Event::Empty(e)) => match current.as_mut() {
                Some(element) => element.text.push(' '),
                None => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name.ends_with(":encoded") {
                        found.push(EncodedElement {
                            name,
                            text: String::new(),
                        });
                    }
                }
            },
            Ok(Event::End(_)) => {
                if let Some(element) = current.as_mut() {
                    depth -= 1;
                    if depth == 0 {
                        found.extend(current.take());
                    } else {
                        element.text.push(' ');
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(element) = current.as_mut() {
                    let raw = String::from_utf8_lossy(&t);
                    element.text.push_str(&xml_unescape(&raw));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(element) = current.as_mut() {
                    element.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                error!("XML Parsing Error: {}", e);
                return Vec::new();
            }
            _ => {}
        }
    }

    found
}

/// Unescape HTML entities, drop tags and collapse whitespace.
pub fn clean(text: &str) -> String {
    let unescaped = unescape_with(text, |entity| {
        resolve_predefined_entity(entity).or_else(|| resolve_html_entity(entity))
    })
    .unwrap_or(Cow::Borrowed(text));

    TAG_RE
        .replace_all(&unescaped, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleaned text keyed by local name. Elements that clean to nothing are left
/// out; a repeated name keeps the last occurrence.
pub fn compile(elements: &[EncodedElement]) -> Map<String, Value> {
    let mut result = Map::new();
    for element in elements {
        let cleaned = clean(&element.text);
        if !cleaned.is_empty() {
            result.insert(element.local_name().to_string(), Value::String(cleaned));
        }
    }
    result
}

pub fn process(xml: &str) -> Result<String, serde_json::Error> {
    let elements = detect_encoded(xml);
    if elements.is_empty() {
        return Ok(NO_ENCODED_ELEMENTS.to_string());
    }

    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    compile(&elements).serialize(&mut serializer)?;

    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn xml_unescape(raw: &str) -> Cow<'_, str> {
    unescape_with(raw, resolve_predefined_entity).unwrap_or(Cow::Borrowed(raw))
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    let resolved = match entity {
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "yen" => "\u{a5}",
        "cent" => "\u{a2}",
        "deg" => "\u{b0}",
        "times" => "\u{d7}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        _ => return None,
    };
    Some(resolved)
}
