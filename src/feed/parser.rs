use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::feed::error::FeedError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub media_type: Option<String>,
}

impl MediaRef {
    pub fn is_image(&self) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
    }
}

/// One `<item>` (RSS) or `<entry>` (Atom), before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub encoded_content: Option<String>,
    pub published: Option<String>,
    pub pub_date: Option<String>,
    pub updated: Option<String>,
    pub created: Option<String>,
    pub categories: Vec<String>,
    pub media_content: Vec<MediaRef>,
    pub media_thumbnails: Vec<String>,
    pub enclosures: Vec<MediaRef>,
}

impl FeedEntry {
    /// Date candidates in order of preference.
    pub fn date_candidates(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("published", self.published.as_deref()),
            ("pubDate", self.pub_date.as_deref()),
            ("updated", self.updated.as_deref()),
            ("created", self.created.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

/// Content fields keep nested markup; every other field only takes text from
/// direct children of the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentField {
    Summary,
    Encoded,
}

impl ContentField {
    fn of(name: &str) -> Option<Self> {
        match name {
            "description" | "summary" => Some(Self::Summary),
            "content:encoded" | "content" => Some(Self::Encoded),
            _ => None,
        }
    }

    fn slot(self, entry: &mut FeedEntry) -> &mut Option<String> {
        match self {
            Self::Summary => &mut entry.summary,
            Self::Encoded => &mut entry.encoded_content,
        }
    }
}

/// Parse an RSS 2.0 or Atom document into its entries.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_reader(xml);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<FeedEntry> = None;
    // elements open inside the current entry, outermost first
    let mut open: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = qualified_name(&e);
                if let Some(entry) = current.as_mut() {
                    match enclosing_content(&open) {
                        Some(field) => {
                            let tag = format!("<{}>", String::from_utf8_lossy(&e));
                            push_markup(field.slot(entry), &tag);
                        }
                        None => apply_attributes(entry, &name, &e, open.is_empty()),
                    }
                    open.push(name);
                } else if is_entry(&name) {
                    current = Some(FeedEntry::default());
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    match enclosing_content(&open) {
                        Some(field) => {
                            let tag = format!("<{}/>", String::from_utf8_lossy(&e));
                            push_markup(field.slot(entry), &tag);
                        }
                        None => {
                            apply_attributes(entry, &qualified_name(&e), &e, open.is_empty())
                        }
                    }
                }
            }
            Ok(Event::End(e)) if current.is_some() => {
                if open.pop().is_none() {
                    entries.extend(current.take().map(finish));
                } else if let (Some(entry), Some(field)) =
                    (current.as_mut(), enclosing_content(&open))
                {
                    let tag = format!("</{}>", String::from_utf8_lossy(e.name().as_ref()));
                    push_markup(field.slot(entry), &tag);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(entry) = current.as_mut() {
                    match nested_content(&open) {
                        // nested markup stays escaped, like the tags around it
                        Some(field) => push_markup(field.slot(entry), &String::from_utf8_lossy(&e)),
                        None => {
                            let text = e
                                .unescape()
                                .map(|t| t.into_owned())
                                .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                            apply_text(entry, &open, &text);
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(entry) = current.as_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    match nested_content(&open) {
                        Some(field) => push_markup(field.slot(entry), &text),
                        None => apply_text(entry, &open, &text),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn is_entry(name: &str) -> bool {
    name == "item" || name == "entry"
}

/// Content field the open elements sit in, when the entry's direct child on
/// the stack is one.
fn enclosing_content(open: &[String]) -> Option<ContentField> {
    open.first().and_then(|name| ContentField::of(name))
}

/// Like `enclosing_content`, but only below the content element itself.
fn nested_content(open: &[String]) -> Option<ContentField> {
    if open.len() > 1 {
        enclosing_content(open)
    } else {
        None
    }
}

fn push_markup(slot: &mut Option<String>, markup: &str) {
    slot.get_or_insert_with(String::new).push_str(markup);
}

fn finish(mut entry: FeedEntry) -> FeedEntry {
    for slot in [&mut entry.summary, &mut entry.encoded_content] {
        *slot = slot
            .take()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
    }
    entry
}

fn qualified_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Media references count at any depth (`media:group` wraps them); links and
/// categories only as direct children, so an Atom `<source>` is ignored.
fn apply_attributes(entry: &mut FeedEntry, name: &str, e: &BytesStart, direct: bool) {
    match name {
        "media:content" => {
            if let Some(url) = attribute(e, "url") {
                entry.media_content.push(MediaRef {
                    url,
                    media_type: attribute(e, "type"),
                });
            }
        }
        "media:thumbnail" => {
            if let Some(url) = attribute(e, "url") {
                entry.media_thumbnails.push(url);
            }
        }
        "enclosure" => {
            if let Some(url) = attribute(e, "url") {
                entry.enclosures.push(MediaRef {
                    url,
                    media_type: attribute(e, "type"),
                });
            }
        }
        // Atom links carry the target in `href`
        "link" if direct => {
            let Some(href) = attribute(e, "href") else {
                return;
            };
            match attribute(e, "rel").as_deref() {
                None | Some("alternate") => {
                    if entry.link.is_none() {
                        entry.link = Some(href);
                    }
                }
                Some("enclosure") => entry.enclosures.push(MediaRef {
                    url: href,
                    media_type: attribute(e, "type"),
                }),
                _ => {}
            }
        }
        "category" if direct => {
            if let Some(term) = attribute(e, "term") {
                entry.categories.push(term);
            }
        }
        _ => {}
    }
}

fn apply_text(entry: &mut FeedEntry, open: &[String], text: &str) {
    let [element] = open else {
        return;
    };

    if let Some(field) = ContentField::of(element) {
        push_markup(field.slot(entry), text);
        return;
    }

    let text = text.trim();
    if text.is_empty() {
        return;
    }

    match element.as_str() {
        "title" => append(&mut entry.title, text),
        "link" => {
            if entry.link.is_none() {
                entry.link = Some(text.to_string());
            }
        }
        "pubDate" => append(&mut entry.pub_date, text),
        "published" => append(&mut entry.published, text),
        "updated" => append(&mut entry.updated, text),
        "dc:date" | "created" => append(&mut entry.created, text),
        "category" => entry.categories.push(text.to_string()),
        _ => {}
    }
}

fn append(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => existing.push_str(text),
        None => *slot = Some(text.to_string()),
    }
}
