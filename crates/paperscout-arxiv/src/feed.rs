//! Parsing of the arXiv Atom query response.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::ArxivError;

/// One `<entry>` of the feed, as raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// The abs URL, e.g. `http://arxiv.org/abs/2101.00001v2`.
    pub id: String,
    /// Title with internal whitespace collapsed.
    pub title: String,
    pub summary: String,
    /// Timestamp as sent by the server (RFC 3339).
    pub published: String,
    pub authors: Vec<String>,
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Name,
    Doi,
}

/// Parse every entry of an Atom feed, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, ArxivError> {
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;
    let mut in_author = false;
    let mut text = String::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"entry" => current = Some(FeedEntry::default()),
                    b"author" if current.is_some() => in_author = true,
                    name if current.is_some() => {
                        field = match name {
                            b"id" => Some(Field::Id),
                            b"title" => Some(Field::Title),
                            b"summary" => Some(Field::Summary),
                            b"published" => Some(Field::Published),
                            b"name" if in_author => Some(Field::Name),
                            b"doi" => Some(Field::Doi),
                            _ => None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if field.is_some() {
                    let t = e
                        .unescape()
                        .map_err(|err| ArxivError::Xml(err.to_string()))?;
                    text.push_str(&t);
                }
            }
            Ok(Event::CData(ref e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(ref e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"entry" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    b"author" => in_author = false,
                    _ => {
                        if let (Some(f), Some(entry)) = (field.take(), current.as_mut()) {
                            let value = text.trim();
                            match f {
                                Field::Id => entry.id = value.to_string(),
                                Field::Title => entry.title = collapse_whitespace(value),
                                Field::Summary => entry.summary = value.to_string(),
                                Field::Published => entry.published = value.to_string(),
                                Field::Name if !value.is_empty() => {
                                    entry.authors.push(value.to_string())
                                }
                                Field::Name => {}
                                Field::Doi => entry.doi = Some(value.to_string()),
                            }
                        }
                        text.clear();
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ArxivError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
