//! XML branch of the feed parser.
//!
//! Parses the document into a small generic element tree, then maps the two
//! recognized dialects (Atom `<feed>`, RSS 2.0 `<rss><channel>`) onto the
//! raw feed shape shared with the JSON branch.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::app::{FreshetError, Result};
use crate::parser::{RawAuthor, RawDate, RawFeed, RawId, RawItem};

#[derive(Debug)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated direct text content, trimmed. CDATA sections pass
    /// through verbatim; escaped entities arrive already decoded.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(text) = node {
                out.push_str(text);
            }
        }
        out.trim().to_string()
    }
}

/// Build the element tree for a whole document and return its root.
pub(crate) fn parse_document(input: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FreshetError::Format(format!("invalid XML: {e}")))?;
        match event {
            Event::Start(start) => {
                let element = XmlElement::new(qualified_name(start.name().as_ref()), attrs(&start));
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = XmlElement::new(qualified_name(start.name().as_ref()), attrs(&start));
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| FreshetError::Format("unbalanced XML end tag".into()))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let decoded = text
                        .unescape()
                        .map(|cow| cow.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    parent.children.push(XmlNode::Text(decoded));
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(raw));
                }
            }
            Event::Eof => break,
            // Declarations, comments, PIs and doctypes carry no feed data.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FreshetError::Format("unclosed XML element".into()));
    }
    root.ok_or_else(|| FreshetError::Format("XML document has no root element".into()))
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    }
}

fn qualified_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn attrs(start: &quick_xml::events::BytesStart<'_>) -> Vec<(String, String)> {
    start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect()
}

/// Dispatch on the root element and map the document to the raw feed shape.
pub(crate) fn parse(input: &str) -> Result<RawFeed> {
    let root = parse_document(input)?;
    match root.name.as_str() {
        "feed" => Ok(atom(&root)),
        "rss" => root
            .elements()
            .find(|element| element.name == "channel")
            .map(rss2)
            .ok_or_else(|| FreshetError::Format("RSS document has no <channel>".into())),
        other => Err(FreshetError::Format(format!(
            "unrecognized feed root element <{other}>"
        ))),
    }
}

fn author_name(author: &XmlElement) -> Option<RawAuthor> {
    author
        .elements()
        .find(|element| element.name == "name")
        .map(|name| RawAuthor {
            name: Some(name.text()),
        })
}

fn atom(root: &XmlElement) -> RawFeed {
    let mut feed = RawFeed::default();
    for element in root.elements() {
        match element.name.as_str() {
            "title" => feed.title = Some(element.text()),
            "subtitle" => feed.description = Some(element.text()),
            "author" => {
                if let Some(author) = author_name(element) {
                    feed.authors.get_or_insert_with(Vec::new).push(author);
                }
            }
            "link" => {
                let rel = element.attr("rel");
                if (rel.is_none() || rel == Some("alternate")) && element.attr("href").is_some() {
                    feed.home_page_url = element.attr("href").map(String::from);
                }
            }
            "entry" => feed.items.push(atom_entry(element)),
            _ => {}
        }
    }
    feed
}

fn atom_entry(entry: &XmlElement) -> RawItem {
    let mut item = RawItem::default();
    for element in entry.elements() {
        match element.name.as_str() {
            "id" => item.id = Some(RawId::Text(element.text())),
            "title" => item.title = Some(element.text()),
            // `content` wins over `summary` regardless of document order.
            "summary" => {
                item.content_html.get_or_insert_with(|| element.text());
            }
            "content" => item.content_html = Some(element.text()),
            "published" => item.date_published = Some(RawDate::Text(element.text())),
            "author" => {
                if let Some(author) = author_name(element) {
                    item.authors.get_or_insert_with(Vec::new).push(author);
                }
            }
            "link" => {
                let rel = element.attr("rel");
                if (rel.is_none() || rel == Some("alternate")) && element.attr("href").is_some() {
                    item.url = element.attr("href").map(String::from);
                }
            }
            _ => {}
        }
    }
    item
}

fn rss2(channel: &XmlElement) -> RawFeed {
    let mut feed = RawFeed::default();
    for element in channel.elements() {
        match element.name.as_str() {
            "title" => feed.title = Some(element.text()),
            "link" => feed.home_page_url = Some(element.text()),
            "description" => feed.description = Some(element.text()),
            "item" => feed.items.push(rss2_item(element)),
            _ => {}
        }
    }
    feed
}

fn rss2_item(entry: &XmlElement) -> RawItem {
    let mut item = RawItem::default();
    for element in entry.elements() {
        match element.name.as_str() {
            "guid" => item.id = Some(RawId::Text(element.text())),
            "title" => item.title = Some(element.text()),
            // `content:encoded` wins over `description` regardless of order.
            "description" => {
                item.content_html.get_or_insert_with(|| element.text());
            }
            "content:encoded" => item.content_html = Some(element.text()),
            "pubDate" => item.date_published = Some(RawDate::Text(element.text())),
            "author" => {
                item.author = Some(RawAuthor {
                    name: Some(element.text()),
                })
            }
            "link" => item.url = Some(element.text()),
            _ => {}
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_tree_basics() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
            <rss version="2.0"><channel><title>T &amp; U</title></channel></rss>"#,
        )
        .unwrap();
        assert_eq!(root.name, "rss");
        assert_eq!(root.attr("version"), Some("2.0"));
        let channel = root.elements().next().unwrap();
        assert_eq!(channel.elements().next().unwrap().text(), "T & U");
    }

    #[test]
    fn test_cdata_passes_through() {
        let root = parse_document("<a><![CDATA[<b>kept</b>]]></a>").unwrap();
        assert_eq!(root.text(), "<b>kept</b>");
    }

    #[test]
    fn test_unclosed_document_fails() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("no markup").is_err());
    }

    #[test]
    fn test_unrecognized_root_fails() {
        let err = parse("<opml><body/></opml>").unwrap_err();
        assert!(err.to_string().contains("opml"));
    }

    #[test]
    fn test_rss_without_channel_fails() {
        assert!(parse("<rss version=\"2.0\"></rss>").is_err());
    }

    #[test]
    fn test_content_encoded_beats_description_in_any_order() {
        let before = parse(
            "<rss><channel><title>t</title><item>\
             <content:encoded>full</content:encoded><description>short</description>\
             </item></channel></rss>",
        )
        .unwrap();
        assert_eq!(before.items[0].content_html.as_deref(), Some("full"));

        let after = parse(
            "<rss><channel><title>t</title><item>\
             <description>short</description><content:encoded>full</content:encoded>\
             </item></channel></rss>",
        )
        .unwrap();
        assert_eq!(after.items[0].content_html.as_deref(), Some("full"));
    }

    #[test]
    fn test_atom_link_rel_alternate() {
        let feed = parse(
            r#"<feed xmlns="http://www.w3.org/2005/Atom">
                <title>t</title>
                <link rel="self" href="https://example.com/feed.atom"/>
                <link rel="alternate" href="https://example.com/"/>
            </feed>"#,
        )
        .unwrap();
        assert_eq!(feed.home_page_url.as_deref(), Some("https://example.com/"));
    }
}
