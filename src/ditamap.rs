//! DITA map parsing.
//!
//! Converts a map document (`<map>` with nested `<topicref>` elements)
//! into the [`Topic`] tree the navigator walks. Only the map structure
//! is interpreted; topic bodies are fetched separately through the
//! envelope store.
//!
//! Malformed XML, a missing `<map>` root, or a `<topicref>` without an
//! `href` are errors — a map that cannot be interpreted is never
//! silently defaulted.

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::models::Topic;

/// Parse a DITA map document into its topic tree.
pub fn parse_map(xml: &str) -> Result<Vec<Topic>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut roots: Vec<Topic> = Vec::new();
    let mut stack: Vec<Topic> = Vec::new();
    let mut saw_map = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"map" => saw_map = true,
                b"topicref" => stack.push(topic_from(&element)?),
                _ => {}
            },
            Ok(Event::Empty(element)) if element.name().as_ref() == b"topicref" => {
                let topic = topic_from(&element)?;
                attach(&mut stack, &mut roots, topic);
            }
            Ok(Event::End(element)) if element.name().as_ref() == b"topicref" => {
                let topic = stack
                    .pop()
                    .context("malformed DITA map: unbalanced </topicref>")?;
                attach(&mut stack, &mut roots, topic);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(err).context("malformed DITA map XML"),
        }
    }

    if !saw_map {
        bail!("malformed DITA map: no <map> element");
    }
    if !stack.is_empty() {
        bail!("malformed DITA map: unclosed <topicref>");
    }

    Ok(roots)
}

fn attach(stack: &mut [Topic], roots: &mut Vec<Topic>, topic: Topic) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(topic),
        None => roots.push(topic),
    }
}

fn topic_from(element: &BytesStart<'_>) -> Result<Topic> {
    let mut href: Option<String> = None;
    let mut navtitle: Option<String> = None;

    for attr in element.attributes() {
        let attr = attr.context("malformed DITA map: bad topicref attribute")?;
        let value = attr
            .unescape_value()
            .context("malformed DITA map: bad topicref attribute value")?;
        match attr.key.as_ref() {
            b"href" => href = Some(value.into_owned()),
            b"navtitle" => navtitle = Some(value.into_owned()),
            _ => {}
        }
    }

    let uri = match href {
        Some(href) if !href.trim().is_empty() => href,
        _ => bail!("malformed DITA map: <topicref> without href"),
    };

    let title = navtitle.unwrap_or_else(|| title_from_uri(&uri));

    Ok(Topic {
        uri,
        title,
        last_modified: None,
        children: Vec::new(),
    })
}

/// Fallback title: the file stem of the href, with separators spaced.
fn title_from_uri(uri: &str) -> String {
    let segment = uri.rsplit('/').next().unwrap_or(uri);
    let stem = segment.split('.').next().unwrap_or(segment);
    stem.replace(['-', '_'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map>
  <title>Chemistry Guide</title>
  <topicref href="/topics/intro.xml" navtitle="Introduction"/>
  <topicref href="/topics/unit-1.xml" navtitle="Unit 1">
    <topicref href="/topics/unit-1-theory.xml" navtitle="Theory">
      <topicref href="/topics/unit-1-theory-deep.xml"/>
    </topicref>
    <topicref href="/topics/unit-1-practice.xml" navtitle="Practice"/>
  </topicref>
</map>"#;

    #[test]
    fn parses_nested_topicrefs() {
        let topics = parse_map(SAMPLE_MAP).unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].title, "Introduction");
        assert_eq!(topics[1].children.len(), 2);
        assert_eq!(topics[1].children[0].children.len(), 1);
    }

    #[test]
    fn missing_navtitle_falls_back_to_file_stem() {
        let topics = parse_map(SAMPLE_MAP).unwrap();
        let deep = &topics[1].children[0].children[0];
        assert_eq!(deep.title, "unit 1 theory deep");
    }

    #[test]
    fn topicref_without_href_is_an_error() {
        let xml = r#"<map><topicref navtitle="Orphan"/></map>"#;
        let err = parse_map(xml).unwrap_err();
        assert!(err.to_string().contains("without href"));
    }

    #[test]
    fn document_without_map_element_is_an_error() {
        let xml = r#"<topic><title>Not a map</title></topic>"#;
        assert!(parse_map(xml).is_err());
    }

    #[test]
    fn truncated_xml_is_an_error() {
        let xml = r#"<map><topicref href="/topics/a.xml">"#;
        assert!(parse_map(xml).is_err());
    }
}
