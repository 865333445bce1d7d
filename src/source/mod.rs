//! Envelope store abstraction.
//!
//! The [`EnvelopeSource`] trait defines the read operations the catalog
//! builder and resolver need from the external document store, enabling
//! pluggable backends (HTTP store, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! No operation here retries internally; timeouts and transport failures
//! surface to the caller as ordinary errors.

pub mod http;
pub mod memory;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Envelope, Programme, Topic};

/// A raw document fetched from the store by locator.
#[derive(Debug, Clone)]
pub enum RawDocument {
    /// Structured XML content (e.g. a DITA map or topic).
    Xml(String),
    /// Structured JSON content.
    Json(serde_json::Value),
    /// Binary content (e.g. an attached image).
    Binary {
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Read access to the envelope store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_envelopes`](EnvelopeSource::list_envelopes) | List envelope records, optionally filtered by language |
/// | [`read_document`](EnvelopeSource::read_document) | Fetch a raw document by locator |
/// | [`search`](EnvelopeSource::search) | Pass a full-text query through to the store |
#[async_trait]
pub trait EnvelopeSource: Send + Sync {
    /// List all envelope records in the configured collection.
    ///
    /// With a language filter, only envelopes whose normalized language
    /// matches are returned.
    async fn list_envelopes(&self, language: Option<&str>) -> Result<Vec<Envelope>>;

    /// Fetch a raw document (map, topic, or attachment) by locator.
    ///
    /// Returns `Ok(None)` when the store has no document at the locator.
    async fn read_document(&self, uri: &str) -> Result<Option<RawDocument>>;

    /// Pass a full-text search query through to the store.
    ///
    /// Ranking is entirely the store's concern; the response body is
    /// relayed as-is.
    async fn search(&self, query: &str, page: u32, page_length: u32) -> Result<serde_json::Value>;
}

/// Parse one raw envelope record into a normalized [`Envelope`].
///
/// The record's header block supplies the descriptive fields, with the
/// normalization defaults applied: blank or unknown `programme` folds to
/// PYP, `subject` defaults to `"general"`, `language` defaults to `"en"`
/// and is lowercased. The instance block supplies the topic tree and
/// attachment list.
///
/// A record without a header block cannot be interpreted and is an
/// error, not a default.
pub fn parse_envelope_record(envelope_uri: &str, record: &serde_json::Value) -> Result<Envelope> {
    let headers = record
        .pointer("/envelope/headers")
        .with_context(|| format!("malformed envelope record (no header block): {envelope_uri}"))?;

    let programme = Programme::parse(str_field(headers, "programme").unwrap_or_default());

    let subject = match str_field(headers, "subject") {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => "general".to_string(),
    };

    let language = match str_field(headers, "language") {
        Some(l) if !l.trim().is_empty() => l.trim().to_lowercase(),
        _ => "en".to_string(),
    };

    let publication = str_field(headers, "publication")
        .unwrap_or(envelope_uri)
        .to_string();

    let translation_of = str_field(headers, "translationOf")
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty());

    let last_modified = match str_field(headers, "lastModified") {
        Some(raw) => raw
            .parse::<DateTime<Utc>>()
            .with_context(|| format!("malformed lastModified on envelope {envelope_uri}"))?,
        None => Utc::now(),
    };

    let uri = str_field(headers, "uri").unwrap_or_default().to_string();

    let topics: Vec<Topic> = match record.pointer("/envelope/instance/ditaMap/files") {
        Some(files) => serde_json::from_value(files.clone())
            .with_context(|| format!("malformed topic list on envelope {envelope_uri}"))?,
        None => Vec::new(),
    };

    let attachments: Vec<String> = match record.pointer("/envelope/instance/ditaMap/attachments") {
        Some(list) => serde_json::from_value(list.clone())
            .with_context(|| format!("malformed attachment list on envelope {envelope_uri}"))?,
        None => Vec::new(),
    };

    if publication.trim().is_empty() {
        bail!("malformed envelope record (no publication name or uri): {envelope_uri}");
    }

    Ok(Envelope {
        programme,
        subject,
        publication,
        language,
        translation_of,
        last_modified,
        uri,
        envelope_uri: envelope_uri.to_string(),
        topics,
        attachments,
    })
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_full_record() {
        let record = json!({
            "envelope": {
                "headers": {
                    "publication": "Chemistry Guide",
                    "programme": "dp",
                    "subject": "sciences",
                    "language": "EN",
                    "uri": "/maps/chem-guide.ditamap",
                    "lastModified": "2025-03-10T12:00:00Z"
                },
                "instance": {
                    "ditaMap": {
                        "files": [
                            { "uri": "/topics/intro.xml", "title": "Introduction" }
                        ],
                        "attachments": ["/images/cover.png"]
                    }
                }
            }
        });

        let env = parse_envelope_record("/envelopes/chem-en.json", &record).unwrap();
        assert_eq!(env.programme, Programme::Dp);
        assert_eq!(env.subject, "sciences");
        assert_eq!(env.language, "en");
        assert_eq!(env.topics.len(), 1);
        assert_eq!(env.attachments, vec!["/images/cover.png".to_string()]);
    }

    #[test]
    fn applies_defaults_for_missing_fields() {
        let record = json!({
            "envelope": {
                "headers": { "publication": "Loose Record" }
            }
        });

        let env = parse_envelope_record("/envelopes/loose.json", &record).unwrap();
        assert_eq!(env.programme, Programme::Pyp);
        assert_eq!(env.subject, "general");
        assert_eq!(env.language, "en");
        assert!(env.topics.is_empty());
    }

    #[test]
    fn record_without_header_block_is_an_error() {
        let record = json!({ "envelope": { "instance": {} } });
        let err = parse_envelope_record("/envelopes/broken.json", &record).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn bad_timestamp_is_an_error_not_a_default() {
        let record = json!({
            "envelope": {
                "headers": {
                    "publication": "Bad Clock",
                    "lastModified": "yesterday-ish"
                }
            }
        });
        let err = parse_envelope_record("/envelopes/clock.json", &record).unwrap_err();
        assert!(err.to_string().contains("lastModified"));
    }
}
