//! In-memory [`EnvelopeSource`] implementation for tests.
//!
//! Holds envelopes and raw documents behind `std::sync::RwLock`.
//! Search returns a minimal verbatim-match response; real ranking lives
//! in the external store.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Envelope;

use super::{EnvelopeSource, RawDocument};

/// In-memory source for tests.
#[derive(Default)]
pub struct MemoryEnvelopeSource {
    envelopes: RwLock<Vec<Envelope>>,
    documents: RwLock<HashMap<String, RawDocument>>,
    /// When true, every operation fails as if the store were down.
    unavailable: RwLock<bool>,
}

impl MemoryEnvelopeSource {
    pub fn new() -> MemoryEnvelopeSource {
        MemoryEnvelopeSource::default()
    }

    pub fn with_envelopes(envelopes: Vec<Envelope>) -> MemoryEnvelopeSource {
        let source = MemoryEnvelopeSource::new();
        *source.envelopes.write().unwrap() = envelopes;
        source
    }

    pub fn push_envelope(&self, envelope: Envelope) {
        self.envelopes.write().unwrap().push(envelope);
    }

    pub fn put_document(&self, uri: &str, doc: RawDocument) {
        self.documents.write().unwrap().insert(uri.to_string(), doc);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.read().unwrap() {
            bail!("envelope store unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl EnvelopeSource for MemoryEnvelopeSource {
    async fn list_envelopes(&self, language: Option<&str>) -> Result<Vec<Envelope>> {
        self.check_available()?;
        let envelopes = self.envelopes.read().unwrap();
        Ok(match language {
            Some(lang) => {
                let lang = lang.to_lowercase();
                envelopes
                    .iter()
                    .filter(|e| e.language == lang)
                    .cloned()
                    .collect()
            }
            None => envelopes.clone(),
        })
    }

    async fn read_document(&self, uri: &str) -> Result<Option<RawDocument>> {
        self.check_available()?;
        Ok(self.documents.read().unwrap().get(uri).cloned())
    }

    async fn search(&self, query: &str, page: u32, page_length: u32) -> Result<serde_json::Value> {
        self.check_available()?;
        let query_lower = query.to_lowercase();
        let envelopes = self.envelopes.read().unwrap();
        let matches: Vec<serde_json::Value> = envelopes
            .iter()
            .filter(|e| e.publication.to_lowercase().contains(&query_lower))
            .map(|e| serde_json::json!({ "uri": e.envelope_uri, "publication": e.publication }))
            .collect();
        Ok(serde_json::json!({
            "query": { "queryText": query, "page": page, "pageLength": page_length },
            "response": { "total": matches.len(), "results": matches }
        }))
    }
}
