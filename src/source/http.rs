//! HTTP [`EnvelopeSource`] backed by the document store's REST surface.
//!
//! Talks to the store configured under `[store]`: envelope listings come
//! from a collection-scoped search, raw documents from the documents
//! endpoint, and full-text search is proxied verbatim. Transport
//! failures and unparseable payloads surface to the caller; retry and
//! backoff are the caller's concern.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::models::Envelope;

use super::{parse_envelope_record, EnvelopeSource, RawDocument};

/// [`EnvelopeSource`] implementation over the store's REST API.
pub struct HttpEnvelopeSource {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl HttpEnvelopeSource {
    pub fn new(config: &StoreConfig) -> Result<HttpEnvelopeSource> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for the envelope store")?;

        Ok(HttpEnvelopeSource {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }
}

#[async_trait]
impl EnvelopeSource for HttpEnvelopeSource {
    async fn list_envelopes(&self, language: Option<&str>) -> Result<Vec<Envelope>> {
        let mut url = format!(
            "{}/v1/search?format=json&view=documents&collection={}",
            self.base_url,
            urlencoding::encode(&self.collection)
        );
        if let Some(lang) = language {
            url.push_str("&language=");
            url.push_str(&urlencoding::encode(lang));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("envelope store unreachable")?;

        if !response.status().is_success() {
            bail!(
                "envelope store unreachable: listing returned {}",
                response.status()
            );
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("malformed envelope listing from store")?;

        let results = body
            .get("results")
            .and_then(|r| r.as_array())
            .context("malformed envelope listing from store (no results array)")?;

        let mut envelopes = Vec::with_capacity(results.len());
        for result in results {
            let uri = result
                .get("uri")
                .and_then(|u| u.as_str())
                .context("malformed envelope listing from store (result without uri)")?;
            let content = result
                .get("content")
                .with_context(|| format!("malformed envelope record (no content): {uri}"))?;
            envelopes.push(parse_envelope_record(uri, content)?);
        }

        // The store's language filter is advisory; enforce it here so
        // callers can rely on the narrowed set.
        if let Some(lang) = language {
            let lang = lang.to_lowercase();
            envelopes.retain(|e| e.language == lang);
        }

        Ok(envelopes)
    }

    async fn read_document(&self, uri: &str) -> Result<Option<RawDocument>> {
        let url = format!(
            "{}/v1/documents?uri={}",
            self.base_url,
            urlencoding::encode(uri)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("envelope store unreachable")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!(
                "envelope store unreachable: document read returned {}",
                response.status()
            );
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if content_type.contains("json") {
            let value = response
                .json()
                .await
                .with_context(|| format!("malformed JSON document at {uri}"))?;
            Ok(Some(RawDocument::Json(value)))
        } else if content_type.contains("xml") {
            let text = response
                .text()
                .await
                .with_context(|| format!("malformed XML document at {uri}"))?;
            Ok(Some(RawDocument::Xml(text)))
        } else {
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("failed reading binary document at {uri}"))?;
            Ok(Some(RawDocument::Binary {
                content_type,
                bytes: bytes.to_vec(),
            }))
        }
    }

    async fn search(&self, query: &str, page: u32, page_length: u32) -> Result<serde_json::Value> {
        let start = search_start(page, page_length);
        let url = format!(
            "{}/v1/search?format=json&pageLength={}&start={}",
            self.base_url, page_length, start
        );

        let body = serde_json::json!({ "search": { "qtext": query } });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("envelope store unreachable")?;

        if !response.status().is_success() {
            bail!(
                "envelope store unreachable: search returned {}",
                response.status()
            );
        }

        response
            .json()
            .await
            .context("malformed search response from store")
    }
}

/// 1-based result offset for a page of the given length. Saturates so
/// adversarial paging values cannot overflow.
fn search_start(page: u32, page_length: u32) -> u32 {
    page_length
        .saturating_mul(page.saturating_sub(1))
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_start_is_one_based() {
        assert_eq!(search_start(1, 10), 1);
        assert_eq!(search_start(2, 10), 11);
        assert_eq!(search_start(0, 10), 1);
    }

    #[test]
    fn search_start_saturates_instead_of_overflowing() {
        assert_eq!(search_start(u32::MAX, u32::MAX), u32::MAX);
        assert_eq!(search_start(2, u32::MAX), u32::MAX);
    }
}
