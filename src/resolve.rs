//! Publication resolution.
//!
//! Maps a (programme, publication name, language) request to the
//! concrete envelope to serve. Candidates come from the programme's
//! catalog snapshot when one exists, otherwise from a direct store
//! lookup with a two-step language fallback (desired language, then
//! `en`). Selection prefers the desired language, then `en`, then the
//! first candidate in source order.
//!
//! "Not found" is a normal negative result (`Ok(None)`), not a fault.
//! Resolution is read-only; its only signal back to the caller is the
//! canonical-name field when the stored name differs from the request.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::models::{translation_group, Envelope, Programme};
use crate::snapshot::SnapshotStore;
use crate::source::EnvelopeSource;

/// One resolution request.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub programme: String,
    pub publication: String,
    /// Desired language; blank defaults to `en`.
    pub language: String,
    /// Previously-learned translation group, matched case-insensitively
    /// against each candidate's computed group when supplied.
    pub group_hint: Option<String>,
}

/// A successful resolution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub envelope: Envelope,
    /// Set when the stored publication name differs (case-insensitively)
    /// from the requested one, so the consumer can update its persisted
    /// reference. A side channel, not a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
}

pub struct Resolver {
    source: Arc<dyn EnvelopeSource>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl Resolver {
    pub fn new(source: Arc<dyn EnvelopeSource>, snapshots: Arc<dyn SnapshotStore>) -> Resolver {
        Resolver { source, snapshots }
    }

    /// Resolve a request to a concrete envelope, or `None` when no
    /// candidate matches.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Option<Resolution>> {
        if request.programme.trim().is_empty() {
            bail!("missing parameter: programme");
        }
        if request.publication.trim().is_empty() {
            bail!("missing parameter: publication");
        }

        let language = if request.language.trim().is_empty() {
            "en".to_string()
        } else {
            request.language.trim().to_lowercase()
        };

        let candidates = self.candidates(&request.programme, &language).await?;
        Ok(select_candidate(&candidates, request, &language))
    }

    /// Candidate envelopes for the request, catalog-first.
    ///
    /// When the programme has a snapshot, every envelope in it is a
    /// candidate (the snapshot already holds all languages). Without a
    /// snapshot, the store is queried for the desired language and then
    /// for `en` when that set is empty.
    async fn candidates(&self, programme: &str, language: &str) -> Result<Vec<Envelope>> {
        if let Some(programme) = Programme::from_code(programme) {
            if let Some(catalog) = self.snapshots.read(programme).await? {
                return Ok(catalog
                    .subjects
                    .iter()
                    .flat_map(|s| &s.groups)
                    .flat_map(|g| &g.publications)
                    .cloned()
                    .collect());
            }
        }

        let mut listed = self.source.list_envelopes(Some(language)).await?;
        if listed.is_empty() && language != "en" {
            listed = self.source.list_envelopes(Some("en")).await?;
        }
        Ok(listed)
    }
}

/// Narrow the candidate set and pick the envelope to serve.
///
/// Narrowing: programme code match (case-insensitive), then either the
/// translation-group hint against each candidate's computed group, or
/// the publication name. Selection: desired language first, `en`
/// second, else the first narrowed candidate in source order.
pub fn select_candidate(
    candidates: &[Envelope],
    request: &ResolveRequest,
    language: &str,
) -> Option<Resolution> {
    let programme = request.programme.trim();
    let publication = request.publication.trim();
    let hint = request
        .group_hint
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());

    let narrowed: Vec<&Envelope> = candidates
        .iter()
        .filter(|e| e.programme.code().eq_ignore_ascii_case(programme))
        .filter(|e| match hint {
            Some(hint) => translation_group(e).eq_ignore_ascii_case(hint),
            None => e.publication.eq_ignore_ascii_case(publication),
        })
        .collect();

    let selected = narrowed
        .iter()
        .find(|e| e.language == language)
        .or_else(|| narrowed.iter().find(|e| e.language == "en"))
        .or_else(|| narrowed.first())?;

    // Matching is case-insensitive, but the signal fires on any textual
    // difference so the consumer can persist the canonical spelling.
    let canonical_name = if selected.publication == publication {
        None
    } else {
        Some(selected.publication.clone())
    };

    Some(Resolution {
        envelope: (*selected).clone(),
        canonical_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::memory::MemorySnapshotStore;
    use crate::source::memory::MemoryEnvelopeSource;
    use chrono::{TimeZone, Utc};

    fn envelope(publication: &str, language: &str, of: Option<&str>) -> Envelope {
        Envelope {
            programme: Programme::Dp,
            subject: "general".to_string(),
            publication: publication.to_string(),
            language: language.to_string(),
            translation_of: of.map(|s| s.to_string()),
            last_modified: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
            uri: format!("/maps/{}-{}.ditamap", publication.to_lowercase(), language),
            envelope_uri: format!("/envelopes/{}-{}.json", publication.to_lowercase(), language),
            topics: Vec::new(),
            attachments: Vec::new(),
        }
    }

    fn request(publication: &str, language: &str, hint: Option<&str>) -> ResolveRequest {
        ResolveRequest {
            programme: "dp".to_string(),
            publication: publication.to_string(),
            language: language.to_string(),
            group_hint: hint.map(|s| s.to_string()),
        }
    }

    #[test]
    fn falls_back_to_english_when_desired_language_absent() {
        let candidates = vec![
            envelope("Guide de chimie", "fr", Some("Chemistry Guide")),
            envelope("Chemistry Guide", "en", Some("Chemistry Guide")),
        ];
        let req = request("anything", "es", Some("chemistry guide"));
        let resolution = select_candidate(&candidates, &req, "es").unwrap();
        assert_eq!(resolution.envelope.language, "en");
    }

    #[test]
    fn prefers_exact_language_over_english() {
        let candidates = vec![
            envelope("Chemistry Guide", "en", Some("Chemistry Guide")),
            envelope("Guide de chimie", "fr", Some("Chemistry Guide")),
        ];
        let req = request("anything", "fr", Some("chemistry guide"));
        let resolution = select_candidate(&candidates, &req, "fr").unwrap();
        assert_eq!(resolution.envelope.language, "fr");
    }

    #[test]
    fn first_candidate_wins_when_no_language_matches() {
        let candidates = vec![
            envelope("Guía", "es", Some("Core Guide")),
            envelope("Guide", "fr", Some("Core Guide")),
        ];
        let req = request("anything", "de", Some("core guide"));
        let resolution = select_candidate(&candidates, &req, "de").unwrap();
        assert_eq!(resolution.envelope.language, "es");
    }

    #[test]
    fn canonicalization_signals_differing_name() {
        let candidates = vec![envelope("Clogs", "en", None)];

        // A case-only difference still resolves, and signals the
        // canonical spelling for the consumer to persist.
        let req = request("clogs", "en", None);
        let resolution = select_candidate(&candidates, &req, "en").unwrap();
        assert_eq!(resolution.canonical_name.as_deref(), Some("Clogs"));

        let req = request("Clogs", "en", None);
        let resolution = select_candidate(&candidates, &req, "en").unwrap();
        assert!(resolution.canonical_name.is_none());

        let req = request("old name", "en", Some("clogs-en.ditamap"));
        let resolution = select_candidate(&candidates, &req, "en").unwrap();
        assert_eq!(resolution.canonical_name.as_deref(), Some("Clogs"));
    }

    #[test]
    fn hint_overrides_publication_name() {
        let candidates = vec![envelope("Chemistry Guide", "en", Some("Chemistry Guide"))];
        let req = request("totally different", "en", Some("CHEMISTRY GUIDE"));
        assert!(select_candidate(&candidates, &req, "en").is_some());
    }

    #[test]
    fn wrong_programme_never_matches() {
        let candidates = vec![envelope("Chemistry Guide", "en", None)];
        let mut req = request("Chemistry Guide", "en", None);
        req.programme = "myp".to_string();
        assert!(select_candidate(&candidates, &req, "en").is_none());
    }

    #[tokio::test]
    async fn resolver_reads_catalog_when_snapshot_exists() {
        let source = Arc::new(MemoryEnvelopeSource::new());
        let snapshots = Arc::new(MemorySnapshotStore::new());

        let envelopes = vec![
            envelope("Chemistry Guide", "en", Some("Chemistry Guide")),
            envelope("Guide de chimie", "fr", Some("Chemistry Guide")),
        ];
        for catalog in crate::catalog::build_catalogs(&envelopes) {
            snapshots.write(&catalog).await.unwrap();
        }

        // Note: the source is empty; candidates must come from the catalog.
        let resolver = Resolver::new(source, snapshots);

        // The group hint bridges the differing per-language names.
        let resolution = resolver
            .resolve(&request("Chemistry Guide", "fr", Some("chemistry guide")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolution.envelope.language, "fr");

        // By name alone, only the same-named edition is a candidate.
        let resolution = resolver
            .resolve(&request("Guide de chimie", "fr", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolution.envelope.publication, "Guide de chimie");
    }

    #[tokio::test]
    async fn resolver_falls_back_to_source_without_snapshot() {
        let source = Arc::new(MemoryEnvelopeSource::with_envelopes(vec![envelope(
            "Chemistry Guide",
            "en",
            None,
        )]));
        let snapshots = Arc::new(MemorySnapshotStore::new());

        let resolver = Resolver::new(source, snapshots);
        let resolution = resolver
            .resolve(&request("chemistry guide", "es", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolution.envelope.language, "en");
        assert_eq!(resolution.canonical_name.as_deref(), Some("Chemistry Guide"));
    }

    #[tokio::test]
    async fn missing_parameters_fail_immediately() {
        let resolver = Resolver::new(
            Arc::new(MemoryEnvelopeSource::new()),
            Arc::new(MemorySnapshotStore::new()),
        );

        let mut req = request("Chemistry Guide", "en", None);
        req.programme = "  ".to_string();
        let err = resolver.resolve(&req).await.unwrap_err();
        assert!(err.to_string().contains("missing parameter"));
    }

    #[tokio::test]
    async fn no_match_is_a_negative_result_not_an_error() {
        let resolver = Resolver::new(
            Arc::new(MemoryEnvelopeSource::new()),
            Arc::new(MemorySnapshotStore::new()),
        );
        let outcome = resolver
            .resolve(&request("Nowhere Guide", "en", None))
            .await
            .unwrap();
        assert!(outcome.is_none());
    }
}
