//! Core data models used throughout pubcat.
//!
//! These types represent the envelope records, topic trees, and catalog
//! snapshots that flow through the build and resolution pipeline. They
//! serialize with camelCase field names to match the wire shape of the
//! envelope store and the persisted snapshot files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level classification code for a publication.
///
/// Parsing is case-insensitive. Values that do not match one of the four
/// known codes fold to [`Programme::Pyp`], the default applied during
/// envelope normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Programme {
    #[serde(rename = "PYP")]
    Pyp,
    #[serde(rename = "MYP")]
    Myp,
    #[serde(rename = "DP")]
    Dp,
    #[serde(rename = "CP")]
    Cp,
}

impl Programme {
    /// All known programme codes, in display order.
    pub const ALL: [Programme; 4] = [Programme::Pyp, Programme::Myp, Programme::Dp, Programme::Cp];

    /// Normalize a raw programme value from an envelope record.
    ///
    /// Blank or unrecognized values fold to `Pyp`.
    pub fn parse(raw: &str) -> Programme {
        Programme::from_code(raw).unwrap_or(Programme::Pyp)
    }

    /// Strict, case-insensitive lookup. Used by the request surfaces,
    /// where an unknown code must not silently fold to a default.
    pub fn from_code(raw: &str) -> Option<Programme> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PYP" => Some(Programme::Pyp),
            "MYP" => Some(Programme::Myp),
            "DP" => Some(Programme::Dp),
            "CP" => Some(Programme::Cp),
            _ => None,
        }
    }

    /// Uppercase display code.
    pub fn code(&self) -> &'static str {
        match self {
            Programme::Pyp => "PYP",
            Programme::Myp => "MYP",
            Programme::Dp => "DP",
            Programme::Cp => "CP",
        }
    }

    /// Lowercase snapshot address (e.g. the PYP snapshot lives at `pyp`).
    pub fn key(&self) -> &'static str {
        match self {
            Programme::Pyp => "pyp",
            Programme::Myp => "myp",
            Programme::Dp => "dp",
            Programme::Cp => "cp",
        }
    }
}

/// A node in a publication's content map, possibly with nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub uri: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Topic>,
}

/// Metadata record for one language variant of one publication.
///
/// `programme`, `subject`, and `language` are always non-empty after
/// normalization: missing values default to `PYP`, `"general"`, and
/// `"en"` respectively, and `language` is lowercased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub programme: Programme,
    pub subject: String,
    pub publication: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_of: Option<String>,
    pub last_modified: DateTime<Utc>,
    /// Locator of the underlying map document.
    pub uri: String,
    /// Locator of the envelope record itself.
    pub envelope_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Topic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

/// Derived key linking same-publication envelopes across languages.
///
/// Pure function of one envelope's fields, by priority:
///
/// 1. trimmed lowercase `translation_of`, if non-empty;
/// 2. lowercase final path segment of `uri`, if present;
/// 3. lowercase `publication`, or `"untitled"` when that is empty.
pub fn translation_group(envelope: &Envelope) -> String {
    if let Some(parent) = &envelope.translation_of {
        let trimmed = parent.trim();
        if !trimmed.is_empty() {
            return trimmed.to_lowercase();
        }
    }

    if let Some(segment) = envelope.uri.rsplit('/').next() {
        let trimmed = segment.trim();
        if !trimmed.is_empty() {
            return trimmed.to_lowercase();
        }
    }

    let name = envelope.publication.trim();
    if name.is_empty() {
        "untitled".to_string()
    } else {
        name.to_lowercase()
    }
}

/// All language variants of one logical publication within a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationGroup {
    pub translation_group: String,
    pub publications: Vec<Envelope>,
}

/// One subject heading within a programme catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSection {
    pub subject: String,
    pub groups: Vec<PublicationGroup>,
}

/// Per-programme snapshot of subjects, translation groups, and envelopes.
///
/// Rebuilt wholly on each trigger; readers always observe a complete
/// snapshot, never a partially written one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub programme: Programme,
    pub subjects: Vec<SubjectSection>,
}

impl Catalog {
    /// An empty catalog for a programme with no observed envelopes.
    pub fn empty(programme: Programme) -> Catalog {
        Catalog {
            programme,
            subjects: Vec::new(),
        }
    }
}
