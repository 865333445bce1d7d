//! # pubcat
//!
//! A multilingual publication catalog and resolution engine for
//! structured document stores.
//!
//! Pubcat reads publication *envelopes* (per-language metadata records)
//! out of a document store, derives per-programme catalogs grouped by
//! subject and translation group, and answers resolution requests
//! ("this programme, this publication, this language") with the
//! concrete envelope to serve — falling back to English when the
//! desired translation does not exist. It also navigates a
//! publication's DITA map to compose reading views and menus.
//!
//! ## Data Flow
//!
//! ```text
//! document store ──list──▶ envelopes ──build──▶ catalogs ──write──▶ snapshots
//!                                                                      │
//!            resolve / catalog / map endpoints ◀──────read────────────┘
//! ```
//!
//! Catalog construction is triggered (manually or by store update
//! events), never incremental: each pass lists every envelope, rebuilds
//! all four programme catalogs, and atomically replaces the previous
//! snapshots. Reads always see either the old snapshot or the new one.
//!
//! ## Modules
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`models`] | Envelope, topic, programme, and catalog types |
//! | [`catalog`] | Catalog construction from an envelope list |
//! | [`rebuild`] | Full rebuild pass and coalescing trigger scheduler |
//! | [`resolve`] | Publication resolution with language fallback |
//! | [`navigator`] | Topic location, composite views, menus |
//! | [`ditamap`] | DITA map XML to topic tree |
//! | [`source`] | Envelope store access (HTTP and in-memory) |
//! | [`snapshot`] | Catalog snapshot persistence (filesystem and in-memory) |
//! | [`config`] | TOML configuration |
//! | [`server`] | HTTP API server |

pub mod catalog;
pub mod config;
pub mod ditamap;
pub mod models;
pub mod navigator;
pub mod rebuild;
pub mod resolve;
pub mod server;
pub mod snapshot;
pub mod source;
