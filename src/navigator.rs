//! Document map navigation.
//!
//! Walks a publication's topic tree to locate a target topic and to
//! compose the set of topics rendered as one reading view.
//!
//! # Composition rule
//!
//! Top-level map entries are independently navigable pages: locating one
//! yields exactly that node. Nested entries belong to a containing unit
//! read as a single composite view: locating one yields the node plus
//! its whole descendant subtree in document order.
//!
//! The navigation menu exposes only two structural tiers (top-level
//! items and their direct children); deeper nesting stays reachable
//! through [`assemble`].
//!
//! The map is a tree by contract. A repeated URI along one ancestry path
//! would make traversal ambiguous, so it fails loudly instead of being
//! skipped.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Topic;

/// Nesting guard for pathological map data.
const MAX_DEPTH: usize = 64;

/// A located topic and its nesting depth (root-listed topics are 0).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Located {
    pub uri: String,
    pub title: String,
    pub depth: usize,
}

/// One entry of a composite reading view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledTopic {
    pub uri: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Depth relative to the located topic (0 for the topic itself).
    pub relative_depth: usize,
}

/// A second-tier menu item (no children exposed).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub uri: String,
    pub title: String,
}

/// A top-level menu entry with its direct children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuEntry {
    pub uri: String,
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

/// Depth-first search for a topic by URI.
///
/// URIs are compared exactly after percent-decoding both sides; the
/// first match wins.
pub fn locate(topics: &[Topic], target_uri: &str) -> Result<Option<Located>> {
    let target = decode_uri(target_uri);
    let found = locate_node(topics, &target, 0, &mut Vec::new())?;
    Ok(found.map(|(topic, depth)| Located {
        uri: topic.uri.clone(),
        title: topic.title.clone(),
        depth,
    }))
}

/// Compose the reading view for a topic.
///
/// Depth 0: exactly the located node. Depth ≥ 1: the node plus its full
/// descendant subtree in document order, with depths relative to the
/// node. `None` when the topic is not in the map.
pub fn assemble(topics: &[Topic], target_uri: &str) -> Result<Option<Vec<AssembledTopic>>> {
    let target = decode_uri(target_uri);
    let found = locate_node(topics, &target, 0, &mut Vec::new())?;
    let (topic, depth) = match found {
        Some(found) => found,
        None => return Ok(None),
    };

    let mut view = Vec::new();
    if depth == 0 {
        view.push(entry(topic, 0));
    } else {
        flatten_subtree(topic, 0, &mut view);
    }
    Ok(Some(view))
}

/// Two-tier navigation menu for a map.
pub fn menu(topics: &[Topic]) -> Vec<MenuEntry> {
    topics
        .iter()
        .map(|topic| MenuEntry {
            uri: topic.uri.clone(),
            title: topic.title.clone(),
            children: topic
                .children
                .iter()
                .map(|child| MenuItem {
                    uri: child.uri.clone(),
                    title: child.title.clone(),
                })
                .collect(),
        })
        .collect()
}

fn locate_node<'a>(
    topics: &'a [Topic],
    target: &str,
    depth: usize,
    path: &mut Vec<String>,
) -> Result<Option<(&'a Topic, usize)>> {
    if depth > MAX_DEPTH {
        bail!("topic tree exceeds maximum depth of {MAX_DEPTH}");
    }

    for topic in topics {
        let uri = decode_uri(&topic.uri);
        if path.contains(&uri) {
            bail!("cycle detected in topic tree at {}", topic.uri);
        }
        if uri == target {
            return Ok(Some((topic, depth)));
        }

        path.push(uri);
        let found = locate_node(&topic.children, target, depth + 1, path)?;
        path.pop();
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn flatten_subtree(topic: &Topic, relative_depth: usize, out: &mut Vec<AssembledTopic>) {
    out.push(entry(topic, relative_depth));
    for child in &topic.children {
        flatten_subtree(child, relative_depth + 1, out);
    }
}

fn entry(topic: &Topic, relative_depth: usize) -> AssembledTopic {
    AssembledTopic {
        uri: topic.uri.clone(),
        title: topic.title.clone(),
        last_modified: topic.last_modified,
        relative_depth,
    }
}

fn decode_uri(uri: &str) -> String {
    match urlencoding::decode(uri) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => uri.to_string(),
    }
}
