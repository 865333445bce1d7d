//! Catalog construction.
//!
//! Groups the flat envelope listing into per-programme catalogs:
//! programme → subject → translation group → language variants. The
//! builder is a pure function of its input; fetching and persistence
//! live in [`crate::rebuild`].
//!
//! # Ordering rules
//!
//! - Subjects and groups appear in first-encounter order, not sorted.
//! - Within a group, the `en` variant (if any) is moved to the front;
//!   the relative order of the remaining members is preserved. No other
//!   ordering is guaranteed.
//! - Every one of the four known programmes yields a catalog, empty when
//!   no envelope referenced it.

use crate::models::{translation_group, Catalog, Envelope, Programme, PublicationGroup, SubjectSection};

/// Build one catalog per known programme from the full envelope listing.
///
/// Idempotent: the output depends only on `envelopes` and its order.
/// Because the grouping key *is* the computed translation group, every
/// member of a group shares it by construction; no reconciliation pass
/// is needed afterwards.
pub fn build_catalogs(envelopes: &[Envelope]) -> Vec<Catalog> {
    let mut catalogs: Vec<Catalog> = Programme::ALL.iter().map(|p| Catalog::empty(*p)).collect();

    for envelope in envelopes {
        let group_key = translation_group(envelope);

        // Catalogs are seeded in Programme::ALL declaration order.
        let catalog = &mut catalogs[envelope.programme as usize];

        let section = match catalog
            .subjects
            .iter_mut()
            .position(|s| s.subject == envelope.subject)
        {
            Some(idx) => &mut catalog.subjects[idx],
            None => {
                catalog.subjects.push(SubjectSection {
                    subject: envelope.subject.clone(),
                    groups: Vec::new(),
                });
                let last = catalog.subjects.len() - 1;
                &mut catalog.subjects[last]
            }
        };

        let group = match section
            .groups
            .iter_mut()
            .position(|g| g.translation_group == group_key)
        {
            Some(idx) => &mut section.groups[idx],
            None => {
                section.groups.push(PublicationGroup {
                    translation_group: group_key,
                    publications: Vec::new(),
                });
                let last = section.groups.len() - 1;
                &mut section.groups[last]
            }
        };

        group.publications.push(envelope.clone());
    }

    for catalog in &mut catalogs {
        for section in &mut catalog.subjects {
            for group in &mut section.groups {
                // Stable: non-en members keep their relative order.
                group.publications.sort_by_key(|e| e.language != "en");
            }
        }
    }

    catalogs
}
