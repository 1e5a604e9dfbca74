//! File-to-entity classification
//!
//! A mapping matches a file when every required canonical column is
//! derivable from the normalized headers, and either a filename token
//! hits or the headers carry corroborating columns beyond the required
//! set. Among multiple matches the largest required-column overlap
//! wins; a remaining tie is unresolvable and the file stays
//! unclassified.

use crate::config::{EntityMapping, ImportConfig};
use crate::entity::EntityKind;
use tracing::debug;

/// Detect the entity behind a file, or None when no mapping matches
/// unambiguously
pub fn detect_entity(
    file_name: &str,
    headers: &[String],
    config: &ImportConfig,
) -> Option<EntityKind> {
    let lower_name = file_name.to_lowercase();

    let mut best: Option<(EntityKind, usize)> = None;
    let mut tied = false;

    for mapping in &config.mappings {
        let Some(overlap) = match_score(mapping, &lower_name, headers) else {
            continue;
        };
        match best {
            Some((_, best_overlap)) if overlap == best_overlap => tied = true,
            Some((_, best_overlap)) if overlap > best_overlap => {
                best = Some((mapping.entity, overlap));
                tied = false;
            }
            None => best = Some((mapping.entity, overlap)),
            _ => {}
        }
    }

    match best {
        Some((entity, overlap)) if !tied => {
            debug!(file = file_name, %entity, overlap, "classified input file");
            Some(entity)
        }
        Some(_) => {
            debug!(file = file_name, "ambiguous classification, multiple mappings tie");
            None
        }
        None => None,
    }
}

/// Required-column overlap when the mapping matches, None otherwise.
///
/// A mapping with a larger required set is the more specific candidate,
/// so its score outranks a mapping that merely tolerates the same
/// headers as optional columns.
fn match_score(mapping: &EntityMapping, lower_name: &str, headers: &[String]) -> Option<usize> {
    let canonical: Vec<&str> = headers
        .iter()
        .filter_map(|h| mapping.canonical_field(h))
        .collect();

    let required_overlap = mapping
        .required_columns
        .iter()
        .filter(|req| canonical.iter().any(|c| *c == req.as_str()))
        .count();
    if required_overlap < mapping.required_columns.len() {
        return None;
    }

    let token_hit = mapping
        .filename_tokens
        .iter()
        .any(|token| lower_name.contains(token.as_str()));
    let extra_columns = canonical.len() > mapping.required_columns.len();

    if token_hit || extra_columns {
        Some(required_overlap)
    } else {
        None
    }
}
