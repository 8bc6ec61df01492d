#![deny(missing_docs)]

//! # Ordering
//!
//! Puts tags and paths into reading order: tags by a preferred sequence,
//! paths grouped by their first tag, then by each function's declared
//! `order`, then by function name. Both sorts are stable.

use crate::document::{Document, PathItem};
use crate::registry::FunctionRegistry;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Preferred tag sequence. Tags not listed follow, in discovery order.
pub const DEFAULT_TAG_ORDER: [&str; 16] = [
    "Submissions",
    "Documents",
    "Submission administration",
    "Search",
    "Tags",
    "Review preferences",
    "Reviews",
    "Comments",
    "Meeting tracker",
    "Users",
    "Profile",
    "Notifications",
    "Site information",
    "Site administration",
    "Settings",
    "Session",
];

/// Rank of each tag in the document's tag list.
fn tag_ranks(doc: &Document) -> HashMap<String, usize> {
    let mut ranks = HashMap::new();
    for (i, tag) in doc.tags.iter().flatten().enumerate() {
        let rank = DEFAULT_TAG_ORDER
            .iter()
            .position(|t| *t == tag.name)
            .unwrap_or(DEFAULT_TAG_ORDER.len() + i);
        ranks.insert(tag.name.clone(), rank);
    }
    ranks
}

/// Last segment of a path template; the function name.
fn function_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Sorts `doc.tags` and `doc.paths` in place.
pub fn sort_document(doc: &mut Document, registry: &FunctionRegistry) {
    let ranks = tag_ranks(doc);
    let rank = |tag: &str| ranks.get(tag).copied().unwrap_or(usize::MAX);

    if let Some(tags) = doc.tags.as_mut() {
        tags.sort_by_key(|t| rank(&t.name));
    }
    doc.paths
        .sort_by(|a_path, a, b_path, b| compare_paths(a_path, a, b_path, b, &rank, registry));
}

fn compare_paths(
    a_path: &str,
    a: &PathItem,
    b_path: &str,
    b: &PathItem,
    rank: &impl Fn(&str) -> usize,
    registry: &FunctionRegistry,
) -> Ordering {
    match (a.first_tag(), b.first_tag()) {
        (Some(at), Some(bt)) if at != bt => {
            return rank(at).cmp(&rank(bt)).then_with(|| at.cmp(bt));
        }
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        _ => {}
    }

    let (an, bn) = (function_name(a_path), function_name(b_path));
    match (registry.find(an), registry.find(bn)) {
        (Some(af), Some(bf)) => {
            let ao = af.order.unwrap_or(i64::MAX);
            let bo = bf.order.unwrap_or(i64::MAX);
            if ao != bo {
                return ao.cmp(&bo);
            }
        }
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (None, None) => {}
    }
    an.cmp(bn)
}
