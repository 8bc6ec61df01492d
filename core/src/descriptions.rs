#![deny(missing_docs)]

//! # Description Catalog
//!
//! Summaries and descriptions authored in Markdown, merged into the document
//! by key. A file is a series of blocks:
//!
//! ```text
//! # get /{p}/review
//!
//! > Fetch a review
//!
//! Returns the review identified by `r`.
//! ```
//!
//! The heading is the lookup key (`info`, a path, `"<method> <path>"`, a tag
//! name, `schema NAME` or `parameter NAME`). A leading run of `> ` lines is
//! the summary; the rest of the block is the description.

use crate::document::{Describe, OPERATION_KEYS};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Summary and description for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionEntry {
    /// Lookup key.
    pub name: String,
    /// Short summary, from the leading quote block.
    pub summary: Option<String>,
    /// Remaining Markdown.
    pub description: Option<String>,
}

/// Keyed collection of description entries. Later entries replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct DescriptionCatalog {
    entries: HashMap<String, DescriptionEntry>,
}

impl DescriptionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any previous entry with the same key.
    pub fn insert(&mut self, mut entry: DescriptionEntry) {
        entry.name = normalize_key(&entry.name);
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Parses a Markdown file and adds its blocks. Returns how many were added.
    pub fn add_markdown(&mut self, text: &str) -> usize {
        let entries = parse_markdown(text);
        let n = entries.len();
        for entry in entries {
            self.insert(entry);
        }
        n
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&DescriptionEntry> {
        self.entries.get(&normalize_key(key))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the entry for `key` into `target`.
    ///
    /// A field is written only when the target's field is empty, or when
    /// `override_existing` is set. Returns true if an entry was found.
    pub fn apply<T: Describe + ?Sized>(
        &self,
        key: &str,
        target: &mut T,
        override_existing: bool,
    ) -> bool {
        let Some(entry) = self.get(key) else {
            return false;
        };
        if let (Some(summary), Some(slot)) = (&entry.summary, target.summary_slot()) {
            if override_existing || is_empty(slot) {
                *slot = Some(summary.clone());
            }
        }
        if let Some(description) = &entry.description {
            let slot = target.description_slot();
            if override_existing || is_empty(slot) {
                *slot = Some(description.clone());
            }
        }
        true
    }
}

fn is_empty(slot: &Option<String>) -> bool {
    slot.as_deref().unwrap_or("").is_empty()
}

/// Canonical form of a lookup key: whitespace collapsed, and a leading HTTP
/// method word lowercased (`GET /x` and `get /x` are the same key).
pub fn normalize_key(key: &str) -> String {
    let key = simplify_whitespace(key);
    match key.split_once(' ') {
        Some((first, rest)) if OPERATION_KEYS.contains(&first.to_ascii_lowercase().as_str()) => {
            format!("{} {}", first.to_ascii_lowercase(), rest)
        }
        _ => key,
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn simplify_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(r"(?m)^#[ \t]+([^\n]*?)[ \t]*\n").expect("Invalid regex")
    })
}

/// Parses a Markdown description file into entries.
///
/// Text that does not start with `#` yields nothing. Only level-one headings
/// (`# `) start a block.
pub fn parse_markdown(text: &str) -> Vec<DescriptionEntry> {
    if !text.starts_with('#') {
        return Vec::new();
    }
    let mut text = text.replace("\r\n", "\n").replace('\r', "\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }

    let headings: Vec<(usize, usize, String)> = heading_regex()
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = simplify_whitespace(caps.get(1)?.as_str());
            Some((whole.start(), whole.end(), name))
        })
        .collect();

    let mut entries = Vec::with_capacity(headings.len());
    for (i, (_, body_start, name)) in headings.iter().enumerate() {
        let body_end = headings.get(i + 1).map_or(text.len(), |next| next.0);
        entries.push(parse_block(name, &text[*body_start..body_end]));
    }
    entries
}

fn parse_block(name: &str, body: &str) -> DescriptionEntry {
    let mut rest = body.trim_start();
    let mut summary_lines = Vec::new();
    while let Some(line) = rest.strip_prefix("> ") {
        let (quoted, after) = line.split_once('\n').unwrap_or((line, ""));
        summary_lines.push(quoted);
        rest = after;
    }
    let summary = if summary_lines.is_empty() {
        None
    } else {
        Some(simplify_whitespace(&summary_lines.join(" ")))
    };
    let description = rest.trim();

    DescriptionEntry {
        name: name.to_string(),
        summary,
        description: if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        },
    }
}
