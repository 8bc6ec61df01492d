#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Helpers for building and reading `$ref` strings that point into
//! `#/components/{section}/{name}`.
//!
//! Only local references are understood. External documents are never
//! fetched, and a `$ref` into another file is treated as opaque.

use percent_encoding::percent_decode_str;

/// Component section holding shared schemas.
pub const SCHEMAS: &str = "schemas";

/// Component section holding shared parameters.
pub const PARAMETERS: &str = "parameters";

/// Builds the local reference string for a component.
///
/// e.g. `("schemas", "pid")` -> `#/components/schemas/pid`
pub fn component_ref(section: &str, name: &str) -> String {
    format!(
        "#/components/{}/{}",
        section,
        encode_pointer_segment(name)
    )
}

/// Extracts a component name from a `$ref` if it points to `#/components/{section}/{name}`.
///
/// Returns `None` for references into other sections, deeper pointers, or
/// other documents.
pub fn extract_component_name(ref_str: &str, section: &str) -> Option<String> {
    let pointer = ref_str.strip_prefix("#/")?;
    let segments: Vec<&str> = pointer.split('/').collect();

    if segments.len() != 3 {
        return None;
    }
    if segments[0] != "components" || segments[1] != section {
        return None;
    }

    let name = decode_pointer_segment(segments[2]);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Encodes a component name as a JSON Pointer segment.
pub fn encode_pointer_segment(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}
