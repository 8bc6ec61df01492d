#![deny(missing_docs)]

//! # Function Registry
//!
//! Stores the API function descriptors the specification is generated from.
//! Descriptors are read from JSON in one of two layouts:
//!
//! - an array of descriptor objects, each carrying its `name`;
//! - an object mapping a function name to a descriptor or a list of them.
//!
//! Loading several files appends to the same registry.

use crate::document::{Method, RefOr, Schema};
use crate::error::{AppError, AppResult};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Parameter or response tokens: one space-separated string or a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TokenList {
    /// `"p ?q =body"`
    Text(String),
    /// `["p", "?q", "=body"]`
    List(Vec<String>),
}

impl TokenList {
    /// The individual tokens, empty ones skipped.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            TokenList::Text(s) => s.split_whitespace().collect(),
            TokenList::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// The declared type of a parameter or response field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeAnnotation {
    /// A primitive (`integer`), a common schema (`pid`), or `[X]` for an array of X.
    Name(String),
    /// An inline schema object, used as is.
    Inline(RefOr<Schema>),
    /// Anything else; reported and treated as untyped.
    Invalid(Value),
}

/// One API function as declared by the application.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FunctionDescriptor {
    /// Function name; also the final path segment.
    pub name: String,
    /// Allows GET.
    pub get: bool,
    /// Allows POST explicitly.
    pub post: bool,
    /// Scoped to a submission; implies a leading required `p`.
    pub paper: bool,
    /// Request parameter tokens.
    pub parameters: Option<TokenList>,
    /// Response field tokens.
    pub response: Option<TokenList>,
    /// Types for request parameters, keyed by name.
    pub parameter_info: IndexMap<String, TypeAnnotation>,
    /// Types for response fields, keyed by name.
    pub response_info: IndexMap<String, TypeAnnotation>,
    /// Operation tags.
    pub tags: Option<Vec<String>>,
    /// Explicit sort position among functions sharing a tag.
    pub order: Option<i64>,
    /// Accepts a `redirect` parameter.
    pub redirect: bool,
    /// Fallback operation description.
    pub description: Option<String>,
    /// Name of the function this entry aliases; aliases are not expanded.
    pub alias: Option<String>,
}

impl FunctionDescriptor {
    /// True when this entry is an alias of another function.
    pub fn is_alias(&self) -> bool {
        self.alias.is_some()
    }

    /// Whether the function answers `method`.
    ///
    /// GET requires `get`; POST is implied unless the function is GET-only.
    pub fn supports(&self, method: Method) -> bool {
        match method {
            Method::Get => self.get,
            Method::Post => self.post || !self.get,
        }
    }
}

/// Lookup table of function descriptors keyed by function name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, Vec<FunctionDescriptor>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one descriptor under its own name.
    pub fn insert(&mut self, desc: FunctionDescriptor) {
        self.functions
            .entry(desc.name.clone())
            .or_default()
            .push(desc);
    }

    /// Parses registry JSON text and adds every descriptor it contains.
    pub fn load_json_str(&mut self, text: &str) -> AppResult<()> {
        let raw: Value = serde_json::from_str(text)?;
        self.load_json(raw)
    }

    /// Adds every descriptor in an already parsed registry value.
    pub fn load_json(&mut self, raw: Value) -> AppResult<()> {
        match raw {
            Value::Array(items) => {
                for item in items {
                    let desc: FunctionDescriptor = serde_json::from_value(item)?;
                    if desc.name.is_empty() {
                        return Err(AppError::InvalidInput(
                            "function descriptor without a `name`".into(),
                        ));
                    }
                    self.insert(desc);
                }
            }
            Value::Object(map) => {
                for (name, entry) in map {
                    let entries = match entry {
                        Value::Array(items) => items,
                        single @ Value::Object(_) => vec![single],
                        _ => {
                            return Err(AppError::InvalidInput(format!(
                                "function `{}` must be an object or a list of objects",
                                name
                            )))
                        }
                    };
                    for item in entries {
                        let mut desc: FunctionDescriptor = serde_json::from_value(item)?;
                        desc.name = name.clone();
                        self.insert(desc);
                    }
                }
            }
            _ => {
                return Err(AppError::InvalidInput(
                    "function registry must be a JSON array or object".into(),
                ))
            }
        }
        Ok(())
    }

    /// Function names with at least one non-alias entry, sorted.
    pub fn expandable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .functions
            .iter()
            .filter(|(_, entries)| entries.iter().any(|d| !d.is_alias()))
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// The first non-alias entry for `name` that answers `method`.
    pub fn lookup(&self, name: &str, method: Method) -> Option<&FunctionDescriptor> {
        self.functions
            .get(name)?
            .iter()
            .find(|d| !d.is_alias() && d.supports(method))
    }

    /// The first non-alias entry for `name`, whatever its methods.
    pub fn find(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)?.iter().find(|d| !d.is_alias())
    }

    /// Number of distinct function names.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True when no function has been loaded.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
