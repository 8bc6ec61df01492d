#![deny(missing_docs)]

//! # Reconciliation Context
//!
//! Per-run state threaded through every merge step: the mode flags, the
//! "already handled this run" sets, the cursor naming what is being
//! reconciled, and the diagnostic sink.
//!
//! Diagnostics are not errors. They describe content in the existing
//! document that disagrees with the registry and was left alone.

use crate::document::{Method, JSON_CONTENT};
use crate::landmarks::{JsonPath, LandmarkIndex};
use std::collections::HashSet;
use std::fmt;

/// Mode flags for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Replace conflicting `$ref`s in the input.
    pub override_ref: bool,
    /// Replace conflicting query and body parameters.
    pub override_param: bool,
    /// Replace conflicting response schemas and fields.
    pub override_response: bool,
    /// Replace operation tags with the registry's.
    pub override_tags: bool,
    /// Replace shared schemas and parameters with the built-in definitions.
    pub override_schema: bool,
    /// Let catalog summaries and descriptions replace existing text.
    pub override_description: bool,
    /// Sort tags and paths even when an existing document was supplied.
    pub sort: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            override_ref: false,
            override_param: false,
            override_response: false,
            override_tags: false,
            override_schema: false,
            override_description: true,
            sort: false,
        }
    }
}

/// Names touched so far this run.
///
/// Only used for membership tests; output order never comes from here.
#[derive(Debug, Clone, Default)]
pub struct SeenSets {
    /// Path templates produced.
    pub paths: HashSet<String>,
    /// Operations produced.
    pub operations: HashSet<(String, Method)>,
    /// Shared schemas referenced.
    pub schemas: HashSet<String>,
    /// Shared parameters referenced.
    pub parameters: HashSet<String>,
    /// Tags registered in the top-level tag list.
    pub tags: HashSet<String>,
}

/// The part of an operation being reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// `parameters`
    Query,
    /// `requestBody.content[content_type].schema`
    Body {
        /// Form content type the body schema lives under.
        content_type: String,
    },
    /// `responses.200` JSON schema.
    Response {
        /// Position of the inline object inside `allOf`, once known.
        all_of_index: Option<usize>,
    },
}

/// The operation (and part of it) under reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Path template.
    pub path: String,
    /// Operation method.
    pub method: Method,
    /// Current part, if one has been entered.
    pub part: Option<Part>,
}

impl Cursor {
    /// A cursor at the top of an operation.
    pub fn new(path: &str, method: Method) -> Self {
        Self {
            path: path.to_string(),
            method,
            part: None,
        }
    }

    /// `/path.method`, the prefix of operation diagnostics.
    pub fn scope(&self) -> String {
        format!("{}.{}", self.path, self.method)
    }

    /// Location of the operation object.
    pub fn operation_path(&self) -> JsonPath {
        JsonPath::root()
            .key("paths")
            .key(&self.path)
            .key(self.method.as_str())
    }
}

/// Identifies a field within the current part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId<'f> {
    /// Position in `parameters`.
    Index(usize),
    /// A property name.
    Name(&'f str),
    /// The `required` list itself.
    Required,
}

/// A non-fatal conflict report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// `file:line:col` of the offending input, when known.
    pub landmark: Option<String>,
    /// `/path.method` of the operation concerned.
    pub scope: Option<String>,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(landmark) = &self.landmark {
            write!(f, "{}: ", landmark)?;
        }
        if let Some(scope) = &self.scope {
            write!(f, "{}: ", scope)?;
        }
        f.write_str(&self.message)
    }
}

/// Mutable state for one reconciliation run.
#[derive(Debug)]
pub struct ReconcileContext<'a> {
    /// Mode flags.
    pub options: ReconcileOptions,
    /// Names touched so far.
    pub seen: SeenSets,
    /// Collected reports, in emission order.
    pub diagnostics: Vec<Diagnostic>,
    /// Current operation, if any.
    pub cursor: Option<Cursor>,
    landmarks: Option<&'a LandmarkIndex>,
}

impl<'a> ReconcileContext<'a> {
    /// A fresh context.
    pub fn new(options: ReconcileOptions, landmarks: Option<&'a LandmarkIndex>) -> Self {
        Self {
            options,
            seen: SeenSets::default(),
            diagnostics: Vec::new(),
            cursor: None,
            landmarks,
        }
    }

    /// Points the cursor at a new operation.
    pub fn enter_operation(&mut self, path: &str, method: Method) {
        self.cursor = Some(Cursor::new(path, method));
    }

    /// Moves the cursor to another part of the current operation.
    pub fn enter_part(&mut self, part: Part) {
        if let Some(cursor) = &mut self.cursor {
            cursor.part = Some(part);
        }
    }

    /// Clears the cursor.
    pub fn leave_operation(&mut self) {
        self.cursor = None;
    }

    /// Records a diagnostic located at `path` in the input, if it is indexed.
    pub fn report(&mut self, path: Option<JsonPath>, scope: Option<String>, message: String) {
        let landmark = match (self.landmarks, path) {
            (Some(index), Some(path)) => index.landmark(&path),
            _ => None,
        };
        tracing::trace!(?landmark, ?scope, "diagnostic recorded");
        self.diagnostics.push(Diagnostic {
            landmark,
            scope,
            message,
        });
    }

    /// Records a diagnostic about the current operation.
    pub fn warn(&mut self, message: String) {
        let scope = self.cursor.as_ref().map(Cursor::scope);
        self.report(None, scope, message);
    }

    /// Records a diagnostic about a member of the current operation object.
    pub fn warn_at(&mut self, key: &str, message: String) {
        let path = self.cursor.as_ref().map(|c| c.operation_path().key(key));
        let scope = self.cursor.as_ref().map(Cursor::scope);
        self.report(path, scope, message);
    }

    /// Records a diagnostic about one field of the current part.
    pub fn field_warn(&mut self, id: FieldId<'_>, message: String) {
        let path = self.field_path(id);
        let scope = self.cursor.as_ref().map(Cursor::scope);
        self.report(path, scope, message);
    }

    fn field_path(&self, id: FieldId<'_>) -> Option<JsonPath> {
        let cursor = self.cursor.as_ref()?;
        let op = cursor.operation_path();
        let schema = match (cursor.part.as_ref()?, id) {
            (Part::Query, FieldId::Index(i)) => return Some(op.key("parameters").index(i)),
            (Part::Body { content_type }, _) => op
                .key("requestBody")
                .key("content")
                .key(content_type)
                .key("schema"),
            (Part::Response { all_of_index: Some(i) }, _) => op
                .key("responses")
                .key("200")
                .key("content")
                .key(JSON_CONTENT)
                .key("schema")
                .key("allOf")
                .index(*i),
            _ => return None,
        };
        match id {
            FieldId::Name(name) => Some(schema.key("properties").key(name)),
            FieldId::Required => Some(schema.key("required")),
            FieldId::Index(_) => None,
        }
    }

    /// How fields of the current part are named in messages.
    pub fn field_description(&self) -> &'static str {
        match self.cursor.as_ref().and_then(|c| c.part.as_ref()) {
            Some(Part::Body { .. }) => "body parameter",
            Some(Part::Response { .. }) => "response field",
            _ => "parameter",
        }
    }

    /// Whether the current part may replace existing content.
    pub fn override_active(&self) -> bool {
        match self.cursor.as_ref().and_then(|c| c.part.as_ref()) {
            Some(Part::Response { .. }) => self.options.override_response,
            _ => self.options.override_param,
        }
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
