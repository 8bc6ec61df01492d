#![deny(missing_docs)]

//! # Reconciler
//!
//! Expands every function in the registry into path operations and merges
//! them into an existing document (or an empty one).
//!
//! - **components**: lazy registration of shared schemas and parameters.
//! - **request**: query parameters and the form request body.
//! - **response**: the `200` and `default` responses.
//!
//! A run is one pass: expand, warn about input the registry does not know,
//! optionally sort, then tidy placeholder summaries.

mod components;
mod request;
mod response;

use crate::context::{Diagnostic, ReconcileContext, ReconcileOptions};
use crate::descriptions::DescriptionCatalog;
use crate::document::{Document, Method, Operation, Tag, OPENAPI_VERSION};
use crate::error::AppResult;
use crate::landmarks::{JsonPath, LandmarkIndex};
use crate::ordering::sort_document;
use crate::registry::{FunctionDescriptor, FunctionRegistry};
use crate::tokens::{parse_parameters, ParamFlags, PAPER_PARAM};
use indexmap::IndexMap;
use serde_json::Value;

/// Title used when the document has none.
pub const DEFAULT_TITLE: &str = "HotCRP";

/// Version used when the document has none.
pub const DEFAULT_VERSION: &str = "0.1";

/// The result of a run.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The reconciled document.
    pub document: Document,
    /// Conflicts found along the way, in discovery order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Merges a function registry into an OpenAPI document.
pub struct Reconciler<'a> {
    registry: &'a FunctionRegistry,
    descriptions: &'a DescriptionCatalog,
    doc: Document,
    batch: bool,
    ctx: ReconcileContext<'a>,
}

impl<'a> Reconciler<'a> {
    /// A reconciler that builds a document from scratch.
    pub fn new(
        registry: &'a FunctionRegistry,
        descriptions: &'a DescriptionCatalog,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            registry,
            descriptions,
            doc: Document::default(),
            batch: false,
            ctx: ReconcileContext::new(options, None),
        }
    }

    /// Merges into `doc` instead of an empty document.
    ///
    /// `landmarks` indexes the text `doc` was parsed from, so diagnostics can
    /// name input positions.
    pub fn with_existing(mut self, doc: Document, landmarks: Option<&'a LandmarkIndex>) -> Self {
        self.doc = doc;
        self.batch = true;
        self.ctx = ReconcileContext::new(self.ctx.options, landmarks);
        self
    }

    /// Runs the reconciliation.
    pub fn run(mut self) -> AppResult<Reconciliation> {
        self.expand_info();

        let registry = self.registry;
        for name in registry.expandable_names() {
            self.expand_function(name)?;
        }
        self.ctx.leave_operation();

        if self.batch {
            self.warn_unknown_inputs();
        }
        if self.ctx.options.sort || !self.batch {
            sort_document(&mut self.doc, self.registry);
        }
        self.drop_placeholder_summaries();

        tracing::info!(
            paths = self.doc.paths.len(),
            diagnostics = self.ctx.diagnostics.len(),
            "reconciled document"
        );
        Ok(Reconciliation {
            document: self.doc,
            diagnostics: self.ctx.diagnostics,
        })
    }

    fn override_description(&self) -> bool {
        self.ctx.options.override_description
    }

    fn expand_info(&mut self) {
        self.doc.openapi = OPENAPI_VERSION.to_string();
        let info = &mut self.doc.info;
        info.title.get_or_insert_with(|| DEFAULT_TITLE.to_string());
        info.version.get_or_insert_with(|| DEFAULT_VERSION.to_string());
        self.descriptions
            .apply("info", info, self.ctx.options.override_description);
    }

    fn expand_function(&mut self, name: &str) -> AppResult<()> {
        let registry = self.registry;
        for method in Method::ALL {
            let Some(desc) = registry.lookup(name, method) else {
                continue;
            };
            let mut known = parse_parameters(desc);
            let path = match known.get_mut(PAPER_PARAM) {
                Some(flags) if flags.is_required() => {
                    flags.insert(ParamFlags::PATH);
                    format!("/{{p}}/{}", name)
                }
                _ => format!("/{}", name),
            };
            self.expand_path_method(&path, method, &known, desc)?;
        }
        Ok(())
    }

    fn expand_path_method(
        &mut self,
        path: &str,
        method: Method,
        known: &IndexMap<String, ParamFlags>,
        desc: &FunctionDescriptor,
    ) -> AppResult<()> {
        tracing::debug!(path, %method, function = %desc.name, "expanding operation");
        self.ctx.enter_operation(path, method);
        let override_description = self.override_description();

        let first_path = self.ctx.seen.paths.insert(path.to_string());
        let item = self.doc.paths.entry(path.to_string()).or_default();
        if first_path {
            self.descriptions.apply(path, item, override_description);
        }
        let mut op = item.operation_mut(method).take().unwrap_or_default();

        if self.ctx.seen.operations.insert((path.to_string(), method)) {
            let empty = op.summary.as_deref().unwrap_or("").is_empty();
            if override_description || empty {
                op.summary = Some(path.to_string());
            }
        }

        self.expand_metadata(&mut op, path, method, desc);
        self.expand_request(&mut op, method, known, desc)?;
        self.expand_response(&mut op, method, desc)?;

        *self
            .doc
            .paths
            .entry(path.to_string())
            .or_default()
            .operation_mut(method) = Some(op);
        Ok(())
    }

    fn expand_metadata(
        &mut self,
        op: &mut Operation,
        path: &str,
        method: Method,
        desc: &FunctionDescriptor,
    ) {
        let override_description = self.override_description();
        self.descriptions
            .apply(&format!("{} {}", method, path), op, override_description);
        if op.description.as_deref().unwrap_or("").is_empty() {
            if let Some(text) = &desc.description {
                op.description = Some(text.clone());
            }
        }

        if let Some(tags) = &desc.tags {
            if op.tags.is_none() || self.ctx.options.override_tags {
                op.tags = Some(tags.clone());
            } else if op.tags.as_ref() != Some(tags) {
                let existing = op.tags.clone().unwrap_or_default();
                let message = format!(
                    "tags differ\n  input {}, expected {}",
                    Value::from(existing),
                    Value::from(tags.clone())
                );
                self.ctx.warn_at("tags", message);
            }
        }

        for tag in op.tags.iter().flatten() {
            if !self.ctx.seen.tags.insert(tag.clone()) {
                continue;
            }
            let tags = self.doc.tags.get_or_insert_with(Vec::new);
            let index = match tags.iter().position(|t| t.name == *tag) {
                Some(index) => index,
                None => {
                    tags.push(Tag::new(tag));
                    tags.len() - 1
                }
            };
            self.descriptions
                .apply(tag, &mut tags[index], override_description);
        }
    }

    /// Warns about input paths and operations no function produced.
    fn warn_unknown_inputs(&mut self) {
        for (path, item) in &self.doc.paths {
            let at = JsonPath::root().key("paths").key(path);
            if !self.ctx.seen.paths.contains(path) {
                self.ctx
                    .report(Some(at), None, format!("input path {} unknown", path));
                continue;
            }
            for method in Method::ALL {
                let produced = self.ctx.seen.operations.contains(&(path.clone(), method));
                if item.operation(method).is_some() && !produced {
                    self.ctx.report(
                        Some(at.clone().key(method.as_str())),
                        None,
                        format!("input operation {} {} unknown", method, path),
                    );
                }
            }
            for method in item.untyped_operation_keys() {
                self.ctx.report(
                    Some(at.clone().key(method)),
                    None,
                    format!("input operation {} {} unknown", method, path),
                );
            }
        }
    }

    /// Removes summaries that merely repeat the path, and tag summaries.
    fn drop_placeholder_summaries(&mut self) {
        for (path, item) in self.doc.paths.iter_mut() {
            for op in [item.get.as_mut(), item.post.as_mut()].into_iter().flatten() {
                if op.summary.as_deref() == Some(path.as_str())
                    && op.description.is_none()
                    && op.operation_id.is_none()
                {
                    op.summary = None;
                }
            }
            for (_, op) in item.extra.iter_mut() {
                let Value::Object(op) = op else {
                    continue;
                };
                if op.get("summary").and_then(Value::as_str) == Some(path.as_str())
                    && !op.contains_key("description")
                    && !op.contains_key("operationId")
                {
                    op.remove("summary");
                }
            }
        }
        for tag in self.doc.tags.iter_mut().flatten() {
            tag.extra.remove("summary");
        }
    }
}

/// Reconciles `registry` into `existing` (or a fresh document) in one call.
pub fn reconcile(
    registry: &FunctionRegistry,
    descriptions: &DescriptionCatalog,
    options: ReconcileOptions,
    existing: Option<Document>,
    landmarks: Option<&LandmarkIndex>,
) -> AppResult<Reconciliation> {
    let reconciler = Reconciler::new(registry, descriptions, options);
    match existing {
        Some(doc) => reconciler.with_existing(doc, landmarks).run(),
        None => reconciler.run(),
    }
}
