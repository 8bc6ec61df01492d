#![deny(missing_docs)]

//! # apispec core
//!
//! Rebuilds the HotCRP OpenAPI document from the application's API function
//! registry, merging it into an existing, partly hand-written document.
//!
//! ```text
//! registry ──┐
//!            ├─> Reconciler ─> Document + Diagnostics
//! document ──┘       ^
//!                    └─ description catalog (Markdown)
//! ```

/// Shared error types.
pub mod error;

/// `$ref` construction and parsing.
pub mod refs;

/// Typed OpenAPI document model.
pub mod document;

/// Parameter and response token grammar.
pub mod tokens;

/// API function descriptors.
pub mod registry;

/// Markdown description catalog.
pub mod descriptions;

/// Built-in shared schemas and parameters.
pub mod catalog;

/// JSON source positions for diagnostics.
pub mod landmarks;

/// Per-run state and diagnostics.
pub mod context;

/// Field-level merge rules.
pub mod merge;

/// The reconciliation pass.
pub mod reconcile;

/// Tag and path ordering.
pub mod ordering;

pub use context::{Diagnostic, ReconcileOptions};
pub use descriptions::DescriptionCatalog;
pub use document::Document;
pub use error::{AppError, AppResult};
pub use landmarks::LandmarkIndex;
pub use reconcile::{reconcile, Reconciler, Reconciliation};
pub use registry::{FunctionDescriptor, FunctionRegistry};
