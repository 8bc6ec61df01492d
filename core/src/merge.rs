#![deny(missing_docs)]

//! # Field Merge Rules
//!
//! How a freshly computed parameter, body property or response field is
//! combined with the one already in the document, and how `required` lists
//! are reconciled.
//!
//! The existing value wins every conflict unless an override mode is active.
//! Conflicts are reported, never silently resolved.

use crate::context::{FieldId, ReconcileContext};
use crate::document::{Blank, Parameter, RefOr, Schema};
use crate::error::AppResult;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A node the combine rule can merge key by key.
pub trait Mergeable: Blank + Serialize + DeserializeOwned + Clone + PartialEq {
    /// Fills fields an overriding value leaves unset from the value it replaces.
    fn backfill_from(&mut self, existing: &Self);
}

impl Mergeable for Parameter {
    fn backfill_from(&mut self, existing: &Self) {
        if self.schema.is_none() {
            self.schema = existing.schema.clone();
        }
        if self.description.is_none() {
            self.description = existing.description.clone();
        }
    }
}

impl Mergeable for Schema {
    fn backfill_from(&mut self, existing: &Self) {
        if self.description.is_none() {
            self.description = existing.description.clone();
        }
    }
}

/// Combines a computed field into the existing one, in place.
///
/// - a blank existing field is replaced;
/// - a blank computed field changes nothing;
/// - under override (the part's override flag, or `override_ref` for a
///   computed `$ref`) the computed field replaces the existing one, keeping
///   its `schema` and `description` when the computed field lacks them;
/// - otherwise conflicts are reported and absent keys are filled in.
pub fn combine_fields<T: Mergeable>(
    ctx: &mut ReconcileContext<'_>,
    name: &str,
    mut new: RefOr<T>,
    existing: &mut RefOr<T>,
    id: FieldId<'_>,
) -> AppResult<()> {
    if existing.is_blank() {
        *existing = new;
        return Ok(());
    }
    if new.is_blank() {
        return Ok(());
    }

    let new_ref = new.ref_location().map(str::to_string);
    let old_ref = existing.ref_location().map(str::to_string);
    if ctx.override_active() || (ctx.options.override_ref && new_ref.is_some()) {
        if let (RefOr::T(fresh), RefOr::T(old)) = (&mut new, &*existing) {
            fresh.backfill_from(old);
        }
        *existing = new;
        return Ok(());
    }

    let what = ctx.field_description();
    match (new_ref, old_ref) {
        (Some(expected), Some(input)) => {
            if expected != input {
                ctx.field_warn(
                    id,
                    format!(
                        "{} `{}` $ref destination differs\n  input {}, expected {}",
                        what, name, input, expected
                    ),
                );
            }
        }
        (None, None) => match (&new, existing) {
            (RefOr::T(fresh), RefOr::T(old)) => merge_inline(ctx, name, fresh, old, id)?,
            (fresh, old) => {
                if fresh != &*old {
                    ctx.field_warn(id, format!("{} `{}` boolean schema differs", what, name));
                }
            }
        },
        (expected, input) => {
            ctx.field_warn(
                id,
                format!(
                    "{} `{}` $ref status differs\n  input {}, expected {}",
                    what,
                    name,
                    input.as_deref().unwrap_or("noref"),
                    expected.as_deref().unwrap_or("noref")
                ),
            );
        }
    }
    Ok(())
}

fn to_map<T: Serialize>(value: &T) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Copies keys missing from `existing`, reporting scalar keys that differ.
fn merge_inline<T: Mergeable>(
    ctx: &mut ReconcileContext<'_>,
    name: &str,
    fresh: &T,
    existing: &mut T,
    id: FieldId<'_>,
) -> AppResult<()> {
    let fresh = to_map(fresh)?;
    let mut merged = to_map(existing)?;
    let what = ctx.field_description();
    let mut changed = false;

    for (key, value) in fresh {
        match merged.get(&key) {
            None | Some(Value::Null) => {
                merged.insert(key, value);
                changed = true;
            }
            Some(current) => {
                let scalar = matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_));
                if scalar && *current != value {
                    ctx.field_warn(id, format!("{} `{}` {} differs", what, name, key));
                }
            }
        }
    }

    if changed {
        *existing = serde_json::from_value(Value::Object(merged))?;
    }
    Ok(())
}

/// Reconciles a `required` list against the computed properties.
///
/// `expected` holds the names that should be required and `ignore` the
/// names some other schema already makes required. Names in the list that
/// should be optional, or that name no computed property, are reported; new
/// required names are appended. An empty list removes the key.
pub fn reconcile_required(
    ctx: &mut ReconcileContext<'_>,
    required: &mut Option<Vec<String>>,
    computed: &IndexMap<String, RefOr<Schema>>,
    expected: &[String],
    ignore: &[String],
) {
    let mut list = if ctx.override_active() {
        Vec::new()
    } else {
        required.take().unwrap_or_default()
    };

    let what = ctx.field_description();
    for name in &list {
        if ignore.contains(name) {
            continue;
        }
        if !computed.contains_key(name) {
            ctx.field_warn(
                FieldId::Required,
                format!("{} `{}` unexpected required", what, name),
            );
        } else if !expected.contains(name) {
            ctx.field_warn(
                FieldId::Required,
                format!("{} `{}` expected optional", what, name),
            );
        }
    }

    for name in expected {
        if !ignore.contains(name) && !list.contains(name) {
            list.push(name.clone());
        }
    }

    *required = if list.is_empty() { None } else { Some(list) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Part, ReconcileOptions};
    use crate::document::{Method, Reference};
    use crate::refs::{PARAMETERS, SCHEMAS};
    use serde_json::json;

    fn ctx(options: ReconcileOptions) -> ReconcileContext<'static> {
        let mut ctx = ReconcileContext::new(options, None);
        ctx.enter_operation("/paper", Method::Get);
        ctx.enter_part(Part::Query);
        ctx
    }

    fn messages(ctx: &ReconcileContext<'_>) -> Vec<String> {
        ctx.diagnostics().iter().map(|d| d.to_string()).collect()
    }

    fn param_ref(name: &str) -> RefOr<Parameter> {
        RefOr::Ref(Reference::to_component(PARAMETERS, name))
    }

    fn inline_param(value: Value) -> RefOr<Parameter> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_blank_existing_adopts_new() {
        let mut ctx = ctx(ReconcileOptions::default());
        let mut existing = RefOr::T(Parameter::default());
        combine_fields(&mut ctx, "p", param_ref("p"), &mut existing, FieldId::Index(0)).unwrap();
        assert_eq!(existing.ref_location(), Some("#/components/parameters/p"));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_blank_new_keeps_existing() {
        let mut ctx = ctx(ReconcileOptions::default());
        let mut existing = inline_param(json!({"name": "x", "in": "query"}));
        let before = existing.clone();
        combine_fields(
            &mut ctx,
            "x",
            RefOr::T(Parameter::default()),
            &mut existing,
            FieldId::Index(0),
        )
        .unwrap();
        assert_eq!(existing, before);
    }

    #[test]
    fn test_ref_conflicts_are_reported() {
        let mut ctx = ctx(ReconcileOptions::default());
        let mut existing = param_ref("p.opt");
        let fresh = param_ref("p.path");
        combine_fields(&mut ctx, "p", fresh, &mut existing, FieldId::Index(0)).unwrap();
        assert_eq!(existing.ref_location(), Some("#/components/parameters/p.opt"));

        let mut inline = inline_param(json!({"name": "p", "in": "query"}));
        combine_fields(&mut ctx, "p", param_ref("p"), &mut inline, FieldId::Index(1)).unwrap();
        assert!(inline.ref_location().is_none());

        assert_eq!(
            messages(&ctx),
            vec![
                "/paper.get: parameter `p` $ref destination differs\n  input #/components/parameters/p.opt, expected #/components/parameters/p.path",
                "/paper.get: parameter `p` $ref status differs\n  input noref, expected #/components/parameters/p",
            ]
        );
    }

    #[test]
    fn test_override_ref_replaces_only_with_refs() {
        let options = ReconcileOptions {
            override_ref: true,
            ..ReconcileOptions::default()
        };
        let mut ctx = ctx(options);
        let mut existing = inline_param(json!({"name": "p", "in": "query"}));
        combine_fields(&mut ctx, "p", param_ref("p"), &mut existing, FieldId::Index(0)).unwrap();
        assert_eq!(existing.ref_location(), Some("#/components/parameters/p"));

        let mut stays = param_ref("x");
        let fresh = inline_param(json!({"name": "x", "in": "query", "required": true}));
        combine_fields(&mut ctx, "x", fresh, &mut stays, FieldId::Index(1)).unwrap();
        assert_eq!(stays.ref_location(), Some("#/components/parameters/x"));
        assert_eq!(ctx.diagnostics().len(), 1);
    }

    #[test]
    fn test_override_param_backfills_schema_and_description() {
        let options = ReconcileOptions {
            override_param: true,
            ..ReconcileOptions::default()
        };
        let mut ctx = ctx(options);
        let mut existing = inline_param(json!({
            "name": "n", "in": "query", "required": false,
            "description": "Count", "schema": {"type": "integer"}
        }));
        let fresh = inline_param(json!({"name": "n", "in": "query", "required": true}));
        combine_fields(&mut ctx, "n", fresh, &mut existing, FieldId::Index(0)).unwrap();

        assert_eq!(
            serde_json::to_value(&existing).unwrap(),
            json!({
                "name": "n", "in": "query", "required": true,
                "description": "Count", "schema": {"type": "integer"}
            })
        );
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_inline_merge_fills_and_flags() {
        let mut ctx = ctx(ReconcileOptions::default());
        let mut existing = inline_param(json!({
            "name": "n", "in": "query", "required": false, "x-note": "kept"
        }));
        let fresh = inline_param(json!({
            "name": "n", "in": "query", "required": true, "schema": {"type": "integer"}
        }));
        combine_fields(&mut ctx, "n", fresh, &mut existing, FieldId::Index(2)).unwrap();

        assert_eq!(
            serde_json::to_value(&existing).unwrap(),
            json!({
                "name": "n", "in": "query", "required": false,
                "schema": {"type": "integer"}, "x-note": "kept"
            })
        );
        assert_eq!(messages(&ctx), vec!["/paper.get: parameter `n` required differs"]);
    }

    #[test]
    fn test_schema_fields_use_body_wording() {
        let mut ctx = ctx(ReconcileOptions::default());
        ctx.enter_part(Part::Body {
            content_type: "application/x-www-form-urlencoded".into(),
        });
        let mut existing = RefOr::T(Schema::typed("string"));
        let fresh = RefOr::Ref(Reference::to_component(SCHEMAS, "pid"));
        combine_fields(&mut ctx, "p", fresh, &mut existing, FieldId::Name("p")).unwrap();
        assert!(
            messages(&ctx)[0].starts_with("/paper.get: body parameter `p` $ref status differs")
        );
    }

    #[test]
    fn test_boolean_schemas_are_kept_and_compared() {
        let mut ctx = ctx(ReconcileOptions::default());
        ctx.enter_part(Part::Body {
            content_type: "multipart/form-data".into(),
        });
        let mut same: RefOr<Schema> = RefOr::Bool(true);
        combine_fields(&mut ctx, "a", RefOr::Bool(true), &mut same, FieldId::Name("a")).unwrap();
        assert!(ctx.diagnostics().is_empty());

        let mut never = RefOr::Bool(false);
        let fresh = RefOr::T(Schema::typed("string"));
        combine_fields(&mut ctx, "b", fresh, &mut never, FieldId::Name("b")).unwrap();
        assert_eq!(never, RefOr::Bool(false));

        let mut flagged: RefOr<Schema> = RefOr::Bool(true);
        let fresh = RefOr::Ref(Reference::to_component(SCHEMAS, "pid"));
        combine_fields(&mut ctx, "c", fresh, &mut flagged, FieldId::Name("c")).unwrap();
        assert_eq!(flagged, RefOr::Bool(true));

        assert_eq!(
            messages(&ctx),
            vec![
                "/paper.get: body parameter `b` boolean schema differs",
                "/paper.get: body parameter `c` $ref status differs\n  input noref, expected #/components/schemas/pid",
            ]
        );
    }

    fn props(names: &[&str]) -> IndexMap<String, RefOr<Schema>> {
        names
            .iter()
            .map(|n| (n.to_string(), RefOr::T(Schema::default())))
            .collect()
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_required_appends_new_names() {
        let mut ctx = ctx(ReconcileOptions::default());
        let mut required = Some(strings(&["a"]));
        reconcile_required(
            &mut ctx,
            &mut required,
            &props(&["a", "b", "c"]),
            &strings(&["a", "c"]),
            &[],
        );
        assert_eq!(required, Some(strings(&["a", "c"])));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_required_reports_optional_and_stray_names() {
        let mut ctx = ctx(ReconcileOptions::default());
        ctx.enter_part(Part::Response { all_of_index: Some(1) });
        let mut required = Some(strings(&["b", "zzz", "ok"]));
        reconcile_required(
            &mut ctx,
            &mut required,
            &props(&["a", "b"]),
            &strings(&["a", "ok"]),
            &strings(&["ok"]),
        );
        assert_eq!(required, Some(strings(&["b", "zzz", "ok", "a"])));
        assert_eq!(
            messages(&ctx),
            vec![
                "/paper.get: response field `b` expected optional",
                "/paper.get: response field `zzz` unexpected required",
            ]
        );
    }

    #[test]
    fn test_required_ignored_names_are_not_added() {
        let mut ctx = ctx(ReconcileOptions::default());
        let mut required = None;
        reconcile_required(
            &mut ctx,
            &mut required,
            &props(&["ok"]),
            &strings(&["ok"]),
            &strings(&["ok"]),
        );
        assert_eq!(required, None);
    }

    #[test]
    fn test_required_override_starts_fresh() {
        let options = ReconcileOptions {
            override_param: true,
            ..ReconcileOptions::default()
        };
        let mut ctx = ctx(options);
        let mut required = Some(strings(&["old"]));
        reconcile_required(&mut ctx, &mut required, &props(&["new"]), &[], &[]);
        assert_eq!(required, None);
        assert!(ctx.diagnostics().is_empty());
    }
}
