//! Query parameters and form request bodies.

use super::Reconciler;
use crate::catalog::param_schema_name;
use crate::context::{FieldId, Part};
use crate::document::{
    Method, Operation, Parameter, RefOr, RequestBody, Schema, MULTIPART_FORM, URLENCODED_FORM,
};
use crate::error::AppResult;
use crate::merge::{combine_fields, reconcile_required};
use crate::registry::FunctionDescriptor;
use crate::tokens::{ParamFlags, WILDCARD};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

/// Search refinements that share a definition when the operation also takes `q`.
const SEARCH_MODIFIERS: [&str; 5] = ["t", "qt", "reviewer", "sort", "scoresort"];

/// Computed body fields for one operation.
#[derive(Debug, Default)]
struct BodyFields {
    properties: IndexMap<String, RefOr<Schema>>,
    required: Vec<String>,
}

impl Reconciler<'_> {
    pub(super) fn expand_request(
        &mut self,
        op: &mut Operation,
        method: Method,
        known: &IndexMap<String, ParamFlags>,
        desc: &FunctionDescriptor,
    ) -> AppResult<()> {
        let applies = |name: &str, flags: ParamFlags| {
            name != WILDCARD && !(method == Method::Get && flags.intersects(ParamFlags::NON_GET))
        };
        let has_file = known
            .iter()
            .any(|(name, flags)| applies(name, *flags) && flags.contains(ParamFlags::FILE));
        let content_type = if has_file {
            MULTIPART_FORM
        } else {
            URLENCODED_FORM
        };
        let query_plausible = known.contains_key("q");

        let mut params: IndexMap<String, RefOr<Parameter>> = IndexMap::new();
        let mut body = BodyFields::default();
        for (name, &flags) in known {
            if !applies(name, flags) {
                continue;
            }
            if flags.in_body() {
                self.ctx.enter_part(Part::Body {
                    content_type: content_type.to_string(),
                });
                let schema = match desc.parameter_info.get(name) {
                    Some(info) => self.resolve_info(Some(info), name)?,
                    None => match param_schema_name(name) {
                        Some(schema) => self.resolve_type_name(schema, name)?,
                        None => RefOr::T(Schema::default()),
                    },
                };
                body.properties.insert(name.clone(), schema);
                if flags.is_required() {
                    body.required.push(name.clone());
                }
                continue;
            }
            self.ctx.enter_part(Part::Query);
            let param = self.query_parameter(name, flags, query_plausible, desc)?;
            params.insert(name.clone(), param);
        }

        if !params.is_empty() || op.parameters.is_some() {
            self.apply_parameters(op, params)?;
        }
        if !body.properties.is_empty() || op.request_body.is_some() {
            self.apply_request_body(op, body, content_type)?;
        }
        Ok(())
    }

    /// The parameter entry for one query token.
    fn query_parameter(
        &mut self,
        name: &str,
        flags: ParamFlags,
        query_plausible: bool,
        desc: &FunctionDescriptor,
    ) -> AppResult<RefOr<Parameter>> {
        let required = flags.is_required();
        let optional_variant = |name: &str| {
            if required {
                name.to_string()
            } else {
                format!("{}.opt", name)
            }
        };
        let common = match name {
            "p" if flags == ParamFlags::REQUIRED | ParamFlags::PATH => Some("p.path".to_string()),
            "p" | "r" | "c" | "q" => Some(optional_variant(name)),
            "redirect" | "forceShow" if flags.is_empty() => Some(name.to_string()),
            _ if SEARCH_MODIFIERS.contains(&name) && query_plausible && !required => {
                Some(name.to_string())
            }
            _ => None,
        };
        if let Some(common) = common {
            return self.reference_parameter(&common);
        }

        let schema = self.resolve_info(desc.parameter_info.get(name), name)?;
        Ok(RefOr::T(Parameter::query(name, required, schema)))
    }

    /// Merges computed query parameters into the operation's list.
    ///
    /// Existing parameters are never removed; unknown ones are reported.
    fn apply_parameters(
        &mut self,
        op: &mut Operation,
        params: IndexMap<String, RefOr<Parameter>>,
    ) -> AppResult<()> {
        self.ctx.enter_part(Part::Query);
        let existing = op.parameters.get_or_insert_with(Vec::new);

        let names: Vec<Option<String>> = existing
            .iter()
            .map(|entry| self.resolve_parameter(entry).and_then(|p| p.name.clone()))
            .collect();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (index, name) in names.into_iter().enumerate() {
            let Some(name) = name else {
                continue;
            };
            if !params.contains_key(&name) {
                self.ctx.field_warn(
                    FieldId::Index(index),
                    format!("unexpected parameter `{}`", name),
                );
            }
            positions.insert(name, index);
        }

        for (name, param) in params {
            match positions.get(&name) {
                Some(&index) => combine_fields(
                    &mut self.ctx,
                    &name,
                    param,
                    &mut existing[index],
                    FieldId::Index(index),
                )?,
                None => existing.push(param),
            }
        }
        Ok(())
    }

    /// Reconciles the form request body schema.
    fn apply_request_body(
        &mut self,
        op: &mut Operation,
        body: BodyFields,
        content_type: &str,
    ) -> AppResult<()> {
        let request = op.request_body.get_or_insert_with(|| RequestBody {
            description: Some(String::new()),
            ..RequestBody::default()
        });
        let content = request.content.get_or_insert_with(IndexMap::new);
        let multipart = content.shift_remove(MULTIPART_FORM);
        let urlencoded = content.shift_remove(URLENCODED_FORM);
        content.shift_remove("schema");
        let media = content
            .entry(content_type.to_string())
            .or_insert(multipart.or(urlencoded).unwrap_or_default());

        self.ctx.enter_part(Part::Body {
            content_type: content_type.to_string(),
        });
        let slot = media
            .schema
            .get_or_insert_with(|| RefOr::T(Schema::default()));
        let opaque = match &*slot {
            RefOr::T(_) => None,
            RefOr::Ref(reference) => Some(reference.ref_location.clone()),
            RefOr::Bool(value) => Some(value.to_string()),
        };
        if let Some(target) = opaque {
            if !self.ctx.options.override_param {
                let message = format!("request body schema {} not reconciled", target);
                self.ctx.warn(message);
                return Ok(());
            }
            *slot = RefOr::T(Schema::default());
        }
        let RefOr::T(schema) = slot else {
            return Ok(());
        };
        schema.schema_type = Some(Value::from("object"));

        reconcile_required(
            &mut self.ctx,
            &mut schema.required,
            &body.properties,
            &body.required,
            &[],
        );

        let properties = schema.properties.get_or_insert_with(IndexMap::new);
        for name in properties.keys() {
            if !body.properties.contains_key(name) {
                self.ctx.field_warn(
                    FieldId::Name(name),
                    format!("unexpected body parameter `{}`", name),
                );
            }
        }
        for (name, field) in body.properties {
            match properties.get_mut(&name) {
                Some(existing) => {
                    combine_fields(&mut self.ctx, &name, field, existing, FieldId::Name(&name))?
                }
                None => {
                    properties.insert(name, field);
                }
            }
        }
        Ok(())
    }
}
