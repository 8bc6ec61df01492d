//! The `200` and `default` responses.

use super::Reconciler;
use crate::catalog::{ERROR_RESPONSE, MINIMAL_RESPONSE};
use crate::context::{FieldId, Part};
use crate::document::{Method, Operation, RefOr, Response, Schema, JSON_CONTENT};
use crate::error::AppResult;
use crate::merge::{combine_fields, reconcile_required};
use crate::refs::{component_ref, SCHEMAS};
use crate::registry::FunctionDescriptor;
use crate::tokens::{parse_response, ParamFlags, WILDCARD};
use indexmap::IndexMap;
use std::collections::HashSet;

/// How the existing `200` schema is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `$ref` to the minimal response.
    Minimal,
    /// `allOf` with exactly one inline object member.
    Extended,
    /// Anything else; hand-written.
    Custom,
}

/// Index of the single inline `type: object` member of an `allOf`.
fn object_position(members: &[RefOr<Schema>]) -> Option<usize> {
    let mut objects = members
        .iter()
        .enumerate()
        .filter(|(_, m)| m.as_inline().is_some_and(Schema::is_object_type));
    let (index, _) = objects.next()?;
    match objects.next() {
        Some(_) => None,
        None => Some(index),
    }
}

fn classify(schema: &RefOr<Schema>) -> Shape {
    match schema {
        RefOr::Ref(r) if r.ref_location == component_ref(SCHEMAS, MINIMAL_RESPONSE) => {
            Shape::Minimal
        }
        RefOr::T(s) if s.all_of.as_deref().and_then(object_position).is_some() => Shape::Extended,
        _ => Shape::Custom,
    }
}

impl Reconciler<'_> {
    pub(super) fn expand_response(
        &mut self,
        op: &mut Operation,
        method: Method,
        desc: &FunctionDescriptor,
    ) -> AppResult<()> {
        self.ctx.enter_part(Part::Response { all_of_index: None });
        let mut fields = IndexMap::new();
        let mut required = Vec::new();
        for (name, flags) in parse_response(desc) {
            if name == WILDCARD
                || (method == Method::Get && flags.intersects(ParamFlags::NON_GET))
            {
                continue;
            }
            let schema = self.resolve_info(desc.response_info.get(&name), &name)?;
            if flags.is_required() {
                required.push(name.clone());
            }
            fields.insert(name, schema);
        }
        self.apply_response(op, fields, required)
    }

    fn apply_response(
        &mut self,
        op: &mut Operation,
        fields: IndexMap<String, RefOr<Schema>>,
        required: Vec<String>,
    ) -> AppResult<()> {
        let responses = op.responses.get_or_insert_with(IndexMap::new);
        if !responses.contains_key("200") {
            responses.insert("200".to_string(), RefOr::T(Response::default()));
        }
        if !responses.contains_key("default") {
            let schema = self.reference_schema(ERROR_RESPONSE)?;
            responses.insert("default".to_string(), RefOr::T(Response::json("", schema)));
        }

        let Some(RefOr::T(ok)) = responses.get_mut("200") else {
            self.ctx.warn("200 response is a $ref, not reconciled".to_string());
            return Ok(());
        };
        ok.description.get_or_insert_with(String::new);
        let media = ok
            .content
            .get_or_insert_with(IndexMap::new)
            .entry(JSON_CONTENT.to_string())
            .or_default();
        if media.schema.is_none() {
            media.schema = Some(self.reference_schema(MINIMAL_RESPONSE)?);
        }
        let Some(slot) = media.schema.as_mut() else {
            return Ok(());
        };

        let shape = classify(slot);
        let override_response = self.ctx.options.override_response;
        if !override_response
            && (shape == Shape::Custom || (shape == Shape::Extended && fields.is_empty()))
        {
            return Ok(());
        }
        if fields.is_empty() {
            if shape != Shape::Minimal {
                *slot = self.reference_schema(MINIMAL_RESPONSE)?;
            }
            return Ok(());
        }
        if shape != Shape::Extended {
            *slot = RefOr::T(Schema {
                all_of: Some(vec![
                    self.reference_schema(MINIMAL_RESPONSE)?,
                    RefOr::T(Schema::typed("object")),
                ]),
                ..Schema::default()
            });
        }

        let RefOr::T(composite) = slot else {
            return Ok(());
        };
        let Some(members) = composite.all_of.as_mut() else {
            return Ok(());
        };
        let Some(index) = object_position(members) else {
            return Ok(());
        };

        // Fields already supplied by referenced members.
        let mut inherited = HashSet::new();
        let mut inherited_required = Vec::new();
        for member in members.iter() {
            if let Some(schema) = self.resolve_schema(member) {
                if schema.is_object_type() {
                    inherited.extend(schema.properties.iter().flatten().map(|(k, _)| k.clone()));
                    inherited_required.extend(schema.required.iter().flatten().cloned());
                }
            }
        }

        self.ctx.enter_part(Part::Response {
            all_of_index: Some(index),
        });
        let RefOr::T(object) = &mut members[index] else {
            return Ok(());
        };
        reconcile_required(
            &mut self.ctx,
            &mut object.required,
            &fields,
            &required,
            &inherited_required,
        );

        if override_response {
            object.properties = None;
        }
        let mut properties = object.properties.take().unwrap_or_default();
        for name in properties.keys() {
            if !fields.contains_key(name) && !inherited.contains(name) {
                self.ctx.field_warn(
                    FieldId::Name(name),
                    format!("unexpected response field `{}`", name),
                );
            }
        }
        for (name, field) in fields {
            if inherited.contains(&name) {
                continue;
            }
            match properties.get_mut(&name) {
                Some(existing) => {
                    combine_fields(&mut self.ctx, &name, field, existing, FieldId::Name(&name))?
                }
                None => {
                    properties.insert(name, field);
                }
            }
        }
        if !properties.is_empty() {
            object.properties = Some(properties);
        }
        Ok(())
    }
}
