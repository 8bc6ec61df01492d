//! Shared schemas and parameters, registered on first use.

use super::Reconciler;
use crate::catalog::{
    common_parameter, is_common_schema, is_primitive, schema_definition, schema_dependencies,
};
use crate::document::{Parameter, RefOr, Reference, Schema};
use crate::error::{AppError, AppResult};
use crate::refs::{extract_component_name, PARAMETERS, SCHEMAS};
use crate::registry::TypeAnnotation;

impl Reconciler<'_> {
    /// A reference to the shared schema `name`, registering it if needed.
    ///
    /// Primitive type names come back inline and are never registered.
    pub(super) fn reference_schema(&mut self, name: &str) -> AppResult<RefOr<Schema>> {
        if is_primitive(name) {
            return Ok(RefOr::T(Schema::typed(name)));
        }

        let first_touch = !self.ctx.seen.schemas.contains(name);
        let present = self
            .doc
            .schemas()
            .is_some_and(|schemas| schemas.contains_key(name));
        if !present || (self.ctx.options.override_schema && first_touch) {
            for dep in schema_dependencies(name) {
                self.reference_schema(dep)?;
            }
            let definition = schema_definition(name)
                .ok_or_else(|| AppError::UnknownComponent(format!("schema `{}`", name)))?;
            tracing::debug!(schema = name, "registering shared schema");
            self.doc
                .schemas_mut()
                .insert(name.to_string(), RefOr::T(definition));
        }

        if first_touch {
            self.ctx.seen.schemas.insert(name.to_string());
            if let Some(RefOr::T(schema)) = self.doc.schemas_mut().get_mut(name) {
                self.descriptions.apply(
                    &format!("schema {}", name),
                    schema,
                    self.ctx.options.override_description,
                );
            }
        }
        Ok(RefOr::Ref(Reference::to_component(SCHEMAS, name)))
    }

    /// A reference to the shared parameter `name` (`p`, `p.path`, `q.opt`, ...),
    /// registering it if needed.
    pub(super) fn reference_parameter(&mut self, name: &str) -> AppResult<RefOr<Parameter>> {
        let first_touch = !self.ctx.seen.parameters.contains(name);
        let present = self
            .doc
            .parameters()
            .is_some_and(|params| params.contains_key(name));
        if !present || (self.ctx.options.override_schema && first_touch) {
            let common = common_parameter(name)
                .ok_or_else(|| AppError::UnknownComponent(format!("parameter `{}`", name)))?;
            let schema = self.reference_schema(common.schema)?;
            tracing::debug!(parameter = name, "registering shared parameter");
            self.doc
                .parameters_mut()
                .insert(name.to_string(), RefOr::T(common.to_parameter(schema)));
        }

        if first_touch {
            self.ctx.seen.parameters.insert(name.to_string());
            if let Some(RefOr::T(param)) = self.doc.parameters_mut().get_mut(name) {
                self.descriptions.apply(
                    &format!("parameter {}", name),
                    param,
                    self.ctx.options.override_description,
                );
            }
        }
        Ok(RefOr::Ref(Reference::to_component(PARAMETERS, name)))
    }

    /// The parameter a `parameters` entry stands for, following local
    /// `#/components/parameters/` references.
    pub(super) fn resolve_parameter<'p>(
        &'p self,
        entry: &'p RefOr<Parameter>,
    ) -> Option<&'p Parameter> {
        match entry {
            RefOr::T(param) => Some(param),
            RefOr::Ref(reference) => {
                let name = extract_component_name(&reference.ref_location, PARAMETERS)?;
                self.doc.parameters()?.get(&name)?.as_inline()
            }
            RefOr::Bool(_) => None,
        }
    }

    /// The shared schema a `$ref` points to, if it is local and inline.
    pub(super) fn resolve_schema<'s>(&'s self, entry: &RefOr<Schema>) -> Option<&'s Schema> {
        let name = extract_component_name(entry.ref_location()?, SCHEMAS)?;
        self.doc.schemas()?.get(&name)?.as_inline()
    }

    /// The schema a type annotation describes.
    ///
    /// A missing annotation gives the untyped schema `{}`. So does an
    /// unusable one, after a diagnostic.
    pub(super) fn resolve_info(
        &mut self,
        info: Option<&TypeAnnotation>,
        field: &str,
    ) -> AppResult<RefOr<Schema>> {
        match info {
            None => Ok(RefOr::T(Schema::default())),
            Some(TypeAnnotation::Inline(schema)) => Ok(schema.clone()),
            Some(TypeAnnotation::Name(name)) => self.resolve_type_name(name, field),
            Some(TypeAnnotation::Invalid(_)) => Ok(self.bad_info(field)),
        }
    }

    /// Resolves `integer`, `pid`, `[string]`, `[[rid]]`, ...
    pub(super) fn resolve_type_name(
        &mut self,
        name: &str,
        field: &str,
    ) -> AppResult<RefOr<Schema>> {
        if name.is_empty() {
            return Ok(self.bad_info(field));
        }
        if let Some(inner) = name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let items = self.resolve_type_name(inner, field)?;
            return Ok(RefOr::T(Schema::array_of(items)));
        }
        if is_primitive(name) || is_common_schema(name) {
            return self.reference_schema(name);
        }
        let what = self.ctx.field_description();
        self.ctx
            .warn(format!("unknown type `{}` for {} `{}`", name, what, field));
        Ok(RefOr::T(Schema::default()))
    }

    fn bad_info(&mut self, field: &str) -> RefOr<Schema> {
        let what = self.ctx.field_description();
        self.ctx.warn(format!("bad info for {} `{}`", what, field));
        RefOr::T(Schema::default())
    }
}
