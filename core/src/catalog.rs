#![deny(missing_docs)]

//! # Common Components
//!
//! The fixed catalog of shared schemas and parameters that operations reference
//! by `$ref` instead of inlining. This module only *defines* them; the
//! reconciler materializes each into `components` the first time it is used.

use crate::document::{Parameter, RefOr, Reference, Schema};
use crate::refs::SCHEMAS;
use indexmap::IndexMap;
use serde_json::{json, Map};

/// JSON Schema primitive type names; these are inlined, never registered.
pub const PRIMITIVE_TYPES: [&str; 5] = ["string", "number", "integer", "boolean", "null"];

/// Schema every successful response extends.
pub const MINIMAL_RESPONSE: &str = "minimal_response";

/// Schema of every error (`default`) response.
pub const ERROR_RESPONSE: &str = "error_response";

/// Shared schema names, in definition order.
pub const COMMON_SCHEMAS: [&str; 14] = [
    "pid",
    "rid",
    "cid",
    "ok",
    "message",
    "message_list",
    MINIMAL_RESPONSE,
    ERROR_RESPONSE,
    "search_string",
    "search_collection",
    "search_qt",
    "search_reviewer",
    "search_sort",
    "search_scoresort",
];

/// Parameters with a shared definition, and the schema each one uses.
const PARAM_SCHEMAS: [(&str, &str); 11] = [
    ("p", "pid"),
    ("r", "rid"),
    ("c", "cid"),
    ("q", "search_string"),
    ("t", "search_collection"),
    ("qt", "search_qt"),
    ("reviewer", "search_reviewer"),
    ("sort", "search_sort"),
    ("scoresort", "search_scoresort"),
    ("redirect", "string"),
    ("forceShow", "boolean"),
];

/// Parameters that are required in their plain (unsuffixed) variant.
const PARAM_REQUIRED: [&str; 3] = ["p", "r", "c"];

/// True for `string`, `integer`, etc.
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

/// True for names in [`COMMON_SCHEMAS`].
pub fn is_common_schema(name: &str) -> bool {
    COMMON_SCHEMAS.contains(&name)
}

/// The schema a parameter name maps to when used as a body field.
pub fn param_schema_name(param: &str) -> Option<&'static str> {
    PARAM_SCHEMAS
        .iter()
        .find(|(name, _)| *name == param)
        .map(|(_, schema)| *schema)
}

/// Shared schemas referenced from inside `name`'s definition. They must be
/// registered before `name` itself.
pub fn schema_dependencies(name: &str) -> &'static [&'static str] {
    match name {
        "message_list" => &["message"],
        MINIMAL_RESPONSE | ERROR_RESPONSE => &["message_list"],
        _ => &[],
    }
}

fn schema_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Reference::to_component(SCHEMAS, name))
}

fn properties(entries: Vec<(&str, RefOr<Schema>)>) -> IndexMap<String, RefOr<Schema>> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn object(required: &[&str], props: Vec<(&str, RefOr<Schema>)>) -> Schema {
    Schema {
        required: Some(required.iter().map(|s| s.to_string()).collect()),
        properties: Some(properties(props)),
        ..Schema::typed("object")
    }
}

fn inline(schema: Schema) -> RefOr<Schema> {
    RefOr::T(schema)
}

/// The definition of a shared schema, or `None` if the catalog has no such name.
pub fn schema_definition(name: &str) -> Option<Schema> {
    let schema = match name {
        "pid" => Schema::described("integer", "Submission ID").with("minimum", json!(1)),
        "rid" => Schema {
            description: Some("Review ID".into()),
            one_of: Some(vec![
                inline(Schema::typed("integer").with("minimum", json!(1))),
                inline(Schema::typed("string")),
            ]),
            ..Schema::default()
        },
        "cid" => Schema {
            description: Some("Comment ID".into()),
            one_of: Some(vec![
                inline(Schema::typed("integer").with("minimum", json!(1))),
                inline(
                    Schema::typed("string")
                        .with("examples", json!(["new", "response", "R2response"])),
                ),
            ]),
            ..Schema::default()
        },
        "ok" => Schema::described("boolean", "Success marker"),
        "message" => Schema {
            description: Some("Diagnostic".into()),
            ..object(
                &["status"],
                vec![
                    ("field", inline(Schema::typed("string"))),
                    ("message", inline(Schema::typed("string"))),
                    (
                        "status",
                        inline(
                            Schema::typed("integer")
                                .with("minimum", json!(-5))
                                .with("maximum", json!(3)),
                        ),
                    ),
                    ("context", inline(Schema::typed("string"))),
                    ("pos1", inline(Schema::typed("integer"))),
                    ("pos2", inline(Schema::typed("integer"))),
                ],
            )
        },
        "message_list" => Schema {
            description: Some("Diagnostic list".into()),
            ..Schema::array_of(schema_ref("message"))
        },
        MINIMAL_RESPONSE => object(
            &["ok"],
            vec![
                ("ok", inline(Schema::typed("boolean"))),
                ("message_list", schema_ref("message_list")),
            ],
        ),
        ERROR_RESPONSE => object(
            &["ok"],
            vec![
                ("ok", inline(Schema::described("boolean", "always false"))),
                ("message_list", schema_ref("message_list")),
                ("status_code", inline(Schema::typed("integer"))),
            ],
        ),
        "search_string" => Schema::described("string", "Search query"),
        "search_collection" => Schema::described("string", "Search collection")
            .with("examples", json!(["s", "all", "r", "acc"])),
        "search_qt" => Schema::described("string", "Search query fields")
            .with("examples", json!(["n", "ti", "ab", "au", "co"])),
        "search_reviewer" => {
            Schema::described("string", "Email of reviewer whose context applies to the search")
        }
        "search_sort" => Schema::described("string", "Sort order for search results"),
        "search_scoresort" => Schema::described("string", "Score sort method"),
        _ => return None,
    };
    Some(schema)
}

/// A shared parameter, decoded from its catalog name.
///
/// `NAME.path` is located in the path and required; `NAME.opt` is an
/// optional query parameter; a plain `NAME` is a query parameter whose
/// required-ness comes from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonParameter {
    /// Parameter name as sent on the wire.
    pub name: &'static str,
    /// `path` or `query`.
    pub location: &'static str,
    /// Whether the parameter must be supplied.
    pub required: bool,
    /// Shared schema (or primitive type) of the value.
    pub schema: &'static str,
}

impl CommonParameter {
    /// The Parameter Object for this definition, given its resolved schema.
    pub fn to_parameter(&self, schema: RefOr<Schema>) -> Parameter {
        Parameter {
            name: Some(self.name.to_string()),
            location: Some(self.location.to_string()),
            required: Some(self.required),
            description: None,
            schema: Some(schema),
            extra: Map::new(),
        }
    }
}

/// Decodes a shared parameter name, or `None` if the catalog has no such parameter.
pub fn common_parameter(name: &str) -> Option<CommonParameter> {
    let (base, location, required) = if let Some(base) = name.strip_suffix(".path") {
        (base, "path", Some(true))
    } else if let Some(base) = name.strip_suffix(".opt") {
        (base, "query", Some(false))
    } else {
        (name, "query", None)
    };
    let &(name, schema) = PARAM_SCHEMAS.iter().find(|(n, _)| *n == base)?;
    Some(CommonParameter {
        name,
        location,
        required: required.unwrap_or_else(|| PARAM_REQUIRED.contains(&name)),
        schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_common_schema_has_a_definition() {
        for name in COMMON_SCHEMAS {
            assert!(schema_definition(name).is_some(), "missing {}", name);
            for dep in schema_dependencies(name) {
                assert!(is_common_schema(dep), "{} depends on unknown {}", name, dep);
            }
        }
        assert!(schema_definition("widget").is_none());
        assert!(schema_definition("string").is_none());
    }

    #[test]
    fn test_every_parameter_schema_resolves() {
        for (param, schema) in PARAM_SCHEMAS {
            assert!(
                is_primitive(schema) || is_common_schema(schema),
                "{} uses unknown schema {}",
                param,
                schema
            );
        }
    }

    #[test]
    fn test_common_parameter_variants() {
        assert_eq!(
            common_parameter("p.path"),
            Some(CommonParameter {
                name: "p",
                location: "path",
                required: true,
                schema: "pid"
            })
        );
        let p = common_parameter("p").unwrap();
        assert_eq!((p.location, p.required), ("query", true));
        let p = common_parameter("p.opt").unwrap();
        assert_eq!((p.location, p.required), ("query", false));
        let q = common_parameter("q").unwrap();
        assert_eq!((q.required, q.schema), (false, "search_string"));
        assert_eq!(common_parameter("forceShow").unwrap().schema, "boolean");
        assert!(common_parameter("nonesuch").is_none());
        assert!(common_parameter("nonesuch.path").is_none());
    }

    #[test]
    fn test_minimal_response_shape() {
        let schema = schema_definition(MINIMAL_RESPONSE).unwrap();
        assert!(schema.is_object_type());
        assert_eq!(schema.required, Some(vec!["ok".to_string()]));
        let props = schema.properties.unwrap();
        assert_eq!(props.keys().collect::<Vec<_>>(), ["ok", "message_list"]);
        assert_eq!(
            props["message_list"].ref_location(),
            Some("#/components/schemas/message_list")
        );
    }

    #[test]
    fn test_message_list_is_an_array() {
        let schema = schema_definition("message_list").unwrap();
        assert_eq!(schema.schema_type, Some(json!("array")));
        assert_eq!(
            schema.items.unwrap().ref_location(),
            Some("#/components/schemas/message")
        );
    }

    #[test]
    fn test_param_schema_name() {
        assert_eq!(param_schema_name("r"), Some("rid"));
        assert_eq!(param_schema_name("json"), None);
    }
}
