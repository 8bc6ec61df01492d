#![deny(missing_docs)]

//! # Document Model
//!
//! Typed structures for the parts of an OpenAPI 3.1 document the reconciler
//! reads or writes. Every object keeps the keys it does not model in an
//! `extra` map (in input order), so hand-authored content survives a round
//! trip untouched.
//!
//! Fields the reconciler reasons about (references, `type`, `required`,
//! `properties`, `allOf`, ...) are explicit, which keeps the "is this a
//! reference" and "does this have content" checks of the merge rules typed.

use crate::error::{AppError, AppResult};
use crate::refs::component_ref;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fmt;

/// OpenAPI version written to every generated document.
pub const OPENAPI_VERSION: &str = "3.1.0";

/// Content type for bodies carrying a file upload.
pub const MULTIPART_FORM: &str = "multipart/form-data";

/// Content type for plain form bodies.
pub const URLENCODED_FORM: &str = "application/x-www-form-urlencoded";

/// Content type of every API response.
pub const JSON_CONTENT: &str = "application/json";

/// Path Item keys that hold Operation Objects.
pub const OPERATION_KEYS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// HTTP methods an API function can be exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    /// Methods in expansion order.
    pub const ALL: [Method; 2] = [Method::Get, Method::Post];

    /// Lowercase name, as used for Path Item keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON Reference Object (`{"$ref": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// The reference target.
    #[serde(rename = "$ref")]
    pub ref_location: String,
    /// Sibling keys (`summary`, `description`, extensions).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reference {
    /// Creates a reference to `#/components/{section}/{name}`.
    pub fn to_component(section: &str, name: &str) -> Self {
        Self {
            ref_location: component_ref(section, name),
            extra: Map::new(),
        }
    }
}

/// Either a `$ref` or an inline definition.
///
/// A JSON object carrying `$ref` always deserializes as [`RefOr::Ref`].
/// Bare `true`/`false` are JSON Schema boolean schemas; they are kept as
/// written and never merged into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// A reference into the document.
    Ref(Reference),
    /// A boolean schema (`true` accepts anything, `false` nothing).
    Bool(bool),
    /// An inline definition.
    T(T),
}

impl<T> RefOr<T> {
    /// Returns the reference target if this is a reference.
    pub fn ref_location(&self) -> Option<&str> {
        match self {
            RefOr::Ref(r) => Some(&r.ref_location),
            RefOr::Bool(_) | RefOr::T(_) => None,
        }
    }

    /// Returns the inline definition if this is not a reference.
    pub fn as_inline(&self) -> Option<&T> {
        match self {
            RefOr::T(t) => Some(t),
            RefOr::Ref(_) | RefOr::Bool(_) => None,
        }
    }

    /// Mutable access to the inline definition.
    pub fn as_inline_mut(&mut self) -> Option<&mut T> {
        match self {
            RefOr::T(t) => Some(t),
            RefOr::Ref(_) | RefOr::Bool(_) => None,
        }
    }
}

/// Objects that can receive a summary and description from the description catalog.
pub trait Describe {
    /// The summary field, or `None` when the object kind has no summary.
    fn summary_slot(&mut self) -> Option<&mut Option<String>>;
    /// The description field.
    fn description_slot(&mut self) -> &mut Option<String>;
}

/// Objects with a notion of "no content at all" (`{}`).
pub trait Blank {
    /// True when serializing this value would produce an empty object.
    fn is_blank(&self) -> bool;
}

impl<T: Blank> Blank for RefOr<T> {
    fn is_blank(&self) -> bool {
        match self {
            RefOr::Ref(_) | RefOr::Bool(_) => false,
            RefOr::T(t) => t.is_blank(),
        }
    }
}

/// A JSON Schema object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// `type`: a type name or a list of them.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,
    /// Human readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Names of required properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Object properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, RefOr<Schema>>>,
    /// Array item schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<RefOr<Schema>>>,
    /// `allOf` composition.
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<RefOr<Schema>>>,
    /// `oneOf` composition.
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<RefOr<Schema>>>,
    /// Every other keyword.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Schema {
    /// A schema with only `type` set.
    pub fn typed(type_name: &str) -> Self {
        Self {
            schema_type: Some(Value::String(type_name.to_string())),
            ..Self::default()
        }
    }

    /// A schema with `type` and `description`.
    pub fn described(type_name: &str, description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::typed(type_name)
        }
    }

    /// An array schema over `items`.
    pub fn array_of(items: RefOr<Schema>) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array")
        }
    }

    /// Adds a keyword this model does not name explicitly.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// True for `type: "object"`.
    pub fn is_object_type(&self) -> bool {
        self.schema_type.as_ref().and_then(Value::as_str) == Some("object")
    }
}

impl Blank for Schema {
    fn is_blank(&self) -> bool {
        self.schema_type.is_none()
            && self.description.is_none()
            && self.required.is_none()
            && self.properties.is_none()
            && self.items.is_none()
            && self.all_of.is_none()
            && self.one_of.is_none()
            && self.extra.is_empty()
    }
}

impl Describe for Schema {
    fn summary_slot(&mut self) -> Option<&mut Option<String>> {
        None
    }

    fn description_slot(&mut self) -> &mut Option<String> {
        &mut self.description
    }
}

/// A Parameter Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Location: `query`, `path`, `header` or `cookie`.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Whether the parameter must be supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Human readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<RefOr<Schema>>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Parameter {
    /// An inline query parameter.
    pub fn query(name: &str, required: bool, schema: RefOr<Schema>) -> Self {
        Self {
            name: Some(name.to_string()),
            location: Some("query".to_string()),
            required: Some(required),
            schema: Some(schema),
            ..Self::default()
        }
    }
}

impl Blank for Parameter {
    fn is_blank(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.required.is_none()
            && self.description.is_none()
            && self.schema.is_none()
            && self.extra.is_empty()
    }
}

impl Describe for Parameter {
    fn summary_slot(&mut self) -> Option<&mut Option<String>> {
        None
    }

    fn description_slot(&mut self) -> &mut Option<String> {
        &mut self.description
    }
}

/// A Media Type Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Body schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<RefOr<Schema>>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Request Body Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Human readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content keyed by media type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Response Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Human readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content keyed by media type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    /// A response with a single `application/json` body.
    pub fn json(description: &str, schema: RefOr<Schema>) -> Self {
        let mut content = IndexMap::new();
        content.insert(
            JSON_CONTENT.to_string(),
            MediaType {
                schema: Some(schema),
                extra: Map::new(),
            },
        );
        Self {
            description: Some(description.to_string()),
            content: Some(content),
            extra: Map::new(),
        }
    }
}

/// An Operation Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Grouping tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unique operation identifier.
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Query, path and header parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<RefOr<Parameter>>>,
    /// Request body.
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code or `default`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<IndexMap<String, RefOr<Response>>>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Describe for Operation {
    fn summary_slot(&mut self) -> Option<&mut Option<String>> {
        Some(&mut self.summary)
    }

    fn description_slot(&mut self) -> &mut Option<String> {
        &mut self.description
    }
}

/// A Path Item Object.
///
/// `get` and `post` are modeled; other methods and extensions stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The GET operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// The POST operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PathItem {
    /// The operation slot for `method`.
    pub fn operation_mut(&mut self, method: Method) -> &mut Option<Operation> {
        match method {
            Method::Get => &mut self.get,
            Method::Post => &mut self.post,
        }
    }

    /// The operation for `method`, if present.
    pub fn operation(&self, method: Method) -> Option<&Operation> {
        match method {
            Method::Get => self.get.as_ref(),
            Method::Post => self.post.as_ref(),
        }
    }

    /// Operation keys held in `extra` (methods this model does not type).
    pub fn untyped_operation_keys(&self) -> impl Iterator<Item = &str> {
        self.extra
            .keys()
            .map(String::as_str)
            .filter(|k| OPERATION_KEYS.contains(k))
    }

    /// The first tag of the first operation that has any.
    pub fn first_tag(&self) -> Option<&str> {
        let typed = [self.get.as_ref(), self.post.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|op| op.tags.as_ref().and_then(|t| t.first()))
            .map(String::as_str);
        typed.or_else(|| {
            self.extra
                .iter()
                .filter(|(k, _)| OPERATION_KEYS.contains(&k.as_str()))
                .find_map(|(_, op)| op.get("tags")?.as_array()?.first()?.as_str())
        })
    }
}

impl Describe for PathItem {
    fn summary_slot(&mut self) -> Option<&mut Option<String>> {
        Some(&mut self.summary)
    }

    fn description_slot(&mut self) -> &mut Option<String> {
        &mut self.description
    }
}

/// A Tag Object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tag {
    /// A tag with only a name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            extra: Map::new(),
        }
    }
}

impl Describe for Tag {
    fn summary_slot(&mut self) -> Option<&mut Option<String>> {
        None
    }

    fn description_slot(&mut self) -> &mut Option<String> {
        &mut self.description
    }
}

/// The Info Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// API version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Describe for Info {
    fn summary_slot(&mut self) -> Option<&mut Option<String>> {
        Some(&mut self.summary)
    }

    fn description_slot(&mut self) -> &mut Option<String> {
        &mut self.description
    }
}

/// The Components Object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Shared schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, RefOr<Schema>>>,
    /// Shared parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<IndexMap<String, RefOr<Parameter>>>,
    /// Every other component section.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The root OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// OpenAPI version string.
    #[serde(default)]
    pub openapi: String,
    /// API metadata.
    #[serde(default)]
    pub info: Info,
    /// Path items keyed by path template.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Shared components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Tag metadata, in display order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    /// Every other top-level field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Parses a document from JSON text.
    ///
    /// The top level must be a JSON object.
    pub fn parse(text: &str) -> AppResult<Self> {
        let raw: Value = serde_json::from_str(text)?;
        if !raw.is_object() {
            return Err(AppError::InvalidInput(
                "top level of an OpenAPI document must be an object".into(),
            ));
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Serializes the document as pretty JSON with four-space indentation
    /// and a trailing newline. Slashes and non-ASCII text are not escaped.
    pub fn to_json_pretty(&self) -> AppResult<String> {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        out.push(b'\n');
        String::from_utf8(out).map_err(|e| AppError::General(e.to_string()))
    }

    /// Shared schemas, if any have been registered.
    pub fn schemas(&self) -> Option<&IndexMap<String, RefOr<Schema>>> {
        self.components.as_ref()?.schemas.as_ref()
    }

    /// Shared parameters, if any have been registered.
    pub fn parameters(&self) -> Option<&IndexMap<String, RefOr<Parameter>>> {
        self.components.as_ref()?.parameters.as_ref()
    }

    /// Mutable shared schemas, created on demand.
    pub fn schemas_mut(&mut self) -> &mut IndexMap<String, RefOr<Schema>> {
        self.components
            .get_or_insert_with(Components::default)
            .schemas
            .get_or_insert_with(IndexMap::new)
    }

    /// Mutable shared parameters, created on demand.
    pub fn parameters_mut(&mut self) -> &mut IndexMap<String, RefOr<Parameter>> {
        self.components
            .get_or_insert_with(Components::default)
            .parameters
            .get_or_insert_with(IndexMap::new)
    }
}
