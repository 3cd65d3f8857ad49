use crate::document::DocumentError;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

type PathTemplate = String;
type StatusKey = String;

/// Reference-free view of a specification document.
///
/// Only built from documents whose references were already resolved, so none of these
/// types can carry a `$ref`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExpandedSpec {
    /// Ordered by template, which fixes the first-match precedence.
    #[serde(default, deserialize_with = "without_extensions")]
    pub paths: BTreeMap<PathTemplate, PathItem>,
    #[serde(default)]
    pub definitions: BTreeMap<String, Schema>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
    pub delete: Option<Operation>,
    pub patch: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Operation {
    #[serde(default, deserialize_with = "without_extensions")]
    pub responses: BTreeMap<StatusKey, Response>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Response {
    pub schema: Option<Schema>,
    /// OpenAPI 3.x media types.
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Schema {
    #[serde(rename = "type", default)]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default)]
    pub example: Option<Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unsupported HTTP method {0:?}")]
pub struct UnknownMethod(pub String);

impl ExpandedSpec {
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        serde_json::from_value(value).map_err(DocumentError::Shape)
    }
}

/// Deserializes a map, skipping `x-` vendor extension keys.
fn without_extensions<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    BTreeMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .filter(|(key, _)| !key.starts_with("x-"))
        .map(|(key, value)| {
            serde_json::from_value(value)
                .map(|typed| (key, typed))
                .map_err(D::Error::custom)
        })
        .collect()
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }
}

impl Response {
    /// The Swagger 2.0 schema, else the JSON (or first) OpenAPI 3.x media type schema.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref().or_else(|| {
            self.content
                .get("application/json")
                .and_then(|media| media.schema.as_ref())
                .or_else(|| {
                    self.content
                        .values()
                        .find_map(|media| media.schema.as_ref())
                })
        })
    }
}

impl Schema {
    pub fn is_object(&self) -> bool {
        self.schema_type.contains("object")
    }
}

impl Default for SchemaType {
    fn default() -> Self {
        SchemaType::Multiple(vec![])
    }
}

impl SchemaType {
    pub fn contains(&self, name: &str) -> bool {
        match self {
            SchemaType::Single(single) => single == name,
            SchemaType::Multiple(types) => types.iter().any(|t| t == name),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    /// Case-insensitive; a trailing `method` suffix (`GetMethod`) is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_suffix("method").unwrap_or(&lower);

        match name {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}
