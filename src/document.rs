use crate::openapi::ExpandedSpec;
use crate::resolve::{ResolveError, Resolver};
use serde_json::Value;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("can't parse the document at \"{location}\": {reason}")]
    Parse { location: String, reason: String },
    #[error("the document at \"{location}\" is not an object")]
    NotAnObject { location: String },
    #[error("malformed spec: {0}")]
    Shape(#[source] serde_json::Error),
}

/// A parsed specification document, owned by the request that loaded it.
///
/// The raw form is what documentation pages serve; the expanded form is the
/// reference-free typed model the mock endpoint works with.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    location: Url,
    raw: Value,
}

impl SpecDocument {
    pub fn from_slice(location: Url, bytes: &[u8]) -> Result<Self, DocumentError> {
        let raw = parse_value(&location, bytes)?;
        if !raw.is_object() {
            return Err(DocumentError::NotAnObject {
                location: location.to_string(),
            });
        }

        Ok(Self { location, raw })
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Points the document's "try it now" target at `host` + `base_path`. Without a
    /// host, clients fall back to the host that served the document.
    pub fn patch_try_it(&mut self, host: Option<&str>, base_path: &str) {
        if let Some(root) = self.raw.as_object_mut() {
            match host {
                Some(host) => root.insert("host".to_string(), Value::String(host.to_string())),
                None => root.remove("host"),
            };
            root.insert("basePath".to_string(), Value::String(base_path.to_string()));
        }
    }

    /// Resolves every reference against `base` and builds the typed model.
    pub async fn expand(
        self,
        resolver: &Resolver<'_>,
        base: &Url,
    ) -> Result<ExpandedSpec, ResolveError> {
        let resolved = resolver.resolve(self.raw, base).await?;

        Ok(ExpandedSpec::from_value(resolved)?)
    }
}

/// Parses JSON or YAML into a JSON value. YAML mapping keys such as bare status codes
/// come out as strings.
pub fn parse_value(location: &Url, bytes: &[u8]) -> Result<Value, DocumentError> {
    let parse_error = |reason: String| DocumentError::Parse {
        location: location.to_string(),
        reason,
    };

    let text = String::from_utf8_lossy(bytes);
    if text.trim_start().starts_with('{') {
        return serde_json::from_str(&text).map_err(|err| parse_error(err.to_string()));
    }

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|err| parse_error(err.to_string()))?;

    serde_json::to_value(yaml).map_err(|err| parse_error(err.to_string()))
}
