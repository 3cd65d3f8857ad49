pub mod example;
pub mod matcher;
pub mod select;

use crate::document::DocumentError;
use crate::loader::LoadError;
use crate::mock::example::synthesize;
use crate::mock::matcher::PathMatcher;
use crate::mock::select::{select_operation, select_response, InvalidStatus};
use crate::openapi::ExpandedSpec;
use crate::resolve::ResolveError;
use axum::http::StatusCode;
use serde_json::Value;

/// A "try it now" call against one spec on one branch.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub branch: String,
    pub spec_name: String,
    pub method: String,
    pub path: String,
    pub expected_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(thiserror::Error, Debug)]
pub enum MockError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),
    #[error("invalid path template: {0}")]
    Template(#[from] regex::Error),
    #[error("no path matches {path:?}")]
    NoMatch { path: String },
    #[error("no example response for {method} {template} ({status})")]
    NoSchema {
        method: String,
        template: String,
        status: String,
    },
}

impl MockError {
    /// A malformed expected status shares the 500 of load failures.
    pub fn status_code(&self) -> StatusCode {
        match self {
            MockError::NoMatch { .. } => StatusCode::NOT_FOUND,
            MockError::NoSchema { .. } => StatusCode::METHOD_NOT_ALLOWED,
            MockError::Load(_)
            | MockError::Document(_)
            | MockError::Resolve(_)
            | MockError::InvalidStatus(_)
            | MockError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Answers `method path` from an expanded spec.
///
/// The first template, in `spec.paths` order, that matches the path and declares the
/// method wins, even if a later template would fit better. A template that matches but
/// lacks the method is skipped.
pub fn mock_response(
    spec: &ExpandedSpec,
    method: &str,
    path: &str,
    expected_status: Option<&str>,
) -> Result<MockResponse, MockError> {
    for (template, item) in &spec.paths {
        let matcher = PathMatcher::new(template)?;
        if !matcher.is_match(path) {
            continue;
        }

        let Some(operation) = select_operation(item, method) else {
            continue;
        };

        tracing::debug!(template = matcher.template(), method, path, "matched path template");

        return match select_response(operation, expected_status)? {
            Some((status, schema)) => Ok(MockResponse {
                status,
                body: synthesize(schema),
            }),
            None => Err(MockError::NoSchema {
                method: method.to_string(),
                template: matcher.template().to_string(),
                status: expected_status
                    .filter(|status| !status.trim().is_empty())
                    .map(|status| format!("status {}", status.trim()))
                    .unwrap_or_else(|| "status 200, 302 or 301".to_string()),
            }),
        };
    }

    Err(MockError::NoMatch {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pets_spec() -> ExpandedSpec {
        ExpandedSpec::from_value(json!({
            "paths": {
                "/pets/{id}": {
                    "get": {"responses": {"200": {"schema": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string", "example": "Rex"},
                            "owner": {
                                "type": "object",
                                "properties": {"city": {"type": "string", "example": "NYC"}}
                            }
                        }
                    }}}},
                    "delete": {"responses": {"204": {"description": "gone"}}}
                },
                "/pets": {
                    "post": {"responses": {"201": {"schema": {
                        "type": "object",
                        "properties": {"id": {"type": "integer", "example": 1}}
                    }}}}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn get_pet_returns_example() {
        let response = mock_response(&pets_spec(), "GET", "/pets/42", None).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({"name": "Rex", "owner": {"city": "NYC"}})
        );
    }

    #[test]
    fn undeclared_expected_status_is_method_not_allowed() {
        let err = mock_response(&pets_spec(), "GET", "/pets/42", Some("404")).unwrap_err();

        assert!(matches!(err, MockError::NoSchema { .. }));
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn operation_without_default_schema_is_method_not_allowed() {
        let err = mock_response(&pets_spec(), "DELETE", "/pets/42", None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn expected_status_selects_response() {
        let response = mock_response(&pets_spec(), "post", "pets", Some("201")).unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.body, json!({"id": 1}));
    }

    #[test]
    fn extra_segment_is_not_found() {
        let err = mock_response(&pets_spec(), "GET", "/pets/42/toys", None).unwrap_err();

        assert!(matches!(err, MockError::NoMatch { .. }));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn undeclared_method_is_not_found() {
        let err = mock_response(&pets_spec(), "PUT", "/pets/42", None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn malformed_expected_status_is_internal_error() {
        let err = mock_response(&pets_spec(), "GET", "/pets/42", Some("teapot")).unwrap_err();

        assert!(matches!(err, MockError::InvalidStatus(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn template_without_method_falls_through_to_next_match() {
        let spec = ExpandedSpec::from_value(json!({
            "paths": {
                "/pets/mine": {"post": {"responses": {}}},
                "/pets/{id}": {"get": {"responses": {"200": {"schema": {
                    "type": "object",
                    "properties": {"name": {"example": "Rex"}}
                }}}}}
            }
        }))
        .unwrap();

        let response = mock_response(&spec, "GET", "/pets/mine", None).unwrap();
        assert_eq!(response.body, json!({"name": "Rex"}));
    }

    #[test]
    fn first_template_in_order_wins() {
        let spec = ExpandedSpec::from_value(json!({
            "paths": {
                "/pets/{id}": {"get": {"responses": {"200": {"schema": {
                    "type": "object",
                    "properties": {"from": {"example": "template"}}
                }}}}},
                "/pets/mine": {"get": {"responses": {"200": {"schema": {
                    "type": "object",
                    "properties": {"from": {"example": "static"}}
                }}}}}
            }
        }))
        .unwrap();

        // "/pets/mine" sorts before "/pets/{id}".
        let response = mock_response(&spec, "GET", "/pets/mine", None).unwrap();
        assert_eq!(response.body, json!({"from": "static"}));
    }
}
