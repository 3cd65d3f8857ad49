use crate::mock::{MockError, MockRequest};
use crate::service::SpecService;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::sync::Arc;

/// Request header naming the response status to mock.
const EXPECTED_STATUS_HEADER: &str = "X-Status";

pub async fn spec_handler(
    State(service): State<Arc<SpecService>>,
    Path((branch, filename)): Path<(String, String)>,
) -> Response {
    match service.document_json(&branch, &filename).await {
        Ok(doc) => json_response(StatusCode::OK, &doc, b"  "),
        Err(err) => err.into_response(),
    }
}

pub async fn defs_handler(
    State(service): State<Arc<SpecService>>,
    Path((branch, _filename, defs)): Path<(String, String, String)>,
) -> Response {
    match service.raw_file(&branch, &defs).await {
        Ok(doc) => json_response(StatusCode::OK, &doc, b"  "),
        Err(err) => err.into_response(),
    }
}

pub async fn try_handler(
    State(service): State<Arc<SpecService>>,
    Path((branch, filename, path)): Path<(String, String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let request = MockRequest {
        branch,
        spec_name: filename,
        method: method.as_str().to_string(),
        path,
        expected_status: headers
            .get(EXPECTED_STATUS_HEADER)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned()),
    };

    tracing::info!(
        branch = %request.branch,
        spec = %request.spec_name,
        method = %request.method,
        path = %request.path,
        expected_status = ?request.expected_status,
        "try it now"
    );

    match service.try_request(&request).await {
        Ok(response) => json_response(
            StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK),
            &response.body,
            b" ",
        ),
        Err(err) => err.into_response(),
    }
}

fn json_response(status: StatusCode, value: &Value, indent: &[u8]) -> Response {
    let mut body = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(indent));

    if let Err(err) = value.serialize(&mut serializer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "no mock response");
        }

        (
            status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
