use crate::openapi::{HttpMethod, Operation, PathItem, Schema};
use axum::http::StatusCode;

/// Statuses tried, in order, when the caller does not ask for one.
const DEFAULT_STATUSES: [u16; 3] = [200, 302, 301];

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("invalid expected status {0:?}")]
pub struct InvalidStatus(pub String);

pub fn select_operation<'a>(item: &'a PathItem, method: &str) -> Option<&'a Operation> {
    let method: HttpMethod = method.parse().ok()?;

    item.operation(method)
}

/// Picks the response schema for `expected_status`, or the first of 200, 302 and 301
/// that declares one. An empty header counts as absent.
pub fn select_response<'a>(
    operation: &'a Operation,
    expected_status: Option<&str>,
) -> Result<Option<(u16, &'a Schema)>, InvalidStatus> {
    match expected_status.map(str::trim).filter(|status| !status.is_empty()) {
        Some(raw) => {
            let status = parse_status(raw)?;

            Ok(schema_for(operation, status).map(|schema| (status, schema)))
        }
        None => Ok(DEFAULT_STATUSES
            .iter()
            .find_map(|&status| schema_for(operation, status).map(|schema| (status, schema)))),
    }
}

fn parse_status(raw: &str) -> Result<u16, InvalidStatus> {
    raw.parse::<u16>()
        .ok()
        .filter(|&status| StatusCode::from_u16(status).is_ok())
        .ok_or_else(|| InvalidStatus(raw.to_string()))
}

fn schema_for(operation: &Operation, status: u16) -> Option<&Schema> {
    operation
        .responses
        .get(&status.to_string())
        .and_then(|response| response.schema())
}
