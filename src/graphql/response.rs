//! Turning execution results into response bodies.

use super::{
    execute::ExecutionResult, params::GraphQlParams, GraphQlView, JsonMap, RequestInfo,
};
use crate::infra::error::{HttpError, ViewResult};
use async_graphql::{Executor, PathSegment, ServerError};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A position in the GraphQL document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The line, starting at 1.
    pub line: usize,
    /// The column, starting at 1.
    pub column: usize,
}

/// An error as the client sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedError {
    message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    path: Vec<Value>,
}

impl FormattedError {
    /// An error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where in the document the error was found.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// The response path of the field that failed.
    pub fn path(&self) -> &[Value] {
        &self.path
    }
}

impl From<&ServerError> for FormattedError {
    fn from(error: &ServerError) -> Self {
        Self {
            message: error.message.clone(),
            locations: error
                .locations
                .iter()
                .map(|pos| Location {
                    line: pos.line,
                    column: pos.column,
                })
                .collect(),
            path: error
                .path
                .iter()
                .map(|segment| match segment {
                    PathSegment::Field(name) => Value::String(name.clone()),
                    PathSegment::Index(index) => Value::from(*index),
                })
                .collect(),
        }
    }
}

impl From<&HttpError> for FormattedError {
    fn from(error: &HttpError) -> Self {
        Self::new(error.to_string())
    }
}

/// The GraphQL response of one request.
///
/// `data` is left out entirely when the request never reached execution.
#[derive(Clone, Debug, Serialize)]
pub struct GraphQlPayload {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FormattedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<async_graphql::Value>,
}

impl GraphQlPayload {
    /// Shapes a result and picks its status: 400 if invalid, 200 otherwise.
    pub fn from_result(result: ExecutionResult) -> (Self, StatusCode) {
        let errors = result.errors.iter().map(FormattedError::from).collect();
        if result.invalid {
            (Self { errors, data: None }, StatusCode::BAD_REQUEST)
        } else {
            (
                Self {
                    errors,
                    data: Some(result.data),
                },
                StatusCode::OK,
            )
        }
    }

    /// The errors of the response.
    pub fn errors(&self) -> &[FormattedError] {
        &self.errors
    }

    /// The data of the response, if execution started.
    pub fn data(&self) -> Option<&async_graphql::Value> {
        self.data.as_ref()
    }
}

/// One element of a batch response.
#[derive(Serialize)]
struct BatchEntry<'a> {
    id: Option<&'a Value>,
    payload: &'a GraphQlPayload,
    status: u16,
}

/// Encodes `value` as compact JSON, or indented with sorted keys if `pretty`.
pub fn encode<T: Serialize + ?Sized>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if !pretty {
        return serde_json::to_string(value);
    }
    let value = sort_keys(serde_json::to_value(value)?);
    serde_json::to_string_pretty(&value)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        value => value,
    }
}

impl<E: Executor> GraphQlView<E> {
    /// Runs one request and encodes its response.
    ///
    /// The body is only missing when `show_graphiql` is set and execution
    /// was skipped.
    pub(crate) async fn get_response(
        &self,
        info: &RequestInfo,
        body: &JsonMap,
        show_graphiql: bool,
    ) -> ViewResult<(Option<String>, StatusCode)> {
        let params = GraphQlParams::extract(&info.query_params, body)?;
        let Some(result) = self
            .execute_graphql_request(&params, &info.context, show_graphiql)
            .await?
        else {
            return Ok((None, StatusCode::OK));
        };

        let (payload, status) = GraphQlPayload::from_result(result);
        let pretty = info.pretty || show_graphiql;
        let encoded = if self.config.batch {
            let entry = BatchEntry {
                id: params.id.as_ref(),
                payload: &payload,
                status: status.as_u16(),
            };
            encode(&entry, pretty)?
        } else {
            encode(&payload, pretty)?
        };
        Ok((Some(encoded), status))
    }

    /// Runs every request of a batch. The status is the highest of the batch.
    pub(crate) async fn batch_response(
        &self,
        info: &RequestInfo,
        entries: &[Value],
    ) -> ViewResult<(String, StatusCode)> {
        if entries.is_empty() {
            return Err(
                HttpError::bad_request("Received an empty list in the batch request.").into(),
            );
        }
        let responses = futures::future::try_join_all(entries.iter().map(|entry| async move {
            match entry {
                Value::Object(params) => self.get_response(info, params, false).await,
                _ => Err(HttpError::bad_request("Batch entries must be JSON objects.").into()),
            }
        }))
        .await?;

        let status = responses
            .iter()
            .map(|(_, status)| *status)
            .max_by_key(|status| status.as_u16())
            .unwrap_or(StatusCode::OK);
        let body = responses
            .into_iter()
            .filter_map(|(encoded, _)| encoded)
            .collect::<Vec<_>>()
            .join(",");
        Ok((format!("[{body}]"), status))
    }
}
