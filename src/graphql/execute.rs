//! Running a GraphQL request against the engine.

use super::{params::GraphQlParams, GraphQlView};
use crate::infra::error::HttpError;
use async_graphql::{
    parser::types::{DocumentOperations, ExecutableDocument, OperationType},
    Executor, Response, ServerError, Value, Variables,
};
use http::{HeaderMap, Method, Uri};
use tracing::instrument;

/// Request details handed to resolvers when the view has no context of its own.
///
/// Resolvers read it with `ctx.data::<RequestContext>()`.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// The HTTP method.
    pub method: Method,
    /// The requested URI.
    pub uri: Uri,
    /// The request headers.
    pub headers: HeaderMap,
}

/// The outcome of one GraphQL request.
#[derive(Debug)]
pub struct ExecutionResult {
    /// The resolved data.
    pub data: Value,
    /// Errors in the order the engine reported them.
    pub errors: Vec<ServerError>,
    /// Set when the request failed before any field was resolved.
    pub invalid: bool,
}

impl ExecutionResult {
    /// A result for a request that could not be executed at all.
    pub fn invalid(errors: Vec<ServerError>) -> Self {
        Self {
            data: Value::Null,
            errors,
            invalid: true,
        }
    }
}

impl From<Response> for ExecutionResult {
    /// Validation and operation selection fail before execution starts, so
    /// such a response has no data and none of its errors carries a path.
    fn from(response: Response) -> Self {
        let invalid = matches!(response.data, Value::Null)
            && !response.errors.is_empty()
            && response.errors.iter().all(|error| error.path.is_empty());
        Self {
            data: response.data,
            errors: response.errors,
            invalid,
        }
    }
}

/// The type of the operation that would run, if it can be told.
///
/// Without a name the only operation of the document is picked. Documents
/// with several operations and no name select nothing; the engine reports
/// that when it executes.
pub(crate) fn selected_operation(
    document: &ExecutableDocument,
    operation_name: Option<&str>,
) -> Option<OperationType> {
    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Some(operation.node.ty),
        (DocumentOperations::Single(_), Some(_)) => None,
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find(|(operation_name, _)| operation_name.as_str() == name)
            .map(|(_, operation)| operation.node.ty),
        (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => {
            operations.values().next().map(|operation| operation.node.ty)
        }
        (DocumentOperations::Multiple(_), None) => None,
    }
}

fn operation_keyword(ty: OperationType) -> &'static str {
    match ty {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}

impl<E: Executor> GraphQlView<E> {
    /// Parses and runs a request.
    ///
    /// Returns `None` only when `show_graphiql` is set and nothing should run.
    /// GraphQL errors end up in the result; only problems with the HTTP
    /// request itself are returned as errors.
    ///
    /// The engine validates while executing, so the GET operation check sees
    /// the parsed document before validation.
    #[instrument(skip_all, fields(operation_name = ?params.operation_name))]
    pub(crate) async fn execute_graphql_request(
        &self,
        params: &GraphQlParams,
        context: &RequestContext,
        show_graphiql: bool,
    ) -> Result<Option<ExecutionResult>, HttpError> {
        let Some(query) = params.query.as_deref() else {
            if show_graphiql {
                return Ok(None);
            }
            return Err(HttpError::MissingQuery);
        };

        let variables = params
            .variables
            .clone()
            .map(|variables| Variables::from_json(serde_json::Value::Object(variables)))
            .unwrap_or_default();
        let mut request = async_graphql::Request::new(query).variables(variables);
        if let Some(operation_name) = &params.operation_name {
            request = request.operation_name(operation_name.clone());
        }

        let operation = match request.parsed_query() {
            Ok(document) => selected_operation(document, params.operation_name.as_deref()),
            Err(error) => {
                tracing::debug!("query failed to parse: {}", error.message);
                return Ok(Some(ExecutionResult::invalid(vec![error])));
            }
        };

        if context.method == Method::GET {
            if let Some(ty) = operation.filter(|ty| *ty != OperationType::Query) {
                if show_graphiql {
                    return Ok(None);
                }
                return Err(HttpError::method_not_allowed(
                    "POST",
                    format!(
                        "Can only perform a {} operation from a POST request.",
                        operation_keyword(ty)
                    ),
                ));
            }
        }

        let request = match &self.context {
            Some(provide) => provide(request),
            None => request.data(context.clone()),
        };
        let result = ExecutionResult::from(self.executor.execute(request).await);
        if result.invalid {
            tracing::debug!(errors = result.errors.len(), "request is invalid");
        }
        Ok(Some(result))
    }
}
