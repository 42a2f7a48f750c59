//! Serving a GraphQL schema over HTTP.
//!
//! A [`GraphQlView`] answers GET and POST requests on one endpoint. It reads
//! the GraphQL parameters from the query string and the body, runs them on an
//! [`async_graphql::Executor`] and answers with JSON or, for browsers, with
//! the GraphiQL explorer.

use self::{
    negotiate::request_wants_html,
    params::{is_truthy, parse_body, query_params},
};
use crate::infra::error::{
    ConfigError, ErrorEnvelope, HttpError, InternalError, ViewError, ViewResult, APPLICATION_JSON,
};
use async_graphql::Executor;
use axum::{
    extract::{Request, State},
    response::{Html, IntoResponse, Response},
    routing::any,
    Router,
};
use http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode};
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::instrument;

mod execute;
mod graphiql;
pub mod negotiate;
mod params;
mod response;

pub use execute::{ExecutionResult, RequestContext};
pub use params::{GraphQlParams, JsonMap, RequestBody};
pub use response::{encode, FormattedError, GraphQlPayload, Location};

/// Settings of a GraphQL endpoint.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraphQlViewConfig {
    /// Always indent responses.
    pub pretty: bool,
    /// Show the explorer to browsers.
    pub graphiql: bool,
    /// Title of the explorer page.
    pub graphiql_title: String,
    /// GraphiQL release loaded by the explorer page.
    pub graphiql_version: String,
    /// Accept a list of requests in one JSON body.
    pub batch: bool,
    /// Largest request body that is read.
    pub max_body_bytes: usize,
}

impl Default for GraphQlViewConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            graphiql: false,
            graphiql_title: "GraphQL".to_string(),
            graphiql_version: "0.11.11".to_string(),
            batch: false,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Adds the configured context to a request.
type ContextFn = Arc<dyn Fn(async_graphql::Request) -> async_graphql::Request + Send + Sync>;

/// A GraphQL endpoint.
///
/// Cheap to clone if the executor is, as [`async_graphql::Schema`] is.
#[derive(Clone)]
pub struct GraphQlView<E> {
    executor: E,
    config: GraphQlViewConfig,
    context: Option<ContextFn>,
}

impl<E> fmt::Debug for GraphQlView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQlView")
            .field("config", &self.config)
            .field("context", &self.context.is_some())
            .finish_non_exhaustive()
    }
}

/// What every request of one HTTP call shares.
struct RequestInfo {
    context: RequestContext,
    query_params: JsonMap,
    pretty: bool,
}

impl<E: Executor> GraphQlView<E> {
    /// Creates a view.
    ///
    /// # Errors
    ///
    /// The explorer cannot be combined with batching.
    pub fn new(executor: E, config: GraphQlViewConfig) -> Result<Self, ConfigError> {
        if config.graphiql && config.batch {
            return Err(ConfigError::GraphiqlWithBatch);
        }
        Ok(Self {
            executor,
            config,
            context: None,
        })
    }

    /// Hands `context` to every request instead of the [`RequestContext`].
    ///
    /// Resolvers read it with `ctx.data::<C>()`.
    pub fn with_context<C: Clone + Send + Sync + 'static>(mut self, context: C) -> Self {
        self.context = Some(Arc::new(move |request: async_graphql::Request| {
            request.data(context.clone())
        }));
        self
    }

    /// The settings of the view.
    pub fn config(&self) -> &GraphQlViewConfig {
        &self.config
    }

    /// Answers one HTTP request.
    ///
    /// Never fails: rejected requests are answered with an error envelope.
    #[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
    pub async fn dispatch(&self, request: Request) -> Response {
        if request.method() != Method::GET && request.method() != Method::POST {
            let error = HttpError::method_not_allowed(
                "GET, POST",
                "GraphQL only supports GET and POST requests.",
            );
            return error_response(error.into(), self.config.pretty);
        }
        let query_params = match query_params(request.uri()) {
            Ok(query_params) => query_params,
            Err(e) => return error_response(e.into(), self.config.pretty),
        };
        let pretty = self.config.pretty || query_params.get("pretty").is_some_and(is_truthy);
        match self.handle(request, query_params, pretty).await {
            Ok(response) => response,
            Err(e) => error_response(e, pretty),
        }
    }

    async fn handle(
        &self,
        request: Request,
        query_params: JsonMap,
        pretty: bool,
    ) -> ViewResult<Response> {
        let context = RequestContext {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        };

        let body = parse_body(request, self.config.batch, self.config.max_body_bytes).await?;
        let show_graphiql = self.config.graphiql
            && !graphiql::wants_raw(&query_params, body.params())
            && request_wants_html(&context.headers);
        let info = RequestInfo {
            context,
            query_params,
            pretty,
        };

        let body = match body {
            RequestBody::Batch(entries) => {
                let (result, status) = self.batch_response(&info, &entries).await?;
                return Ok(json_response(result, status));
            }
            RequestBody::Params(_) if self.config.batch => {
                return Err(HttpError::bad_request(
                    "Batch GraphQL requests must be a list of requests.",
                )
                .into());
            }
            RequestBody::Params(body) => body,
        };

        match self.get_response(&info, &body, show_graphiql).await? {
            (Some(result), status) if !show_graphiql => Ok(json_response(result, status)),
            (result, _) => {
                let params = GraphQlParams::extract(&info.query_params, &body)?;
                let page = graphiql::render(&self.config, &params, result.as_deref())?;
                Ok(Html(page).into_response())
            }
        }
    }
}

fn json_response(body: String, status: StatusCode) -> Response {
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))],
        body,
    )
        .into_response()
}

fn error_response(error: ViewError, pretty: bool) -> Response {
    match error {
        ViewError::Http(error) => {
            tracing::debug!(status = %error.status(), "rejected request: {}", error);
            match encode(&ErrorEnvelope::new(error.to_string()), pretty) {
                Ok(body) => error.into_response_with_body(body),
                Err(e) => InternalError::Serialize(e).into_response(),
            }
        }
        ViewError::Internal(error) => error.into_response(),
    }
}

/// Serves `view` on `path`.
pub fn routes<E: Executor>(path: &str, view: GraphQlView<E>) -> Router {
    Router::new()
        .route(path, any(graphql_handler::<E>))
        .with_state(view)
}

async fn graphql_handler<E: Executor>(
    State(view): State<GraphQlView<E>>,
    request: Request,
) -> Response {
    view.dispatch(request).await
}
