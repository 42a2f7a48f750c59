//! The HTTP application around the GraphQL endpoint.
//!
//! # Examples
//!
//! Querying a running server.
//!
//! ```rust
//! # tokio_test::block_on(async {
//! # let url = graphql_view::app::spawn_app().await;
//! let response = reqwest::get(format!("{url}?query={{test}}")).await.unwrap();
//! assert_eq!(200, response.status());
//! assert_eq!(r#"{"data":{"test":"Hello World"}}"#, response.text().await.unwrap());
//! # });
//! ```
//!
//! Mutations have to be sent with POST.
//!
//! ```rust
//! # tokio_test::block_on(async {
//! # let url = graphql_view::app::spawn_app().await;
//! let client = reqwest::ClientBuilder::default().build().unwrap();
//! let response = client
//!     .post(&url)
//!     .json(&serde_json::json!({"query": "mutation { writeTest { test } }"}))
//!     .send()
//!     .await
//!     .unwrap();
//! assert_eq!(200, response.status());
//! # });
//! ```

use std::time::Duration;

use crate::graphql::{self, GraphQlView};
use crate::infra::config::ServerConfig;
use crate::infra::error::{InternalError, PanicHandler};
use crate::infra::middleware::MakeRequestIdSpan;
use async_graphql::Executor;
use axum::error_handling::HandleErrorLayer;
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Constructs the full axum application.
pub fn app<E: Executor>(view: GraphQlView<E>, config: &ServerConfig) -> Router {
    // Fallible middleware from tower, mapped to infallible response with [`HandleErrorLayer`].
    let tower_middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e| async move {
            InternalError::Other(format!("Tower middleware failed: {e}")).into_response()
        }))
        .concurrency_limit(config.concurrency_limit);

    graphql::routes(&config.graphql_path, view)
        // Layers
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(tower_middleware)
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// Starts the axum server, and runs it until ctrl-c is pressed.
pub async fn run_app<E: Executor>(
    listener: TcpListener,
    view: GraphQlView<E>,
    config: ServerConfig,
) -> std::io::Result<()> {
    let app = app(view, &config).into_make_service();

    tracing::info!(
        "Serving GraphQL on {}{}",
        listener.local_addr()?,
        config.graphql_path
    );
    let exit_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown("axum"))
        .await;

    match &exit_result {
        Ok(_) => tracing::info!("Successfully shut down"),
        Err(e) => tracing::error!("Shutdown failed: {}", e),
    }

    exit_result
}

/// Completes when ctrl-c is pressed.
async fn shutdown(name: &str) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to fetch ctrl_c: {}", e);
    }
    tracing::info!("{} shutting down", name);
}

/// Spawn a server with the example schema on a random port.
///
/// Returns the URL of the GraphQL endpoint.
pub async fn spawn_app() -> String {
    let address = "127.0.0.1";
    let listener = TcpListener::bind(format!("{address}:0")).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = crate::infra::config::load_config().unwrap();
    let view = GraphQlView::new(crate::schema::build_schema(), config.graphql).unwrap();
    let url = format!("http://{address}:{port}{}", config.server.graphql_path);
    tokio::spawn(run_app(listener, view, config.server));
    url
}
