//! Serves the example schema over HTTP.

use color_eyre::eyre::Context;
use graphql_view::{
    app::run_app,
    graphql::GraphQlView,
    infra::{config::load_config, logging::init_logging},
    schema::build_schema,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let _guard = init_logging();
    let config = load_config()?;

    let view = GraphQlView::new(build_schema(), config.graphql)?;
    let addr = format!(
        "{}:{}",
        config.server.http_address, config.server.http_port
    );
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;
    run_app(listener, view, config.server).await?;

    Ok(())
}
