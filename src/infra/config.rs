//! For reading application configuration.

use crate::graphql::GraphQlViewConfig;
use serde::Deserialize;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Settings for the GraphQL endpoint.
    #[serde(default)]
    pub graphql: GraphQlViewConfig,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server address.
    pub http_address: String,
    /// Server http port.
    pub http_port: u16,
    /// Path the GraphQL endpoint is mounted on.
    pub graphql_path: String,
    /// Requests running longer than this are answered with 408.
    pub request_timeout_seconds: u64,
    /// Maximum number of requests served at once.
    pub concurrency_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_address: "127.0.0.1".to_string(),
            http_port: 5000,
            graphql_path: "/graphql".to_string(),
            request_timeout_seconds: 10,
            concurrency_limit: 500,
        }
    }
}

/// Retrieve [`Config`] from the default configuration file.
///
/// Values from `APP__`-prefixed environment variables override the file,
/// e.g. `APP__GRAPHQL__PRETTY=true`.
#[tracing::instrument]
pub fn load_config() -> color_eyre::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?
        .try_deserialize()?;
    Ok(config)
}
