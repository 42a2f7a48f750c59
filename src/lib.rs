//! A GraphQL endpoint for axum.
//!
//! [`graphql::GraphQlView`] turns HTTP requests into GraphQL requests for any
//! [`async_graphql::Executor`], and the results back into HTTP responses.
//! [`app`] wraps it in the usual middleware, and [`schema`] holds the schema
//! served by the binary.

pub mod app;
pub mod graphql;
pub mod infra;
pub mod schema;
