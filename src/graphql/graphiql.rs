//! The GraphiQL explorer page.

use super::{params::GraphQlParams, GraphQlViewConfig, JsonMap};
use crate::infra::error::ViewResult;
use askama::Template;
use serde::Serialize;

#[derive(Template)]
#[template(path = "graphiql.html")]
struct GraphiqlTemplate<'a> {
    title: &'a str,
    version: &'a str,
    // JavaScript literals, inserted unescaped.
    query: String,
    variables: String,
    operation_name: String,
    result: String,
}

/// Renders the explorer, prefilled with the request and its encoded result.
pub(crate) fn render(
    config: &GraphQlViewConfig,
    params: &GraphQlParams,
    result: Option<&str>,
) -> ViewResult<String> {
    let variables = params
        .variables
        .as_ref()
        .map(|variables| serde_json::to_string(variables))
        .transpose()?;
    let template = GraphiqlTemplate {
        title: &config.graphiql_title,
        version: &config.graphiql_version,
        query: script_literal(&params.query)?,
        variables: script_literal(&variables)?,
        operation_name: script_literal(&params.operation_name)?,
        result: script_literal(&result)?,
    };
    Ok(template.render()?)
}

/// Encodes `value` as JSON that can sit inside a `<script>` element.
fn script_literal<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let encoded = serde_json::to_string(value)?;
    Ok(encoded
        .replace('<', "\\u003c")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

/// Whether a `raw` parameter asks for JSON instead of the explorer.
pub(crate) fn wants_raw(query_params: &JsonMap, body: Option<&JsonMap>) -> bool {
    query_params.contains_key("raw") || body.is_some_and(|body| body.contains_key("raw"))
}
