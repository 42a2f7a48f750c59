//! Reading GraphQL parameters out of an HTTP request.
//!
//! Parameters can come from the URL query string and from the body. A
//! non-empty query string value always wins over the body.

use crate::infra::error::HttpError;
use axum::extract::{FromRequest, Multipart, Request};
use http::{header::CONTENT_TYPE, HeaderMap, Uri};
use serde_json::Value;

/// A JSON object.
pub type JsonMap = serde_json::Map<String, Value>;

/// The body of a request, decoded according to its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A single set of parameters.
    Params(JsonMap),
    /// A list of requests, only accepted by batching views.
    Batch(Vec<Value>),
}

impl RequestBody {
    /// The parameters of a single request, `None` for batches.
    pub fn params(&self) -> Option<&JsonMap> {
        match self {
            RequestBody::Params(params) => Some(params),
            RequestBody::Batch(_) => None,
        }
    }
}

/// The parameters of one GraphQL request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphQlParams {
    /// The GraphQL document.
    pub query: Option<String>,
    /// Values for the variables declared by the operation.
    pub variables: Option<JsonMap>,
    /// Selects an operation when the document holds several.
    pub operation_name: Option<String>,
    /// Identifies a request within a batch.
    pub id: Option<Value>,
}

impl GraphQlParams {
    /// Extracts the parameters, preferring the query string over `body`.
    ///
    /// Fails if `variables` is a string that does not hold a JSON object.
    pub fn extract(query_params: &JsonMap, body: &JsonMap) -> Result<Self, HttpError> {
        let text = |name: &str| match lookup(name, query_params, body) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        };
        let variables = match lookup("variables", query_params, body) {
            Some(Value::String(text)) if text.is_empty() => None,
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(variables)) => Some(variables),
                Ok(Value::Null) => None,
                _ => return Err(invalid_variables()),
            },
            Some(Value::Object(variables)) => Some(variables.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(invalid_variables()),
        };
        let id = lookup("id", query_params, body)
            .filter(|id| !id.is_null())
            .cloned();

        Ok(Self {
            query: text("query"),
            variables,
            operation_name: text("operationName"),
            id,
        })
    }
}

fn invalid_variables() -> HttpError {
    HttpError::bad_request("Variables are invalid JSON.")
}

/// Finds a parameter, treating the literal `"undefined"` as absent.
fn lookup<'a>(name: &str, query_params: &'a JsonMap, body: &'a JsonMap) -> Option<&'a Value> {
    let value = match query_params.get(name) {
        Some(value) if is_truthy(value) => Some(value),
        _ => body.get(name),
    };
    value.filter(|value| value.as_str() != Some("undefined"))
}

/// Empty strings, empty containers, zero, `false` and `null` are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Decodes the URL query string into string parameters.
pub fn query_params(uri: &Uri) -> Result<JsonMap, HttpError> {
    let Some(query) = uri.query() else {
        return Ok(JsonMap::new());
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|_| HttpError::bad_request("Query string is not valid URL encoding."))?;
    Ok(pairs
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect())
}

/// The media type of the request without parameters such as `charset`.
fn content_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next().unwrap_or_default();
    Some(essence.trim().to_ascii_lowercase())
}

/// Decodes the request body.
///
/// Unknown content types yield no parameters, so such clients have to use the
/// query string.
pub async fn parse_body(
    request: Request,
    batch: bool,
    limit: usize,
) -> Result<RequestBody, HttpError> {
    match content_type(request.headers()).as_deref() {
        Some("application/json") => {
            let bytes = read_body(request, limit).await?;
            parse_json(&bytes, batch)
        }
        Some("application/x-www-form-urlencoded") => {
            let bytes = read_body(request, limit).await?;
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
                .map_err(|_| HttpError::bad_request("POST body sent invalid form data."))?;
            Ok(RequestBody::Params(
                pairs
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect(),
            ))
        }
        Some("application/graphql") => {
            let bytes = read_body(request, limit).await?;
            let query = String::from_utf8(bytes.to_vec())
                .map_err(|_| HttpError::bad_request("POST body is not valid UTF-8."))?;
            let mut params = JsonMap::new();
            params.insert("query".to_string(), Value::String(query));
            Ok(RequestBody::Params(params))
        }
        Some("multipart/form-data") => parse_multipart(request).await,
        _ => Ok(RequestBody::Params(JsonMap::new())),
    }
}

async fn read_body(request: Request, limit: usize) -> Result<bytes::Bytes, HttpError> {
    axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| {
            tracing::debug!("failed to read request body: {}", e);
            HttpError::bad_request("POST body could not be read.")
        })
}

fn parse_json(bytes: &[u8], batch: bool) -> Result<RequestBody, HttpError> {
    let invalid = || HttpError::bad_request("POST body sent invalid JSON.");
    match serde_json::from_slice::<Value>(bytes).map_err(|_| invalid())? {
        Value::Array(entries) if batch => Ok(RequestBody::Batch(entries)),
        Value::Object(params) if !batch => Ok(RequestBody::Params(params)),
        _ => Err(invalid()),
    }
}

/// Collects the text fields of a multipart form. File uploads are skipped.
async fn parse_multipart(request: Request) -> Result<RequestBody, HttpError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let mut params = JsonMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| HttpError::bad_request(e.to_string()))?;
        params.insert(name, Value::String(value));
    }
    Ok(RequestBody::Params(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn post(content_type: &str, body: impl Into<Body>) -> Request {
        Request::post("/graphql")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    #[test]
    fn query_string_wins_over_body() {
        let query = map(json!({"query": "{test}", "operationName": ""}));
        let body = map(json!({"query": "{other}", "operationName": "Op"}));
        let params = GraphQlParams::extract(&query, &body).unwrap();
        assert_eq!(Some("{test}".to_string()), params.query);
        assert_eq!(Some("Op".to_string()), params.operation_name);
    }

    #[test]
    fn undefined_is_absent() {
        let query = map(json!({"operationName": "undefined", "variables": "undefined"}));
        let params = GraphQlParams::extract(&query, &JsonMap::new()).unwrap();
        assert_eq!(GraphQlParams::default(), params);
    }

    #[test]
    fn string_variables_are_parsed() {
        let query = map(json!({"variables": r#"{"name": "John"}"#}));
        let params = GraphQlParams::extract(&query, &JsonMap::new()).unwrap();
        assert_eq!(Some(map(json!({"name": "John"}))), params.variables);
    }

    #[test]
    fn object_variables_are_kept() {
        let body = map(json!({"variables": {"name": "John"}, "id": 1}));
        let params = GraphQlParams::extract(&JsonMap::new(), &body).unwrap();
        assert_eq!(Some(map(json!({"name": "John"}))), params.variables);
        assert_eq!(Some(json!(1)), params.id);
    }

    #[test]
    fn malformed_variables_are_rejected() {
        let query = map(json!({"variables": "name: John"}));
        let error = GraphQlParams::extract(&query, &JsonMap::new()).unwrap_err();
        assert_eq!(HttpError::bad_request("Variables are invalid JSON."), error);

        let body = map(json!({"variables": [1, 2]}));
        assert!(GraphQlParams::extract(&JsonMap::new(), &body).is_err());
    }

    #[test]
    fn decodes_query_string() {
        let uri: Uri = "/graphql?query=%7Btest%7D&pretty=1".parse().unwrap();
        let params = query_params(&uri).unwrap();
        assert_eq!(map(json!({"query": "{test}", "pretty": "1"})), params);
        assert!(query_params(&"/graphql".parse().unwrap()).unwrap().is_empty());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!("1")));
        assert!(is_truthy(&json!([0])));
    }

    #[tokio::test]
    async fn json_body_must_match_mode() {
        let body = parse_body(post("application/json", r#"{"query":"{test}"}"#), false, 1024)
            .await
            .unwrap();
        assert_eq!(RequestBody::Params(map(json!({"query": "{test}"}))), body);

        let error = parse_body(post("application/json", "query=%7B%7D"), false, 1024)
            .await
            .unwrap_err();
        assert_eq!("POST body sent invalid JSON.", error.to_string());

        let error = parse_body(post("application/json", r#"{"query":"{test}"}"#), true, 1024)
            .await
            .unwrap_err();
        assert_eq!("POST body sent invalid JSON.", error.to_string());

        let body = parse_body(post("application/json", r#"[{"query":"{test}"}]"#), true, 1024)
            .await
            .unwrap();
        assert_eq!(RequestBody::Batch(vec![json!({"query": "{test}"})]), body);
    }

    #[tokio::test]
    async fn content_type_parameters_are_ignored() {
        let request = post("Application/JSON; charset=utf-8", r#"{"query":"{test}"}"#);
        let body = parse_body(request, false, 1024).await.unwrap();
        assert_eq!(Some(&map(json!({"query": "{test}"}))), body.params());
    }

    #[tokio::test]
    async fn form_and_graphql_bodies() {
        let request = post("application/x-www-form-urlencoded", "query=%7Btest%7D");
        let body = parse_body(request, false, 1024).await.unwrap();
        assert_eq!(RequestBody::Params(map(json!({"query": "{test}"}))), body);

        let body = parse_body(post("application/graphql", "{test}"), false, 1024)
            .await
            .unwrap();
        assert_eq!(RequestBody::Params(map(json!({"query": "{test}"}))), body);
    }

    #[tokio::test]
    async fn unknown_content_type_has_no_params() {
        let body = parse_body(post("text/plain", "{test}"), false, 1024)
            .await
            .unwrap();
        assert_eq!(RequestBody::Params(JsonMap::new()), body);
    }

    #[tokio::test]
    async fn multipart_text_fields_are_params() {
        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"query\"\r\n\r\n\
             {{test}}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"Test\"; filename=\"text1.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             Guido\r\n\
             --{boundary}--\r\n"
        );
        let request = post(&format!("multipart/form-data; boundary={boundary}"), body);
        let body = parse_body(request, false, 1024).await.unwrap();
        assert_eq!(RequestBody::Params(map(json!({"query": "{test}"}))), body);
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let error = parse_body(post("application/json", r#"{"query":"{test}"}"#), false, 4)
            .await
            .unwrap_err();
        assert_eq!("POST body could not be read.", error.to_string());
    }
}
