//! Types for reporting errors that happened during a request.
//!
//! GraphQL errors (syntax, validation, resolver failures) never show up here:
//! they are part of the execution result. The errors in this module abort a
//! request before or instead of execution, and carry their own status code.

use crate::graphql::FormattedError;
use axum::{
    http::{header, HeaderValue},
    response::IntoResponse,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::ResponseForPanic;

/// The `{"errors": [...]}` body sent when a request is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    errors: Vec<FormattedError>,
}

impl ErrorEnvelope {
    /// An envelope holding a single error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![FormattedError::new(message)],
        }
    }

    /// The errors in the envelope.
    pub fn errors(&self) -> &[FormattedError] {
        &self.errors
    }
}

/// An error from the view.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The request cannot be served as sent.
    #[error("{0}")]
    Http(#[from] HttpError),
    /// Something went wrong on our side.
    #[error("{0}")]
    Internal(#[from] InternalError),
}

impl From<askama::Error> for ViewError {
    fn from(e: askama::Error) -> Self {
        ViewError::Internal(InternalError::Template(e))
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(e: serde_json::Error) -> Self {
        ViewError::Internal(InternalError::Serialize(e))
    }
}

/// The result of view-related functions.
pub type ViewResult<T> = Result<T, ViewError>;

/// Transport-level errors caused by the client.
///
/// The message is shown to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// The request body or parameters could not be understood.
    #[error("{0}")]
    BadRequest(String),
    /// No query was sent. Reported in an envelope with status 200.
    #[error("Must provide query string.")]
    MissingQuery,
    /// The method is not allowed for this request.
    #[error("{message}")]
    MethodNotAllowed {
        /// Value of the `Allow` header.
        allow: &'static str,
        /// A description of the error.
        message: String,
    },
}

impl HttpError {
    /// Constructs a [`HttpError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Constructs a [`HttpError::MethodNotAllowed`].
    pub fn method_not_allowed(allow: &'static str, message: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            allow,
            message: message.into(),
        }
    }

    /// The status code this error is sent with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingQuery => StatusCode::OK,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// The methods to advertise in the `Allow` header, if any.
    pub fn allow(&self) -> Option<&'static str> {
        match self {
            Self::BadRequest(_) | Self::MissingQuery => None,
            Self::MethodNotAllowed { allow, .. } => Some(*allow),
        }
    }

    /// Renders the error with an already encoded envelope body.
    pub(crate) fn into_response_with_body(self, body: String) -> axum::response::Response {
        let mut response = (
            self.status(),
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_JSON),
            )],
            body,
        )
            .into_response();
        if let Some(allow) = self.allow() {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let envelope = ErrorEnvelope::new(self.to_string());
        match serde_json::to_string(&envelope) {
            Ok(body) => self.into_response_with_body(body),
            Err(e) => InternalError::Serialize(e).into_response(),
        }
    }
}

/// An internal error.
/// The client cannot do anything about this.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    /// The explorer template failed to render.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    /// A response could not be encoded.
    #[error("serde json error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Other miscellaneous errors.
    #[error("{0}")]
    Other(String),
}

impl IntoResponse for InternalError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("internal error: {}", self);
        // Hand-written so that it cannot fail to encode.
        let body = r#"{"errors":[{"message":"internal error"}]}"#;
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_JSON),
            )],
            body,
        )
            .into_response()
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ViewError::Http(e) => e.into_response(),
            ViewError::Internal(e) => e.into_response(),
        }
    }
}

/// Errors raised when a view is constructed with contradicting settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The explorer and batching cannot share an endpoint.
    #[error("Use either graphiql or batch processing")]
    GraphiqlWithBatch,
}

/// A handler for converting panics into proper responses for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanicHandler;

impl ResponseForPanic for PanicHandler {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        _: Box<dyn std::any::Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        InternalError::Other("Panic".to_string()).into_response()
    }
}

pub(crate) const APPLICATION_JSON: &str = "application/json";
