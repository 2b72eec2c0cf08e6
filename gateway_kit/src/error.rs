use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unauthorized: {0}")]
    AuthDenied(String),
    #[error("Unable to compile OpenAPI schema: {0}")]
    SchemaCompilation(String),
    #[error("Configuration Error: {0}")]
    Configuration(String),
    #[error("Registry Error: {0}")]
    Registry(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Validation Error: {0}")]
    Validation(String),
    #[error("SerdeJson Error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::AuthDenied(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::SchemaCompilation(_)
            | Error::Configuration(_)
            | Error::Registry(_)
            | Error::SerdeJson(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in the `type` field of the body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::AuthDenied(_) => "NO_RIGHTS",
            Error::SchemaCompilation(_) => "UNABLE_COMPILE_OPENAPI_SCHEMA",
            Error::Configuration(_) => "CONFIGURATION_ERROR",
            Error::Registry(_) => "REGISTRY_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::SerdeJson(_) | Error::Io(_) => "INTERNAL_ERROR",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Error::AuthDenied(_) => "UnAuthorizedError",
            Error::NotFound(_) => "NotFoundError",
            Error::Validation(_) => "ValidationError",
            _ => "ServerError",
        }
    }

    /// JSON body sent to clients. Internal failures keep their details in the logs.
    pub fn to_body(&self) -> Value {
        match self {
            Error::AuthDenied(_) => json!({
                "name": self.name(),
                "message": "Unauthorized",
                "code": 401,
                "type": self.code(),
                "data": { "error": "Unauthorized" },
            }),
            Error::NotFound(msg) | Error::Validation(msg) => json!({
                "name": self.name(),
                "message": msg,
                "code": self.status_code().as_u16(),
                "type": self.code(),
            }),
            Error::SchemaCompilation(_) => json!({
                "name": self.name(),
                "message": "Unable to compile OpenAPI schema",
                "code": 500,
                "type": self.code(),
            }),
            _ => json!({
                "name": self.name(),
                "message": "Internal Error.",
                "code": 500,
                "type": self.code(),
            }),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_denied_maps_to_no_rights_body() {
        let err = Error::AuthDenied("unauthorized: no credential".into());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let body = err.to_body();
        assert_eq!(body["type"], "NO_RIGHTS");
        assert_eq!(body["data"]["error"], "Unauthorized");
        assert_eq!(body["code"], 401);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = Error::Registry("broker at 10.0.0.3 unreachable".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_body().to_string().contains("10.0.0.3"));
    }
}
