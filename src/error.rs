use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::collections::BTreeMap;
use std::env;

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
    pub fields: Option<FieldErrors>,
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            103 => (StatusCode::FORBIDDEN, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let mut body = json!({
            "code": self.code,
            "error": error_message,
        });

        if let Some(fields) = &self.fields {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

pub fn invalid_state_error() -> Error {
    Error {
        code: 100,
        message: "invalid state".into(),
        fields: None,
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
        fields: None,
    }
}

pub fn validation_error(fields: FieldErrors) -> Error {
    Error {
        code: 102,
        message: "validation failed".into(),
        fields: Some(fields),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        code: 103,
        message: "unauthorized".into(),
        fields: None,
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
        fields: None,
    }
}

pub fn reqwest_error(_: reqwest::Error) -> Error {
    Error {
        code: 3,
        message: "reqwest error".into(),
        fields: None,
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
        fields: None,
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
        fields: None,
    }
}
