use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Submitted key does not carry the provider prefix
    #[error("key does not start with the expected prefix")]
    InvalidFormat,

    /// Provider refused the key while it was being validated
    #[error("key rejected by provider")]
    Rejected,

    /// No key saved, or the provider refused the saved key at use time
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// No image field, or an image field without a file name
    #[error("no image uploaded")]
    MissingImage { message: Option<String> },

    #[error("Unsupported file type: {mime}")]
    UnsupportedType { mime: String },

    /// Malformed request body or form
    #[error("{message}")]
    BadRequest { message: String },

    /// Provider output could not be parsed as the captions object
    #[error("could not parse provider response: {detail}")]
    MalformedResponse { detail: String },

    #[error("provider did not respond within {secs}s")]
    ProviderTimeout { secs: u64 },

    /// Any other provider failure, passed through verbatim
    #[error("{message}")]
    Provider { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidFormat
            | Error::Rejected
            | Error::MissingImage { .. }
            | Error::UnsupportedType { .. }
            | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::MalformedResponse { .. }
            | Error::ProviderTimeout { .. }
            | Error::Provider { .. }
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the browser
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidFormat => {
                r#"Key must start with "gsk_". Check you copied it fully."#.to_string()
            }
            Error::Rejected => {
                "Key rejected by Groq. Please double-check and try again.".to_string()
            }
            Error::Unauthenticated { message } => message
                .clone()
                .unwrap_or_else(|| "No API key saved. Please enter your Groq key.".to_string()),
            Error::MissingImage { message } => message
                .clone()
                .unwrap_or_else(|| "No image uploaded.".to_string()),
            Error::UnsupportedType { mime } => format!("Unsupported file type: {mime}"),
            Error::BadRequest { message } => message.clone(),
            Error::MalformedResponse { .. } => {
                "Could not parse AI response. Please try again.".to_string()
            }
            Error::ProviderTimeout { secs } => {
                format!("The AI service did not answer within {secs}s. Please try again.")
            }
            Error::Provider { message } => message.clone(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::MalformedResponse { .. } | Error::ProviderTimeout { .. } | Error::Provider { .. } => {
                tracing::warn!("Provider error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Rejected => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::InvalidFormat
            | Error::MissingImage { .. }
            | Error::UnsupportedType { .. }
            | Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorBody {
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
