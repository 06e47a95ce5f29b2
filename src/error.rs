use serde_json::json;

use crate::types::{FileStatus, GraphQlError, UserError};

/// Every way an upload can fail, from parsing the inbound form to waiting on the platform.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to parse multipart form: {0}")]
    FormParse(String),
    #[error("No file uploaded")]
    MissingFile,
    #[error("Shopify returned GraphQL errors: {}", join_messages(.errors))]
    Protocol { errors: Vec<GraphQlError> },
    #[error("Shopify API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to create staged upload: {}", join_user_errors(.user_errors))]
    Staging { user_errors: Vec<UserError> },
    #[error("Upload to staged target failed with status {status}")]
    Transmission { status: u16, body: String },
    #[error("Failed to register file: {}", join_user_errors(.user_errors))]
    Registration { user_errors: Vec<UserError> },
    #[error("File {id} no longer exists on Shopify")]
    NodeNotFound { id: String },
    #[error("File was not ready after {attempts} attempts (last status: {})", last_status.map(|s| s.as_str()).unwrap_or("none"))]
    Timeout {
        attempts: u32,
        last_status: Option<FileStatus>,
    },
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),
    #[error("Invalid configuration for {name}: {value:?}")]
    InvalidConfig { name: &'static str, value: String },
    #[error("Network request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to parse API response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UploadError>;

impl UploadError {
    /// HTTP status this error is rendered with by the upload endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            UploadError::MissingFile => 400,
            UploadError::Staging { .. } | UploadError::Registration { .. } => 422,
            _ => 500,
        }
    }

    /// Upstream detail worth handing back to the caller, if any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            UploadError::Staging { user_errors } | UploadError::Registration { user_errors } => {
                Some(json!(user_errors))
            }
            UploadError::Protocol { errors } => Some(json!(errors)),
            UploadError::Api { message, .. } => Some(json!(message)),
            UploadError::Transmission { status, body } => {
                Some(json!({ "status": status, "body": body }))
            }
            UploadError::Timeout { last_status, .. } => {
                Some(json!({ "lastStatus": last_status }))
            }
            UploadError::NodeNotFound { id } => Some(json!({ "id": id })),
            _ => None,
        }
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
