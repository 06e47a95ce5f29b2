//! HTTP surface: a single multipart endpoint that runs the upload pipeline.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::client::ShopifyClient;
use crate::error::{Result, UploadError};
use crate::types::UploadRequest;

const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ShopifyClient>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "Upload failed");
        } else {
            tracing::warn!(error = %self, "Upload rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the router, with the inbound body limit taken from `max_upload_bytes`.
pub fn router(client: ShopifyClient, max_upload_bytes: usize) -> Router {
    let state = AppState {
        client: Arc::new(client),
    };

    Router::new()
        .route("/api/upload", post(upload).fallback(method_not_allowed))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accepts one `file` field and answers with the file's public URL once Shopify has it ready.
///
/// The pipeline runs on its own task, so a client that hangs up does not
/// interrupt a registration or poll already in flight.
#[tracing::instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let multipart = multipart.map_err(|e| UploadError::FormParse(e.body_text()))?;
    let request = extract_file(multipart).await?;

    let client = state.client.clone();
    let url = tokio::spawn(async move { client.upload(request).await })
        .await
        .map_err(|e| {
            UploadError::Io(std::io::Error::other(format!("Upload task failed: {}", e)))
        })??;

    Ok(Json(UploadResponse { url }))
}

async fn method_not_allowed() -> Response {
    let body = ErrorResponse {
        error: "Method not allowed".to_string(),
        details: None,
    };
    (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response()
}

/// Reads the first field named `file`; other fields are ignored.
async fn extract_file(mut multipart: Multipart) -> Result<UploadRequest> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::FormParse(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("file")
            .to_string();
        let mime_type = match field.content_type() {
            Some(content_type) if !content_type.is_empty() => content_type.to_string(),
            _ => mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .to_string(),
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::FormParse(e.body_text()))?;

        return Ok(UploadRequest::new(bytes.to_vec(), filename, mime_type));
    }

    Err(UploadError::MissingFile)
}
