use crate::config::Config;
use crate::error::{Result, UploadError};
use crate::types::{
    AssetKind, CreatedFile, FileCreateData, FileCreateInput, FileStatus, GraphQlRequest,
    GraphQlResponse, NodeData, StagedTarget, StagedUploadInput, StagedUploadsCreateData,
    UploadRequest,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";

const STAGED_UPLOADS_CREATE: &str = r#"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}
"#;

const FILE_CREATE: &str = r#"
mutation fileCreate($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files { id fileStatus }
    userErrors { field message }
  }
}
"#;

const FILE_NODE: &str = r#"
query fileNode($id: ID!) {
  node(id: $id) {
    __typename
    ... on GenericFile { id fileStatus url }
    ... on MediaImage { id fileStatus image { url } }
    ... on Video { id fileStatus sources { url format mimeType } }
  }
}
"#;

/// The client for Shopify's Admin GraphQL API and its staged upload targets.
///
/// It holds two `reqwest::Client`s: one that carries the access token for the
/// GraphQL endpoint, and a plain one for the staged targets, which must never
/// see the token. GraphQL calls are bounded by `request_timeout`; uploads to a
/// staged target only by `transfer_timeout` once connected.
#[derive(Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    upload_client: reqwest::Client,
    graphql_url: Url,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl ShopifyClient {
    /// Creates a new `ShopifyClient` for the shop described by `config`.
    ///
    /// # Errors
    ///
    /// - `UploadError::InvalidConfig` if the access token is not a valid header value.
    /// - `UploadError::Request` if an internal HTTP client fails to build.
    /// - `UploadError::Url` if the shop domain does not form a valid URL.
    pub fn new(config: &Config) -> Result<Self> {
        Self::new_with_url(config, &config.graphql_url())
    }

    /// Creates a new `ShopifyClient` that sends GraphQL requests to `graphql_url`.
    ///
    /// This is useful for testing against a mock server.
    pub fn new_with_url(config: &Config, graphql_url: &str) -> Result<Self> {
        let token = HeaderValue::from_str(&config.access_token).map_err(|_| {
            UploadError::InvalidConfig {
                name: "SHOPIFY_ACCESS_TOKEN",
                value: "<redacted>".to_string(),
            }
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_TOKEN_HEADER, token);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        let upload_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.transfer_timeout)
            .build()?;

        Ok(Self {
            client,
            upload_client,
            graphql_url: Url::parse(graphql_url)?,
            poll_attempts: config.poll_attempts,
            poll_interval: config.poll_interval,
        })
    }

    /// Sends one GraphQL document and returns its `data`.
    ///
    /// # Errors
    ///
    /// - `UploadError::Api` if the endpoint answers with a non-success status.
    /// - `UploadError::Protocol` if the response carries any `errors`, even alongside `data`.
    pub async fn graphql<V, T>(&self, query: &str, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = GraphQlRequest { query, variables };
        let response = self
            .client
            .post(self.graphql_url.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: GraphQlResponse<T> = response.json().await?;
        if !envelope.errors.is_empty() {
            return Err(UploadError::Protocol {
                errors: envelope.errors,
            });
        }
        envelope.data.ok_or_else(|| UploadError::Protocol { errors: Vec::new() })
    }

    /// Asks Shopify for a single staged upload target sized and typed for this file.
    pub async fn stage_upload(
        &self,
        filename: &str,
        mime_type: &str,
        size: usize,
        kind: AssetKind,
    ) -> Result<StagedTarget> {
        let input = StagedUploadInput {
            filename,
            mime_type,
            resource: kind,
            file_size: size.to_string(),
            http_method: "POST",
        };
        let data: StagedUploadsCreateData = self
            .graphql(STAGED_UPLOADS_CREATE, json!({ "input": [input] }))
            .await?;
        let payload = data.staged_uploads_create;

        if !payload.user_errors.is_empty() {
            tracing::warn!(filename, errors = ?payload.user_errors, "Staged upload rejected");
            return Err(UploadError::Staging {
                user_errors: payload.user_errors,
            });
        }
        payload
            .staged_targets
            .into_iter()
            .next()
            .ok_or(UploadError::Staging {
                user_errors: Vec::new(),
            })
    }

    /// Posts the file to a staged target, signed parameters first and the file part last.
    ///
    /// # Errors
    ///
    /// `UploadError::Transmission` with the raw response body if the target does not
    /// answer with a success status. A signed target cannot be retried; start over
    /// from [`ShopifyClient::stage_upload`].
    pub async fn transmit(
        &self,
        target: &StagedTarget,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<()> {
        let form = target
            .parameters
            .iter()
            .fold(multipart::Form::new(), |form, param| {
                form.text(param.name.clone(), param.value.clone())
            });
        let mime_type = match mime_type.parse::<mime_guess::Mime>() {
            Ok(_) => mime_type,
            Err(_) => "application/octet-stream",
        };
        let file_part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = form.part("file", file_part);

        let response = self
            .upload_client
            .post(&target.url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "Staged upload failed");
            return Err(UploadError::Transmission {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Turns an uploaded staged object into a permanent Shopify file.
    pub async fn register_file(
        &self,
        resource_url: &str,
        kind: AssetKind,
        original_filename: &str,
    ) -> Result<CreatedFile> {
        let filename = registration_filename(original_filename, resource_url);
        let input = FileCreateInput {
            original_source: resource_url,
            content_type: kind,
            filename: &filename,
        };
        let data: FileCreateData = self
            .graphql(FILE_CREATE, json!({ "files": [input] }))
            .await?;
        let payload = data.file_create;

        if !payload.user_errors.is_empty() {
            tracing::warn!(%filename, errors = ?payload.user_errors, "File registration rejected");
            return Err(UploadError::Registration {
                user_errors: payload.user_errors,
            });
        }
        payload
            .files
            .into_iter()
            .next()
            .ok_or(UploadError::Registration {
                user_errors: Vec::new(),
            })
    }

    /// Waits for a registered file to become ready and returns its public URL.
    ///
    /// Polls with the configured attempt budget and interval. See
    /// [`ShopifyClient::wait_for_file_with`] for the exact transition rules.
    pub async fn wait_for_file(&self, id: &str, kind: AssetKind) -> Result<String> {
        let interval = self.poll_interval;
        self.wait_for_file_with(id, kind, self.poll_attempts, |_| sleep(interval))
            .await
    }

    /// Polls `node(id:)` at most `max_attempts` times, calling `delay` between attempts.
    ///
    /// - A missing node aborts at once with `UploadError::NodeNotFound`.
    /// - `READY` with a non-empty URL of the expected kind returns that URL.
    /// - `READY` without a URL, or any other status, keeps polling.
    /// - Running out of attempts fails with `UploadError::Timeout` and the last status seen.
    pub async fn wait_for_file_with<F, Fut>(
        &self,
        id: &str,
        kind: AssetKind,
        max_attempts: u32,
        mut delay: F,
    ) -> Result<String>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut last_status: Option<FileStatus> = None;

        for attempt in 1..=max_attempts {
            let data: NodeData = self.graphql(FILE_NODE, json!({ "id": id })).await?;
            let Some(node) = data.node else {
                tracing::warn!(id, attempt, "File disappeared while polling");
                return Err(UploadError::NodeNotFound { id: id.to_string() });
            };

            last_status = node.file_status();
            tracing::debug!(id, attempt, status = ?last_status, "Polled file status");

            if last_status == Some(FileStatus::Ready) {
                if let Some(url) = node.public_url(kind) {
                    tracing::info!(id, attempt, "File is ready");
                    return Ok(url.to_string());
                }
            }

            if attempt < max_attempts {
                delay(attempt).await;
            }
        }

        Err(UploadError::Timeout {
            attempts: max_attempts,
            last_status,
        })
    }

    /// Runs the whole pipeline: stage, transmit, register, then wait for the public URL.
    pub async fn upload(&self, request: UploadRequest) -> Result<String> {
        let kind = request.kind();
        let size = request.size();
        let UploadRequest {
            bytes,
            filename,
            mime_type,
        } = request;

        tracing::info!(%filename, %mime_type, size, ?kind, "Staging upload");
        let target = self.stage_upload(&filename, &mime_type, size, kind).await?;

        tracing::info!(%filename, "Sending file to staged target");
        self.transmit(&target, bytes, &filename, &mime_type).await?;

        let file = self
            .register_file(&target.resource_url, kind, &filename)
            .await?;
        tracing::info!(id = %file.id, "File registered, waiting for it to be ready");

        self.wait_for_file(&file.id, kind).await
    }
}

/// Picks the filename to register a staged object under.
///
/// Keeps `original` when it already ends with the extension of the uploaded
/// object, otherwise synthesizes `file.<ext>` so Shopify does not reject a
/// mismatched extension.
pub fn registration_filename(original: &str, resource_url: &str) -> String {
    match uploaded_extension(resource_url) {
        Some(ext) if !original.ends_with(&format!(".{}", ext)) => format!("file.{}", ext),
        _ => original.to_string(),
    }
}

/// The extension of the final path segment of `resource_url`, ignoring any query string.
fn uploaded_extension(resource_url: &str) -> Option<String> {
    let last_segment = match Url::parse(resource_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => resource_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    }?;

    let (stem, ext) = last_segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}
