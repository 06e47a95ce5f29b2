use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::UploadError;

/// Classification of an upload, derived from its MIME type.
///
/// The same kind drives the staged upload resource, the `fileCreate` content
/// type and the variant read back while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetKind {
    Video,
    Image,
    File,
}

impl AssetKind {
    /// Classifies a MIME type by its `video/` or `image/` prefix; everything else is a file.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if mime_type.starts_with("video/") {
            AssetKind::Video
        } else if mime_type.starts_with("image/") {
            AssetKind::Image
        } else {
            AssetKind::File
        }
    }
}

/// Lifecycle state of a file on Shopify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    /// The bytes arrived but processing has not started.
    Uploaded,
    Processing,
    Ready,
    Failed,
    /// A status this crate does not know about yet.
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "UPLOADED",
            FileStatus::Processing => "PROCESSING",
            FileStatus::Ready => "READY",
            FileStatus::Failed => "FAILED",
            FileStatus::Unknown => "UNKNOWN",
        }
    }
}

/// An entry of the top-level `errors` array of a GraphQL response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

/// A mutation-level validation error (`userErrors`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// (Internal) The envelope of every GraphQL response.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub(crate) data: Option<T>,
    #[serde(default)]
    pub(crate) errors: Vec<GraphQlError>,
}

/// (Internal) The body of a GraphQL request.
#[derive(Serialize)]
pub(crate) struct GraphQlRequest<'a, V> {
    pub(crate) query: &'a str,
    pub(crate) variables: V,
}

/// One input of `stagedUploadsCreate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StagedUploadInput<'a> {
    pub(crate) filename: &'a str,
    pub(crate) mime_type: &'a str,
    pub(crate) resource: AssetKind,
    /// Decimal string of bytes.
    pub(crate) file_size: String,
    pub(crate) http_method: &'static str,
}

/// A signed form field that must accompany the staged upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StagedUploadParameter {
    pub name: String,
    pub value: String,
}

/// A single-use destination for the raw bytes of one upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedTarget {
    /// Where the multipart POST is sent.
    pub url: String,
    /// The URL `fileCreate` is pointed at once the bytes are uploaded.
    pub resource_url: String,
    /// Signed parameters, in the order they must be sent.
    pub parameters: Vec<StagedUploadParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StagedUploadsCreateData {
    pub(crate) staged_uploads_create: StagedUploadsCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StagedUploadsCreatePayload {
    #[serde(default)]
    pub(crate) staged_targets: Vec<StagedTarget>,
    #[serde(default)]
    pub(crate) user_errors: Vec<UserError>,
}

/// One input of `fileCreate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileCreateInput<'a> {
    pub(crate) original_source: &'a str,
    pub(crate) content_type: AssetKind,
    pub(crate) filename: &'a str,
}

/// A file record freshly created by `fileCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFile {
    /// Opaque global id, e.g. `gid://shopify/MediaImage/1`.
    pub id: String,
    #[serde(default)]
    pub file_status: Option<FileStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileCreateData {
    pub(crate) file_create: FileCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileCreatePayload {
    #[serde(default)]
    pub(crate) files: Vec<CreatedFile>,
    #[serde(default)]
    pub(crate) user_errors: Vec<UserError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub url: Option<String>,
    pub format: Option<String>,
    pub mime_type: Option<String>,
}

/// A file as returned by `node(id:)`, discriminated by `__typename`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum FileNode {
    #[serde(rename_all = "camelCase")]
    GenericFile {
        id: String,
        file_status: FileStatus,
        url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MediaImage {
        id: String,
        file_status: FileStatus,
        image: Option<Image>,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        id: String,
        file_status: FileStatus,
        #[serde(default)]
        sources: Vec<VideoSource>,
    },
    /// Any node type that is not a file.
    #[serde(other)]
    Other,
}

impl FileNode {
    pub fn file_status(&self) -> Option<FileStatus> {
        match self {
            FileNode::GenericFile { file_status, .. }
            | FileNode::MediaImage { file_status, .. }
            | FileNode::Video { file_status, .. } => Some(*file_status),
            FileNode::Other => None,
        }
    }

    /// The public URL of this node when it is of the expected kind and the URL is non-empty.
    ///
    /// Videos prefer an `mp4` source and fall back to the first source with a URL.
    pub fn public_url(&self, kind: AssetKind) -> Option<&str> {
        let url = match (self, kind) {
            (FileNode::GenericFile { url, .. }, AssetKind::File) => url.as_deref(),
            (FileNode::MediaImage { image, .. }, AssetKind::Image) => {
                image.as_ref().and_then(|i| i.url.as_deref())
            }
            (FileNode::Video { sources, .. }, AssetKind::Video) => {
                let mut with_url = sources
                    .iter()
                    .filter(|s| s.url.as_deref().is_some_and(|u| !u.is_empty()));
                let first = with_url.clone().next();
                with_url
                    .find(|s| s.format.as_deref() == Some("mp4"))
                    .or(first)
                    .and_then(|s| s.url.as_deref())
            }
            _ => None,
        };
        url.filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeData {
    pub(crate) node: Option<FileNode>,
}

/// An inbound file, owned for the duration of one upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl UploadRequest {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Reads a local file, guessing its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploadError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Could not determine file name",
                ))
            })?
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        Ok(Self::new(bytes, filename, mime_type))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn kind(&self) -> AssetKind {
        AssetKind::from_mime(&self.mime_type)
    }
}
