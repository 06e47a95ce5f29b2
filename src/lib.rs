//! Upload files to Shopify's file storage and get back a public URL.
//!
//! An upload goes through four calls against Shopify, all driven by
//! [`ShopifyClient::upload`]:
//!
//! 1. `stagedUploadsCreate` hands out a single-use target with signed form parameters.
//! 2. The raw bytes are posted to that target, signed parameters first and the file last.
//! 3. `fileCreate` registers the staged object as a permanent file.
//! 4. `node(id:)` is polled until the file is `READY` and exposes its URL.
//!
//! The [`server`] module wraps the pipeline in a single multipart endpoint.
//!
//! ```no_run
//! # use shopify_file_upload::{Config, ShopifyClient, UploadRequest};
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let client = ShopifyClient::new(&config)?;
//! let request = UploadRequest::from_path("photo.jpg").await?;
//! let url = client.upload(request).await?;
//! println!("{}", url);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod types;

pub use client::{registration_filename, ShopifyClient};
pub use config::Config;
pub use error::{Result, UploadError};
pub use types::{
    AssetKind, CreatedFile, FileNode, FileStatus, GraphQlError, StagedTarget,
    StagedUploadParameter, UploadRequest, UserError,
};
