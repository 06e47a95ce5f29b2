use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, UploadError};

const DEFAULT_API_VERSION: &str = "2024-10";
const DEFAULT_POLL_ATTEMPTS: u32 = 30;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Everything the upload pipeline and its HTTP surface need to run.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shop's `*.myshopify.com` domain.
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    /// How many times a registered file is polled before giving up.
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    /// Deadline applied to every GraphQL call, and to connecting to a staged target.
    pub request_timeout: Duration,
    /// Deadline for sending the file bytes to a staged target.
    pub transfer_timeout: Duration,
    pub max_upload_bytes: usize,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// A configuration with defaults for everything except the shop and its token.
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// - `UploadError::MissingConfig` if `SHOPIFY_SHOP_DOMAIN` or `SHOPIFY_ACCESS_TOKEN` is unset.
    /// - `UploadError::InvalidConfig` if a numeric or address setting does not parse, or if
    ///   `UPLOAD_POLL_ATTEMPTS` is zero.
    pub fn from_env() -> Result<Self> {
        let shop_domain = required("SHOPIFY_SHOP_DOMAIN")?;
        let access_token = required("SHOPIFY_ACCESS_TOKEN")?;
        let mut config = Self::new(shop_domain, access_token);

        if let Ok(version) = env::var("SHOPIFY_API_VERSION") {
            config.api_version = version;
        }
        if let Some(attempts) = parsed::<u32>("UPLOAD_POLL_ATTEMPTS")? {
            if attempts == 0 {
                return Err(UploadError::InvalidConfig {
                    name: "UPLOAD_POLL_ATTEMPTS",
                    value: attempts.to_string(),
                });
            }
            config.poll_attempts = attempts;
        }
        if let Some(ms) = parsed::<u64>("UPLOAD_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parsed::<u64>("UPLOAD_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed::<u64>("UPLOAD_TRANSFER_TIMEOUT_SECS")? {
            config.transfer_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = parsed::<usize>("UPLOAD_MAX_BYTES")? {
            config.max_upload_bytes = bytes;
        }
        if let Some(addr) = parsed::<SocketAddr>("BIND_ADDR")? {
            config.bind_addr = addr;
        }

        Ok(config)
    }

    /// The Admin GraphQL endpoint of the configured shop.
    pub fn graphql_url(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.shop_domain.trim_end_matches('/'),
            self.api_version
        )
    }
}

fn required(name: &'static str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(UploadError::MissingConfig(name))
}

fn parsed<T: FromStr>(name: &'static str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| UploadError::InvalidConfig { name, value }),
        Err(_) => Ok(None),
    }
}
