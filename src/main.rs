use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shopify_file_upload::{server, Config, ShopifyClient, UploadRequest};

/// Host files on Shopify and get back a public URL
#[derive(Parser)]
#[command(name = "shopify-file-upload")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the multipart upload endpoint
    Serve,
    /// Upload a single local file and print its URL
    Upload {
        /// Path to the file to upload
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopify_file_upload=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let client = ShopifyClient::new(&config)?;

    match cli.command {
        Commands::Serve => {
            let app = server::router(client, config.max_upload_bytes);
            let listener = tokio::net::TcpListener::bind(config.bind_addr)
                .await
                .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
            tracing::info!(addr = %config.bind_addr, shop = %config.shop_domain, "Listening");
            axum::serve(listener, app).await?;
        }
        Commands::Upload { path } => {
            let request = UploadRequest::from_path(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let url = client.upload(request).await?;
            println!("{}", url);
        }
    }

    Ok(())
}
