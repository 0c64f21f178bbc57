use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppConfig;

/// Main entry point for the MindCare backend
///
/// Loads `.env`, installs logging, resolves configuration once and serves the REST API.
///
/// # Environment Variables
/// - `MINDCARE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MINDCARE_TOKEN_SECRET`: HMAC secret for bearer tokens, at least 32 bytes (required)
/// - `MINDCARE_STORAGE`: `file` or `memory` (default: "file")
/// - `MINDCARE_DATA_DIR`: Root of the file store (default: "mindcare_data")
/// - `MINDCARE_COMPANION_URL`: Ollama-compatible base URL; unset means fallback replies only
/// - `MINDCARE_COMPANION_MODEL`: Model name (default: "llama3")
/// - `MINDCARE_COMPANION_TIMEOUT_SECS`: Model request timeout (default: 60)
///
/// # Errors
/// Returns an error if configuration is invalid, the store cannot be opened, or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mindcare=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("mindcare_core=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        storage = ?config.core.storage(),
        data_dir = %config.core.data_dir().display(),
        companion = config.core.companion().is_some(),
        "-- MindCare configuration resolved"
    );

    api_rest::serve(config).await
}
