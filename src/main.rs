use chat0::config::RelayConfig;
use chat0::{server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real deployments use the environment.
    let dotenv = dotenvy::dotenv();

    // Flags and environment; invalid values exit with clap's usage message.
    let config = RelayConfig::from_env();
    telemetry::init_tracing(config.log_format);

    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env file");
        }
    }

    tracing::info!(port = config.port, "starting chat0 backend");
    tracing::info!(environment = %config.environment, "environment");
    tracing::info!(origins = ?config.allowed_origins, "allowed CORS origins");
    tracing::info!(keys = %config.provider_keys.summary(), "environment API keys loaded");

    server::serve(config).await?;
    Ok(())
}
