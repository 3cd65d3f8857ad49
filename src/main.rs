use spear::config::Config;
use spear::loader::HttpClient;
use spear::service::SpecService;
use spear::web::serve_with_config;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "spear-config.toml";
const CONFIG_ENV: &str = "SPEAR_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();

    let config_file = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
    let config = match Config::parse_from_file(&config_file) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    let service = match SpecService::new(&config, HttpClient::new()) {
        Ok(service) => Arc::new(service),
        Err(err) => {
            tracing::error!(error = %err, "invalid repository location");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(repository = %service.repository().root(), "serving specs");

    match serve_with_config(config.listen, service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server error");
            ExitCode::FAILURE
        }
    }
}
