use anyhow::Context;
use cep_weather::app::{backend, frontend, server};
use cep_weather::config::toml_config;
use cep_weather::telemetry::otel::{init_tracer_provider, OtelTracer};
use cep_weather::telemetry::Tracer;
use cep_weather::utils::logger::{self, LogFormat};
use cep_weather::utils::validation::Validate;
use cep_weather::{BackendConfig, FrontendConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cep-weather")]
#[command(about = "Brazilian postal code to current temperature, split across two traced services")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand)]
enum Service {
    /// Client-facing service: POST / {"cep": "..."}
    Frontend {
        /// TOML file; replaces flags and environment when given
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        settings: FrontendConfig,
    },
    /// Lookup service: GET /temperatura?cep=...
    Backend {
        /// TOML file; replaces flags and environment when given
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        settings: BackendConfig,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 只補上尚未設定的環境變數，檔案不存在時略過
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_logger(cli.log_format, cli.verbose);
    if let Ok(path) = dotenv {
        tracing::info!("📁 Loaded environment from {}", path.display());
    }

    match cli.service {
        Service::Frontend { config, settings } => {
            let mut config: FrontendConfig = load(config, settings)?;
            config
                .telemetry
                .service_name
                .get_or_insert_with(|| "cep-weather-frontend".to_string());
            ensure_valid(&config);
            tracing::debug!("Frontend config: {:?}", config);

            let guard = init_tracer_provider(&config.telemetry).await?;
            let tracer: Arc<dyn Tracer> = Arc::new(OtelTracer::new("cep-weather-frontend"));
            let router = frontend::from_config(&config, tracer)?;

            tracing::info!("🌐 Frontend relaying to {}", config.backend_url);
            let served = server::serve(config.listen_addr.parse()?, router).await;
            guard.shutdown().await;
            served?;
        }
        Service::Backend { config, settings } => {
            let mut config: BackendConfig = load(config, settings)?;
            config
                .telemetry
                .service_name
                .get_or_insert_with(|| "cep-weather-backend".to_string());
            ensure_valid(&config);
            tracing::debug!("Backend config: {:?}", config);

            let guard = init_tracer_provider(&config.telemetry).await?;
            let tracer: Arc<dyn Tracer> = Arc::new(OtelTracer::new("cep-weather-backend"));
            let router = backend::from_config(&config, tracer)?;

            tracing::info!(
                "🌐 Backend using {} and {}",
                config.location_url,
                config.weather_url
            );
            let served = server::serve(config.listen_addr.parse()?, router).await;
            guard.shutdown().await;
            served?;
        }
    }

    Ok(())
}

fn load<T: serde::de::DeserializeOwned>(path: Option<PathBuf>, settings: T) -> anyhow::Result<T> {
    match path {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            toml_config::from_file(&path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))
        }
        None => Ok(settings),
    }
}

fn ensure_valid<C: Validate>(config: &C) {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
