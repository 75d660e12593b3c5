pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod telemetry;
pub mod utils;

pub use config::{BackendConfig, FrontendConfig, TelemetryConfig};
pub use core::{backend::BackendOrchestrator, frontend::FrontendOrchestrator};
pub use domain::model::{ErrorBody, LookupRequest, PlaceName, PostalCode, Temperature, WeatherReport};
pub use telemetry::{TraceContext, Tracer};
pub use utils::error::{Result, ServiceError};
