use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::identity::IdentityError;
use crate::workflows::listings::ListingError;
use crate::workflows::media::StorageError;

/// Faults that can stop the process: startup wiring plus CLI workflow runs.
/// Request-level failures stay inside the workflow error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("identity workflow error: {0}")]
    Identity(#[from] IdentityError),
    #[error("listing workflow error: {0}")]
    Listing(#[from] ListingError),
}
