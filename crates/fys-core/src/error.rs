use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid coordinates lat={lat} lng={lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },
}

/// Errors raised by durable key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
