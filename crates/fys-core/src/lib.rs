pub mod app_config;
pub mod config;
pub mod credential;
pub mod error;
pub mod filter;
pub mod geo;
pub mod services;
pub mod storage;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use credential::{AuthHook, Credential};
pub use error::{ConfigError, CoreError, StorageError};
pub use filter::FilterState;
pub use geo::GeoPoint;
pub use services::{ServiceDraft, ServiceRecord};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
