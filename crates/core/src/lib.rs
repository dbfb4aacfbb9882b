pub mod config;
pub mod domain;
pub mod errors;

pub use config::{AiConfig, AppConfig, ConfigError, ConfigOverrides, LoadOptions, ProviderSettings};
pub use domain::records::{Certificate, Job, Profile, Project, RecordId};
pub use errors::{AiError, DataError};
