pub mod config;
pub mod error;
pub mod plant;

pub use config::AppConfig;
pub use error::{ConfigError, PlantError, PlantResult};
