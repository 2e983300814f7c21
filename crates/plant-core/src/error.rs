use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(#[source] anyhow::Error),

    /// Raised instead of queueing when the database handle is not usable.
    #[error("Database not connected (state: {0})")]
    NotConnected(String),

    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Database operation failed: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Media host error: {0}")]
    MediaHost(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

pub type PlantResult<T> = Result<T, PlantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_lists_every_variable() {
        let err = ConfigError::MissingEnv(vec!["MONGODB_URL".into(), "API_KEY".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: MONGODB_URL, API_KEY"
        );
    }

    #[test]
    fn not_found_names_resource() {
        let err = PlantError::NotFound {
            resource: "Plant",
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "Plant not found: abc");
    }
}
