#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read hosts file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse hosts file: {0}")]
    Parse(String),

    #[error("Hosts file validation error: {0}")]
    Validation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
}
