use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudyError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found at {0}")]
    ConfigNotFound(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    // Naming
    #[error("Invalid file extension: '.{0}'")]
    InvalidExtension(String),

    #[error("Invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("No free name found for {name} after {attempts} attempts")]
    NameExhausted { name: String, attempts: u32 },

    // Backend
    #[error("Object not found: {container}/{name}")]
    ObjectNotFound { container: String, name: String },

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl CloudyError {
    /// Wrap any driver-layer failure without altering it.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        CloudyError::Backend(err.into())
    }

    pub fn object_not_found(container: &str, name: &str) -> Self {
        CloudyError::ObjectNotFound {
            container: container.to_string(),
            name: name.to_string(),
        }
    }

    /// True for the "object/container does not exist" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudyError::ObjectNotFound { .. } | CloudyError::ContainerNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudyError>;
