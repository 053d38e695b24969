use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum YassoError {
    #[error("Malformed data in {origin}: {message}")]
    DataFormat { origin: String, message: String },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Simulation extends too far into the future: timestep {timestep} cannot be placed on the calendar")]
    TemporalRange { timestep: usize },
    #[error("Decomposition kernel failed: {0}")]
    Kernel(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerialize(#[from] toml::ser::Error),
}

impl YassoError {
    pub(crate) fn data_format(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataFormat {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

/// Convenience type for `Result<T, YassoError>`.
pub type YassoResult<T> = Result<T, YassoError>;
