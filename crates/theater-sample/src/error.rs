use std::path::PathBuf;
use theater_framework::TheaterError;

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("The cast has no component named '{0}' to act as monitor")]
    MissingMonitor(String),
    #[error(transparent)]
    Theater(#[from] TheaterError),
}
