use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Input has no header row")]
    MissingHeader,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FeatureResult<T> = Result<T, FeatureError>;
