use thiserror::Error;

/// Errors that can occur while projecting or summarising population data.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
}

impl From<toml::de::Error> for ForecastError {
    fn from(e: toml::de::Error) -> Self {
        ForecastError::Config(e.to_string())
    }
}
