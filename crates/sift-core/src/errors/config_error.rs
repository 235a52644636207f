/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown rerank strategy: {value} (expected \"event\" or \"section\")")]
    UnknownRerankStrategy { value: String },

    #[error("unknown recall mode: {value} (expected \"fast\" or \"normal\")")]
    UnknownRecallMode { value: String },

    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}
