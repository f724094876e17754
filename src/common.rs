use thiserror::Error;

/// Errors that could occur while resolving the output configuration.
///
/// Resolution is all-or-nothing: any of these means no [`Config`](crate::Config)
/// was produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON configuration document is malformed or not an object.
    #[error("failed to parse the JSON configuration: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A key of the JSON configuration document holds a value that cannot be
    /// coerced into the type of the field it controls.
    #[error("invalid value {value} for JSON configuration key {field}: {reason}")]
    InvalidJsonField {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// An environment variable was present but its value could not be coerced
    /// into the type of the field it controls.
    #[error("invalid value \"{value}\" for environment variable {var}: {reason}")]
    InvalidEnvVar {
        var: &'static str,
        value: String,
        reason: String,
    },
}
