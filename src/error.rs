use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    /// A configured CSS selector could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A label-to-type heuristic pattern is not a valid regex
    #[error("Invalid type pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The container requested as extraction scope is not in the document
    #[error("No element matches scope selector '{0}'")]
    ScopeNotFound(String),

    /// The awaited field never appeared within the timeout
    #[error("Timed out after {}ms waiting for field '{identifier}'", waited.as_millis())]
    Timeout { identifier: String, waited: Duration },

    /// HTTP request to the completion service failed
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Completion service answered with a non-success status or an empty body
    #[error("Completion backend error: {0}")]
    Backend(String),

    /// JSON parsing failed
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Missing or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}
