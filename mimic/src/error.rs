//! Error types for mimic.

use std::fmt;

/// Pipeline error types.
#[derive(Debug)]
pub enum CloneError {
    /// HTTP request failed.
    Http(reqwest::Error),
    /// JSON serialization/deserialization error.
    Json(serde_json::Error),
    /// IO error (file operations).
    Io(std::io::Error),
    /// Invalid caller input (missing URL, content, or selector).
    InvalidInput(&'static str),
    /// Scraping backend error.
    Scrape(String),
    /// LLM provider error.
    Llm(String),
    /// Embedding provider error.
    Embedding(String),
    /// Model response contained no text content.
    NoContent,
    /// No stylesheet stored for the hostname.
    MissingStylesheet(String),
    /// HTML rewriting failed.
    Html(String),
    /// Rate limit exceeded.
    RateLimited,
    /// Timeout.
    Timeout,
}

impl fmt::Display for CloneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Scrape(msg) => write!(f, "Scrape error: {}", msg),
            Self::Llm(msg) => write!(f, "LLM error: {}", msg),
            Self::Embedding(msg) => write!(f, "Embedding error: {}", msg),
            Self::NoContent => write!(f, "No text content returned by the model"),
            Self::MissingStylesheet(host) => {
                write!(f, "No stylesheet stored for hostname: {}", host)
            }
            Self::Html(msg) => write!(f, "HTML rewrite error: {}", msg),
            Self::RateLimited => write!(f, "Rate limit exceeded"),
            Self::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for CloneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CloneError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

impl From<serde_json::Error> for CloneError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<std::io::Error> for CloneError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Result type for pipeline operations.
pub type CloneResult<T> = Result<T, CloneError>;
