//! Error types for Hawser core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Hawser core error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Empty channel type string
    #[error("empty channel type")]
    EmptyChannelType,

    /// Channel URI with a colon before any scheme characters
    #[error("missing scheme in channel URI")]
    MissingScheme,

    /// Control bytes are never valid in a channel URI
    #[error("control character in channel URI")]
    ControlCharacter,

    /// Malformed percent escape in a query component
    #[error("invalid escape sequence: {0:?}")]
    InvalidEscape(String),

    /// Semicolons are not accepted as query separators
    #[error("invalid semicolon separator in query")]
    SemicolonSeparator,

    /// Decoded query component is not valid UTF-8
    #[error("query component is not valid utf-8")]
    InvalidUtf8,
}
