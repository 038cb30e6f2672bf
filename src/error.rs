//! Engine error types
//!
//! Every failure in the creation and ingestion paths maps to exactly one of
//! these variants. All of them are terminal for the request that produced
//! them and leave no partial state behind.

use thiserror::Error;

/// Errors surfaced by the time-series engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed metric/label descriptor text
    #[error("TSDB: invalid metric descriptor: {0}")]
    DescriptorFormat(String),

    /// An option value had the wrong primitive type (non-numeric where a
    /// number was expected)
    #[error("TSDB: {option}: expected a number, got '{found}'")]
    OptionType {
        option: &'static str,
        found: String,
    },

    /// An option value parsed but fell outside its permitted range
    #[error("TSDB: {option}: {message}")]
    OptionRange {
        option: &'static str,
        message: String,
    },

    /// An enum-style option was given an unrecognized token, or no token
    /// at all
    #[error("TSDB: {option}: {message}")]
    OptionValue {
        option: &'static str,
        message: String,
    },

    /// LABELS was followed by an odd number of tokens
    #[error("TSDB: LABELS expects key/value pairs, but '{0}' has no value")]
    LabelArity(String),

    /// The target key already holds a value of some type
    #[error("TSDB: the key already exists")]
    KeyAlreadyExists,

    /// A sample arrived at a timestamp that already holds one and the
    /// series policy is BLOCK
    #[error("TSDB: duplicate sample at timestamp {0}")]
    DuplicateSample(i64),

    /// A sample arrived older than the series retention window
    #[error("TSDB: sample timestamp {0} is older than the retention window")]
    SampleTooOld(i64),

    /// A chunk payload failed checksum or decode
    #[error("TSDB: corrupt chunk payload: {0}")]
    Corruption(String),

    /// A command was dispatched with too few arguments
    #[error("TSDB: wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// A command name not present in the registry
    #[error("TSDB: unknown command '{0}'")]
    UnknownCommand(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
