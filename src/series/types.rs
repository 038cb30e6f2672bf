//! Core data types for the series layer
//!
//! - `Sample`: a single (timestamp, value) measurement
//! - `Encoding`: chunk payload encoding, fixed at series creation
//! - `DuplicatePolicy`: collision rule for equal timestamps
//! - `SeriesOptions`: the validated creation-time configuration

use crate::error::{EngineError, EngineResult};
use crate::series::chunk::DEFAULT_CHUNK_SIZE_BYTES;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in milliseconds
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds
///
/// Hosts pass this as `now` when driving explicit maintenance passes;
/// the ingestion path itself works from sample timestamps.
pub fn current_time_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// A single time-series measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix timestamp in milliseconds
    pub timestamp: Timestamp,
    /// The measured value
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// How chunk payloads are encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Delta-encoded, LZ4-compressed payload
    #[default]
    Compressed,
    /// Plain in-memory sample vector
    Uncompressed,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Compressed => "COMPRESSED",
            Encoding::Uncompressed => "UNCOMPRESSED",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&str> for Encoding {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            s if s.eq_ignore_ascii_case("COMPRESSED") => Ok(Encoding::Compressed),
            s if s.eq_ignore_ascii_case("UNCOMPRESSED") => Ok(Encoding::Uncompressed),
            _ => Err(EngineError::OptionValue {
                option: "ENCODING",
                message: format!("unrecognized encoding '{}'", s),
            }),
        }
    }
}

/// Rule governing a sample whose timestamp collides with an existing one
///
/// Fixed at creation and immutable thereafter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Reject the new sample with an error
    #[default]
    Block,
    /// Keep the existing sample
    First,
    /// Overwrite with the new sample
    Last,
    /// Keep the smaller value
    Min,
    /// Keep the larger value
    Max,
    /// Add the new value to the existing one
    Sum,
}

impl DuplicatePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            DuplicatePolicy::Block => "BLOCK",
            DuplicatePolicy::First => "FIRST",
            DuplicatePolicy::Last => "LAST",
            DuplicatePolicy::Min => "MIN",
            DuplicatePolicy::Max => "MAX",
            DuplicatePolicy::Sum => "SUM",
        }
    }

    /// Resolve a timestamp collision, yielding the value to keep
    pub fn resolve(&self, ts: Timestamp, existing: f64, incoming: f64) -> EngineResult<f64> {
        Ok(match self {
            DuplicatePolicy::Block => return Err(EngineError::DuplicateSample(ts)),
            DuplicatePolicy::First => existing,
            DuplicatePolicy::Last => incoming,
            DuplicatePolicy::Min => existing.min(incoming),
            DuplicatePolicy::Max => existing.max(incoming),
            DuplicatePolicy::Sum => existing + incoming,
        })
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&str> for DuplicatePolicy {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            s if s.eq_ignore_ascii_case("BLOCK") => Ok(DuplicatePolicy::Block),
            s if s.eq_ignore_ascii_case("FIRST") => Ok(DuplicatePolicy::First),
            s if s.eq_ignore_ascii_case("LAST") => Ok(DuplicatePolicy::Last),
            s if s.eq_ignore_ascii_case("MIN") => Ok(DuplicatePolicy::Min),
            s if s.eq_ignore_ascii_case("MAX") => Ok(DuplicatePolicy::Max),
            s if s.eq_ignore_ascii_case("SUM") => Ok(DuplicatePolicy::Sum),
            _ => Err(EngineError::OptionValue {
                option: "DUPLICATE_POLICY",
                message: format!("unrecognized policy '{}'", s),
            }),
        }
    }
}

/// Validated creation-time configuration for one series
///
/// Immutable after creation, except retention which may change through a
/// separate update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOptions {
    /// Maximum sample age in milliseconds; 0 keeps samples forever
    pub retention_ms: i64,
    /// Chunk capacity in bytes
    pub chunk_size_bytes: usize,
    /// Chunk payload encoding
    pub encoding: Encoding,
    /// Collision rule for equal timestamps
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            retention_ms: 0,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            encoding: Encoding::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_str() {
        assert_eq!(Encoding::try_from("COMPRESSED").unwrap(), Encoding::Compressed);
        assert_eq!(Encoding::try_from("uncompressed").unwrap(), Encoding::Uncompressed);
        assert_eq!(Encoding::try_from("Compressed").unwrap(), Encoding::Compressed);
        assert!(Encoding::try_from("gzip").is_err());
        assert!(Encoding::try_from("").is_err());
    }

    #[test]
    fn test_duplicate_policy_from_str() {
        for (token, policy) in [
            ("BLOCK", DuplicatePolicy::Block),
            ("first", DuplicatePolicy::First),
            ("Last", DuplicatePolicy::Last),
            ("min", DuplicatePolicy::Min),
            ("MAX", DuplicatePolicy::Max),
            ("sum", DuplicatePolicy::Sum),
        ] {
            assert_eq!(DuplicatePolicy::try_from(token).unwrap(), policy);
        }
        assert!(DuplicatePolicy::try_from("KEEP").is_err());
    }

    #[test]
    fn test_policy_resolution() {
        assert!(matches!(
            DuplicatePolicy::Block.resolve(1000, 1.0, 2.0),
            Err(EngineError::DuplicateSample(1000))
        ));
        assert_eq!(DuplicatePolicy::First.resolve(0, 1.0, 2.0).unwrap(), 1.0);
        assert_eq!(DuplicatePolicy::Last.resolve(0, 1.0, 2.0).unwrap(), 2.0);
        assert_eq!(DuplicatePolicy::Min.resolve(0, 1.0, 2.0).unwrap(), 1.0);
        assert_eq!(DuplicatePolicy::Max.resolve(0, 1.0, 2.0).unwrap(), 2.0);
        assert_eq!(DuplicatePolicy::Sum.resolve(0, 1.0, 2.0).unwrap(), 3.0);
    }

    #[test]
    fn test_default_options() {
        let options = SeriesOptions::default();
        assert_eq!(options.retention_ms, 0);
        assert_eq!(options.chunk_size_bytes, DEFAULT_CHUNK_SIZE_BYTES);
        assert_eq!(options.encoding, Encoding::Compressed);
        assert_eq!(options.duplicate_policy, DuplicatePolicy::Block);
    }
}
