//! # Tempo
//!
//! An embeddable Prometheus-style time-series value type for key-value
//! stores. A host store plugs Tempo in as an extension type: each series is
//! a value bound to one store key, identified by a metric name plus an
//! unordered set of labels, and holding its samples as an ordered sequence
//! of bounded, optionally compressed chunks.
//!
//! ## Features
//!
//! - **Descriptor parsing**: `name{key="value",...}` into a canonical,
//!   order-independent label set
//! - **Validated creation**: retention window, chunk size, encoding and
//!   duplicate-sample policy checked up front, all-or-nothing
//! - **Chunked storage**: delta-encoded, LZ4-compressed, checksummed
//!   chunks with lazy retention eviction
//! - **Typed namespace**: series carry a runtime type tag alongside the
//!   host's other value kinds
//!
//! ## Modules
//!
//! - [`descriptor`]: metric descriptor parser
//! - [`series`]: the series object and its chunk storage
//! - [`store`]: the host keyspace boundary
//! - [`command`]: command table, option validation, creation flow
//! - [`config`]: engine defaults from TOML and the environment
//!
//! ## Quick Start
//!
//! ```rust
//! use tempo::{CommandRegistry, Config, MemoryStore, SERIES_TYPE_NAME};
//!
//! fn main() -> Result<(), tempo::EngineError> {
//!     let registry = CommandRegistry::new();
//!     let mut store = MemoryStore::new();
//!     let config = Config::default();
//!
//!     let args: Vec<String> = [
//!         "temperature:3:east",
//!         r#"temperature{area_id="32",sensor_id="1",region="east"}"#,
//!         "RETENTION",
//!         "24h",
//!     ]
//!     .map(String::from)
//!     .to_vec();
//!     registry.dispatch(&mut store, &config, "TEMPO.CREATE", &args)?;
//!
//!     // The key now introspects as a series
//!     assert_eq!(store.type_of(b"temperature:3:east"), Some(SERIES_TYPE_NAME));
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod series;
pub mod store;

// Re-export top-level types for convenience
pub use command::{parse_create_args, CommandRegistry, CommandSpec, CreateRequest, Reply};

pub use config::{Config, ConfigError, LoggingConfig, SeriesConfig};

pub use descriptor::{Label, MetricDescriptor};

pub use error::{EngineError, EngineResult};

pub use series::{
    current_time_millis, validate_chunk_size, Chunk, ChunkAppend, DuplicatePolicy, Encoding,
    Sample, Series, SeriesOptions, Timestamp, DEFAULT_CHUNK_SIZE_BYTES, MAX_CHUNK_SIZE,
};

pub use store::{MemoryStore, Value, BYTES_TYPE_NAME, SERIES_TYPE_NAME};
