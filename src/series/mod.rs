//! Series layer: the in-memory series object and its chunk storage
//!
//! A [`Series`] is the value the engine binds to a store key. It owns an
//! ordered list of [`Chunk`]s holding (timestamp, value) samples, encoded
//! per the series' creation-time options.

pub mod chunk;
pub mod series;
pub mod types;

pub use chunk::{validate_chunk_size, Chunk, ChunkAppend, DEFAULT_CHUNK_SIZE_BYTES, MAX_CHUNK_SIZE};
pub use series::Series;
pub use types::{current_time_millis, DuplicatePolicy, Encoding, Sample, SeriesOptions, Timestamp};
