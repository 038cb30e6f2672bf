//! Chunk storage for series samples
//!
//! A chunk is the bounded-size unit of storage, compression and retention
//! trimming inside a series. Compressed payloads use the pipeline:
//!
//! ```text
//! samples -> delta-encode timestamps -> bincode -> LZ4 -> + CRC32 trailer
//! ```
//!
//! Layout of a compressed payload:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ LZ4 frame (size-prepended)              │
//! │   EncodedBlock (bincode)                │
//! │     base_timestamp: i64                 │
//! │     timestamp_deltas: Vec<i64>          │
//! │     values: Vec<f64>                    │
//! ├─────────────────────────────────────────┤
//! │ checksum: u32 (CRC32 of the frame)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Uncompressed chunks keep their samples as a plain vector and account
//! for size as `sample_count * SAMPLE_SIZE`.

use crate::error::{EngineError, EngineResult};
use crate::series::types::{DuplicatePolicy, Encoding, Sample, Timestamp};
use serde::{Deserialize, Serialize};

/// Fixed ceiling for CHUNK_SIZE, part of the creation contract
pub const MAX_CHUNK_SIZE: usize = 1_048_576;

/// Chunk capacity used when CHUNK_SIZE is omitted
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 4096;

/// In-memory footprint of one sample: timestamp (8) + value (8)
pub(crate) const SAMPLE_SIZE: usize = 16;

/// CRC32 trailer length on compressed payloads
const CHECKSUM_SIZE: usize = 4;

/// Check the CHUNK_SIZE contract: creation succeeds iff `0 < v <= MAX_CHUNK_SIZE`
pub fn validate_chunk_size(value: i64) -> EngineResult<usize> {
    if value <= 0 || value > MAX_CHUNK_SIZE as i64 {
        return Err(EngineError::OptionRange {
            option: "CHUNK_SIZE",
            message: format!("value {} must be in the range 1..={}", value, MAX_CHUNK_SIZE),
        });
    }
    Ok(value as usize)
}

/// Intermediate format for a delta-encoded compressed payload
#[derive(Debug, Serialize, Deserialize)]
struct EncodedBlock {
    /// First sample's timestamp
    base_timestamp: i64,
    /// Differences from the previous timestamp
    timestamp_deltas: Vec<i64>,
    /// Values, stored as-is
    values: Vec<f64>,
}

/// Encode sorted samples into a compressed payload
fn encode_samples(samples: &[Sample]) -> EngineResult<Vec<u8>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let base_timestamp = samples[0].timestamp;
    let mut timestamp_deltas = Vec::with_capacity(samples.len());
    let mut prev_ts = base_timestamp;
    for sample in samples {
        timestamp_deltas.push(sample.timestamp - prev_ts);
        prev_ts = sample.timestamp;
    }

    let block = EncodedBlock {
        base_timestamp,
        timestamp_deltas,
        values: samples.iter().map(|s| s.value).collect(),
    };

    let serialized =
        bincode::serialize(&block).map_err(|e| EngineError::Corruption(e.to_string()))?;
    let mut payload = lz4_flex::compress_prepend_size(&serialized);

    let checksum = crc32fast::hash(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());
    Ok(payload)
}

/// Decode a compressed payload back into samples, verifying its checksum
fn decode_samples(payload: &[u8]) -> EngineResult<Vec<Sample>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    if payload.len() < CHECKSUM_SIZE {
        return Err(EngineError::Corruption("payload shorter than checksum".to_string()));
    }

    let (frame, trailer) = payload.split_at(payload.len() - CHECKSUM_SIZE);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32fast::hash(frame);
    if stored != computed {
        return Err(EngineError::Corruption(format!(
            "checksum mismatch: stored={}, computed={}",
            stored, computed
        )));
    }

    let decompressed = lz4_flex::decompress_size_prepended(frame)
        .map_err(|e| EngineError::Corruption(format!("LZ4 decompression failed: {}", e)))?;
    let block: EncodedBlock =
        bincode::deserialize(&decompressed).map_err(|e| EngineError::Corruption(e.to_string()))?;

    let mut samples = Vec::with_capacity(block.timestamp_deltas.len());
    let mut current_ts = block.base_timestamp;
    for (i, delta) in block.timestamp_deltas.iter().enumerate() {
        current_ts += delta;
        samples.push(Sample {
            timestamp: current_ts,
            value: block.values.get(i).copied().unwrap_or(0.0),
        });
    }
    Ok(samples)
}

/// Sample storage, per the chunk's encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ChunkData {
    /// Plain sample vector
    Plain(Vec<Sample>),
    /// Compressed payload
    Lz4(Vec<u8>),
}

/// Outcome of appending one sample to a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAppend {
    /// Sample stored as a new entry
    Appended,
    /// An existing sample at the same timestamp absorbed the new one
    Merged,
    /// Chunk is at capacity; the caller must open a new chunk
    Full,
}

/// A bounded-size block of samples, strictly ordered by timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    encoding: Encoding,
    max_size_bytes: usize,
    start_ts: Timestamp,
    end_ts: Timestamp,
    sample_count: usize,
    data: ChunkData,
}

impl Chunk {
    /// Create an empty chunk with the given capacity
    pub fn new(encoding: Encoding, max_size_bytes: usize) -> Self {
        let data = match encoding {
            Encoding::Compressed => ChunkData::Lz4(Vec::new()),
            Encoding::Uncompressed => ChunkData::Plain(Vec::new()),
        };
        Self {
            encoding,
            max_size_bytes,
            start_ts: 0,
            end_ts: 0,
            sample_count: 0,
            data,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.sample_count
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Timestamp of the first sample; 0 when empty
    pub fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    /// Timestamp of the last sample; 0 when empty
    pub fn end_ts(&self) -> Timestamp {
        self.end_ts
    }

    /// Current payload size in bytes
    pub fn size(&self) -> usize {
        match &self.data {
            ChunkData::Plain(samples) => samples.len() * SAMPLE_SIZE,
            ChunkData::Lz4(payload) => payload.len(),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size_bytes
    }

    /// Whether the chunk's time span intersects `[start, end]`
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        !self.is_empty() && self.start_ts <= end && self.end_ts >= start
    }

    /// Decode the chunk's samples, ordered by timestamp
    pub fn samples(&self) -> EngineResult<Vec<Sample>> {
        match &self.data {
            ChunkData::Plain(samples) => Ok(samples.clone()),
            ChunkData::Lz4(payload) => decode_samples(payload),
        }
    }

    /// Append one sample, resolving timestamp collisions per `policy`
    ///
    /// Returns [`ChunkAppend::Full`] without mutating anything when storing
    /// the sample would push the payload past the chunk's capacity. A chunk
    /// always accepts at least one sample, so a capacity smaller than a
    /// single encoded sample cannot wedge the series.
    pub fn try_append(
        &mut self,
        sample: Sample,
        policy: DuplicatePolicy,
    ) -> EngineResult<ChunkAppend> {
        let mut samples = self.samples()?;

        match samples.binary_search_by_key(&sample.timestamp, |s| s.timestamp) {
            Ok(idx) => {
                let resolved = policy.resolve(sample.timestamp, samples[idx].value, sample.value)?;
                samples[idx].value = resolved;
                self.commit(samples)?;
                Ok(ChunkAppend::Merged)
            }
            Err(idx) => {
                samples.insert(idx, sample);
                if !self.is_empty() && self.would_exceed(&samples)? {
                    return Ok(ChunkAppend::Full);
                }
                self.commit(samples)?;
                Ok(ChunkAppend::Appended)
            }
        }
    }

    /// Remove all samples strictly before `cutoff`, returning how many
    /// were dropped
    pub fn remove_before(&mut self, cutoff: Timestamp) -> EngineResult<usize> {
        if self.is_empty() || self.start_ts >= cutoff {
            return Ok(0);
        }
        let mut samples = self.samples()?;
        let before = samples.len();
        samples.retain(|s| s.timestamp >= cutoff);
        let removed = before - samples.len();
        if removed > 0 {
            self.commit(samples)?;
        }
        Ok(removed)
    }

    /// Move the upper half of this chunk's samples into a new chunk
    ///
    /// Used when an out-of-order insert lands in a chunk that is already
    /// at capacity. The lower half keeps the extra sample on odd counts,
    /// so a one-sample chunk yields an empty right half.
    pub fn split(&mut self) -> EngineResult<Self> {
        let mut samples = self.samples()?;
        let mid = (samples.len() + 1) / 2;
        let upper = samples.split_off(mid);

        let mut right = Chunk::new(self.encoding, self.max_size_bytes);
        right.commit(upper)?;
        self.commit(samples)?;
        Ok(right)
    }

    /// Whether storing `samples` would push the payload past capacity
    fn would_exceed(&self, samples: &[Sample]) -> EngineResult<bool> {
        let size = match self.encoding {
            Encoding::Uncompressed => samples.len() * SAMPLE_SIZE,
            Encoding::Compressed => encode_samples(samples)?.len(),
        };
        Ok(size > self.max_size_bytes)
    }

    /// Store `samples` as the chunk's new contents and refresh its bounds
    fn commit(&mut self, samples: Vec<Sample>) -> EngineResult<()> {
        self.sample_count = samples.len();
        self.start_ts = samples.first().map(|s| s.timestamp).unwrap_or(0);
        self.end_ts = samples.last().map(|s| s.timestamp).unwrap_or(0);
        self.data = match self.encoding {
            Encoding::Uncompressed => ChunkData::Plain(samples),
            Encoding::Compressed => ChunkData::Lz4(encode_samples(&samples)?),
        };
        Ok(())
    }
}
