//! The in-memory series object
//!
//! One `Series` is the value bound to one store key: its parsed descriptor,
//! the validated creation-time options, and an ordered list of chunks.
//!
//! Write path: sample → retention gate → chunk upsert → seal/open on
//! capacity. Retention eviction runs lazily at the start of every mutating
//! operation; there is no background task.

use crate::descriptor::MetricDescriptor;
use crate::error::{EngineError, EngineResult};
use crate::series::chunk::{Chunk, ChunkAppend};
use crate::series::types::{Sample, SeriesOptions, Timestamp};

/// One named, labeled, time-ordered sequence of samples
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Series {
    descriptor: MetricDescriptor,
    options: SeriesOptions,
    /// Chunks ordered by start timestamp; never empty
    chunks: Vec<Chunk>,
    total_samples: usize,
    first_timestamp: Timestamp,
    last_timestamp: Timestamp,
    last_value: f64,
}

impl Series {
    /// Create an empty series from already-validated inputs
    ///
    /// Always succeeds; allocates one empty initial chunk sized to
    /// `options.chunk_size_bytes`.
    pub fn new(descriptor: MetricDescriptor, options: SeriesOptions) -> Self {
        let initial = Chunk::new(options.encoding, options.chunk_size_bytes);
        Self {
            descriptor,
            options,
            chunks: vec![initial],
            total_samples: 0,
            first_timestamp: 0,
            last_timestamp: 0,
            last_value: f64::NAN,
        }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &SeriesOptions {
        &self.options
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Timestamp of the oldest retained sample; 0 when empty
    pub fn first_timestamp(&self) -> Timestamp {
        self.first_timestamp
    }

    /// Timestamp of the newest sample; 0 when empty
    pub fn last_timestamp(&self) -> Timestamp {
        self.last_timestamp
    }

    /// Value of the newest sample; NaN when empty
    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    /// All retained samples in timestamp order
    pub fn samples(&self) -> EngineResult<Vec<Sample>> {
        let mut out = Vec::with_capacity(self.total_samples);
        for chunk in &self.chunks {
            out.extend(chunk.samples()?);
        }
        Ok(out)
    }

    /// The retention cutoff for a given notion of "now"; samples strictly
    /// before it are expired. `None` when retention is unbounded.
    fn retention_cutoff(&self, now: Timestamp) -> Option<Timestamp> {
        if self.options.retention_ms == 0 {
            None
        } else {
            Some(now - self.options.retention_ms)
        }
    }

    /// Ingest one sample, honoring the series duplicate policy
    ///
    /// Runs eviction first, rejects samples older than the retention
    /// window, and opens a new chunk when the active one is at capacity.
    pub fn append_sample(&mut self, timestamp: Timestamp, value: f64) -> EngineResult<()> {
        let now = timestamp.max(self.last_timestamp);
        self.evict_expired(now);

        if let Some(cutoff) = self.retention_cutoff(now) {
            if timestamp < cutoff {
                return Err(EngineError::SampleTooOld(timestamp));
            }
        }

        let sample = Sample::new(timestamp, value);
        let idx = self.chunk_index_for(timestamp);
        let policy = self.options.duplicate_policy;

        match self.chunks[idx].try_append(sample, policy)? {
            ChunkAppend::Appended => {
                self.total_samples += 1;
            }
            ChunkAppend::Merged => {}
            ChunkAppend::Full => {
                self.overflow_into_new_chunk(idx, sample)?;
                self.total_samples += 1;
            }
        }

        self.refresh_bounds();
        if timestamp >= self.last_timestamp {
            self.last_value = value;
        }
        Ok(())
    }

    /// Pick the chunk a timestamp belongs to: the last chunk whose span
    /// could contain it, or the active (final) chunk for in-order appends
    fn chunk_index_for(&self, timestamp: Timestamp) -> usize {
        let last = self.chunks.len() - 1;
        if self.chunks[last].is_empty() || timestamp >= self.chunks[last].start_ts() {
            return last;
        }
        self.chunks
            .partition_point(|c| !c.is_empty() && c.start_ts() <= timestamp)
            .saturating_sub(1)
    }

    /// Handle a chunk that reported Full: either open a fresh active chunk
    /// (in-order append) or split the crowded chunk and retry (out-of-order
    /// insert)
    fn overflow_into_new_chunk(&mut self, idx: usize, sample: Sample) -> EngineResult<()> {
        let policy = self.options.duplicate_policy;
        let is_active = idx == self.chunks.len() - 1;

        if is_active && sample.timestamp > self.chunks[idx].end_ts() {
            tracing::debug!(
                sealed_samples = self.chunks[idx].len(),
                "chunk at capacity, opening a new one"
            );
            let mut fresh = Chunk::new(self.options.encoding, self.options.chunk_size_bytes);
            match fresh.try_append(sample, policy)? {
                ChunkAppend::Appended => {}
                // a fresh chunk always accepts its first sample
                _ => unreachable!("empty chunk refused a sample"),
            }
            self.chunks.push(fresh);
            return Ok(());
        }

        // Out-of-order insert into a crowded chunk: split it and retry
        let right = self.chunks[idx].split()?;
        let mut target = idx;
        if !right.is_empty() {
            if sample.timestamp >= right.start_ts() {
                target = idx + 1;
            }
            self.chunks.insert(idx + 1, right);
        }
        match self.chunks[target].try_append(sample, policy)? {
            ChunkAppend::Full => {
                // Capacity below one encoded sample: give it its own chunk,
                // inserted in timestamp order
                let mut solo = Chunk::new(self.options.encoding, self.options.chunk_size_bytes);
                solo.try_append(sample, policy)?;
                let pos = if sample.timestamp < self.chunks[target].start_ts() {
                    target
                } else {
                    target + 1
                };
                self.chunks.insert(pos, solo);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Evict samples older than `now - retention`, returning how many
    /// were removed
    ///
    /// Chunks entirely before the cutoff are dropped; a chunk straddling
    /// the cutoff is truncated so no in-window sample is lost. Triggered
    /// from mutating operations, never from a background task.
    pub fn evict_expired(&mut self, now: Timestamp) -> usize {
        let Some(cutoff) = self.retention_cutoff(now) else {
            return 0;
        };
        if self.is_empty() || self.first_timestamp >= cutoff {
            return 0;
        }

        let mut removed = 0;

        // Drop whole chunks that end before the cutoff
        self.chunks.retain(|chunk| {
            if !chunk.is_empty() && chunk.end_ts() < cutoff {
                removed += chunk.len();
                false
            } else {
                true
            }
        });

        // Truncate the chunk straddling the cutoff
        if let Some(chunk) = self.chunks.first_mut() {
            match chunk.remove_before(cutoff) {
                Ok(count) => removed += count,
                Err(e) => {
                    tracing::warn!("failed to truncate expired chunk: {}", e);
                }
            }
        }

        // A series always owns at least one chunk
        if self.chunks.is_empty() {
            self.chunks
                .push(Chunk::new(self.options.encoding, self.options.chunk_size_bytes));
        }

        if removed > 0 {
            tracing::debug!(removed, "evicted expired samples");
            self.total_samples -= removed;
            self.refresh_bounds();
            if self.is_empty() {
                self.last_value = f64::NAN;
            }
        }
        removed
    }

    fn refresh_bounds(&mut self) {
        let first = self.chunks.iter().find(|c| !c.is_empty());
        let last = self.chunks.iter().rev().find(|c| !c.is_empty());
        self.first_timestamp = first.map(|c| c.start_ts()).unwrap_or(0);
        self.last_timestamp = last.map(|c| c.end_ts()).unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::chunk::SAMPLE_SIZE;
    use crate::series::types::{DuplicatePolicy, Encoding};

    fn options(overrides: impl FnOnce(&mut SeriesOptions)) -> SeriesOptions {
        let mut opts = SeriesOptions::default();
        overrides(&mut opts);
        opts
    }

    fn new_series(opts: SeriesOptions) -> Series {
        Series::new(MetricDescriptor::anonymous(), opts)
    }

    #[test]
    fn test_new_series_has_one_empty_chunk() {
        let series = new_series(SeriesOptions::default());
        assert!(series.is_empty());
        assert_eq!(series.chunk_count(), 1);
        assert_eq!(series.total_samples(), 0);
        assert!(series.last_value().is_nan());
    }

    #[test]
    fn test_append_in_order() {
        let mut series = new_series(SeriesOptions::default());
        for i in 0..100 {
            series.append_sample(1000 + i * 1000, i as f64).unwrap();
        }
        assert_eq!(series.total_samples(), 100);
        assert_eq!(series.first_timestamp(), 1000);
        assert_eq!(series.last_timestamp(), 100_000);
        assert_eq!(series.last_value(), 99.0);

        let samples = series.samples().unwrap();
        assert_eq!(samples.len(), 100);
        assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_append_opens_new_chunk_when_full() {
        // room for 4 samples per chunk
        let opts = options(|o| {
            o.encoding = Encoding::Uncompressed;
            o.chunk_size_bytes = 4 * SAMPLE_SIZE;
        });
        let mut series = new_series(opts);
        for i in 0..10 {
            series.append_sample(i * 1000, i as f64).unwrap();
        }
        assert_eq!(series.total_samples(), 10);
        assert!(series.chunk_count() >= 3);
        // order preserved across the chunk boundary
        let samples = series.samples().unwrap();
        assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_append_duplicate_block_policy() {
        let mut series = new_series(SeriesOptions::default());
        series.append_sample(1000, 1.0).unwrap();
        let err = series.append_sample(1000, 2.0).unwrap_err();
        assert_eq!(err, EngineError::DuplicateSample(1000));
        assert_eq!(series.total_samples(), 1);
        assert_eq!(series.last_value(), 1.0);
    }

    #[test]
    fn test_append_duplicate_sum_policy() {
        let opts = options(|o| o.duplicate_policy = DuplicatePolicy::Sum);
        let mut series = new_series(opts);
        series.append_sample(1000, 1.5).unwrap();
        series.append_sample(1000, 2.5).unwrap();
        assert_eq!(series.total_samples(), 1);
        assert_eq!(series.samples().unwrap()[0].value, 4.0);
    }

    #[test]
    fn test_out_of_order_insert() {
        let mut series = new_series(SeriesOptions::default());
        series.append_sample(1000, 1.0).unwrap();
        series.append_sample(3000, 3.0).unwrap();
        series.append_sample(2000, 2.0).unwrap();
        let values: Vec<f64> = series.samples().unwrap().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_value(), 3.0);
    }

    #[test]
    fn test_out_of_order_insert_into_sealed_chunk() {
        let opts = options(|o| {
            o.encoding = Encoding::Uncompressed;
            o.chunk_size_bytes = 4 * SAMPLE_SIZE;
        });
        let mut series = new_series(opts);
        for ts in [1000, 2000, 4000, 5000, 6000, 7000, 8000, 9000] {
            series.append_sample(ts, 0.0).unwrap();
        }
        // lands in the sealed first chunk
        series.append_sample(3000, 3.0).unwrap();
        let timestamps: Vec<i64> = series
            .samples()
            .unwrap()
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(
            timestamps,
            vec![1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000]
        );
    }

    #[test]
    fn test_retention_rejects_old_sample() {
        let opts = options(|o| o.retention_ms = 10_000);
        let mut series = new_series(opts);
        series.append_sample(100_000, 1.0).unwrap();
        let err = series.append_sample(80_000, 2.0).unwrap_err();
        assert_eq!(err, EngineError::SampleTooOld(80_000));
    }

    #[test]
    fn test_zero_retention_keeps_everything() {
        let mut series = new_series(SeriesOptions::default());
        series.append_sample(1, 1.0).unwrap();
        series.append_sample(1_000_000_000, 2.0).unwrap();
        assert_eq!(series.evict_expired(2_000_000_000), 0);
        assert_eq!(series.total_samples(), 2);
    }

    #[test]
    fn test_evict_drops_whole_chunks() {
        let opts = options(|o| {
            o.encoding = Encoding::Uncompressed;
            o.chunk_size_bytes = 2 * SAMPLE_SIZE;
            o.retention_ms = 3_000;
        });
        let mut series = new_series(opts);
        for i in 0..6 {
            series.append_sample(i * 1000, i as f64).unwrap();
        }
        // window is [2000, 5000]: samples at 0 and 1000 expire
        assert_eq!(series.total_samples(), 4);
        assert_eq!(series.first_timestamp(), 2000);
        assert_eq!(series.last_timestamp(), 5000);
    }

    #[test]
    fn test_evict_truncates_straddling_chunk() {
        let opts = options(|o| o.retention_ms = 4_000);
        let mut series = new_series(opts);
        for i in 0..10 {
            series.append_sample(i * 1000, i as f64).unwrap();
        }
        // one big chunk straddles the cutoff; explicit maintenance pass
        let removed = series.evict_expired(10_000);
        assert!(removed > 0);
        assert_eq!(series.first_timestamp(), 6000);
        assert_eq!(series.last_timestamp(), 9000);
        let samples = series.samples().unwrap();
        assert!(samples.iter().all(|s| s.timestamp >= 6000));
    }

    #[test]
    fn test_evict_with_wall_clock_now() {
        use crate::series::types::current_time_millis;

        let opts = options(|o| o.retention_ms = 60_000);
        let mut series = new_series(opts);
        let now = current_time_millis();
        series.append_sample(now - 120_000, 1.0).unwrap();
        series.append_sample(now - 90_000, 2.0).unwrap();
        series.append_sample(now - 30_000, 3.0).unwrap();

        series.evict_expired(current_time_millis());
        assert_eq!(series.total_samples(), 1);
        assert_eq!(series.last_value(), 3.0);
    }

    #[test]
    fn test_evict_everything_resets_series() {
        let opts = options(|o| o.retention_ms = 1_000);
        let mut series = new_series(opts);
        series.append_sample(1000, 1.0).unwrap();
        series.append_sample(2000, 2.0).unwrap();
        let removed = series.evict_expired(100_000);
        assert_eq!(removed, 2);
        assert!(series.is_empty());
        assert_eq!(series.chunk_count(), 1);
        assert!(series.last_value().is_nan());
    }
}
