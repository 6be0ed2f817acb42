//! Single-resolution counter log.
//!
//! A `TimeSeries` maps time points onto integer bucket keys relative to its
//! `start` and accumulates increments per bucket. Storage grows by doubling
//! and is kept bounded by evicting the oldest buckets once the series grows
//! past `max_capacity * oversize_factor`.

use chrono::{DateTime, Local, TimeDelta};

use crate::aggregation::{AggregationWindow, Statistic};
use crate::constants::{DEFAULT_MAX_CAPACITY, DEFAULT_OVERSIZE_FACTOR};
use crate::error::TimeSeriesError;

pub type TimePoint = DateTime<Local>;

/// When and how far a series is cut back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationPolicy {
    /// Number of buckets kept after a truncation
    pub max_capacity: usize,
    /// How far past `max_capacity` the series may grow before truncating
    pub oversize_factor: f64,
}

impl TruncationPolicy {
    pub fn new(max_capacity: usize, oversize_factor: f64) -> Self {
        Self {
            max_capacity: max_capacity.max(1),
            oversize_factor: oversize_factor.max(1.0),
        }
    }

    fn is_oversized(&self, size: usize) -> bool {
        size as f64 > self.max_capacity as f64 * self.oversize_factor
    }
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY, DEFAULT_OVERSIZE_FACTOR)
    }
}

/// Render-ready extract of consecutive buckets, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesSlice {
    pub time_points: Vec<TimePoint>,
    pub values: Vec<u64>,
    pub window: AggregationWindow,
}

impl TimeSeriesSlice {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_value(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct TimeSeries {
    window: AggregationWindow,
    interval: TimeDelta,
    start: TimePoint,
    storage: Vec<u64>,
    max_key: usize,
    policy: TruncationPolicy,
}

impl TimeSeries {
    pub fn new(window: AggregationWindow, start: TimePoint) -> Self {
        Self::with_policy(window, start, TruncationPolicy::default())
    }

    pub fn with_policy(window: AggregationWindow, start: TimePoint, policy: TruncationPolicy) -> Self {
        Self {
            window,
            interval: window.duration(),
            start,
            // the bucket `start` falls into always exists
            storage: vec![0],
            max_key: 0,
            policy,
        }
    }

    pub fn window(&self) -> AggregationWindow {
        self.window
    }

    pub fn start(&self) -> TimePoint {
        self.start
    }

    pub fn policy(&self) -> TruncationPolicy {
        self.policy
    }

    pub fn size(&self) -> usize {
        self.max_key + 1
    }

    /// Number of allocated bucket slots, always at least `size()`.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn calculate_key(&self, time_point: TimePoint) -> Result<usize, TimeSeriesError> {
        let distance = time_point.signed_duration_since(self.start);
        if distance < TimeDelta::zero() {
            return Err(TimeSeriesError::BeforeStart {
                time_point,
                start: self.start,
            });
        }

        Ok((distance.num_milliseconds() / self.interval.num_milliseconds()) as usize)
    }

    pub fn reverse_key(&self, key: usize) -> TimePoint {
        self.start + self.interval_times(key)
    }

    /// Adds `amount` to the bucket owning `time_point`.
    ///
    /// A series already past its oversize threshold is truncated back to
    /// `max_capacity` before the write lands, so a single write never
    /// evicts history on its own. Writing into a bucket that truncation
    /// would evict fails without modifying the series.
    pub fn inc(&mut self, time_point: TimePoint, amount: u64) -> Result<(), TimeSeriesError> {
        let key = self.calculate_key(time_point)?;
        let evict = self.pending_eviction();

        if key < evict {
            return Err(TimeSeriesError::Evicted {
                time_point,
                start: self.reverse_key(evict),
            });
        }

        if evict > 0 {
            self.truncate();
        }

        let key = key - evict;
        self.ensure_slot(key);
        self.storage[key] = self.storage[key].saturating_add(amount);
        self.max_key = self.max_key.max(key);

        Ok(())
    }

    /// Whether `inc(time_point, _)` would succeed.
    pub fn admits(&self, time_point: TimePoint) -> bool {
        match self.calculate_key(time_point) {
            Ok(key) => key >= self.pending_eviction(),
            Err(_) => false,
        }
    }

    /// Current value of the bucket owning `time_point`. Buckets that were
    /// never written read as zero; evicted buckets are an error.
    pub fn get(&self, time_point: TimePoint) -> Result<u64, TimeSeriesError> {
        let key = self
            .calculate_key(time_point)
            .map_err(|_| TimeSeriesError::Evicted {
                time_point,
                start: self.start,
            })?;

        self.get_key(key)
    }

    pub fn get_key(&self, key: usize) -> Result<u64, TimeSeriesError> {
        self.storage
            .get(key)
            .copied()
            .ok_or(TimeSeriesError::OutOfRange {
                key,
                len: self.storage.len(),
            })
    }

    pub fn get_slice_from_end(&self, length: usize, stat: Statistic) -> TimeSeriesSlice {
        self.get_slice_from_pos(0, length, stat)
    }

    /// Slice of `length` buckets whose newest bucket is `offset_from_end`
    /// buckets before the newest one.
    pub fn get_slice_from_pos(&self, offset_from_end: usize, length: usize, stat: Statistic) -> TimeSeriesSlice {
        let last_key = self.max_key.saturating_sub(offset_from_end);
        self.slice_ending_at(last_key, length, stat)
    }

    /// Slice of `length` buckets ending with the bucket owning `time_point`,
    /// clamped to the buckets currently held.
    pub fn get_slice_from_point(&self, time_point: TimePoint, length: usize, stat: Statistic) -> TimeSeriesSlice {
        let last_key = self.clamped_key(time_point);
        self.slice_ending_at(last_key, length, stat)
    }

    pub fn min(&self) -> TimePoint {
        self.start
    }

    pub fn max(&self) -> TimePoint {
        self.reverse_key(self.max_key)
    }

    /// One bucket earlier, or `None` at the oldest bucket.
    pub fn minus_one(&self, time_point: TimePoint) -> Option<TimePoint> {
        let key = self.calculate_key(time_point).ok()?.min(self.max_key);
        key.checked_sub(1).map(|key| self.reverse_key(key))
    }

    /// One bucket later, or `None` at the newest bucket.
    pub fn plus_one(&self, time_point: TimePoint) -> Option<TimePoint> {
        let key = self.clamped_key(time_point);
        if key >= self.max_key {
            return None;
        }
        Some(self.reverse_key(key + 1))
    }

    /// Evicts the oldest `size() - max_capacity` buckets. No-op when the
    /// series is within capacity.
    pub fn truncate(&mut self) {
        let evict = self.size().saturating_sub(self.policy.max_capacity);
        if evict > 0 {
            self.evict(evict);
        }
    }

    /// Buckets the next `inc` truncates before writing.
    fn pending_eviction(&self) -> usize {
        if self.policy.is_oversized(self.size()) {
            self.size().saturating_sub(self.policy.max_capacity)
        } else {
            0
        }
    }

    fn evict(&mut self, count: usize) {
        let drained = count.min(self.storage.len());
        self.storage.drain(..drained);
        if self.storage.is_empty() {
            self.storage.push(0);
        }

        self.start = self.reverse_key(count);
        self.max_key = self.max_key.saturating_sub(count);

        tracing::trace!(
            window = %self.window,
            evicted = count,
            start = %self.start,
            "truncated time series"
        );
    }

    fn ensure_slot(&mut self, key: usize) {
        if key >= self.storage.len() {
            self.storage.resize((key + 1) * 2, 0);
        }
    }

    fn clamped_key(&self, time_point: TimePoint) -> usize {
        self.calculate_key(time_point)
            .map(|key| key.min(self.max_key))
            .unwrap_or(0)
    }

    fn interval_times(&self, count: usize) -> TimeDelta {
        TimeDelta::milliseconds(self.interval.num_milliseconds() * count as i64)
    }

    fn slice_ending_at(&self, last_key: usize, length: usize, stat: Statistic) -> TimeSeriesSlice {
        let first_key = (last_key + 1).saturating_sub(length);
        let divisor = stat.divisor(self.window);

        let (time_points, values) = if length == 0 {
            (Vec::new(), Vec::new())
        } else {
            (first_key..=last_key)
                .map(|key| (self.reverse_key(key), self.storage[key] / divisor))
                .unzip()
        };

        TimeSeriesSlice {
            time_points,
            values,
            window: self.window,
        }
    }
}
