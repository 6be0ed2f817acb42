//! One independent `TimeSeries` per aggregation window, fed from a single
//! ingestion point.

use std::collections::BTreeMap;

use crate::aggregation::{AggregationWindow, Statistic};
use crate::error::TimeSeriesError;
use crate::time_series::{TimePoint, TimeSeries, TimeSeriesSlice, TruncationPolicy};

#[derive(Debug, Clone)]
pub struct TimeSeriesCollection {
    series: BTreeMap<AggregationWindow, TimeSeries>,
}

impl TimeSeriesCollection {
    pub fn new(start: TimePoint, windows: &[AggregationWindow]) -> Self {
        Self::with_policy(start, windows, TruncationPolicy::default())
    }

    pub fn with_policy(start: TimePoint, windows: &[AggregationWindow], policy: TruncationPolicy) -> Self {
        let series = windows
            .iter()
            .map(|&window| (window, TimeSeries::with_policy(window, start, policy)))
            .collect();

        Self { series }
    }

    /// Adds `amount` at `time_point` to every resolution.
    ///
    /// Either every series takes the write or none does: a time point one
    /// of the series can no longer represent is rejected up front.
    pub fn inc(&mut self, time_point: TimePoint, amount: u64) -> Result<(), TimeSeriesError> {
        if let Some(ts) = self.series.values().find(|ts| !ts.admits(time_point)) {
            return Err(TimeSeriesError::Evicted {
                time_point,
                start: ts.start(),
            });
        }

        for ts in self.series.values_mut() {
            ts.inc(time_point, amount)?;
        }

        Ok(())
    }

    pub fn get_slice_from_end(
        &self,
        window: AggregationWindow,
        length: usize,
        stat: Statistic,
    ) -> Result<TimeSeriesSlice, TimeSeriesError> {
        Ok(self.series(window)?.get_slice_from_end(length, stat))
    }

    pub fn get_slice_from_pos(
        &self,
        window: AggregationWindow,
        offset_from_end: usize,
        length: usize,
        stat: Statistic,
    ) -> Result<TimeSeriesSlice, TimeSeriesError> {
        Ok(self
            .series(window)?
            .get_slice_from_pos(offset_from_end, length, stat))
    }

    pub fn get_slice_from_point(
        &self,
        window: AggregationWindow,
        time_point: TimePoint,
        length: usize,
        stat: Statistic,
    ) -> Result<TimeSeriesSlice, TimeSeriesError> {
        Ok(self
            .series(window)?
            .get_slice_from_point(time_point, length, stat))
    }

    pub fn min(&self, window: AggregationWindow) -> Result<TimePoint, TimeSeriesError> {
        Ok(self.series(window)?.min())
    }

    pub fn max(&self, window: AggregationWindow) -> Result<TimePoint, TimeSeriesError> {
        Ok(self.series(window)?.max())
    }

    pub fn minus_one(
        &self,
        window: AggregationWindow,
        time_point: TimePoint,
    ) -> Result<Option<TimePoint>, TimeSeriesError> {
        Ok(self.series(window)?.minus_one(time_point))
    }

    pub fn plus_one(
        &self,
        window: AggregationWindow,
        time_point: TimePoint,
    ) -> Result<Option<TimePoint>, TimeSeriesError> {
        Ok(self.series(window)?.plus_one(time_point))
    }

    pub fn size(&self, window: AggregationWindow) -> Result<usize, TimeSeriesError> {
        Ok(self.series(window)?.size())
    }

    fn series(&self, window: AggregationWindow) -> Result<&TimeSeries, TimeSeriesError> {
        self.series
            .get(&window)
            .ok_or(TimeSeriesError::UnregisteredWindow(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeDelta, TimeZone};

    fn t0() -> TimePoint {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn one_sample_fans_out_to_every_resolution() {
        let windows = [AggregationWindow::OneSecond, AggregationWindow::OneMinute];
        let mut coll = TimeSeriesCollection::new(t0(), &windows);

        coll.inc(t0(), 120).unwrap();
        coll.inc(t0() + TimeDelta::seconds(30), 120).unwrap();

        let minute = coll
            .get_slice_from_end(AggregationWindow::OneMinute, 1, Statistic::Sum)
            .unwrap();
        assert_eq!(minute.values, vec![240]);

        let second = coll
            .get_slice_from_end(AggregationWindow::OneSecond, 31, Statistic::Sum)
            .unwrap();
        assert_eq!(second.values.first(), Some(&120));
        assert_eq!(second.values.last(), Some(&120));
        assert_eq!(second.values.iter().filter(|&&v| v > 0).count(), 2);
        assert_eq!(coll.size(AggregationWindow::OneSecond), Ok(31));
        assert_eq!(coll.size(AggregationWindow::OneMinute), Ok(1));
    }

    #[test]
    fn unregistered_window_is_an_error() {
        let coll = TimeSeriesCollection::new(t0(), &[AggregationWindow::OneSecond]);
        assert_eq!(
            coll.size(AggregationWindow::OneDay),
            Err(TimeSeriesError::UnregisteredWindow(AggregationWindow::OneDay))
        );
        assert!(coll
            .get_slice_from_end(AggregationWindow::OneHour, 5, Statistic::Sum)
            .is_err());
    }

    #[test]
    fn rejected_write_leaves_every_resolution_untouched() {
        let policy = TruncationPolicy::new(2, 1.0);
        let windows = [AggregationWindow::OneSecond, AggregationWindow::OneMinute];
        let mut coll = TimeSeriesCollection::with_policy(t0(), &windows, policy);

        for i in 0..5 {
            coll.inc(t0() + TimeDelta::seconds(i), 1).unwrap();
        }
        // the per-second series has moved past t0, the per-minute one has not
        assert!(coll.inc(t0(), 1).is_err());
        let minute = coll
            .get_slice_from_end(AggregationWindow::OneMinute, 1, Statistic::Sum)
            .unwrap();
        assert_eq!(minute.values, vec![5]);
    }

    #[test]
    fn delegates_cursor_navigation() {
        let mut coll = TimeSeriesCollection::new(t0(), &AggregationWindow::ALL);
        coll.inc(t0() + TimeDelta::minutes(3), 1).unwrap();

        let window = AggregationWindow::OneMinute;
        assert_eq!(coll.min(window), Ok(t0()));
        assert_eq!(coll.max(window), Ok(t0() + TimeDelta::minutes(3)));
        assert_eq!(
            coll.minus_one(window, t0() + TimeDelta::minutes(3)),
            Ok(Some(t0() + TimeDelta::minutes(2)))
        );
        assert_eq!(coll.plus_one(window, t0() + TimeDelta::minutes(3)), Ok(None));
        assert!(AggregationWindow::ALL.iter().all(|&w| coll.size(w).is_ok()));
    }
}
