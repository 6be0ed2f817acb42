//! Resolutions the dashboard can display and the statistic applied to them.

use std::fmt;

use chrono::TimeDelta;

/// Duration covered by one bucket. The discriminant is the number of raw
/// one-second ticks a bucket accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregationWindow {
    OneSecond = 1,
    OneMinute = 60,
    OneHour = 3600,
    OneDay = 86400,
}

impl AggregationWindow {
    pub const ALL: [AggregationWindow; 4] = [
        AggregationWindow::OneSecond,
        AggregationWindow::OneMinute,
        AggregationWindow::OneHour,
        AggregationWindow::OneDay,
    ];

    /// Raw ticks represented by a single bucket.
    pub fn ticks(self) -> u64 {
        self as u64
    }

    pub fn duration(self) -> TimeDelta {
        TimeDelta::seconds(self as i64)
    }

    /// Next coarser window. Clamps at `OneDay`.
    pub fn next(self) -> Self {
        match self {
            AggregationWindow::OneSecond => AggregationWindow::OneMinute,
            AggregationWindow::OneMinute => AggregationWindow::OneHour,
            AggregationWindow::OneHour => AggregationWindow::OneDay,
            AggregationWindow::OneDay => AggregationWindow::OneDay,
        }
    }

    /// Next finer window. Clamps at `OneSecond`.
    pub fn prev(self) -> Self {
        match self {
            AggregationWindow::OneDay => AggregationWindow::OneHour,
            AggregationWindow::OneHour => AggregationWindow::OneMinute,
            AggregationWindow::OneMinute => AggregationWindow::OneSecond,
            AggregationWindow::OneSecond => AggregationWindow::OneSecond,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AggregationWindow::OneSecond => "sec",
            AggregationWindow::OneMinute => "min",
            AggregationWindow::OneHour => "hour",
            AggregationWindow::OneDay => "day",
        }
    }
}

impl fmt::Display for AggregationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Bucket value divided by its tick count, i.e. a per-second rate
    Average,
    Sum,
}

impl Statistic {
    pub fn toggle(self) -> Self {
        match self {
            Statistic::Average => Statistic::Sum,
            Statistic::Sum => Statistic::Average,
        }
    }

    pub fn divisor(self, window: AggregationWindow) -> u64 {
        match self {
            Statistic::Average => window.ticks(),
            Statistic::Sum => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Statistic::Average => "avg",
            Statistic::Sum => "sum",
        }
    }
}
