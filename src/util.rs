use crate::aggregation::AggregationWindow;
use crate::time_series::TimePoint;

/// Columns left blank between two x-axis labels.
const XAXIS_LABEL_GAP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitBase {
    /// Powers of 1024.
    Binary,
    /// Powers of 1000, used for log10 axis ticks so they read 1, 10, 100...
    Decimal,
}

impl UnitBase {
    fn step(self) -> u64 {
        match self {
            UnitBase::Binary => 1024,
            UnitBase::Decimal => 1000,
        }
    }
}

// Axis tick label, e.g. " 12 kb". Numbers are right aligned in 3 columns
pub fn format_num_bytes(base: UnitBase, num: u64) -> String {
    let step = base.step();
    let (kb, mb, gb) = (step, step * step, step * step * step);

    if num >= gb {
        format!("{:>3} gb", num / gb)
    } else if num >= mb {
        format!("{:>3} mb", num / mb)
    } else if num >= kb {
        format!("{:>3} kb", num / kb)
    } else {
        format!("{:>3} b", num)
    }
}

pub fn format_num_bytes_rate(base: UnitBase, num: u64, time_unit: &str) -> String {
    format!("{}/{}", format_num_bytes(base, num), time_unit)
}

pub fn format_bytes_total(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// strftime pattern for the x-axis labels of a resolution.
pub fn xaxis_label_format(window: AggregationWindow) -> &'static str {
    match window {
        AggregationWindow::OneSecond => "%H:%M:%S",
        AggregationWindow::OneMinute => "%H:%M",
        AggregationWindow::OneHour => "%a %H:00",
        AggregationWindow::OneDay => "%b %d",
    }
}

/// Builds an axis line with one column per time point. Labels are right
/// aligned under their bucket, starting from the newest one, and skipped
/// where they would run off the left edge.
pub fn format_xaxis(window: AggregationWindow, time_points: &[TimePoint]) -> String {
    let mut axis = vec![' '; time_points.len()];
    let pattern = xaxis_label_format(window);

    let mut end = time_points.len();
    while end > 0 {
        let label: Vec<char> = time_points[end - 1].format(pattern).to_string().chars().collect();
        if label.len() > end {
            break;
        }

        let start = end - label.len();
        axis[start..end].copy_from_slice(&label);
        end = start.saturating_sub(XAXIS_LABEL_GAP);
    }

    axis.into_iter().collect()
}
