use std::time::Duration;

// One sample, one render and one input budget per tick
pub const TICK_RATE_MS: u64 = 1000;
// Granularity of the non-blocking keyboard polls inside a tick
pub const INPUT_POLL_MS: u64 = 10;

pub const DEFAULT_SURFACE_LINES: u16 = 12;
pub const MIN_SURFACE_LINES: u16 = 6;

pub const DEFAULT_MAX_CAPACITY: usize = 20;
pub const DEFAULT_OVERSIZE_FACTOR: f64 = 1.5;
// Buckets the dashboard keeps per resolution, enough for a wide terminal
pub const DEFAULT_HISTORY_BUCKETS: usize = 600;

// Left column reserved for y-axis tick labels: 4 digits, a space, 4 chars, a space
pub const SCALE_WIDTH: u16 = 10;
// Rows below the bars: x-axis labels, then the menu line
pub const CHART_OFFSET: u16 = 2;

pub const BACKGROUND_CHAR: char = ' ';

pub fn tick_rate() -> Duration {
    Duration::from_millis(TICK_RATE_MS)
}

pub fn input_poll_quantum() -> Duration {
    Duration::from_millis(INPUT_POLL_MS)
}
