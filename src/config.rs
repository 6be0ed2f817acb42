use std::path::PathBuf;
use std::time::Duration;

use crate::aggregation::AggregationWindow;
use crate::constants::{
    input_poll_quantum, tick_rate, DEFAULT_HISTORY_BUCKETS, DEFAULT_OVERSIZE_FACTOR, DEFAULT_SURFACE_LINES,
    MIN_SURFACE_LINES,
};
use crate::time_series::TruncationPolicy;

/// Everything the run loop needs to know, resolved from the command line.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub interface: String,
    /// Requested surface height; the terminal may force it smaller.
    pub surface_lines: u16,
    pub min_surface_lines: u16,
    pub policy: TruncationPolicy,
    pub windows: Vec<AggregationWindow>,
    pub tick: Duration,
    pub input_quantum: Duration,
    pub log_file: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            surface_lines: DEFAULT_SURFACE_LINES,
            min_surface_lines: MIN_SURFACE_LINES,
            policy: TruncationPolicy::new(DEFAULT_HISTORY_BUCKETS, DEFAULT_OVERSIZE_FACTOR),
            windows: AggregationWindow::ALL.to_vec(),
            tick: tick_rate(),
            input_quantum: input_poll_quantum(),
            log_file: None,
        }
    }

    pub fn with_surface_lines(mut self, lines: u16) -> Self {
        if lines < self.min_surface_lines {
            tracing::warn!(
                requested = lines,
                min = self.min_surface_lines,
                "Surface height raised to the minimum"
            );
        }
        self.surface_lines = lines.max(self.min_surface_lines);
        self
    }

    pub fn with_history(mut self, max_capacity: usize, oversize_factor: f64) -> Self {
        self.policy = TruncationPolicy::new(max_capacity, oversize_factor);
        self
    }

    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DashboardConfig::new("eth0");
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.surface_lines, 12);
        assert_eq!(config.policy.max_capacity, DEFAULT_HISTORY_BUCKETS);
        assert_eq!(config.windows.len(), 4);
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.input_quantum, Duration::from_millis(10));
    }

    #[test]
    fn surface_lines_respect_the_minimum() {
        assert_eq!(DashboardConfig::new("eth0").with_surface_lines(3).surface_lines, 6);
        assert_eq!(DashboardConfig::new("eth0").with_surface_lines(30).surface_lines, 30);
    }

    #[test]
    fn history_goes_through_the_policy_clamps() {
        let config = DashboardConfig::new("eth0").with_history(0, 0.5);
        assert_eq!(config.policy.max_capacity, 1);
        assert_eq!(config.policy.oversize_factor, 1.0);
    }
}
