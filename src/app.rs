use crate::aggregation::{AggregationWindow, Statistic};
use crate::chart::DisplayScale;
use crate::collection::TimeSeriesCollection;
use crate::error::TimeSeriesError;
use crate::input::KeyPress;
use crate::network::Sample;
use crate::time_series::{TimePoint, TimeSeriesSlice, TruncationPolicy};
use crate::util::format_bytes_total;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Rx,
    Tx,
}

impl DisplayMode {
    pub fn title(self) -> &'static str {
        match self {
            DisplayMode::Rx => "received",
            DisplayMode::Tx => "transmitted",
        }
    }
}

/// What the run loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Redraw,
    CarriageReturn,
    Resize,
    Quit,
}

// Main application state
pub struct App {
    interface: String,
    rx: TimeSeriesCollection,
    tx: TimeSeriesCollection,
    last_sample: Sample,
    pub total_rx_bytes: u64,
    pub total_tx_bytes: u64,

    mode: DisplayMode,
    scale: DisplayScale,
    stat: Statistic,
    window: AggregationWindow,
    // None follows the newest bucket
    cursor: Option<TimePoint>,
}

impl App {
    /// `first` is the sample taken during sampler detection; counting
    /// starts from it.
    pub fn new(
        interface: impl Into<String>,
        first: Sample,
        windows: &[AggregationWindow],
        policy: TruncationPolicy,
    ) -> Self {
        let start = first.timestamp;
        Self {
            interface: interface.into(),
            rx: TimeSeriesCollection::with_policy(start, windows, policy),
            tx: TimeSeriesCollection::with_policy(start, windows, policy),
            last_sample: first,
            total_rx_bytes: 0,
            total_tx_bytes: 0,
            mode: DisplayMode::Rx,
            scale: DisplayScale::default(),
            stat: Statistic::Average,
            window: AggregationWindow::OneSecond,
            cursor: None,
        }
    }

    /// Feeds the bytes moved since the previous sample into every
    /// resolution. A rejected sample leaves the previous one in place.
    pub fn on_sample(&mut self, sample: Sample) -> Result<(), TimeSeriesError> {
        let rx_delta = counter_delta("rx", self.last_sample.rx, sample.rx);
        let tx_delta = counter_delta("tx", self.last_sample.tx, sample.tx);

        // both collections share start and policy, so they accept or
        // reject the same time points
        self.rx.inc(sample.timestamp, rx_delta)?;
        self.tx.inc(sample.timestamp, tx_delta)?;

        self.total_rx_bytes += rx_delta;
        self.total_tx_bytes += tx_delta;
        self.last_sample = sample;
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyPress) -> Action {
        match key {
            KeyPress::Nothing => return Action::Continue,
            KeyPress::Quit => return Action::Quit,
            KeyPress::CarriageReturn => return Action::CarriageReturn,
            KeyPress::Resize => return Action::Resize,
            KeyPress::LetterR => self.mode = DisplayMode::Rx,
            KeyPress::LetterT => self.mode = DisplayMode::Tx,
            KeyPress::LetterC => self.scale = self.scale.next(),
            KeyPress::LetterS => self.stat = self.stat.toggle(),
            KeyPress::ArrowUp => self.set_window(self.window.next()),
            KeyPress::ArrowDown => self.set_window(self.window.prev()),
            KeyPress::ArrowLeft => self.scroll_back(),
            KeyPress::ArrowRight => self.scroll_forward(),
        }
        tracing::debug!(?key, mode = ?self.mode, window = %self.window, cursor = ?self.cursor, "view changed");
        Action::Redraw
    }

    /// The `length` buckets to draw, ending at the cursor or the newest
    /// bucket.
    pub fn current_slice(&self, length: usize) -> Result<TimeSeriesSlice, TimeSeriesError> {
        let coll = self.collection();
        match self.cursor {
            None => coll.get_slice_from_end(self.window, length, self.stat),
            Some(tp) => coll.get_slice_from_point(self.window, tp, length, self.stat),
        }
    }

    pub fn title(&self) -> String {
        match self.cursor {
            None => self.mode.title().to_string(),
            Some(tp) => format!("{} @ {}", self.mode.title(), tp.format("%Y-%m-%d %H:%M:%S")),
        }
    }

    pub fn iface_label(&self) -> String {
        format!(
            "{} ▼ {} ▲ {}",
            self.interface,
            format_bytes_total(self.total_rx_bytes),
            format_bytes_total(self.total_tx_bytes)
        )
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn scale(&self) -> DisplayScale {
        self.scale
    }

    pub fn stat(&self) -> Statistic {
        self.stat
    }

    pub fn window(&self) -> AggregationWindow {
        self.window
    }

    pub fn cursor(&self) -> Option<TimePoint> {
        self.cursor
    }

    fn collection(&self) -> &TimeSeriesCollection {
        match self.mode {
            DisplayMode::Rx => &self.rx,
            DisplayMode::Tx => &self.tx,
        }
    }

    fn set_window(&mut self, window: AggregationWindow) {
        self.window = window;
        self.cursor = None;
    }

    fn scroll_back(&mut self) {
        let coll = self.collection();
        let (Ok(min), Ok(max)) = (coll.min(self.window), coll.max(self.window)) else {
            return;
        };

        // truncation may have moved the oldest bucket past the cursor
        let current = self.cursor.unwrap_or(max).max(min);
        let previous = coll.minus_one(self.window, current).ok().flatten();
        self.cursor = Some(previous.unwrap_or(current));
    }

    fn scroll_forward(&mut self) {
        let Some(current) = self.cursor else {
            return;
        };

        let coll = self.collection();
        let next = coll.plus_one(self.window, current).ok().flatten();
        let newest = coll.max(self.window).ok();

        self.cursor = match next {
            Some(tp) if Some(tp) < newest => Some(tp),
            _ => None,
        };
    }
}

fn counter_delta(which: &str, previous: u64, current: u64) -> u64 {
    match current.checked_sub(previous) {
        Some(delta) => delta,
        None => {
            tracing::warn!(counter = which, previous, current, "Byte counter went backwards, assuming a reset");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeDelta, TimeZone};

    fn t0() -> TimePoint {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample(secs: i64, rx: u64, tx: u64) -> Sample {
        Sample {
            rx,
            tx,
            timestamp: t0() + TimeDelta::seconds(secs),
        }
    }

    fn app() -> App {
        App::new(
            "eth0",
            sample(0, 1000, 500),
            &AggregationWindow::ALL,
            TruncationPolicy::new(600, 1.5),
        )
    }

    #[test]
    fn samples_become_per_tick_deltas() {
        let mut app = app();
        app.on_sample(sample(1, 1600, 700)).unwrap();
        app.on_sample(sample(2, 2600, 700)).unwrap();

        let slice = app.current_slice(2).unwrap();
        assert_eq!(slice.values, vec![600, 1000]);
        assert_eq!(app.total_rx_bytes, 1600);
        assert_eq!(app.total_tx_bytes, 200);

        app.handle_key(KeyPress::LetterT);
        assert_eq!(app.current_slice(2).unwrap().values, vec![200, 0]);
    }

    #[test]
    fn counter_reset_counts_as_zero() {
        let mut app = app();
        app.on_sample(sample(1, 10, 10)).unwrap();
        app.on_sample(sample(2, 110, 20)).unwrap();

        assert_eq!(app.current_slice(2).unwrap().values, vec![0, 100]);
        assert_eq!(app.total_rx_bytes, 100);
    }

    #[test]
    fn coarser_windows_see_the_same_bytes() {
        let mut app = app();
        for i in 1..=90 {
            app.on_sample(sample(i, 1000 + i as u64 * 60, 500)).unwrap();
        }

        app.handle_key(KeyPress::ArrowUp);
        assert_eq!(app.window(), AggregationWindow::OneMinute);
        app.handle_key(KeyPress::LetterS);
        assert_eq!(app.stat(), Statistic::Sum);

        let slice = app.current_slice(2).unwrap();
        assert_eq!(slice.window, AggregationWindow::OneMinute);
        assert_eq!(slice.values.iter().sum::<u64>(), 90 * 60);
    }

    #[test]
    fn view_keys() {
        let mut app = app();
        assert_eq!(app.handle_key(KeyPress::Nothing), Action::Continue);
        assert_eq!(app.handle_key(KeyPress::Quit), Action::Quit);
        assert_eq!(app.handle_key(KeyPress::CarriageReturn), Action::CarriageReturn);
        assert_eq!(app.handle_key(KeyPress::Resize), Action::Resize);

        assert_eq!(app.handle_key(KeyPress::LetterC), Action::Redraw);
        assert_eq!(app.scale(), DisplayScale::Log10);
        app.handle_key(KeyPress::LetterC);
        app.handle_key(KeyPress::LetterC);
        assert_eq!(app.scale(), DisplayScale::Linear);

        app.handle_key(KeyPress::LetterT);
        assert_eq!(app.mode(), DisplayMode::Tx);
        app.handle_key(KeyPress::LetterR);
        assert_eq!(app.mode(), DisplayMode::Rx);

        app.handle_key(KeyPress::ArrowDown);
        assert_eq!(app.window(), AggregationWindow::OneSecond);
        for _ in 0..5 {
            app.handle_key(KeyPress::ArrowUp);
        }
        assert_eq!(app.window(), AggregationWindow::OneDay);
    }

    #[test]
    fn scrolling_back_and_returning_to_live() {
        let mut app = app();
        for i in 1..=5 {
            app.on_sample(sample(i, 1000 + i as u64, 500)).unwrap();
        }

        app.handle_key(KeyPress::ArrowRight);
        assert_eq!(app.cursor(), None);

        app.handle_key(KeyPress::ArrowLeft);
        assert_eq!(app.cursor(), Some(t0() + TimeDelta::seconds(4)));
        app.handle_key(KeyPress::ArrowLeft);
        assert_eq!(app.cursor(), Some(t0() + TimeDelta::seconds(3)));
        assert!(app.title().starts_with("received @ "));
        assert_eq!(app.current_slice(10).unwrap().time_points.last(), Some(&(t0() + TimeDelta::seconds(3))));

        app.handle_key(KeyPress::ArrowRight);
        assert_eq!(app.cursor(), Some(t0() + TimeDelta::seconds(4)));
        app.handle_key(KeyPress::ArrowRight);
        assert_eq!(app.cursor(), None);
        assert_eq!(app.title(), "received");
    }

    #[test]
    fn scrolling_stops_at_the_oldest_bucket() {
        let mut app = app();
        app.on_sample(sample(1, 1001, 500)).unwrap();

        for _ in 0..5 {
            app.handle_key(KeyPress::ArrowLeft);
        }
        assert_eq!(app.cursor(), Some(t0()));
    }

    #[test]
    fn changing_resolution_returns_to_live() {
        let mut app = app();
        app.on_sample(sample(1, 1001, 500)).unwrap();
        app.handle_key(KeyPress::ArrowLeft);
        assert!(app.cursor().is_some());

        app.handle_key(KeyPress::ArrowUp);
        assert_eq!(app.cursor(), None);
    }

    #[test]
    fn label_carries_interface_and_totals() {
        let mut app = app();
        app.on_sample(sample(1, 1000 + 2048, 500)).unwrap();
        assert_eq!(app.iface_label(), "eth0 ▼ 2.00 KiB ▲ 0 B");
    }

    #[test]
    fn sample_before_start_is_rejected() {
        let mut app = app();
        assert!(app.on_sample(sample(-5, 2000, 600)).is_err());
        assert_eq!(app.total_rx_bytes, 0);
    }
}
