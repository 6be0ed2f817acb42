use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::aggregation::AggregationWindow;
use crate::geometry::{Dimensions, Point};
use crate::time_series::TimePoint;

#[derive(Debug, Error, PartialEq)]
pub enum TimeSeriesError {
    /// The bucket was dropped by truncation (or predates the series).
    #[error("bucket for {time_point} has been evicted (series starts at {start})")]
    Evicted { time_point: TimePoint, start: TimePoint },

    /// The key lies beyond the allocated storage.
    #[error("bucket key {key} is out of range (storage holds {len} buckets)")]
    OutOfRange { key: usize, len: usize },

    #[error("time point {time_point} is older than the series start {start}")]
    BeforeStart { time_point: TimePoint, start: TimePoint },

    #[error("aggregation window {0} is not registered in this collection")]
    UnregisteredWindow(AggregationWindow),
}

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("signal mask operation failed: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("tried to put cursor outside window, point: {point}, window: {dim}")]
    CursorOutsideWindow { point: Point, dim: Dimensions },

    #[error("point {point} lies outside the surface of size {dim}")]
    PointOutsideSurface { point: Point, dim: Dimensions },

    #[error("terminal window too small: {height} lines, need at least {min_lines}")]
    WindowTooSmall { height: u16, min_lines: u16 },

    #[error("a resize receiver is already registered with this window")]
    ReceiverAlreadyRegistered,

    #[error("a resize watcher is already installed for this process")]
    ResizeWatcherInstalled,

    #[error("cannot install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("interface {0} not found")]
    InterfaceNotFound(String),

    #[error("command `{program}` failed: {detail}")]
    Command { program: String, detail: String },

    #[error(
        "could not find a sampler supported by the system for interface {interface}\n{}\navailable interfaces: {}",
        .errors.iter().map(|e| format!("- {e}")).collect::<Vec<_>>().join("\n"),
        .available.join(", ")
    )]
    NoSamplerFound {
        interface: String,
        errors: Vec<String>,
        available: Vec<String>,
    },
}
