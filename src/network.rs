//! Reading cumulative rx/tx byte counters for one interface.
//!
//! Several strategies exist because no single source is available
//! everywhere; `SamplerDetector` picks the first one that works.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Local;
use once_cell::sync::Lazy;
use pnet::datalink;
use regex::Regex;

use crate::error::SamplerError;
use crate::time_series::TimePoint;

/// Cumulative counters as reported by the system at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub rx: u64,
    pub tx: u64,
    pub timestamp: TimePoint,
}

impl Sample {
    pub fn now(rx: u64, tx: u64) -> Self {
        Self {
            rx,
            tx,
            timestamp: Local::now(),
        }
    }
}

pub trait Sampler {
    fn name(&self) -> &'static str;
    fn get_sample(&self, interface: &str) -> Result<Sample, SamplerError>;
}

fn parse_counter(what: &'static str, text: &str) -> Result<u64, SamplerError> {
    text.trim().parse().map_err(|e| SamplerError::Parse {
        what,
        detail: format!("{:?}: {}", text.trim(), e),
    })
}

fn read_to_string(path: &Path) -> Result<String, SamplerError> {
    fs::read_to_string(path).map_err(|source| SamplerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ----------------------
// sysfs
// ----------------------

pub struct SysFsSampler {
    root: PathBuf,
}

impl SysFsSampler {
    pub fn new() -> Self {
        Self::with_root("/sys/class/net")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_stat(&self, interface: &str, stat: &'static str) -> Result<u64, SamplerError> {
        let iface_dir = self.root.join(interface);
        if !iface_dir.is_dir() {
            return Err(SamplerError::InterfaceNotFound(interface.to_string()));
        }

        let content = read_to_string(&iface_dir.join("statistics").join(stat))?;
        parse_counter(stat, &content)
    }
}

impl Default for SysFsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SysFsSampler {
    fn name(&self) -> &'static str {
        "SysFsSampler"
    }

    fn get_sample(&self, interface: &str) -> Result<Sample, SamplerError> {
        let rx = self.read_stat(interface, "rx_bytes")?;
        let tx = self.read_stat(interface, "tx_bytes")?;
        Ok(Sample::now(rx, tx))
    }
}

// ----------------------
// procfs
// ----------------------

static PROC_NET_DEV_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^\s:]+):\s*(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)")
        .expect("valid /proc/net/dev pattern")
});

/// Extracts (rx_bytes, tx_bytes) for `interface` from `/proc/net/dev`
/// content. Received bytes are the first counter, transmitted bytes the
/// ninth.
pub fn parse_proc_net_dev(content: &str, interface: &str) -> Result<(u64, u64), SamplerError> {
    for line in content.lines() {
        let Some(caps) = PROC_NET_DEV_LINE.captures(line) else {
            continue;
        };
        if &caps[1] != interface {
            continue;
        }

        let rx = parse_counter("rx bytes", &caps[2])?;
        let tx = parse_counter("tx bytes", &caps[10])?;
        return Ok((rx, tx));
    }

    Err(SamplerError::InterfaceNotFound(interface.to_string()))
}

pub struct ProcFsSampler {
    path: PathBuf,
}

impl ProcFsSampler {
    pub fn new() -> Self {
        Self::with_path("/proc/net/dev")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcFsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for ProcFsSampler {
    fn name(&self) -> &'static str {
        "ProcFsSampler"
    }

    fn get_sample(&self, interface: &str) -> Result<Sample, SamplerError> {
        let content = read_to_string(&self.path)?;
        let (rx, tx) = parse_proc_net_dev(&content, interface)?;
        Ok(Sample::now(rx, tx))
    }
}

// ----------------------
// external programs
// ----------------------

/// Runs a program to completion and returns its stdout as lines. Stderr is
/// discarded; a non-zero exit status is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramRunner;

impl ProgramRunner {
    pub fn run(&self, program: &str, args: &[&str]) -> Result<Vec<String>, SamplerError> {
        let command_line = || std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| SamplerError::Command {
                program: command_line(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SamplerError::Command {
                program: command_line(),
                detail: format!("exited with {}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_owned)
            .collect())
    }
}

static IP_IFACE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+:\s+([^\s:@]+)[:@]").expect("valid ip link header pattern"));
static IP_RX_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+RX:").expect("valid RX pattern"));
static IP_TX_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+TX:").expect("valid TX pattern"));
static IP_BYTES_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+(\d+)").expect("valid counter pattern"));

/// Parses `ip -statistics link show` output. The byte counter is the first
/// number on the line following an `RX:` or `TX:` header.
pub fn parse_ip_link_stats(lines: &[String], interface: &str) -> Result<(u64, u64), SamplerError> {
    #[derive(PartialEq)]
    enum Expect {
        Nothing,
        Rx,
        Tx,
    }

    let mut current = None;
    let mut expect = Expect::Nothing;
    let mut rx = None;
    let mut tx = None;

    for line in lines {
        if expect != Expect::Nothing {
            let caps = IP_BYTES_LINE.captures(line).ok_or_else(|| SamplerError::Parse {
                what: "ip link counters",
                detail: format!("expected a counter line, got {:?}", line),
            })?;
            let value = parse_counter("ip link bytes", &caps[1])?;
            if current.as_deref() == Some(interface) {
                match expect {
                    Expect::Rx => rx = Some(value),
                    Expect::Tx => tx = Some(value),
                    Expect::Nothing => {}
                }
            }
            expect = Expect::Nothing;
        } else if let Some(caps) = IP_IFACE_LINE.captures(line) {
            current = Some(caps[1].to_string());
        } else if IP_RX_LINE.is_match(line) {
            expect = Expect::Rx;
        } else if IP_TX_LINE.is_match(line) {
            expect = Expect::Tx;
        }

        if let (Some(rx), Some(tx)) = (rx, tx) {
            return Ok((rx, tx));
        }
    }

    Err(SamplerError::InterfaceNotFound(interface.to_string()))
}

#[derive(Default)]
pub struct IpCommandSampler {
    runner: ProgramRunner,
}

impl Sampler for IpCommandSampler {
    fn name(&self) -> &'static str {
        "IpCommandSampler"
    }

    fn get_sample(&self, interface: &str) -> Result<Sample, SamplerError> {
        let lines = self
            .runner
            .run("ip", &["-statistics", "link", "show", "dev", interface])?;
        let (rx, tx) = parse_ip_link_stats(&lines, interface)?;
        Ok(Sample::now(rx, tx))
    }
}

/// Parses BSD style `netstat -ibn` output. Columns are located through the
/// header; values are indexed from the right since the Address column is
/// blank on some rows.
pub fn parse_netstat(lines: &[String], interface: &str) -> Result<(u64, u64), SamplerError> {
    let header: Vec<&str> = lines
        .iter()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&"Name"))
        .ok_or_else(|| SamplerError::Parse {
            what: "netstat header",
            detail: "no line starting with Name".to_string(),
        })?;

    let column_from_right = |name: &str| {
        header
            .iter()
            .position(|&col| col == name)
            .map(|idx| header.len() - idx)
            .ok_or_else(|| SamplerError::Parse {
                what: "netstat header",
                detail: format!("no {} column", name),
            })
    };
    let ibytes = column_from_right("Ibytes")?;
    let obytes = column_from_right("Obytes")?;

    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&interface) || fields.len() < ibytes.max(obytes) {
            continue;
        }

        let rx = parse_counter("netstat Ibytes", fields[fields.len() - ibytes])?;
        let tx = parse_counter("netstat Obytes", fields[fields.len() - obytes])?;
        return Ok((rx, tx));
    }

    Err(SamplerError::InterfaceNotFound(interface.to_string()))
}

#[derive(Default)]
pub struct NetstatCommandSampler {
    runner: ProgramRunner,
}

impl Sampler for NetstatCommandSampler {
    fn name(&self) -> &'static str {
        "NetstatCommandSampler"
    }

    fn get_sample(&self, interface: &str) -> Result<Sample, SamplerError> {
        let lines = self.runner.run("netstat", &["-ibn"])?;
        let (rx, tx) = parse_netstat(&lines, interface)?;
        Ok(Sample::now(rx, tx))
    }
}

// ----------------------
// detection
// ----------------------

/// The first strategy that produced a sample, and that sample.
pub struct DetectionResult {
    pub sampler: Box<dyn Sampler>,
    pub sample: Sample,
}

pub struct SamplerDetector {
    samplers: Vec<Box<dyn Sampler>>,
}

impl SamplerDetector {
    pub fn with_samplers(samplers: Vec<Box<dyn Sampler>>) -> Self {
        Self { samplers }
    }

    /// Tries each strategy in order. A strategy can fail because the system
    /// lacks it or because the interface does not exist, and the two cannot
    /// be told apart, so every error is reported.
    pub fn detect(self, interface: &str) -> Result<DetectionResult, SamplerError> {
        let mut errors = Vec::new();

        for sampler in self.samplers {
            match sampler.get_sample(interface) {
                Ok(sample) => {
                    tracing::info!(sampler = sampler.name(), interface, "Detected sampler");
                    return Ok(DetectionResult { sampler, sample });
                }
                Err(e) => {
                    tracing::debug!(sampler = sampler.name(), "Sampler unavailable: {}", e);
                    errors.push(format!("{}: {}", sampler.name(), e));
                }
            }
        }

        Err(SamplerError::NoSamplerFound {
            interface: interface.to_string(),
            errors,
            available: available_interfaces(),
        })
    }
}

impl Default for SamplerDetector {
    fn default() -> Self {
        Self::with_samplers(vec![
            Box::new(SysFsSampler::new()),
            Box::new(ProcFsSampler::new()),
            Box::new(IpCommandSampler::default()),
            Box::new(NetstatCommandSampler::default()),
        ])
    }
}

/// Names of the interfaces present on this machine.
pub fn available_interfaces() -> Vec<String> {
    datalink::interfaces()
        .into_iter()
        .map(|iface| iface.name)
        .collect()
}
