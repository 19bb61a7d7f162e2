//! Solution JSON codec, phase timing, and the peak-memory probe

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::io::error::{Result, fs_error, malformed_input};
use crate::io::instance::InstanceJson;
use crate::spatial::Direction;
use crate::spatial::direction::sequence_string;

/// Result record written next to each solved instance
#[derive(Debug, Clone, Serialize)]
pub struct SolutionData {
    /// The tilt sequence as a direction string; `null` when unsolved
    pub control_sequence: Option<String>,
    /// Length of the control sequence, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_sequence_length: Option<usize>,
    /// Wall-clock seconds spent solving
    pub time_needed: f64,
    /// Whether the run was cut off by the timeout
    pub timed_out: bool,
    /// Search nodes created by the planner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_nodes: Option<usize>,
    /// Peak resident set size in bytes, when the platform exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mem_usage: Option<u64>,
    /// The instance this result belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceJson>,
    /// Phase timing report, when profiling was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_profile: Option<String>,
}

impl SolutionData {
    /// Assemble a result record from a solver outcome
    pub fn new(sequence: Option<&[Direction]>, time_needed: f64) -> Self {
        Self {
            control_sequence: sequence.map(sequence_string),
            control_sequence_length: sequence.map(<[Direction]>::len),
            time_needed,
            timed_out: false,
            number_of_nodes: None,
            max_mem_usage: None,
            instance: None,
            runtime_profile: None,
        }
    }
}

/// Write a result record as pretty-printed JSON
///
/// # Errors
///
/// [`crate::SolverError::FileSystem`] when the file cannot be written.
pub fn write_solution(path: &Path, data: &SolutionData) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| fs_error(parent, "create directory", e))?;
        }
    }
    let text = serde_json::to_string_pretty(data).map_err(|e| malformed_input(path, &e))?;
    fs::write(path, text).map_err(|e| fs_error(path, "write", e))
}

/// Peak resident set size of this process in bytes
///
/// Reads `VmHWM` from `/proc/self/status`; `None` on platforms without
/// procfs.
pub fn peak_rss_bytes() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            let kilobytes: u64 = rest
                .trim()
                .trim_end_matches("kB")
                .trim()
                .parse()
                .ok()?;
            return Some(kilobytes * 1024);
        }
    }
    None
}

/// Coarse wall-clock profiler over named phases
///
/// Replaces per-function profiling: each phase of an experiment (read,
/// pre-computation, search, write) is timed once and reported as a table.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    spans: Vec<(String, Duration)>,
}

impl PhaseTimer {
    /// Create an empty timer
    pub const fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// Time a closure under the given label
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.spans.push((label.to_string(), start.elapsed()));
        result
    }

    /// Record an externally measured span
    pub fn record(&mut self, label: &str, elapsed: Duration) {
        self.spans.push((label.to_string(), elapsed));
    }

    /// Render the recorded spans as an aligned text table
    pub fn report(&self) -> String {
        let width = self
            .spans
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        self.spans
            .iter()
            .map(|(label, elapsed)| {
                format!("{label:width$}  {:10.6}s", elapsed.as_secs_f64())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_serialization_shape() {
        let mut data = SolutionData::new(Some(&[Direction::West, Direction::North]), 0.25);
        data.number_of_nodes = Some(12);
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"control_sequence\":\"WN\""));
        assert!(json.contains("\"control_sequence_length\":2"));
        assert!(json.contains("\"number_of_nodes\":12"));
        assert!(!json.contains("max_mem_usage"));

        let unsolved = SolutionData::new(None, 1.0);
        let json = serde_json::to_string(&unsolved).unwrap();
        assert!(json.contains("\"control_sequence\":null"));
        assert!(!json.contains("control_sequence_length"));
    }

    #[test]
    fn test_phase_timer_report_lists_labels() {
        let mut timer = PhaseTimer::new();
        let value = timer.time("search", || 21 * 2);
        assert_eq!(value, 42);
        timer.record("write", Duration::from_millis(5));
        let report = timer.report();
        assert!(report.contains("search"));
        assert!(report.contains("write"));
    }
}
