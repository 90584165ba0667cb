//! Benchmark runner module
//!
//! Short, single-shot synthetic benchmarks: a fixed-count integer mix on one
//! core, a fixed-size memory fill and a fixed-size temp file round trip.
//! They are illustrative only; there is no warm-up and no repetition.
//!
//! A failing benchmark never propagates: it logs a warning and reports a zeroed
//! result.

use std::collections::TryReserveError;
use std::fmt;
use std::fs::File;
use std::hint::black_box;
use std::io::{Read, Seek, SeekFrom, Write};
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hardware::{CategoryFields, FieldValue};

pub const DEFAULT_CPU_ITERATIONS: u64 = 50_000_000;
pub const DEFAULT_MEMORY_BYTES: u64 = 64 * 1024 * 1024;
pub const DEFAULT_DISK_BYTES: u64 = 16 * 1024 * 1024;

const DISK_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkKind {
    Cpu,
    Memory,
    Disk,
}

impl BenchmarkKind {
    pub const ALL: [BenchmarkKind; 3] = [BenchmarkKind::Cpu, BenchmarkKind::Memory, BenchmarkKind::Disk];

    pub fn label(self) -> &'static str {
        match self {
            BenchmarkKind::Cpu => "CPU",
            BenchmarkKind::Memory => "Memory",
            BenchmarkKind::Disk => "Disk",
        }
    }

    /// Unit of the derived throughput metric.
    pub fn metric_unit(self) -> &'static str {
        match self {
            BenchmarkKind::Cpu => "ops/s",
            BenchmarkKind::Memory | BenchmarkKind::Disk => "bytes/s",
        }
    }

    fn field_names(self) -> (&'static str, &'static str) {
        match self {
            BenchmarkKind::Cpu => ("cpu_elapsed_seconds", "cpu_ops_per_second"),
            BenchmarkKind::Memory => ("memory_elapsed_seconds", "memory_bytes_per_second"),
            BenchmarkKind::Disk => ("disk_elapsed_seconds", "disk_bytes_per_second"),
        }
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BenchmarkKind {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(BenchmarkKind::Cpu),
            "memory" | "mem" | "ram" => Ok(BenchmarkKind::Memory),
            "disk" => Ok(BenchmarkKind::Disk),
            other => Err(BenchmarkError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("unknown benchmark `{0}` (expected cpu, memory or disk)")]
    UnknownKind(String),

    #[error("cannot allocate {bytes} bytes")]
    Allocation {
        bytes: u64,
        #[source]
        source: TryReserveError,
    },

    #[error("{bytes} bytes does not fit in this platform's address space")]
    TooLarge { bytes: u64 },

    #[error("disk benchmark I/O failed while {action}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl BenchmarkError {
    fn io(action: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| BenchmarkError::Io { action, source }
    }
}

/// Outcome of one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Wall-clock time from a monotonic clock, always >= 0.
    pub elapsed_seconds: f64,
    /// Operations or bytes per second, always >= 0.
    pub metric: f64,
}

impl BenchmarkResult {
    fn measured(elapsed_seconds: f64, work: u64) -> Self {
        let metric = if elapsed_seconds > 0.0 {
            work as f64 / elapsed_seconds
        } else {
            0.0
        };
        Self {
            elapsed_seconds,
            metric,
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.elapsed_seconds == 0.0 && self.metric == 0.0
    }
}

/// Work sizes for each benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkSettings {
    pub cpu_iterations: u64,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            cpu_iterations: DEFAULT_CPU_ITERATIONS,
            memory_bytes: DEFAULT_MEMORY_BYTES,
            disk_bytes: DEFAULT_DISK_BYTES,
        }
    }
}

impl BenchmarkSettings {
    /// Run one benchmark with these sizes.
    pub fn run(&self, kind: BenchmarkKind) -> BenchmarkResult {
        tracing::info!(benchmark = %kind, "Running benchmark");
        let result = match kind {
            BenchmarkKind::Cpu => run_cpu_benchmark(self.cpu_iterations),
            BenchmarkKind::Memory => run_memory_benchmark(self.memory_bytes),
            BenchmarkKind::Disk => run_disk_benchmark(self.disk_bytes),
        };
        tracing::info!(
            benchmark = %kind,
            elapsed_seconds = result.elapsed_seconds,
            metric = result.metric,
            unit = kind.metric_unit(),
            "Benchmark finished"
        );
        result
    }
}

/// Latest result of each benchmark kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub cpu: Option<BenchmarkResult>,
    pub memory: Option<BenchmarkResult>,
    pub disk: Option<BenchmarkResult>,
}

impl BenchmarkResults {
    pub fn get(&self, kind: BenchmarkKind) -> Option<BenchmarkResult> {
        match kind {
            BenchmarkKind::Cpu => self.cpu,
            BenchmarkKind::Memory => self.memory,
            BenchmarkKind::Disk => self.disk,
        }
    }

    /// Store a result, replacing the previous run of the same kind.
    pub fn record(&mut self, kind: BenchmarkKind, result: BenchmarkResult) {
        let slot = match kind {
            BenchmarkKind::Cpu => &mut self.cpu,
            BenchmarkKind::Memory => &mut self.memory,
            BenchmarkKind::Disk => &mut self.disk,
        };
        *slot = Some(result);
    }

    /// Fields of the Benchmark category; kinds never run are placeholders.
    pub fn to_fields(&self) -> CategoryFields {
        BenchmarkKind::ALL
            .into_iter()
            .flat_map(|kind| {
                let (elapsed_name, metric_name) = kind.field_names();
                let (elapsed, metric) = match self.get(kind) {
                    Some(result) => (
                        FieldValue::from(round4(result.elapsed_seconds)),
                        FieldValue::from(result.metric.round()),
                    ),
                    None => (FieldValue::Unavailable, FieldValue::Unavailable),
                };
                [(elapsed_name, elapsed), (metric_name, metric)]
            })
            .collect()
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Fixed-count integer mix on the calling thread.
pub fn run_cpu_benchmark(iterations: u64) -> BenchmarkResult {
    let start = Instant::now();
    let mut x: u64 = 0x1234_5678_9abc_def0;

    for _ in 0..iterations {
        // Mixed integer ops + branches.
        x ^= x >> 12;
        x = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        x ^= x << 25;
        x = x.rotate_left(17);
        if x & 1 == 0 {
            x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
        } else {
            x = x.wrapping_sub(0x517c_c1b7_2722_0a95);
        }
        x = black_box(x);
    }

    BenchmarkResult::measured(start.elapsed().as_secs_f64(), iterations)
}

/// Allocate `size_bytes` and fill it with a deterministic pattern.
pub fn run_memory_benchmark(size_bytes: u64) -> BenchmarkResult {
    recover(BenchmarkKind::Memory, try_memory_benchmark(size_bytes))
}

/// Write, sync and read back a `size_bytes` temporary file.
pub fn run_disk_benchmark(size_bytes: u64) -> BenchmarkResult {
    recover(BenchmarkKind::Disk, try_disk_benchmark(size_bytes))
}

fn recover(kind: BenchmarkKind, outcome: Result<BenchmarkResult, BenchmarkError>) -> BenchmarkResult {
    outcome.unwrap_or_else(|e| {
        tracing::warn!(
            benchmark = %kind,
            error = %e,
            cause = ?std::error::Error::source(&e),
            "Benchmark failed, reporting a zeroed result"
        );
        BenchmarkResult::default()
    })
}

fn try_memory_benchmark(size_bytes: u64) -> Result<BenchmarkResult, BenchmarkError> {
    let size = usize::try_from(size_bytes).map_err(|_| BenchmarkError::TooLarge { bytes: size_bytes })?;

    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|source| BenchmarkError::Allocation {
            bytes: size_bytes,
            source,
        })?;

    let start = Instant::now();
    buf.extend((0..size).map(|i| (i as u8).wrapping_mul(31).wrapping_add(7)));
    let checksum = buf
        .iter()
        .step_by(4096)
        .fold(0u64, |acc, b| acc.wrapping_add(u64::from(*b)));
    let elapsed = start.elapsed().as_secs_f64();
    black_box(checksum);

    Ok(BenchmarkResult::measured(elapsed, size_bytes))
}

fn try_disk_benchmark(size_bytes: u64) -> Result<BenchmarkResult, BenchmarkError> {
    // Removed on drop, including on the error paths.
    let mut file: File = tempfile::tempfile().map_err(BenchmarkError::io("creating the temp file"))?;
    let chunk = vec![0xa5u8; DISK_CHUNK_BYTES];

    let start = Instant::now();
    let mut written: u64 = 0;
    while written < size_bytes {
        let to_write = (size_bytes - written).min(chunk.len() as u64) as usize;
        file.write_all(&chunk[..to_write])
            .map_err(BenchmarkError::io("writing"))?;
        written += to_write as u64;
    }
    file.sync_all().map_err(BenchmarkError::io("syncing"))?;

    file.seek(SeekFrom::Start(0))
        .map_err(BenchmarkError::io("rewinding"))?;
    let mut buf = vec![0u8; DISK_CHUNK_BYTES];
    let mut read_total: u64 = 0;
    loop {
        let n = file.read(&mut buf).map_err(BenchmarkError::io("reading"))?;
        if n == 0 {
            break;
        }
        read_total += n as u64;
    }
    let elapsed = start.elapsed().as_secs_f64();
    black_box(&buf);

    Ok(BenchmarkResult::measured(elapsed, written + read_total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_benchmark_reports_nonnegative_time() {
        use std::time::Instant;

        for iterations in [1_000, 1_000_000] {
            let before = Instant::now();
            let result = run_cpu_benchmark(iterations);
            let after = Instant::now();

            // The monotonic clock never runs backwards across a run.
            assert!(after >= before);
            assert!(result.elapsed_seconds >= 0.0);
            assert!(result.elapsed_seconds.is_finite());
            assert!(result.elapsed_seconds <= (after - before).as_secs_f64());
            assert!(result.metric >= 0.0);
        }
    }

    #[test]
    fn empty_cpu_run_has_zero_rate() {
        let result = run_cpu_benchmark(0);
        assert!(result.elapsed_seconds >= 0.0);
        assert!(result.metric >= 0.0);
    }

    #[test]
    fn impossible_allocation_returns_zeroed_result() {
        let result = run_memory_benchmark(u64::MAX);
        assert!(result.is_zeroed());
        assert!(matches!(
            try_memory_benchmark(u64::MAX),
            Err(BenchmarkError::Allocation { .. } | BenchmarkError::TooLarge { .. })
        ));
    }

    #[test]
    fn memory_benchmark_measures_throughput() {
        let result = run_memory_benchmark(1024 * 1024);
        assert!(result.elapsed_seconds >= 0.0);
        assert!(result.metric >= 0.0);
    }

    #[test]
    fn disk_benchmark_round_trips_a_temp_file() {
        let result = try_disk_benchmark(3 * 1024 * 1024 + 17).unwrap();
        assert!(result.elapsed_seconds >= 0.0);
        assert!(result.metric >= 0.0);
    }

    #[test]
    fn results_map_onto_benchmark_fields() {
        let mut results = BenchmarkResults::default();
        assert_eq!(results.get(BenchmarkKind::Cpu), None);
        results.record(
            BenchmarkKind::Cpu,
            BenchmarkResult {
                elapsed_seconds: 0.25,
                metric: 200_000_000.4,
            },
        );

        let fields = results.to_fields();
        assert_eq!(
            fields.names().collect::<Vec<_>>(),
            crate::hardware::Category::Benchmark.fields()
        );
        assert_eq!(fields.get("cpu_elapsed_seconds"), Some(&FieldValue::Float(0.25)));
        assert_eq!(
            fields.get("cpu_ops_per_second"),
            Some(&FieldValue::Float(200_000_000.0))
        );
        assert_eq!(fields.get("disk_bytes_per_second"), Some(&FieldValue::Unavailable));
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("CPU".parse::<BenchmarkKind>().unwrap(), BenchmarkKind::Cpu);
        assert_eq!("ram".parse::<BenchmarkKind>().unwrap(), BenchmarkKind::Memory);
        assert!("gpu".parse::<BenchmarkKind>().is_err());
    }
}
