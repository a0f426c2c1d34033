use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::{DateTime, Months, Utc};
use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub data_path: PathBuf,
    pub options_path: PathBuf,

    // Reactor
    pub reactors: usize,                // One acceptor/connection pair per slot
    pub max_events: usize,              // Events drained per wait
    pub max_request_bytes: usize,       // Hard cap on one accumulated request
    pub read_chunk_bytes: usize,        // Bytes pulled per read(2)
    pub connection_timeout: Duration,   // Deadline from accept to close
    pub poll_tick: Duration,            // Wait timeout for sweeps and shutdown

    // Bulk load
    pub loader_workers: usize,
    pub loader_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 80)),
            data_path: PathBuf::from("/tmp/data/data.zip"),
            options_path: PathBuf::from("/tmp/data/options.txt"),

            reactors: num_cpus::get(),
            max_events: 1024,
            max_request_bytes: 16 * 1024,               // 16KB per request
            read_chunk_bytes: 1024,
            connection_timeout: Duration::from_secs(5),
            poll_tick: Duration::from_millis(100),

            loader_workers: 4,
            loader_queue: 4,
        }
    }
}

/// Fixed point in time that relative age filters are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTime {
    pub timestamp: i64,
}

impl ReferenceTime {
    pub fn new(timestamp: i64) -> Self {
        ReferenceTime { timestamp }
    }

    /// Read the reference timestamp from the first line of an options file.
    /// Any further lines (the run-mode flag) are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error {
            kind: ErrorKind::Io,
            context: format!("Cannot read options file {}: {}", path.display(), e),
        })?;

        let first = contents.lines().next().unwrap_or("").trim();
        let timestamp = first.parse::<i64>().map_err(|_| Error {
            kind: ErrorKind::Parse,
            context: format!("Options file {} does not start with an epoch timestamp: {:?}", path.display(), first),
        })?;

        Ok(ReferenceTime { timestamp })
    }

    /// Epoch seconds exactly `years` calendar years before the reference point.
    /// Falls back to a 365.25-day year when the date leaves chrono's range.
    pub fn years_before(&self, years: i64) -> i64 {
        let calendar = DateTime::<Utc>::from_timestamp(self.timestamp, 0).and_then(|at| {
            let months = u32::try_from(years.unsigned_abs().checked_mul(12)?).ok()?;
            // chrono clamps Feb 29 to Feb 28 where a day-overflowing calendar would give Mar 1
            if years >= 0 {
                at.checked_sub_months(Months::new(months))
            } else {
                at.checked_add_months(Months::new(months))
            }
        });

        match calendar {
            Some(at) => at.timestamp(),
            None => self.timestamp.saturating_sub(years.saturating_mul(31_557_600)),
        }
    }
}
