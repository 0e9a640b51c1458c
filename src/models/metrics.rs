//! Per-probe outcomes and run statistics

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};

/// Result of one probe iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// 1-based probe sequence number
    pub sequence: u32,

    /// Whether a matching reply (or datagram, for receivers) arrived in time
    pub received: bool,

    /// Round-trip time from write start to read completion
    pub elapsed: Duration,

    /// Number of bytes read back
    pub bytes: usize,

    /// Peer the reply came from
    pub peer: Option<SocketAddr>,

    /// Why the probe was lost
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    /// A probe whose reply matched the transmitted payload
    pub fn received(sequence: u32, elapsed: Duration, bytes: usize, peer: Option<SocketAddr>) -> Self {
        Self {
            sequence,
            received: true,
            elapsed,
            bytes,
            peer,
            error_message: None,
        }
    }

    /// A probe that timed out, errored or came back garbled
    pub fn lost<S: Into<String>>(sequence: u32, elapsed: Duration, reason: S) -> Self {
        Self {
            sequence,
            received: false,
            elapsed,
            bytes: 0,
            peer: None,
            error_message: Some(reason.into()),
        }
    }

    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Aggregate over all probes of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Probes attempted
    pub transmitted: u32,

    /// Probes with a matching reply
    pub received: u32,

    /// Probes lost to timeout, error or mismatch
    pub lost: u32,

    /// Sum of the elapsed time of received probes only
    pub total_time: Duration,

    /// When the first probe was recorded
    pub started_at: Option<DateTime<Utc>>,
}

impl RunStatistics {
    /// Empty statistics at run start
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one probe outcome into the aggregate
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.transmitted += 1;
        if outcome.received {
            self.received += 1;
            self.total_time += outcome.elapsed;
        } else {
            self.lost += 1;
        }
    }

    /// Count probes that were never attempted (e.g. after a receiver timed out) as lost
    pub fn record_unattempted(&mut self, count: u32) {
        self.transmitted += count;
        self.lost += count;
    }

    /// Loss percentage: 0 whenever nothing was lost, otherwise floor(lost / transmitted * 100)
    pub fn loss_percentage(&self) -> u32 {
        if self.lost == 0 || self.transmitted == 0 {
            return 0;
        }
        (u64::from(self.lost) * 100 / u64::from(self.transmitted)) as u32
    }

    /// Total time of received probes in whole milliseconds
    pub fn total_time_ms(&self) -> u128 {
        self.total_time.as_millis()
    }

    /// Average round-trip time of received probes
    pub fn average_time(&self) -> Option<Duration> {
        if self.received == 0 {
            None
        } else {
            Some(self.total_time / self.received)
        }
    }

    /// Whether every attempted probe came back
    pub fn is_lossless(&self) -> bool {
        self.transmitted > 0 && self.lost == 0
    }
}

/// Measures one probe from write start to read completion
#[derive(Debug)]
pub struct ProbeTimer {
    start_time: Instant,
}

impl ProbeTimer {
    /// Start timing now
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Time since the probe started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
