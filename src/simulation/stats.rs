//! Request statistics for the status endpoint.
//!
//! Bounded buffers only: the last 100 response times and the last 10
//! one-second request counts.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const RESPONSE_TIME_WINDOW: usize = 100;
const RPS_WINDOW: usize = 10;

/// Aggregated metrics as reported by `status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    /// Percent, two decimals.
    pub success_rate: f64,
    /// Observed-healthy backends.
    pub active_servers: usize,
    /// Milliseconds, two decimals.
    pub avg_response_time: f64,
    pub requests_per_second: f64,
}

#[derive(Debug)]
struct Counters {
    total: u64,
    successful: u64,
    response_times: VecDeque<Duration>,
    per_second: VecDeque<u64>,
    window_start: Instant,
    current_second: u64,
}

impl Counters {
    fn new(now: Instant) -> Self {
        Self {
            total: 0,
            successful: 0,
            response_times: VecDeque::with_capacity(RESPONSE_TIME_WINDOW),
            per_second: VecDeque::with_capacity(RPS_WINDOW),
            window_start: now,
            current_second: 0,
        }
    }
}

#[derive(Debug)]
pub struct RequestStats {
    counters: Mutex<Counters>,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::new(Instant::now())),
        }
    }

    pub fn reset(&self) {
        *self.lock() = Counters::new(Instant::now());
    }

    /// Record one submitted request. Failures carry no response time.
    pub fn record(&self, response_time: Option<Duration>) {
        self.record_at(Instant::now(), response_time);
    }

    fn record_at(&self, now: Instant, response_time: Option<Duration>) {
        let mut c = self.lock();
        c.total += 1;
        if let Some(elapsed) = response_time {
            c.successful += 1;
            if c.response_times.len() == RESPONSE_TIME_WINDOW {
                c.response_times.pop_front();
            }
            c.response_times.push_back(elapsed);
        }

        // Close the current one-second window once it has run its course.
        if now.duration_since(c.window_start) >= Duration::from_secs(1) {
            if c.per_second.len() == RPS_WINDOW {
                c.per_second.pop_front();
            }
            let finished = c.current_second;
            c.per_second.push_back(finished);
            c.current_second = 0;
            c.window_start = now;
        }
        c.current_second += 1;
    }

    pub fn snapshot(&self, active_servers: usize) -> MetricsSnapshot {
        let c = self.lock();

        let success_rate = if c.total > 0 {
            c.successful as f64 / c.total as f64 * 100.0
        } else {
            0.0
        };
        let avg_response_time = if c.response_times.is_empty() {
            0.0
        } else {
            let sum: Duration = c.response_times.iter().sum();
            sum.as_secs_f64() / c.response_times.len() as f64 * 1000.0
        };
        let requests_per_second = if c.per_second.is_empty() {
            c.current_second as f64
        } else {
            c.per_second.iter().sum::<u64>() as f64 / c.per_second.len() as f64
        };

        MetricsSnapshot {
            total_requests: c.total,
            success_rate: round2(success_rate),
            active_servers,
            avg_response_time: round2(avg_response_time),
            requests_per_second: round2(requests_per_second),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
