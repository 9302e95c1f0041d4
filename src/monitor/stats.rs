//! Counting monitor backed by `tracing`

use super::{CrawlMetrics, Monitor};
use crate::CrawlError;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Point-in-time copy of the monitor counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorSnapshot {
    /// Pages fetched successfully
    pub pages_fetched: u64,

    /// Total response body bytes
    pub bytes_fetched: u64,

    /// Total links extracted
    pub links_found: u64,

    /// Total errors reported
    pub errors: u64,

    /// Errors grouped by `CrawlError::kind`
    pub errors_by_kind: BTreeMap<String, u64>,

    /// Sum of fetch durations
    pub total_fetch_time: Duration,
}

impl MonitorSnapshot {
    /// Mean fetch duration, zero when nothing was fetched
    pub fn average_fetch_time(&self) -> Duration {
        match u32::try_from(self.pages_fetched) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(pages) => self.total_fetch_time / pages,
        }
    }
}

/// Monitor that logs every report and keeps running totals
#[derive(Debug, Default)]
pub struct TracingMonitor {
    counters: Mutex<MonitorSnapshot>,
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the counters so far
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Monitor for TracingMonitor {
    fn record_metrics(&self, metrics: &CrawlMetrics) {
        tracing::debug!(
            "Fetched {} ({} bytes, {} links) in {:?}",
            metrics.url,
            metrics.bytes,
            metrics.links,
            metrics.duration
        );

        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.pages_fetched += 1;
        counters.bytes_fetched += metrics.bytes as u64;
        counters.links_found += metrics.links as u64;
        counters.total_fetch_time += metrics.duration;
    }

    fn handle_error(&self, error: &CrawlError, context: &str) {
        tracing::warn!("{}: {}", context, error);

        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.errors += 1;
        *counters
            .errors_by_kind
            .entry(error.kind().to_string())
            .or_insert(0) += 1;
    }
}

/// Prints a snapshot to stdout in a formatted manner
pub fn print_snapshot(snapshot: &MonitorSnapshot) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages fetched: {}", snapshot.pages_fetched);
    println!("  Bytes fetched: {}", snapshot.bytes_fetched);
    println!("  Links found: {}", snapshot.links_found);
    println!("  Average fetch time: {:?}", snapshot.average_fetch_time());
    println!();

    if !snapshot.errors_by_kind.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = snapshot.errors_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let attempted = snapshot.pages_fetched + snapshot.errors;
    let success_rate = if attempted > 0 {
        (snapshot.pages_fetched as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} reports)",
        success_rate, snapshot.pages_fetched, attempted
    );
}
