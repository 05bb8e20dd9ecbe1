use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Network-backed operations the orchestrator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Auth,
    Logout,
    Upload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetric {
    pub operation: Operation,
    pub start_time: u64, // milliseconds since epoch
    pub latency_ms: u64,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub bytes: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OperationStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub failure_rate: f64,

    // Latency statistics (milliseconds), successful calls only
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub latency_avg_ms: f64,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,
    pub latency_p99_ms: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub per_operation: HashMap<Operation, OperationStats>,
    pub bytes_uploaded: u64,

    // Failure reasons breakdown
    pub failure_reasons: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct SessionMetrics {
    session_name: String,
    start_time: Instant,
    operations: Vec<OperationMetric>,
}

impl SessionMetrics {
    pub fn new(session_name: String) -> Self {
        Self {
            session_name,
            start_time: Instant::now(),
            operations: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        operation: Operation,
        latency: Duration,
        success: bool,
        failure_reason: Option<String>,
        bytes: Option<u64>,
    ) {
        let start_time = chrono::Utc::now().timestamp_millis().max(0) as u64;

        self.operations.push(OperationMetric {
            operation,
            start_time,
            latency_ms: latency.as_millis() as u64,
            success,
            failure_reason,
            bytes,
        });
    }

    pub fn operations(&self) -> &[OperationMetric] {
        &self.operations
    }

    pub fn aggregate(&self) -> AggregatedStats {
        let mut stats = AggregatedStats::default();

        for operation in [Operation::Auth, Operation::Logout, Operation::Upload] {
            let records: Vec<&OperationMetric> = self
                .operations
                .iter()
                .filter(|r| r.operation == operation)
                .collect();
            if !records.is_empty() {
                stats
                    .per_operation
                    .insert(operation, operation_stats(&records));
            }
        }

        stats.bytes_uploaded = self
            .operations
            .iter()
            .filter(|r| r.operation == Operation::Upload && r.success)
            .filter_map(|r| r.bytes)
            .sum();

        for record in self.operations.iter().filter(|r| !r.success) {
            if let Some(reason) = &record.failure_reason {
                *stats.failure_reasons.entry(reason.clone()).or_insert(0) += 1;
            }
        }

        stats
    }

    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let stats = self.aggregate();

        let output = serde_json::json!({
            "session_name": self.session_name,
            "session_duration_secs": self.start_time.elapsed().as_secs(),
            "operations": self.operations,
            "aggregated_stats": stats,
        });

        let json_string = serde_json::to_string_pretty(&output)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;

        Ok(())
    }
}

fn operation_stats(records: &[&OperationMetric]) -> OperationStats {
    let mut stats = OperationStats {
        total: records.len(),
        successful: records.iter().filter(|r| r.success).count(),
        ..OperationStats::default()
    };
    stats.failed = stats.total - stats.successful;
    stats.failure_rate = (stats.failed as f64 / stats.total as f64) * 100.0;

    let mut latencies: Vec<u64> = records
        .iter()
        .filter(|r| r.success)
        .map(|r| r.latency_ms)
        .collect();
    latencies.sort_unstable();

    if let (Some(&min), Some(&max)) = (latencies.first(), latencies.last()) {
        stats.latency_min_ms = min;
        stats.latency_max_ms = max;
        stats.latency_avg_ms = latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;
        stats.latency_p50_ms = percentile(&latencies, 50.0);
        stats.latency_p95_ms = percentile(&latencies, 95.0);
        stats.latency_p99_ms = percentile(&latencies, 99.0);
    }

    stats
}

fn percentile(sorted_data: &[u64], percentile: f64) -> u64 {
    if sorted_data.is_empty() {
        return 0;
    }

    let index = (percentile / 100.0 * (sorted_data.len() - 1) as f64).round() as usize;
    sorted_data[index.min(sorted_data.len() - 1)]
}
