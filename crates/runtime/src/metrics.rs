// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-stage and aggregate timing and
//! throughput for one forward pass.

use std::time::Duration;

use gemma_model::Stage;

/// Timing for one stage of the forward pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageMetrics {
    pub stage: Stage,
    pub duration: Duration,
}

/// Aggregate metrics for a complete forward pass.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InferenceMetrics {
    /// Total wall-clock time, including input validation.
    pub total_duration: Duration,
    /// Sum of all recorded stage durations.
    pub total_compute_duration: Duration,
    /// Per-stage timings, in execution order.
    pub stages: Vec<StageMetrics>,
    /// Number of token positions processed (`batch * seq_len`).
    pub tokens_processed: usize,
}

impl InferenceMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the time spent in one stage.
    pub fn record_stage(&mut self, stage: Stage, duration: Duration) {
        self.total_compute_duration += duration;
        self.stages.push(StageMetrics { stage, duration });
    }

    /// Finalises metrics with the total wall-clock time and token count.
    pub fn finalise(&mut self, total: Duration, tokens: usize) {
        self.total_duration = total;
        self.tokens_processed = tokens;
    }

    /// Returns tokens per second throughput.
    pub fn tokens_per_second(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 || self.tokens_processed == 0 {
            return 0.0;
        }
        self.tokens_processed as f64 / secs
    }

    /// Returns the stage that took longest, if any were recorded.
    pub fn slowest_stage(&self) -> Option<&StageMetrics> {
        self.stages.iter().max_by_key(|s| s.duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let slowest = self
            .slowest_stage()
            .map(|s| format!(", slowest {} ({:.2}ms)", s.stage, s.duration.as_secs_f64() * 1000.0))
            .unwrap_or_default();
        format!(
            "Inference: {:.2}ms total, {} stages, {:.2}ms compute, {} tokens ({:.1} tok/s){}",
            self.total_duration.as_secs_f64() * 1000.0,
            self.stages.len(),
            self.total_compute_duration.as_secs_f64() * 1000.0,
            self.tokens_processed,
            self.tokens_per_second(),
            slowest,
        )
    }
}
