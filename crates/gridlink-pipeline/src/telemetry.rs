use std::time::Duration;

use serde::Serialize;

use crate::encoder::EncodedFrame;

/// Running per-frame statistics.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    frames: u64,
    total_latency: Duration,
    total_raw: u64,
    total_wire: u64,
    max_wire: usize,
    total_rle: u64,
    max_rle: usize,
    overflows: u64,
    entropy_coded: u64,
}

/// Summary of the frames recorded since the last reset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub frames: u64,
    pub avg_latency_ms: f64,
    pub avg_raw_bytes: f64,
    pub avg_wire_bytes: f64,
    pub max_wire_bytes: usize,
    pub avg_rle_bytes: f64,
    pub max_rle_bytes: usize,
    pub overflow_count: u64,
    pub entropy_coded_count: u64,
    /// Percentage saved relative to one byte per cell.
    pub compression_ratio_pct: f64,
    /// Average wire size sent at the target frame rate.
    pub bandwidth_kbps: f64,
    pub within_ceiling: bool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, frame: &EncodedFrame, latency: Duration) {
        self.frames += 1;
        self.total_latency += latency;
        self.total_raw += frame.raw_size as u64;
        self.total_wire += frame.wire_size() as u64;
        self.max_wire = self.max_wire.max(frame.wire_size());
        self.total_rle += frame.rle_bytes as u64;
        self.max_rle = self.max_rle.max(frame.rle_bytes);
        self.overflows += u64::from(frame.overflow);
        self.entropy_coded += u64::from(frame.entropy_coded);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn snapshot(&self, frames_per_second: f64, ceiling_kbps: f64) -> TelemetrySnapshot {
        let n = self.frames.max(1) as f64;
        let avg_raw = self.total_raw as f64 / n;
        let avg_wire = self.total_wire as f64 / n;
        let bandwidth_kbps = avg_wire * 8.0 * frames_per_second / 1000.0;
        let compression_ratio_pct = if avg_raw > 0.0 {
            (1.0 - avg_wire / avg_raw) * 100.0
        } else {
            0.0
        };

        TelemetrySnapshot {
            frames: self.frames,
            avg_latency_ms: self.total_latency.as_secs_f64() * 1000.0 / n,
            avg_raw_bytes: avg_raw,
            avg_wire_bytes: avg_wire,
            max_wire_bytes: self.max_wire,
            avg_rle_bytes: self.total_rle as f64 / n,
            max_rle_bytes: self.max_rle,
            overflow_count: self.overflows,
            entropy_coded_count: self.entropy_coded,
            compression_ratio_pct,
            bandwidth_kbps,
            within_ceiling: bandwidth_kbps <= ceiling_kbps,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl TelemetrySnapshot {
    /// The budget, when this window truncated a frame or filled the run
    /// region up to it.
    pub fn budget_exceeded(&self, rle_budget: Option<usize>) -> Option<usize> {
        rle_budget.filter(|&budget| self.overflow_count > 0 || self.max_rle_bytes >= budget)
    }

    /// Emit this snapshot as one structured log record.
    pub fn log(&self, rle_budget: Option<usize>) {
        tracing::info!(
            frames = self.frames,
            avg_latency_ms = self.avg_latency_ms,
            avg_wire_bytes = self.avg_wire_bytes,
            max_wire_bytes = self.max_wire_bytes,
            avg_rle_bytes = self.avg_rle_bytes,
            max_rle_bytes = self.max_rle_bytes,
            overflow_count = self.overflow_count,
            compression_ratio_pct = self.compression_ratio_pct,
            bandwidth_kbps = self.bandwidth_kbps,
            within_ceiling = self.within_ceiling,
            "pipeline telemetry"
        );
        if let Some(budget) = self.budget_exceeded(rle_budget) {
            tracing::warn!(
                max_rle_bytes = self.max_rle_bytes,
                budget,
                overflow_count = self.overflow_count,
                "run data reached packet budget"
            );
        }
        if !self.within_ceiling {
            tracing::warn!(
                bandwidth_kbps = self.bandwidth_kbps,
                "estimated bandwidth above ceiling"
            );
        }
    }
}
