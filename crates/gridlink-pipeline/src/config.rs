use std::path::Path;
use std::time::Duration;

use gridlink_codec::RunFormat;
use gridlink_packet::{PacketConfig, RLE_REGION_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Wire profile produced by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Exactly one 300-byte packet per frame, truncated on overflow.
    #[default]
    Fixed,
    /// Header plus entropy container, length varies per frame.
    Variable,
}

/// Quantization depth of incoming grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Levels {
    /// Two levels, carried as explicit 2-byte runs.
    #[default]
    Binary,
    /// Four levels, carried as packed 1-byte runs.
    Quad,
}

impl Levels {
    pub fn run_format(self) -> RunFormat {
        match self {
            Levels::Binary => RunFormat::Explicit,
            Levels::Quad => RunFormat::Packed,
        }
    }
}

/// Pipeline tuning. Every field has a default, so a partial JSON document
/// deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames the producer may get ahead of the consumer.
    pub queue_capacity: usize,
    /// Keep every Nth captured frame.
    pub frame_skip: u32,
    /// Per-frame time budget for consumer pacing.
    pub frame_budget_ms: u64,
    /// Longest the consumer waits for a frame before re-checking shutdown.
    pub pop_timeout_ms: u64,
    pub profile: Profile,
    pub levels: Levels,
    /// Run bytes allowed per fixed packet.
    pub rle_budget: usize,
    /// Telemetry pass/fail threshold.
    pub bandwidth_ceiling_kbps: f64,
    /// Emit telemetry every N encoded frames; 0 disables periodic records.
    pub telemetry_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 8,
            frame_skip: 1,
            frame_budget_ms: 33,
            pop_timeout_ms: 50,
            profile: Profile::Fixed,
            levels: Levels::Binary,
            rle_budget: RLE_REGION_SIZE,
            bandwidth_ceiling_kbps: 100.0,
            telemetry_every: 30,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.frame_skip == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame_skip must be at least 1".to_string(),
            ));
        }
        if self.rle_budget == 0 || self.rle_budget > RLE_REGION_SIZE {
            return Err(PipelineError::InvalidConfig(format!(
                "rle_budget must be between 1 and {RLE_REGION_SIZE}, got {}",
                self.rle_budget
            )));
        }
        if !self.bandwidth_ceiling_kbps.is_finite() || self.bandwidth_ceiling_kbps < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "bandwidth_ceiling_kbps must be a non-negative number, got {}",
                self.bandwidth_ceiling_kbps
            )));
        }
        Ok(())
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn run_format(&self) -> RunFormat {
        self.levels.run_format()
    }

    /// Target frame rate implied by the frame budget.
    pub fn frames_per_second(&self) -> f64 {
        1000.0 / self.frame_budget_ms.max(1) as f64
    }

    pub fn packet_config(&self) -> PacketConfig {
        PacketConfig {
            format: self.run_format(),
            rle_budget: self.rle_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_rates() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.frame_budget(), Duration::from_millis(33));
        assert_eq!(config.pop_timeout(), Duration::from_millis(50));
        assert_eq!(config.run_format(), RunFormat::Explicit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            PipelineConfig::from_json_str(r#"{"profile":"variable","levels":"quad","frame_skip":3}"#)
                .unwrap();
        assert_eq!(config.profile, Profile::Variable);
        assert_eq!(config.run_format(), RunFormat::Packed);
        assert_eq!(config.frame_skip, 3);
        assert_eq!(config.rle_budget, RLE_REGION_SIZE);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for json in [
            r#"{"queue_capacity":0}"#,
            r#"{"frame_skip":0}"#,
            r#"{"rle_budget":276}"#,
            r#"{"bandwidth_ceiling_kbps":-1.0}"#,
        ] {
            let err = PipelineConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidConfig(_)), "{json}");
        }
    }

    #[test]
    fn unknown_profile_is_json_error() {
        let err = PipelineConfig::from_json_str(r#"{"profile":"burst"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }

    #[test]
    fn frame_rate_from_budget() {
        let config = PipelineConfig {
            frame_budget_ms: 50,
            ..PipelineConfig::default()
        };
        assert!((config.frames_per_second() - 20.0).abs() < f64::EPSILON);
    }
}
