use serde::{Deserialize, Serialize};

use crate::effects::types::EffectKind;

/// Dimensions and rate of the synthetic test-pattern source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30.0,
        }
    }
}

/// Tunables for a streaming session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Processed frames kept in the output ring buffer.
    pub buffer_capacity: usize,
    /// JPEG quality (1-100) for full-size previews.
    pub jpeg_quality: u8,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// How long the watchdog waits for the delivery thread to start.
    pub startup_timeout_ms: u64,
    /// How long the watchdog waits for the first processed frame.
    pub frame_timeout_ms: u64,
    pub watchdog_poll_ms: u64,
    pub source: SourceConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 3,
            jpeg_quality: 85,
            thumbnail_width: 160,
            thumbnail_height: 120,
            startup_timeout_ms: 30_000,
            frame_timeout_ms: 5_000,
            watchdog_poll_ms: 250,
            source: SourceConfig::default(),
        }
    }
}

/// Top-level settings file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettingsFile {
    /// Last effect chosen in the selector, if the user ever chose one.
    pub effect: Option<EffectKind>,
    pub session: SessionConfig,
}
