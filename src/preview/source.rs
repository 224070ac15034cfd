use std::time::{Duration, Instant};

use crate::effects::error::Result;
use crate::effects::frame::{Frame, PixelFormat};
use crate::settings::types::SourceConfig;

/// Producer side of a stream: whatever hands raw frames to the pipeline
/// (a camera, a peer connection, a recording).
///
/// `next_frame` blocks until a frame is available and returns `None` once
/// the stream has ended.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    fn next_frame(&mut self) -> Option<Frame>;
}

/// A synthetic camera for running without real hardware.
///
/// Emits a moving BGR gradient at a fixed rate. With `fps <= 0` frames are
/// produced as fast as they are requested.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    interval: Option<Duration>,
    limit: Option<u64>,
    produced: u64,
    started: Instant,
    next_due: Option<Instant>,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, fps: f32) -> Self {
        let interval = (fps > 0.0).then(|| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            width,
            height,
            interval,
            limit: None,
            produced: 0,
            started: Instant::now(),
            next_due: None,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.width, config.height, config.fps)
    }

    /// Stop after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Number of frames handed out so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Render pattern frame `index`. The gradient scrolls one pixel per frame.
    pub fn render(width: u32, height: u32, index: u64) -> Result<Frame> {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let sx = ((u64::from(x) + index) % u64::from(width)) as u32;
                let b = (sx * 255 / width) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let r = ((sx ^ y) & 0xFF) as u8;
                data.extend_from_slice(&[b, g, r]);
            }
        }
        Frame::new(data, width, height, PixelFormat::Bgr24)
    }
}

impl FrameSource for TestPatternSource {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return None;
        }

        if let Some(interval) = self.interval {
            let now = Instant::now();
            let due = self.next_due.unwrap_or(now);
            if due > now {
                std::thread::sleep(due - now);
            }
            self.next_due = Some(due + interval);
        }

        let timestamp_us = self.started.elapsed().as_micros() as u64;
        let frame = match Self::render(self.width, self.height, self.produced) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("test pattern render failed: {e}");
                return None;
            }
        };
        self.produced += 1;
        Some(frame.with_timestamp(timestamp_us))
    }
}
