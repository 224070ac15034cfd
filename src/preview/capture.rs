use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::effects::frame::Frame;
use crate::effects::pipeline::EffectPipeline;
use crate::preview::source::FrameSource;
use crate::settings::types::SessionConfig;

/// Callback type for reporting stream errors to the host.
/// Arguments: (session_name, error_message).
pub type ErrorCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Thread-safe ring buffer for processed frames.
///
/// Stores up to `capacity` frames, overwriting the oldest when full.
/// Frames are wrapped in `Arc` so consumers get a cheap reference-counted
/// pointer instead of cloning multi-megabyte pixel buffers.
pub struct FrameBuffer {
    frames: Mutex<Vec<Option<Arc<Frame>>>>,
    capacity: usize,
    write_idx: Mutex<usize>,
    /// Monotonic counter incremented on each push, independent of frame
    /// timestamps.
    sequence: AtomicU64,
}

impl FrameBuffer {
    /// Create a new ring buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let frames = (0..capacity).map(|_| None).collect();
        Self {
            frames: Mutex::new(frames),
            capacity,
            write_idx: Mutex::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Push a new frame into the buffer, overwriting the oldest if full.
    pub fn push(&self, frame: Frame) {
        self.sequence.fetch_add(1, Ordering::Relaxed);
        if self.capacity == 0 {
            return;
        }
        let mut frames = self.frames.lock();
        let mut idx = self.write_idx.lock();
        frames[*idx] = Some(Arc::new(frame));
        *idx = (*idx + 1) % self.capacity;
    }

    /// Return the monotonic sequence number. Increases by 1 for each
    /// pushed frame.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Get the most recently pushed frame, if any.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        if self.capacity == 0 {
            return None;
        }
        let frames = self.frames.lock();
        let idx = self.write_idx.lock();
        let latest_idx = if *idx == 0 {
            self.capacity - 1
        } else {
            *idx - 1
        };
        frames[latest_idx].clone()
    }

    /// All buffered frames, oldest first.
    pub fn recent(&self) -> Vec<Arc<Frame>> {
        let frames = self.frames.lock();
        let idx = *self.write_idx.lock();
        (0..self.capacity)
            .filter_map(|i| frames[(idx + i) % self.capacity].clone())
            .collect()
    }
}

/// Configuration for the frame watchdog timer.
struct WatchdogConfig {
    /// Maximum time to wait for the delivery thread to set `running = true`.
    startup_timeout: Duration,
    /// Time to wait for the first processed frame once running.
    frame_timeout: Duration,
    /// Poll interval for the watchdog thread.
    poll_interval: Duration,
}

impl From<&SessionConfig> for WatchdogConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            startup_timeout: Duration::from_millis(config.startup_timeout_ms),
            frame_timeout: Duration::from_millis(config.frame_timeout_ms),
            poll_interval: Duration::from_millis(config.watchdog_poll_ms.max(1)),
        }
    }
}

/// Shared state handed to the delivery thread.
struct Delivery {
    name: String,
    pipeline: Arc<EffectPipeline>,
    buffer: Arc<FrameBuffer>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<DiagnosticStats>>,
    on_error: Option<ErrorCallback>,
}

impl Delivery {
    /// Pull frames until the source ends or the session is stopped, running
    /// each through the pipeline in arrival order.
    fn run(self, mut source: Box<dyn FrameSource>) {
        info!("stream {} starting from {}", self.name, source.name());
        self.running.store(true, Ordering::Release);

        while !self.shutdown.load(Ordering::Acquire) && self.running.load(Ordering::Acquire) {
            let Some(frame) = source.next_frame() else {
                info!("stream {}: source ended", self.name);
                break;
            };

            // One snapshot per frame; a concurrent change applies to the next one.
            let effect = self.pipeline.effect();
            let started = Instant::now();
            match self.pipeline.process_frame_with(&frame, effect) {
                Ok(processed) => {
                    {
                        let mut stats = self.stats.lock();
                        stats.record_frame(processed.data().len(), started.elapsed());
                        stats.record_effect(effect);
                    }
                    self.buffer.push(processed);
                }
                Err(e) => {
                    warn!("stream {}: dropping frame: {e}", self.name);
                    self.stats.lock().record_drop();
                    if let Some(cb) = &self.on_error {
                        cb(&self.name, &e.to_string());
                    }
                }
            }
        }

        self.running.store(false, Ordering::Release);
        info!("stream {} exiting", self.name);
    }
}

/// Active streaming session: one source, one pipeline, one output buffer.
pub struct StreamSession {
    name: String,
    pipeline: Arc<EffectPipeline>,
    buffer: Arc<FrameBuffer>,
    running: Arc<AtomicBool>,
    /// Signals both threads to exit during teardown.
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
    stats: Arc<Mutex<DiagnosticStats>>,
}

impl StreamSession {
    /// Start delivering frames from `source` through `pipeline`.
    ///
    /// Spawns a delivery thread that processes frames one at a time, in
    /// order, and a watchdog that reports a source producing no frames.
    /// If `on_error` is provided it is called with `(name, message)` for
    /// dropped frames and stream failures.
    pub fn start(
        name: impl Into<String>,
        source: Box<dyn FrameSource>,
        pipeline: Arc<EffectPipeline>,
        config: &SessionConfig,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        let name = name.into();
        let buffer = Arc::new(FrameBuffer::new(config.buffer_capacity));
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(DiagnosticStats::new()));

        let delivery = Delivery {
            name: name.clone(),
            pipeline: Arc::clone(&pipeline),
            buffer: Arc::clone(&buffer),
            running: Arc::clone(&running),
            shutdown: Arc::clone(&shutdown),
            stats: Arc::clone(&stats),
            on_error: on_error.clone(),
        };

        let thread = match std::thread::Builder::new()
            .name(format!("stream-{name}"))
            .spawn(move || delivery.run(source))
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("failed to spawn delivery thread for {name}: {e}");
                if let Some(cb) = &on_error {
                    cb(&name, &format!("failed to start stream: {e}"));
                }
                None
            }
        };

        let watchdog = thread.as_ref().and_then(|_| {
            let name_wd = name.clone();
            let buffer_wd = Arc::clone(&buffer);
            let running_wd = Arc::clone(&running);
            let shutdown_wd = Arc::clone(&shutdown);
            let config_wd = WatchdogConfig::from(config);

            std::thread::Builder::new()
                .name(format!("watchdog-{name}"))
                .spawn(move || {
                    Self::run_watchdog_with_config(
                        &name_wd,
                        &buffer_wd,
                        &running_wd,
                        &shutdown_wd,
                        on_error.as_ref(),
                        config_wd,
                    );
                })
                .map_err(|e| warn!("failed to spawn watchdog for {name}: {e}"))
                .ok()
        });

        Self {
            name,
            pipeline,
            buffer,
            running,
            shutdown,
            thread,
            watchdog,
            stats,
        }
    }

    /// Get a reference to the processed frame buffer.
    pub fn buffer(&self) -> &Arc<FrameBuffer> {
        &self.buffer
    }

    /// The pipeline this session feeds; the control side sets effects on it.
    pub fn pipeline(&self) -> &Arc<EffectPipeline> {
        &self.pipeline
    }

    /// Check if the delivery thread is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take a snapshot of diagnostic stats for this session.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.lock().snapshot()
    }

    /// Watchdog: waits for delivery to start running, then checks that a
    /// processed frame arrives within `frame_timeout`. Fires `on_error` and
    /// stops the session if none does.
    fn run_watchdog_with_config(
        name: &str,
        buffer: &FrameBuffer,
        running: &AtomicBool,
        shutdown: &AtomicBool,
        on_error: Option<&ErrorCallback>,
        config: WatchdogConfig,
    ) {
        let WatchdogConfig {
            startup_timeout,
            frame_timeout,
            poll_interval,
        } = config;

        // Phase 1: wait for `running` to become true
        let start = Instant::now();
        loop {
            if shutdown.load(Ordering::Acquire) {
                return;
            }
            if running.load(Ordering::Acquire) || buffer.sequence() > 0 {
                break;
            }
            if start.elapsed() >= startup_timeout {
                return;
            }
            std::thread::sleep(poll_interval);
        }

        // Phase 2: wait for at least one frame within frame_timeout
        let deadline = Instant::now() + frame_timeout;
        loop {
            if buffer.sequence() > 0 {
                return;
            }
            if shutdown.load(Ordering::Acquire) || !running.load(Ordering::Acquire) {
                return;
            }
            if Instant::now() >= deadline {
                warn!(
                    "watchdog: no frames processed within {}ms for {name}",
                    frame_timeout.as_millis()
                );
                if let Some(cb) = on_error {
                    cb(
                        name,
                        &format!(
                            "source produces no frames ({}ms timeout)",
                            frame_timeout.as_millis()
                        ),
                    );
                }
                running.store(false, Ordering::Release);
                return;
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Block until the source ends, then tear the session down.
    pub fn wait(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.stop();
    }

    /// Stop the session. Safe to call more than once.
    ///
    /// Returns once the source has handed back its in-flight frame.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.watchdog.take() {
            let _ = handle.join();
        }
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}
