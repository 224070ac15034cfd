pub mod control;
pub mod diagnostics;
pub mod effects;
pub mod preview;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use control::selector::EffectSelector;
use effects::pipeline::EffectPipeline;
use preview::capture::{ErrorCallback, FrameBuffer, StreamSession};
use preview::compress;
use preview::source::TestPatternSource;
use settings::store::SettingsStore;

/// Default settings file name when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "webcam-effects.json";

/// Wait until at least `count` more frames have been pushed after `since`.
fn wait_for_frames(buffer: &FrameBuffer, since: u64, count: u64, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while buffer.sequence() < since + count {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}

/// Cancel the settings debounce task and block until it has stopped, so no
/// save of its own is still in flight afterwards.
fn stop_debounce(runtime: &Runtime, task: &mut JoinHandle<()>) {
    task.abort();
    let _ = runtime.block_on(task);
}

/// Run a test-pattern stream through every effect and write one full-size
/// JPEG and one thumbnail per effect into `out_dir`.
///
/// Returns the paths written. Must not be called from inside a Tokio runtime.
pub fn run(settings_path: Option<PathBuf>, out_dir: &Path) -> Result<Vec<PathBuf>, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let _guard = runtime.enter();

    let settings_path = settings_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let store = Arc::new(SettingsStore::new(settings_path));
    let mut debounce = store.start_debounce_task();
    let config = store.session();

    let pipeline = Arc::new(EffectPipeline::new());
    let selector = EffectSelector::with_store(Arc::clone(&pipeline), Arc::clone(&store));
    if let Some(saved) = selector.restore_saved() {
        tracing::info!("Last session used '{saved}'");
    }

    std::fs::create_dir_all(out_dir).map_err(|e| e.to_string())?;

    let on_error: ErrorCallback = Arc::new(|name, message| {
        tracing::error!("stream {name}: {message}");
    });
    let mut session = StreamSession::start(
        "webcam",
        Box::new(TestPatternSource::from_config(&config.source)),
        Arc::clone(&pipeline),
        &config,
        Some(on_error),
    );

    let frame_timeout = Duration::from_millis(config.frame_timeout_ms);
    let mut written = Vec::new();
    for label in EffectSelector::options() {
        let effect = selector.select_label(label);
        let since = session.buffer().sequence();
        // The frame in flight during the switch may still use the old effect.
        if !wait_for_frames(session.buffer(), since, 2, frame_timeout) {
            session.stop();
            return Err(format!("no frames processed for '{label}'"));
        }

        let frame = session
            .buffer()
            .latest()
            .ok_or_else(|| "frame buffer is empty".to_string())?;

        let full = compress::compress_jpeg(&frame, config.jpeg_quality).map_err(|e| e.to_string())?;
        let thumb =
            compress::compress_thumbnail(&frame, config.thumbnail_width, config.thumbnail_height)
                .map_err(|e| e.to_string())?;

        tracing::debug!(
            "{effect} preview is {} base64 characters",
            compress::encode_base64(&full).len()
        );

        for (suffix, bytes) in [("", full), ("-thumb", thumb)] {
            let path = out_dir.join(format!("{}{suffix}.jpg", effect.as_id_str()));
            std::fs::write(&path, &bytes).map_err(|e| e.to_string())?;
            tracing::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
            written.push(path);
        }
    }

    session.stop();
    let diagnostics = session.diagnostics();
    tracing::info!(
        "processed {} frames ({} dropped, {:.1} fps, {:.2} ms/frame, {} effect switches)",
        diagnostics.frame_count,
        diagnostics.drop_count,
        diagnostics.fps,
        diagnostics.mean_processing_ms,
        diagnostics.effect_switches
    );

    stop_debounce(&runtime, &mut debounce);
    store.save()?;
    tracing::info!("settings saved to {}", store.path().display());

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::types::EffectKind;
    use crate::settings::types::{SessionConfig, SettingsFile, SourceConfig};
    use tempfile::TempDir;

    #[test]
    fn wait_for_frames_times_out_on_idle_buffer() {
        let buffer = FrameBuffer::new(1);
        assert!(!wait_for_frames(&buffer, 0, 1, Duration::from_millis(20)));
    }

    #[test]
    fn stop_debounce_waits_for_pending_save() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effects.json");
        let store = Arc::new(SettingsStore::new(path.clone()));
        let mut task = {
            let _guard = runtime.enter();
            store.start_debounce_task_with_delay(Duration::ZERO)
        };

        store.set_effect(EffectKind::Blur);
        std::thread::sleep(Duration::from_millis(20));
        stop_debounce(&runtime, &mut task);
        assert!(task.is_finished());

        store.set_effect(EffectKind::Invert);
        store.save().unwrap();
        assert!(!dir.path().join("effects.json.tmp").exists());
        let saved = SettingsStore::load(&path).unwrap();
        assert_eq!(saved.effect, Some(EffectKind::Invert));
    }

    #[test]
    fn run_writes_one_preview_per_effect() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("effects.json");
        let file = SettingsFile {
            effect: None,
            session: SessionConfig {
                source: SourceConfig {
                    width: 64,
                    height: 48,
                    fps: 0.0,
                },
                thumbnail_width: 16,
                thumbnail_height: 12,
                watchdog_poll_ms: 10,
                ..SessionConfig::default()
            },
        };
        std::fs::write(&settings_path, serde_json::to_string(&file).unwrap()).unwrap();

        let out_dir = dir.path().join("out");
        let written = run(Some(settings_path.clone()), &out_dir).unwrap();

        assert_eq!(written.len(), 12);
        for effect in EffectKind::ALL {
            let full = out_dir.join(format!("{}.jpg", effect.as_id_str()));
            let bytes = std::fs::read(&full).unwrap();
            assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
            assert!(out_dir
                .join(format!("{}-thumb.jpg", effect.as_id_str()))
                .exists());
        }

        // The last selection is remembered for next time.
        let saved = SettingsStore::load(&settings_path).unwrap();
        assert_eq!(saved.effect, Some(EffectKind::Invert));
    }
}
