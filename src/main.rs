use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings_path = env::var_os("WEBCAM_EFFECTS_SETTINGS").map(PathBuf::from);
    let out_dir = env::var_os("WEBCAM_EFFECTS_OUT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("effects-out"));

    match webcam_effects::run(settings_path, &out_dir) {
        Ok(written) => {
            tracing::info!("wrote {} previews to {}", written.len(), out_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("effects demo failed: {e}");
            ExitCode::FAILURE
        }
    }
}
