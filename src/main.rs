use anyhow::{Context, Result};
use std::path::Path;

use arm_tiny_builder::config::loader::load_config_from_file;
use arm_tiny_builder::{BuildConfig, Orchestrator};

/// Workspace config file; defaults are used when it is absent.
const CONFIG_FILE: &str = "armtiny.toml";

/// Directory for per-run log files.
const LOG_DIR: &str = "logs";

fn main() -> Result<()> {
    arm_tiny_builder::logger::initialize_logging(Some(Path::new(LOG_DIR)))
        .context("Failed to initialize logging")?;

    log::info!("arm_tiny builder v{}", arm_tiny_builder::VERSION);

    let config_path = Path::new(CONFIG_FILE);
    let config = if config_path.exists() {
        log::info!("Loading configuration from {}", CONFIG_FILE);
        load_config_from_file(config_path)
            .with_context(|| format!("Failed to load {}", CONFIG_FILE))?
    } else {
        log::info!("No {} found, using stock configuration", CONFIG_FILE);
        BuildConfig::default()
    };

    let mut orchestrator = Orchestrator::new(config);
    let report = orchestrator.run().context("Build pipeline failed")?;

    for outcome in &report.outcomes {
        log::info!(
            "  {} -> {} ({} bytes, built in {:.1}s)",
            outcome.link_base,
            outcome.output.display(),
            outcome.size_bytes,
            outcome.build_duration.as_secs_f64()
        );
    }
    if let Some(image) = &report.image {
        log::info!(
            "  disk image {} refreshed ({} bytes)",
            image.path.display(),
            image.size_bytes
        );
    }

    Ok(())
}
