//! Sequential build orchestration for the variant pipeline.
//!
//! One run produces every configured variant in strict order. The linker
//! script and the toolchain's output path are shared between variants, so
//! the cycle for variant N+1 never starts before variant N's artifact has
//! been copied out and the script is about to be re-patched; nothing here
//! runs concurrently.

pub mod state;

use std::fs;
use std::time::{Instant, SystemTime};

use crate::artifacts::copy_artifact;
use crate::config::BuildConfig;
use crate::disk::DiskUpdater;
use crate::error::{BuildError, PatchError, Result};
use crate::models::{BuildReport, ImageStatus, VariantOutcome};
use crate::patcher::LinkerPatcher;
use crate::toolchain::Toolchain;

pub use state::{BuildPhaseState, OrchestrationState};

/// Drives the whole pipeline: patch, build, copy per variant, then restore
/// and the optional disk steps.
pub struct Orchestrator {
    config: BuildConfig,
    state: OrchestrationState,
}

impl Orchestrator {
    pub fn new(config: BuildConfig) -> Self {
        let state = OrchestrationState::new(config.variants.len());
        Orchestrator { config, state }
    }

    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run the full pipeline and return the report of what was built.
    ///
    /// The linker script is restored to its pre-run text on every exit
    /// path, success and failure alike.
    pub fn run(&mut self) -> Result<BuildReport> {
        let started = SystemTime::now();

        self.config
            .validate()
            .map_err(|e| self.fail(BuildError::Config(e)))?;

        log::info!(
            "Building {} variant(s) from {}",
            self.config.variants.len(),
            self.config.source_dir.display()
        );

        let toolchain = Toolchain::new(
            self.config.toolchain.clone(),
            self.config.source_dir.clone(),
            self.config.vm_version_env.clone(),
        );

        let mut patcher = LinkerPatcher::new(self.config.linker_script_path());
        patcher
            .begin()
            .map_err(|e| self.fail(BuildError::Patch(e)))?;

        match self.execute(&toolchain, &patcher, started) {
            Ok(report) => Ok(report),
            Err(e) => {
                // Put the script back before surfacing the failure so a
                // rerun starts from the baseline text.
                if let Err(restore_err) = patcher.restore() {
                    log::error!(
                        "Failed to restore linker script after error: {}",
                        restore_err
                    );
                }
                Err(self.fail(e))
            }
        }
    }

    fn execute(
        &mut self,
        toolchain: &Toolchain,
        patcher: &LinkerPatcher,
        started: SystemTime,
    ) -> Result<BuildReport> {
        // The baseline literal must be present before anything is touched;
        // every patch below substitutes relative to it.
        if patcher.count_occurrences(self.config.baseline)? == 0 {
            return Err(BuildError::Patch(PatchError::AddressNotFound {
                literal: self.config.baseline.literal(),
                file: patcher.script_path().to_path_buf(),
            }));
        }

        let outcomes = self.run_variants(toolchain, patcher)?;

        self.transition(BuildPhaseState::Restoring)?;
        patcher.restore()?;

        let (disk_updated, image) = self.run_disk_steps()?;

        let finished = SystemTime::now();
        let report = BuildReport {
            started,
            finished,
            outcomes,
            disk_updated,
            image,
        };
        self.write_report(&report)?;

        self.transition(BuildPhaseState::Completed)?;
        log::info!(
            "Pipeline completed: {} variant(s) built in {:.1}s",
            report.outcomes.len(),
            finished
                .duration_since(started)
                .unwrap_or_default()
                .as_secs_f64()
        );

        Ok(report)
    }

    /// Build every variant in configured order.
    ///
    /// The clean step runs before each patch so no object files compiled
    /// against the previous link base survive into the next build.
    fn run_variants(
        &mut self,
        toolchain: &Toolchain,
        patcher: &LinkerPatcher,
    ) -> Result<Vec<VariantOutcome>> {
        let variants = self.config.variants.clone();
        let mut outcomes = Vec::with_capacity(variants.len());
        let mut current_base = self.config.baseline;

        for (index, variant) in variants.iter().enumerate() {
            self.state.begin_variant(index);
            log::info!(
                "Variant {}/{}: link base {}",
                index + 1,
                variants.len(),
                variant.link_base
            );

            self.transition(BuildPhaseState::Cleaning)?;
            toolchain.clean()?;

            self.transition(BuildPhaseState::Patching)?;
            patcher.set_link_base(current_base, variant.link_base)?;
            current_base = variant.link_base;

            self.transition(BuildPhaseState::Building)?;
            let build_start = Instant::now();
            toolchain.build(variant)?;
            let build_duration = build_start.elapsed();

            self.transition(BuildPhaseState::CopyingArtifact)?;
            let output = self.config.output_path(variant);
            let size_bytes = copy_artifact(&self.config.build_output_path(), &output)?;

            self.state.record_variant_built();
            outcomes.push(VariantOutcome {
                link_base: variant.link_base,
                output,
                size_bytes,
                build_duration,
            });
        }

        Ok(outcomes)
    }

    /// Run the disk-image update and status report when configured.
    fn run_disk_steps(&mut self) -> Result<(bool, Option<ImageStatus>)> {
        let disk = match &self.config.disk {
            Some(disk) => disk.clone(),
            None => return Ok((false, None)),
        };

        let updater = DiskUpdater::new(
            disk.update_script,
            disk.image,
            self.config.source_dir.clone(),
        );

        self.transition(BuildPhaseState::DiskUpdate)?;
        updater.run_update()?;

        self.transition(BuildPhaseState::Reporting)?;
        let status = updater.report_status()?;

        Ok((true, Some(status)))
    }

    fn write_report(&self, report: &BuildReport) -> Result<()> {
        let path = self.config.report_path();
        let json = serde_json::to_string_pretty(report).map_err(|e| BuildError::Report {
            file: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| BuildError::Report {
            file: path.clone(),
            reason: e.to_string(),
        })?;
        log::info!("Wrote build report to {}", path.display());
        Ok(())
    }

    fn transition(&mut self, next: BuildPhaseState) -> Result<()> {
        self.state.transition_to(next).map_err(BuildError::Phase)
    }

    fn fail(&mut self, error: BuildError) -> BuildError {
        self.state.record_error(error.to_string());
        error
    }
}
