//! Pipeline state tracking and phase transitions.
//!
//! The orchestrator moves through discrete phases in strict sequence; the
//! per-variant cycle loops Cleaning -> Patching -> Building ->
//! CopyingArtifact before either starting the next variant's clean or
//! moving on to restoration and the disk steps.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Discrete phases of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildPhaseState {
    /// Config validation, linker script capture and backup.
    Preparation,

    /// Toolchain clean step for the current variant.
    Cleaning,

    /// Link-base substitution in the linker script.
    Patching,

    /// Toolchain build step for the current variant.
    Building,

    /// Copy from the shared build output path to the variant-named file.
    CopyingArtifact,

    /// Restore the linker script to its baseline text.
    Restoring,

    /// External disk-image updater invocation.
    DiskUpdate,

    /// Disk-image status inspection.
    Reporting,

    /// Run completed successfully.
    Completed,

    /// Run failed; the linker script has been restored.
    Failed,
}

impl BuildPhaseState {
    /// Get the human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhaseState::Preparation => "preparation",
            BuildPhaseState::Cleaning => "cleaning",
            BuildPhaseState::Patching => "patching",
            BuildPhaseState::Building => "building",
            BuildPhaseState::CopyingArtifact => "copying-artifact",
            BuildPhaseState::Restoring => "restoring",
            BuildPhaseState::DiskUpdate => "disk-update",
            BuildPhaseState::Reporting => "reporting",
            BuildPhaseState::Completed => "completed",
            BuildPhaseState::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    ///
    /// CopyingArtifact may loop back to Cleaning: the next variant's cycle
    /// only starts once the previous artifact is out of the shared output
    /// path.
    pub fn valid_next_phases(&self) -> Vec<BuildPhaseState> {
        match self {
            BuildPhaseState::Preparation => {
                vec![BuildPhaseState::Cleaning, BuildPhaseState::Failed]
            }
            BuildPhaseState::Cleaning => {
                vec![BuildPhaseState::Patching, BuildPhaseState::Failed]
            }
            BuildPhaseState::Patching => {
                vec![BuildPhaseState::Building, BuildPhaseState::Failed]
            }
            BuildPhaseState::Building => {
                vec![BuildPhaseState::CopyingArtifact, BuildPhaseState::Failed]
            }
            BuildPhaseState::CopyingArtifact => vec![
                BuildPhaseState::Cleaning,
                BuildPhaseState::Restoring,
                BuildPhaseState::Failed,
            ],
            BuildPhaseState::Restoring => vec![
                BuildPhaseState::DiskUpdate,
                BuildPhaseState::Completed,
                BuildPhaseState::Failed,
            ],
            BuildPhaseState::DiskUpdate => {
                vec![BuildPhaseState::Reporting, BuildPhaseState::Failed]
            }
            BuildPhaseState::Reporting => {
                vec![BuildPhaseState::Completed, BuildPhaseState::Failed]
            }
            BuildPhaseState::Completed => vec![],
            // Allow restart after a failed run.
            BuildPhaseState::Failed => vec![BuildPhaseState::Preparation],
        }
    }

    /// Check if a transition to the given phase is valid.
    pub fn can_transition_to(&self, next: BuildPhaseState) -> bool {
        self.valid_next_phases().contains(&next)
    }
}

/// Execution state snapshot for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Current phase.
    pub phase: BuildPhaseState,

    /// Index of the variant currently being built.
    pub current_variant: usize,

    /// Total number of variants in this run.
    pub total_variants: usize,

    /// Variants fully built and copied so far.
    pub variants_built: usize,

    /// Run start timestamp.
    pub start_time: SystemTime,

    /// Last phase update timestamp.
    pub last_update_time: SystemTime,

    /// Error message if the run failed.
    pub error: Option<String>,
}

impl OrchestrationState {
    /// Create a fresh state for a run over `total_variants` variants.
    pub fn new(total_variants: usize) -> Self {
        let now = SystemTime::now();
        OrchestrationState {
            phase: BuildPhaseState::Preparation,
            current_variant: 0,
            total_variants,
            variants_built: 0,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Attempt to transition to the next phase.
    pub fn transition_to(&mut self, next_phase: BuildPhaseState) -> Result<(), String> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(format!(
                "Invalid phase transition: {} -> {}",
                self.phase.as_str(),
                next_phase.as_str()
            ));
        }
        log::debug!(
            "Phase: {} -> {}",
            self.phase.as_str(),
            next_phase.as_str()
        );
        self.phase = next_phase;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Mark the start of a variant's cycle.
    pub fn begin_variant(&mut self, index: usize) {
        self.current_variant = index;
        self.last_update_time = SystemTime::now();
    }

    /// Record a fully built and copied variant.
    pub fn record_variant_built(&mut self) {
        self.variants_built += 1;
        self.last_update_time = SystemTime::now();
    }

    /// Record an error and mark the run as failed.
    pub fn record_error(&mut self, error: String) {
        self.error = Some(error);
        self.phase = BuildPhaseState::Failed;
        self.last_update_time = SystemTime::now();
    }

    /// Get time elapsed since run start.
    pub fn elapsed_since_start(&self) -> Result<std::time::Duration, std::time::SystemTimeError> {
        self.start_time.elapsed()
    }
}
