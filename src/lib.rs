//! arm_tiny build orchestrator.
//!
//! Produces the arm_tiny image at multiple link-base addresses from one
//! source tree: for each configured variant the linker script is patched,
//! the external make-based toolchain runs clean + build, and the artifact
//! is copied to a variant-named output file. Afterwards the linker script
//! is restored and the dependent disk image is optionally refreshed.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **config**: Configuration management and file loading
//! - **patcher**: Linker script patching with backup/restore
//! - **toolchain**: External clean/build invocation
//! - **artifacts**: Build artifact checks and copies
//! - **disk**: Disk-image update and status reporting
//! - **orchestrator**: Sequential pipeline coordination and state tracking
//! - **logger**: Console + file logging pipeline

// Core foundational modules
pub mod error;
pub mod models;

// Configuration management
pub mod config;

// Linker script patching
pub mod patcher;

// External toolchain invocation
pub mod toolchain;

// Artifact handling
pub mod artifacts;

// Disk-image update step
pub mod disk;

// Pipeline coordination and state management
pub mod orchestrator;

// Console + file logging
pub mod logger;

// Re-export the log crate for macro usage
pub use log;

// Re-export error types for easy access
pub use error::{
    ArtifactError, BuildError, ConfigError, ImageError, PatchError, Result, ToolchainError,
};

// Re-export model types for easy access
pub use models::{BuildReport, ImageStatus, LinkBase, Variant, VariantOutcome};

// Re-export config types
pub use config::{BuildConfig, DiskConfig, ToolchainConfig};

// Re-export the pipeline entry points
pub use orchestrator::{BuildPhaseState, Orchestrator, OrchestrationState};
pub use patcher::LinkerPatcher;
pub use toolchain::Toolchain;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        let _: Result<i32> = Ok(42);
    }

    #[test]
    fn test_models_reexport() {
        let base = LinkBase(0x40080000);
        assert_eq!(base.literal(), "0x40080000");
        let _ = Variant::new(base, Some("0"));
    }

    #[test]
    fn test_config_reexport() {
        let config = BuildConfig::default();
        assert!(config.validate().is_ok());
    }
}
