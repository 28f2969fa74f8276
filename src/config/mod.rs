//! Build configuration: paths, variants, toolchain commands.
//!
//! All of the pipeline's behavior is driven by `BuildConfig`. The defaults
//! reproduce the stock arm_tiny layout; a workspace can override them with
//! an `armtiny.toml` file (see `loader`).

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::models::{LinkBase, Variant};

/// External clean/build command pair.
///
/// The toolchain is opaque to the orchestrator: it is spawned, its exit
/// status is checked, and its output is streamed to the log. Defaults wrap
/// `make clean` and `make -jN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default = "ToolchainConfig::default_program")]
    pub program: String,

    #[serde(default = "ToolchainConfig::default_clean_args")]
    pub clean_args: Vec<String>,

    #[serde(default = "ToolchainConfig::default_build_args")]
    pub build_args: Vec<String>,
}

impl ToolchainConfig {
    fn default_program() -> String {
        "make".to_string()
    }

    fn default_clean_args() -> Vec<String> {
        vec!["clean".to_string()]
    }

    fn default_build_args() -> Vec<String> {
        vec![format!("-j{}", num_cpus::get())]
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            program: Self::default_program(),
            clean_args: Self::default_clean_args(),
            build_args: Self::default_build_args(),
        }
    }
}

/// Disk-image update step: the opaque updater script and the image it
/// refreshes. Optional; omit to skip the disk steps entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(default = "DiskConfig::default_update_script")]
    pub update_script: PathBuf,

    #[serde(default = "DiskConfig::default_image")]
    pub image: PathBuf,
}

impl DiskConfig {
    fn default_update_script() -> PathBuf {
        PathBuf::from("update_disk.sh")
    }

    fn default_image() -> PathBuf {
        PathBuf::from("disk.img")
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        DiskConfig {
            update_script: Self::default_update_script(),
            image: Self::default_image(),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source tree containing the Makefile and linker script.
    pub source_dir: PathBuf,

    /// Linker script path, relative to `source_dir`.
    pub linker_script: PathBuf,

    /// Fixed path the toolchain writes its artifact to, relative to
    /// `source_dir`.
    pub build_output: PathBuf,

    /// Directory the variant-named outputs are copied into, relative to
    /// `source_dir`.
    pub output_dir: PathBuf,

    /// Output filename prefix; the link base literal and `.bin` are
    /// appended per variant.
    pub output_prefix: String,

    /// Address literal the linker script carries at rest. The script is
    /// restored to this value after every run.
    pub baseline: LinkBase,

    /// Variants to build, in order.
    pub variants: Vec<Variant>,

    /// Name of the selector environment variable exported per build.
    pub vm_version_env: String,

    pub toolchain: ToolchainConfig,

    /// Disk-image update step; `None` skips it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskConfig>,

    /// Where the JSON build report is written, relative to `source_dir`.
    pub report: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            source_dir: PathBuf::from("."),
            linker_script: PathBuf::from("link.lds"),
            build_output: PathBuf::from("build/arm_tiny.bin"),
            output_dir: PathBuf::from("."),
            output_prefix: "arm_tiny_vm".to_string(),
            baseline: LinkBase(0x40080000),
            variants: vec![
                Variant::new(LinkBase(0x80080000), Some("1")),
                Variant::new(LinkBase(0x40080000), Some("0")),
            ],
            vm_version_env: "VM_VERSION".to_string(),
            toolchain: ToolchainConfig::default(),
            disk: Some(DiskConfig::default()),
            report: PathBuf::from("build_report.json"),
        }
    }
}

impl BuildConfig {
    /// Validate the configuration before a run.
    ///
    /// Duplicate link bases are rejected because each variant's output file
    /// is named by its address; two variants at one address would silently
    /// overwrite each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variants.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one build variant must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.link_base) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Duplicate link base {} in variant list",
                    variant.link_base
                )));
            }
        }

        if self.output_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Output prefix cannot be empty".to_string(),
            ));
        }

        if self.vm_version_env.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Selector environment variable name cannot be empty".to_string(),
            ));
        }

        if self.toolchain.program.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Toolchain program cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Absolute-ish helper paths resolved against `source_dir`.
    pub fn linker_script_path(&self) -> PathBuf {
        self.source_dir.join(&self.linker_script)
    }

    pub fn build_output_path(&self) -> PathBuf {
        self.source_dir.join(&self.build_output)
    }

    pub fn output_path(&self, variant: &Variant) -> PathBuf {
        self.source_dir
            .join(&self.output_dir)
            .join(variant.output_name(&self.output_prefix))
    }

    pub fn report_path(&self) -> PathBuf {
        self.source_dir.join(&self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_stock_layout() {
        let config = BuildConfig::default();
        assert_eq!(config.linker_script, PathBuf::from("link.lds"));
        assert_eq!(config.build_output, PathBuf::from("build/arm_tiny.bin"));
        assert_eq!(config.output_prefix, "arm_tiny_vm");
        assert_eq!(config.baseline, LinkBase(0x40080000));
        assert_eq!(config.vm_version_env, "VM_VERSION");
        assert_eq!(config.variants.len(), 2);
        assert_eq!(config.variants[0].link_base, LinkBase(0x80080000));
        assert_eq!(config.variants[0].vm_version.as_deref(), Some("1"));
        assert_eq!(config.variants[1].link_base, LinkBase(0x40080000));
        assert_eq!(config.variants[1].vm_version.as_deref(), Some("0"));
        assert!(config.disk.is_some());
    }

    #[test]
    fn test_validate_default_ok() {
        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_variants() {
        let mut config = BuildConfig::default();
        config.variants.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_link_base() {
        let mut config = BuildConfig::default();
        config
            .variants
            .push(Variant::new(LinkBase(0x80080000), None));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let mut config = BuildConfig::default();
        config.output_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_path_embeds_address() {
        let config = BuildConfig::default();
        let path = config.output_path(&config.variants[0]);
        assert!(path
            .to_string_lossy()
            .ends_with("arm_tiny_vm_0x80080000.bin"));
    }
}
