//! External toolchain invocation: clean and build steps.
//!
//! The toolchain is opaque: the orchestrator spawns it, streams its stdout
//! through the log pipeline with coarse progress tracking, and checks the
//! exit status. A nonzero status from either step aborts the pipeline so a
//! stale artifact is never copied.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ToolchainConfig;
use crate::error::ToolchainError;
use crate::models::Variant;

// Pre-compiled progress patterns for make-style output.
static STEP_COUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)/(\d+)\]").expect("Invalid step count regex"));
static PERCENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)%\]").expect("Invalid percent regex"));

/// Parses `[X/Y]` or `[ N%]` markers from a build output line.
fn parse_build_progress(line: &str) -> Option<u32> {
    if let Some(caps) = STEP_COUNT_REGEX.captures(line) {
        if let (Ok(current), Ok(total)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            if total > 0 {
                let progress = (current as f32 / total as f32 * 100.0) as u32;
                return Some(progress.min(100));
            }
        }
    }

    if let Some(caps) = PERCENT_REGEX.captures(line) {
        if let Ok(progress) = caps[1].parse::<u32>() {
            return Some(progress.min(100));
        }
    }

    None
}

/// Wrapper around the external clean/build commands.
pub struct Toolchain {
    config: ToolchainConfig,
    source_dir: PathBuf,
    /// Selector environment variable name, exported per build invocation.
    vm_version_env: String,
}

impl Toolchain {
    pub fn new(config: ToolchainConfig, source_dir: PathBuf, vm_version_env: String) -> Self {
        Toolchain {
            config,
            source_dir,
            vm_version_env,
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Run the clean step and check its exit status.
    pub fn clean(&self) -> Result<(), ToolchainError> {
        log::info!(
            "Running clean step: {} {}",
            self.config.program,
            self.config.clean_args.join(" ")
        );

        let status = Command::new(&self.config.program)
            .args(&self.config.clean_args)
            .current_dir(&self.source_dir)
            .status()
            .map_err(|e| ToolchainError::SpawnFailed {
                command: self.config.program.clone(),
                source: e,
            })?;

        if !status.success() {
            return Err(ToolchainError::CleanFailed(status.code()));
        }

        Ok(())
    }

    /// Run the build step for one variant and check its exit status.
    ///
    /// The variant selector is exported into the child's environment only;
    /// the orchestrator's own environment is never mutated. Stdout is
    /// streamed line-by-line through the log pipeline with progress
    /// milestones at 10% steps; stderr passes straight through.
    pub fn build(&self, variant: &Variant) -> Result<(), ToolchainError> {
        log::info!(
            "Running build step for {}: {} {}",
            variant.link_base,
            self.config.program,
            self.config.build_args.join(" ")
        );

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.build_args)
            .current_dir(&self.source_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        if let Some(value) = &variant.vm_version {
            command.env(&self.vm_version_env, value);
            log::info!("Exporting {}={} for this build", self.vm_version_env, value);
        }

        let mut child = command.spawn().map_err(|e| ToolchainError::SpawnFailed {
            command: self.config.program.clone(),
            source: e,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolchainError::OutputCapture("Failed to capture stdout".to_string()))?;

        let reader = BufReader::new(stdout);
        let mut last_milestone = 0u32;
        for line in reader.lines() {
            let line = line
                .map_err(|e| ToolchainError::OutputCapture(format!("stdout read error: {}", e)))?;

            log::debug!(target: "toolchain", "{}", line);

            if let Some(progress) = parse_build_progress(&line) {
                if progress >= last_milestone + 10 {
                    last_milestone = progress - progress % 10;
                    log::info!("Build progress: {}%", progress);
                }
            }
        }

        let status = child.wait().map_err(|e| ToolchainError::SpawnFailed {
            command: self.config.program.clone(),
            source: e,
        })?;

        if !status.success() {
            return Err(ToolchainError::BuildFailed(status.code()));
        }

        log::info!("Build step completed for {}", variant.link_base);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkBase;
    use tempfile::TempDir;

    fn create_test_toolchain(dir: &TempDir, clean: &str, build: &str) -> Toolchain {
        let config = ToolchainConfig {
            program: "sh".to_string(),
            clean_args: vec!["-c".to_string(), clean.to_string()],
            build_args: vec!["-c".to_string(), build.to_string()],
        };
        Toolchain::new(
            config,
            dir.path().to_path_buf(),
            "VM_VERSION".to_string(),
        )
    }

    #[test]
    fn test_parse_build_progress_step_count() {
        assert_eq!(parse_build_progress("[ 50/100] CC main.c"), Some(50));
        assert_eq!(parse_build_progress("[100/100] LD arm_tiny.elf"), Some(100));
        assert_eq!(parse_build_progress("[1/4] AS boot.S"), Some(25));
    }

    #[test]
    fn test_parse_build_progress_percentage() {
        assert_eq!(parse_build_progress("[ 45%] Building"), Some(45));
        assert_eq!(parse_build_progress("[100%] Done"), Some(100));
    }

    #[test]
    fn test_parse_build_progress_no_match() {
        assert_eq!(parse_build_progress("  CC  src/main.c"), None);
        assert_eq!(parse_build_progress("error: undefined reference"), None);
    }

    #[test]
    fn test_clean_success_and_failure() {
        let dir = TempDir::new().unwrap();

        let ok = create_test_toolchain(&dir, "true", "true");
        assert!(ok.clean().is_ok());

        let failing = create_test_toolchain(&dir, "exit 3", "true");
        assert!(matches!(
            failing.clean(),
            Err(ToolchainError::CleanFailed(Some(3)))
        ));
    }

    #[test]
    fn test_build_failure_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let toolchain = create_test_toolchain(&dir, "true", "echo compiling; exit 2");

        let variant = Variant::new(LinkBase(0x40080000), Some("0"));
        assert!(matches!(
            toolchain.build(&variant),
            Err(ToolchainError::BuildFailed(Some(2)))
        ));
    }

    #[test]
    fn test_build_exports_selector_to_child_only() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("selector.txt");
        let build = format!("printf '%s' \"$VM_VERSION\" > {}", marker.display());
        let toolchain = create_test_toolchain(&dir, "true", &build);

        let variant = Variant::new(LinkBase(0x80080000), Some("1"));
        toolchain.build(&variant).expect("build failed");

        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "1");
        // The orchestrator's own environment stays clean.
        assert!(std::env::var("VM_VERSION").is_err());
    }

    #[test]
    fn test_build_without_selector_leaves_env_unset() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("selector.txt");
        let build = format!("printf '%s' \"${{VM_VERSION-unset}}\" > {}", marker.display());
        let toolchain = create_test_toolchain(&dir, "true", &build);

        let variant = Variant::new(LinkBase(0x40080000), None);
        toolchain.build(&variant).expect("build failed");

        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "unset");
    }

    #[test]
    fn test_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let config = ToolchainConfig {
            program: "definitely-not-a-real-binary".to_string(),
            clean_args: vec![],
            build_args: vec![],
        };
        let toolchain = Toolchain::new(config, dir.path().to_path_buf(), "VM_VERSION".to_string());
        assert!(matches!(
            toolchain.clean(),
            Err(ToolchainError::SpawnFailed { .. })
        ));
    }
}
