//! Disk-image update and status reporting.
//!
//! The updater script is opaque: it is handed the workspace as its working
//! directory and invoked with no arguments. Its exit status is checked, and
//! the image must exist before a status report is produced.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ImageError;
use crate::models::ImageStatus;

/// Runner for the external disk-image updater plus image inspection.
pub struct DiskUpdater {
    update_script: PathBuf,
    image: PathBuf,
    working_dir: PathBuf,
}

impl DiskUpdater {
    pub fn new(update_script: PathBuf, image: PathBuf, working_dir: PathBuf) -> Self {
        DiskUpdater {
            update_script,
            image,
            working_dir,
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image
    }

    /// Invoke the updater script via bash and check its exit status.
    pub fn run_update(&self) -> Result<(), ImageError> {
        let script = self.working_dir.join(&self.update_script);
        if !script.exists() {
            return Err(ImageError::ScriptNotFound(script));
        }

        log::info!("Running disk update: bash {}", self.update_script.display());

        let status = Command::new("bash")
            .arg(&self.update_script)
            .current_dir(&self.working_dir)
            .status()
            .map_err(|e| ImageError::SpawnFailed {
                command: format!("bash {}", self.update_script.display()),
                source: e,
            })?;

        if !status.success() {
            return Err(ImageError::UpdateFailed(status.code()));
        }

        log::info!("Disk update completed");
        Ok(())
    }

    /// Stat the disk image and return its size and modification time.
    ///
    /// A missing image is an error: a silent status report after a failed
    /// update would mask the failure.
    pub fn report_status(&self) -> Result<ImageStatus, ImageError> {
        let image = self.working_dir.join(&self.image);
        let metadata = match fs::metadata(&image) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImageError::ImageMissing(image));
            }
            Err(e) => {
                return Err(ImageError::Io {
                    file: image,
                    source: e,
                });
            }
        };

        let modified = metadata.modified().map_err(|e| ImageError::Io {
            file: image.clone(),
            source: e,
        })?;

        let stamp: DateTime<Local> = modified.into();
        log::info!(
            "Disk image {}: {} bytes, modified {}",
            image.display(),
            metadata.len(),
            stamp.format("%Y-%m-%d %H:%M:%S")
        );

        Ok(ImageStatus {
            path: image,
            size_bytes: metadata.len(),
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_updater(dir: &TempDir, script_body: &str) -> DiskUpdater {
        let script = dir.path().join("update_disk.sh");
        fs::write(&script, script_body).expect("Failed to write script");
        DiskUpdater::new(
            PathBuf::from("update_disk.sh"),
            PathBuf::from("disk.img"),
            dir.path().to_path_buf(),
        )
    }

    #[test]
    fn test_run_update_success() {
        let dir = TempDir::new().unwrap();
        let updater = create_test_updater(&dir, "touch disk.img\n");
        updater.run_update().expect("update failed");
        assert!(dir.path().join("disk.img").exists());
    }

    #[test]
    fn test_run_update_missing_script() {
        let dir = TempDir::new().unwrap();
        let updater = DiskUpdater::new(
            PathBuf::from("update_disk.sh"),
            PathBuf::from("disk.img"),
            dir.path().to_path_buf(),
        );
        assert!(matches!(
            updater.run_update(),
            Err(ImageError::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_run_update_failure_exit_code() {
        let dir = TempDir::new().unwrap();
        let updater = create_test_updater(&dir, "exit 7\n");
        assert!(matches!(
            updater.run_update(),
            Err(ImageError::UpdateFailed(Some(7)))
        ));
    }

    #[test]
    fn test_report_status() {
        let dir = TempDir::new().unwrap();
        let updater = create_test_updater(&dir, "true\n");
        fs::write(dir.path().join("disk.img"), vec![0u8; 512]).unwrap();

        let status = updater.report_status().expect("status failed");
        assert_eq!(status.size_bytes, 512);
        assert!(status.path.ends_with("disk.img"));
    }

    #[test]
    fn test_report_status_missing_image() {
        let dir = TempDir::new().unwrap();
        let updater = create_test_updater(&dir, "true\n");
        assert!(matches!(
            updater.report_status(),
            Err(ImageError::ImageMissing(_))
        ));
    }
}
