//! Config file loader and serialization.

use crate::config::BuildConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Load config from a TOML file.
pub fn load_config_from_file(path: &Path) -> Result<BuildConfig, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: BuildConfig = toml::from_str(&content)?;
    config.validate()?;

    Ok(config)
}

/// Save config to a TOML file.
pub fn save_config_to_file(config: &BuildConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
    }

    let content = toml::to_string_pretty(config).map_err(|e| {
        ConfigError::ValidationFailed(format!("Failed to serialize config: {}", e))
    })?;

    fs::write(path, content).map_err(ConfigError::IoError)?;

    Ok(())
}

/// Validate config path (.toml extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "toml" => {}
        Some(ext) => {
            return Err(ConfigError::ValidationFailed(format!(
                "Configuration file must have .toml extension, got .{}",
                ext.to_string_lossy()
            )))
        }
        None => {
            return Err(ConfigError::ValidationFailed(
                "Configuration file must have .toml extension".to_string(),
            ))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkBase, Variant};
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("armtiny.toml");

        let mut original = BuildConfig::default();
        original.output_prefix = "arm_tiny_test".to_string();
        original.baseline = LinkBase(0x48000000);
        original.variants = vec![
            Variant::new(LinkBase(0x48000000), Some("0")),
            Variant::new(LinkBase(0x88000000), Some("1")),
        ];

        save_config_to_file(&original, &config_path).expect("Failed to save config");
        assert!(config_path.exists());

        let loaded = load_config_from_file(&config_path).expect("Failed to load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config_from_file(Path::new("/nonexistent/path/armtiny.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        std::fs::write(&config_path, "variants = not toml").unwrap();

        let result = load_config_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::InvalidToml(_))));
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("empty_variants.toml");
        std::fs::write(&config_path, "variants = []\n").unwrap();

        let result = load_config_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_validate_config_path() {
        assert!(validate_config_path(Path::new("armtiny.toml")).is_ok());
        assert!(validate_config_path(Path::new("config.json")).is_err());
        assert!(validate_config_path(Path::new("config")).is_err());
        assert!(validate_config_path(Path::new("")).is_err());
    }
}
