//! Configuration file persistence.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use tracing::info;

use mixer_audio::{MAX_CHANNELS, MAX_GAIN, MIN_GAIN};
use mixer_ipc::MixerConfig;

/// Get the default config file path.
///
/// Returns: ~/.audio-mixer/config.json
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".audio-mixer")
        .join("config.json")
}

/// Load configuration from a JSON file.
///
/// A missing file yields the default configuration. A file that cannot be
/// parsed or holds out-of-range values is an error.
pub fn load_config(path: &Path) -> Result<MixerConfig> {
    if !path.exists() {
        info!(path = %path.display(), "Config file doesn't exist, using defaults");
        return Ok(MixerConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: MixerConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    validate_config(&config).context("Invalid configuration")?;

    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Save configuration to a JSON file, creating parent directories as needed.
pub fn save_config(config: &MixerConfig, path: &Path) -> Result<()> {
    validate_config(config).context("Invalid configuration")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    info!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Reject values the mixer would otherwise silently replace.
pub fn validate_config(config: &MixerConfig) -> Result<()> {
    ensure!(config.sample_rate > 0, "sample rate must be positive");
    ensure!(config.buffer_size > 0, "buffer size must be positive");
    ensure!(
        (1..=MAX_CHANNELS).contains(&config.channels),
        "channels must be between 1 and {}",
        MAX_CHANNELS
    );

    for (name, gain) in [
        ("input1", config.input1_gain),
        ("input2", config.input2_gain),
        ("master", config.master_gain),
    ] {
        ensure!(
            (MIN_GAIN..=MAX_GAIN).contains(&gain),
            "{} gain must be between {:.1} and {:.1}",
            name,
            MIN_GAIN,
            MAX_GAIN
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use mixer_ipc::DeviceSelector;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("audio-mixer-test-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = temp_path("missing");
        assert_eq!(load_config(&path).unwrap(), MixerConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let config = MixerConfig {
            buffer_size: 256,
            input2_device: Some(DeviceSelector::named("BlackHole 2ch")),
            master_gain: 0.75,
            ..Default::default()
        };

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_config_is_not_saved() {
        let path = temp_path("invalid");
        let config = MixerConfig {
            input1_gain: 2.5,
            ..Default::default()
        };

        let err = save_config(&config, &path).unwrap_err();
        assert!(format!("{:#}", err).contains("input1 gain must be between 0.0 and 2.0"));
        assert!(!path.exists());
    }

    #[test]
    fn test_validation_ranges() {
        assert!(validate_config(&MixerConfig::default()).is_ok());
        assert!(validate_config(&MixerConfig {
            channels: 3,
            ..Default::default()
        })
        .is_err());
        assert!(validate_config(&MixerConfig {
            sample_rate: 0,
            ..Default::default()
        })
        .is_err());
        assert!(validate_config(&MixerConfig {
            master_gain: f32::NAN,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
