use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Progress throttle is not 0
/// - Transport channel capacity is not 0
/// - FFmpeg path is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.progress.throttle_ms == 0 {
        return Err(ConfigError::ValidationError(
            "progress.throttle_ms cannot be 0".to_string(),
        ));
    }

    if config.transport.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "transport.channel_capacity cannot be 0".to_string(),
        ));
    }

    if config.converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_throttle_fails() {
        let mut config = Config::default();
        config.progress.throttle_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_capacity_fails() {
        let mut config = Config::default();
        config.transport.channel_capacity = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_ffmpeg_path_fails() {
        let mut config = Config::default();
        config.converter.ffmpeg_path = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }
}
