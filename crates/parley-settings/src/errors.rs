use thiserror::Error;

/// Why a settings file or the final merged settings were rejected.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value the runtime can't honor: an odd or zero context window, a
    /// zero token budget or session cap, or a retry base delay above the
    /// maximum delay.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParleySettings;

    #[test]
    fn odd_window_message_names_the_key() {
        let mut settings = ParleySettings::default();
        settings.context.window = 7;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
        assert_eq!(
            err.to_string(),
            "invalid settings value: context.window must be a positive even number, got 7"
        );
    }

    #[test]
    fn zero_budget_message_names_the_key() {
        let mut settings = ParleySettings::default();
        settings.model.max_new_tokens = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("model.maxNewTokens"), "got: {err}");
    }

    #[test]
    fn retry_ordering_message_shows_both_delays() {
        let mut settings = ParleySettings::default();
        settings.retry.base_delay_ms = 9_000;
        let err = settings.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("9000") && msg.contains("8000"), "got: {msg}");
    }

    #[test]
    fn unreadable_file_converts_to_io() {
        let err: SettingsError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, SettingsError::Io(_)));
        assert!(err.to_string().starts_with("failed to read settings file"));
    }

    #[test]
    fn bad_json_converts_to_json() {
        let err: SettingsError = serde_json::from_str::<ParleySettings>("{\"context\": ")
            .unwrap_err()
            .into();
        assert!(matches!(err, SettingsError::Json(_)));
    }
}
