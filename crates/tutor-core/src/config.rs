//! Configuration for the tutor client.
//!
//! The client reads an optional `tutor.json` holding the exam defaults and
//! the flashcard request text. The backend address is not configurable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};
use crate::exam::{ExamSettings, QuestionCount, TimeLimit};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "tutor.json";

/// Request text sent when asking the backend for a flashcard batch.
pub const DEFAULT_FLASHCARD_PROMPT: &str = "암기 카드 만들어줘";

/// Default number of exam questions.
const fn default_exam_question_count() -> u32 {
    3
}

/// Default exam time limit in seconds.
const fn default_exam_time_limit() -> u32 {
    60
}

/// Default flashcard request text.
fn default_flashcard_prompt() -> String {
    DEFAULT_FLASHCARD_PROMPT.to_string()
}

/// Main configuration for the tutor client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Question count preselected on the exam setup screen.
    #[serde(default = "default_exam_question_count")]
    pub exam_question_count: u32,

    /// Time limit in seconds preselected on the exam setup screen.
    #[serde(default = "default_exam_time_limit")]
    pub exam_time_limit: u32,

    /// Question text sent with flashcard requests.
    #[serde(default = "default_flashcard_prompt")]
    pub flashcard_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exam_question_count: default_exam_question_count(),
            exam_time_limit: default_exam_time_limit(),
            flashcard_prompt: default_flashcard_prompt(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `tutor.json` in the current directory and falls back to the
    /// defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TutorError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `tutor.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` if the file cannot be read or
    /// parsed, and `TutorError::ConfigValidationError` if a value is outside
    /// the choices the exam screen offers.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(TutorError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TutorError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if QuestionCount::try_from(self.exam_question_count).is_err() {
            return Err(TutorError::config_validation(
                format!(
                    "examQuestionCount must be 3, 5 or 10 (got {})",
                    self.exam_question_count
                ),
                "Pick one of the question counts offered on the exam screen",
            ));
        }

        if TimeLimit::try_from(self.exam_time_limit).is_err() {
            return Err(TutorError::config_validation(
                format!(
                    "examTimeLimit must be 60, 180, 300 or 600 seconds (got {})",
                    self.exam_time_limit
                ),
                "Pick one of the time limits offered on the exam screen",
            ));
        }

        if self.flashcard_prompt.trim().is_empty() {
            return Err(TutorError::config_validation(
                "flashcardPrompt must not be empty",
                "Remove the field to use the default prompt",
            ));
        }

        Ok(())
    }

    /// Returns the exam settings preselected by this configuration.
    ///
    /// Values that fail validation fall back to the defaults.
    #[must_use]
    pub fn exam_settings(&self) -> ExamSettings {
        ExamSettings {
            question_count: QuestionCount::try_from(self.exam_question_count).unwrap_or_default(),
            time_limit: TimeLimit::try_from(self.exam_time_limit).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.exam_question_count, 3);
        assert_eq!(config.exam_time_limit, 60);
        assert_eq!(config.flashcard_prompt, "암기 카드 만들어줘");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.exam_question_count, 3);
        assert_eq!(config.exam_time_limit, 60);
    }

    #[test]
    fn test_config_deserialization_with_overrides() {
        let json = r#"{ "examQuestionCount": 10, "examTimeLimit": 300 }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        let settings = config.exam_settings();
        assert_eq!(settings.question_count, QuestionCount::Ten);
        assert_eq!(settings.time_limit, TimeLimit::FiveMinutes);
    }

    #[test]
    fn test_validate_rejects_unoffered_question_count() {
        let config = Config {
            exam_question_count: 4,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TutorError::ConfigValidationError { .. }));
        assert!(err.to_string().contains("examQuestionCount"));
    }

    #[test]
    fn test_validate_rejects_unoffered_time_limit() {
        let config = Config {
            exam_time_limit: 90,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_prompt() {
        let config = Config {
            flashcard_prompt: "   ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.exam_question_count, 3);
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tutor.json"), "{ not json").unwrap();

        let err = Config::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TutorError::ConfigParseError { .. }));
    }

    #[test]
    fn test_load_validates_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tutor.json"),
            r#"{ "examTimeLimit": 61 }"#,
        )
        .unwrap();

        let err = Config::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TutorError::ConfigValidationError { .. }));
    }
}
