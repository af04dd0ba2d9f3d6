//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (debounce > 0)
//! - Reject an entry filename that cannot be compared to emitted assets
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BuildConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::BuildConfig;

/// A single semantic problem in the build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyOutputFilename,
    NestedOutputFilename(String),
    EmptyCommand,
    ZeroDebounce,
    EmptyWatchList,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyOutputFilename => write!(f, "output.filename must not be empty"),
            ValidationError::NestedOutputFilename(name) => write!(
                f,
                "output.filename '{}' must be a file name inside output.path",
                name
            ),
            ValidationError::EmptyCommand => write!(f, "build.command must name a program"),
            ValidationError::ZeroDebounce => write!(f, "build.debounce_ms must be greater than 0"),
            ValidationError::EmptyWatchList => write!(f, "build.watch must list at least one path"),
        }
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &BuildConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let filename = config.output.filename.trim();
    if filename.is_empty() {
        errors.push(ValidationError::EmptyOutputFilename);
    } else if filename.contains('/') || filename.contains('\\') {
        errors.push(ValidationError::NestedOutputFilename(filename.to_string()));
    }

    if let Some(build) = &config.build {
        if build.command.first().map_or(true, |program| program.trim().is_empty()) {
            errors.push(ValidationError::EmptyCommand);
        }
        if build.debounce_ms == 0 {
            errors.push(ValidationError::ZeroDebounce);
        }
        if build.watch.is_empty() {
            errors.push(ValidationError::EmptyWatchList);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CommandConfig, OutputConfig};

    fn config() -> BuildConfig {
        BuildConfig {
            output: OutputConfig {
                path: "dist".into(),
                filename: "handler.wasm".into(),
            },
            build: None,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = config();
        config.output.filename = "nested/handler.wasm".into();
        config.build = Some(CommandConfig {
            command: vec![],
            watch: vec![],
            debounce_ms: 0,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NestedOutputFilename("nested/handler.wasm".into()),
                ValidationError::EmptyCommand,
                ValidationError::ZeroDebounce,
                ValidationError::EmptyWatchList,
            ]
        );
    }

    #[test]
    fn test_empty_filename() {
        let mut config = config();
        config.output.filename = "  ".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::EmptyOutputFilename]
        );
    }
}
