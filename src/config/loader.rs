//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::BuildConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate the build configuration from a TOML file.
///
/// Relative output and watch paths are resolved against the directory that
/// contains the configuration file.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content, path.parent().unwrap_or_else(|| Path::new("")))?;

    tracing::debug!(path = %path.display(), entry = %config.output.entry_path().display(), "Build configuration loaded");
    Ok(config)
}

/// Parse, resolve and validate configuration text.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<BuildConfig, ConfigError> {
    let mut config: BuildConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    config.output.filename = config.output.filename.trim().to_string();
    config.output.path = resolve(base_dir, &config.output.path);
    if let Some(build) = config.build.as_mut() {
        build.watch = build.watch.iter().map(|p| resolve(base_dir, p)).collect();
    }

    Ok(config)
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = parse_config(
            r#"
            [output]
            path = "dist"
            filename = "handler.wasm"
            "#,
            Path::new("/project"),
        )
        .unwrap();

        assert_eq!(config.output.path, PathBuf::from("/project/dist"));
        assert_eq!(config.output.entry_path(), PathBuf::from("/project/dist/handler.wasm"));
        assert!(config.build.is_none());
    }

    #[test]
    fn test_parse_with_build() {
        let config = parse_config(
            r#"
            [output]
            path = "/abs/out"
            filename = "handler.wasm"

            [build]
            command = ["cargo", "build", "--target", "wasm32-unknown-unknown"]
            watch = ["src", "/shared"]
            "#,
            Path::new("/project"),
        )
        .unwrap();

        assert_eq!(config.output.path, PathBuf::from("/abs/out"));
        let build = config.build.unwrap();
        assert_eq!(build.display(), "cargo build --target wasm32-unknown-unknown");
        assert_eq!(build.watch, vec![PathBuf::from("/project/src"), PathBuf::from("/shared")]);
        assert_eq!(build.debounce_ms, 200);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = parse_config(
            r#"
            [output]
            path = "dist"
            filename = "handler.wasm"
            entry = "src/index.js"
            "#,
            Path::new(""),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config(
            r#"
            [output]
            path = "dist"
            filename = ""
            "#,
            Path::new(""),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: output.filename must not be empty");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
