//! Build command execution.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use crate::bundler::BuildStats;
use crate::config::CommandConfig;

/// Run the configured build command once and report how it went.
///
/// A command that cannot be started counts as a failed build.
pub async fn run_build(config: &CommandConfig, working_dir: &Path) -> BuildStats {
    let command_line = config.display();
    let start = Instant::now();

    let Some((program, args)) = config.command.split_first() else {
        return BuildStats {
            command: command_line,
            success: false,
            duration: start.elapsed(),
            output: "no build command configured".to_string(),
        };
    };

    tracing::debug!(command = %command_line, dir = %working_dir.display(), "Running build");

    let result = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            BuildStats {
                command: command_line,
                success: output.status.success(),
                duration: start.elapsed(),
                output: text,
            }
        }
        Err(e) => BuildStats {
            command: command_line,
            success: false,
            duration: start.elapsed(),
            output: format!("failed to start '{}': {}", program, e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> CommandConfig {
        CommandConfig {
            command: parts.iter().map(|s| s.to_string()).collect(),
            watch: vec![],
            debounce_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_failed_build() {
        let stats = run_build(&command(&["definitely-not-a-real-build-tool"]), Path::new(".")).await;
        assert!(!stats.success);
        assert!(stats.output.contains("failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_and_status_captured() {
        let stats = run_build(&command(&["sh", "-c", "echo out; echo err >&2; exit 3"]), Path::new(".")).await;
        assert!(!stats.success);
        assert!(stats.output.contains("out"));
        assert!(stats.output.contains("err"));
        assert_eq!(stats.command, "sh -c echo out; echo err >&2; exit 3");
    }
}
