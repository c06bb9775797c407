//! Subprocess execution for the terraform binary.
//!
//! Every terraform invocation goes through [`run_command`]: spawn with
//! piped output, enforce a timeout, and map a non-zero exit status to
//! [`ProvisionError::CommandFailed`] carrying the captured stderr (the
//! retry layer matches transient-error patterns against it).

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use guardpost_core::error::ProvisionError;

/// Captured output of a finished collaborator command.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a collaborator command to completion.
///
/// The child inherits the parent environment with `env` merged on top
/// (region propagation), runs in `cwd`, and gets no stdin.
///
/// # Errors
///
/// - [`ProvisionError::Spawn`]: the binary could not be started
/// - [`ProvisionError::CommandFailed`]: non-zero exit or timeout
pub async fn run_command(
    binary: &str,
    args: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<CommandOutput, ProvisionError> {
    let rendered = render_command(binary, args);
    debug!(command = %rendered, cwd = %cwd.display(), "running collaborator command");

    let mut cmd = Command::new(binary);
    cmd.args(args)
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ProvisionError::Spawn {
                command: rendered,
                reason: e.to_string(),
            });
        }
        Err(_elapsed) => {
            return Err(ProvisionError::CommandFailed {
                command: rendered,
                status: format!("timed out after {}s", timeout.as_secs()),
                stderr: String::new(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ProvisionError::CommandFailed {
            command: rendered,
            status: output.status.to_string(),
            stderr: stderr.trim().to_owned(),
        });
    }

    debug!(
        command = %render_command(binary, args),
        stdout_bytes = stdout.len(),
        "collaborator command succeeded"
    );
    Ok(CommandOutput { stdout, stderr })
}

/// Render a command line for log and error messages.
fn render_command(binary: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(binary.to_owned());
    parts.extend_from_slice(args);
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn render_command_joins_binary_and_args() {
        let rendered = render_command("terraform", &args(&["apply", "-auto-approve"]));
        assert_eq!(rendered, "terraform apply -auto-approve");
    }

    #[tokio::test]
    async fn spawn_failure_for_missing_binary() {
        let err = run_command(
            "/nonexistent/guardpost-no-such-binary",
            &args(&["init"]),
            Path::new("."),
            &BTreeMap::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProvisionError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let err = run_command(
            "/bin/sh",
            &args(&["-c", "echo provisioning broke >&2; exit 3"]),
            Path::new("."),
            &BTreeMap::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            ProvisionError::CommandFailed { stderr, status, .. } => {
                assert!(stderr.contains("provisioning broke"));
                assert!(status.contains('3'));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_is_reported_as_failure() {
        let err = run_command(
            "/bin/sh",
            &args(&["-c", "sleep 5"]),
            Path::new("."),
            &BTreeMap::new(),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        match err {
            ProvisionError::CommandFailed { status, .. } => {
                assert!(status.contains("timed out"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_captures_stdout() {
        let out = run_command(
            "/bin/sh",
            &args(&["-c", "echo hello"]),
            Path::new("."),
            &BTreeMap::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn env_is_merged_into_child() {
        let mut env = BTreeMap::new();
        env.insert("GUARDPOST_TEST_REGION".to_owned(), "us-east-1".to_owned());
        let out = run_command(
            "/bin/sh",
            &args(&["-c", "printf %s \"$GUARDPOST_TEST_REGION\""]),
            Path::new("."),
            &env,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.stdout, "us-east-1");
    }
}
