//! GuardDuty API abstraction for testability.
//!
//! The [`DetectorApi`] trait abstracts the three GuardDuty operations
//! the validation workflow consumes, allowing the orchestrator to be
//! tested against mocks while production uses [`AwsCliDetectorApi`],
//! which drives the `aws` CLI as a subprocess and parses its JSON
//! output. Authentication, signing, and pagination mechanics stay with
//! the CLI.
//!
//! # Detector ID Validation
//!
//! All methods validate the detector id before interpolating it into a
//! CLI invocation: ids must be 1-64 ASCII hex characters. Anything else
//! is rejected up front with [`VerifyError::InvalidDetectorId`].

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use guardpost_core::error::VerifyError;
use guardpost_core::types::{DetectorState, FindingPage};

/// Validates a detector id to prevent argument injection.
///
/// GuardDuty detector ids are 32-character hex strings; accept short
/// prefixes up to 64 characters for forward compatibility.
fn validate_detector_id(id: &str) -> Result<(), VerifyError> {
    if id.is_empty() || id.len() > 64 {
        return Err(VerifyError::InvalidDetectorId {
            reason: format!("length {} (must be 1-64)", id.len()),
        });
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VerifyError::InvalidDetectorId {
            reason: "contains non-hex characters".to_owned(),
        });
    }
    Ok(())
}

/// Verification collaborator interface consumed by the orchestrator.
pub trait DetectorApi: Send + Sync {
    /// Fetch the detector's current state by id.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Api`] on a failed call or
    /// [`VerifyError::ResponseParse`] if the response is malformed.
    fn get_detector(
        &self,
        detector_id: &str,
    ) -> impl Future<Output = Result<DetectorState, VerifyError>> + Send;

    /// Trigger sample finding creation for the detector.
    ///
    /// Any error is a hard failure for the run; this call is never
    /// retried here or by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Api`] on a failed call.
    fn create_sample_findings(
        &self,
        detector_id: &str,
    ) -> impl Future<Output = Result<(), VerifyError>> + Send;

    /// List the first page of findings for the detector.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Api`] on a failed call or
    /// [`VerifyError::ResponseParse`] if the response is malformed.
    fn list_findings(
        &self,
        detector_id: &str,
    ) -> impl Future<Output = Result<FindingPage, VerifyError>> + Send;
}

/// Production implementation driving the `aws` CLI, scoped to one region.
pub struct AwsCliDetectorApi {
    binary: String,
    region: String,
    command_timeout: Duration,
}

impl AwsCliDetectorApi {
    /// Create a client scoped to the target region.
    pub fn new(binary: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            region: region.into(),
            command_timeout: Duration::from_secs(120),
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Run one `aws guardduty` subcommand and capture stdout.
    async fn run_guardduty(
        &self,
        operation: &str,
        extra_args: &[&str],
    ) -> Result<String, VerifyError> {
        let mut args = vec![
            "guardduty".to_owned(),
            operation.to_owned(),
            "--region".to_owned(),
            self.region.clone(),
            "--output".to_owned(),
            "json".to_owned(),
        ];
        args.extend(extra_args.iter().map(|s| (*s).to_owned()));

        debug!(operation, "invoking aws cli");
        let output = tokio::time::timeout(
            self.command_timeout,
            Command::new(&self.binary)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_elapsed| VerifyError::Api {
            operation: operation.to_owned(),
            reason: format!("timed out after {}s", self.command_timeout.as_secs()),
        })?
        .map_err(|e| VerifyError::Api {
            operation: operation.to_owned(),
            reason: format!("failed to spawn '{}': {}", self.binary, e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerifyError::Api {
                operation: operation.to_owned(),
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DetectorApi for AwsCliDetectorApi {
    async fn get_detector(&self, detector_id: &str) -> Result<DetectorState, VerifyError> {
        validate_detector_id(detector_id)?;
        let stdout = self
            .run_guardduty("get-detector", &["--detector-id", detector_id])
            .await?;
        let state: DetectorState =
            serde_json::from_str(&stdout).map_err(|e| VerifyError::ResponseParse {
                operation: "get-detector".to_owned(),
                reason: e.to_string(),
            })?;
        debug!(detector_id, status = state.status.as_str(), "detector state fetched");
        Ok(state)
    }

    async fn create_sample_findings(&self, detector_id: &str) -> Result<(), VerifyError> {
        validate_detector_id(detector_id)?;
        self.run_guardduty("create-sample-findings", &["--detector-id", detector_id])
            .await?;
        info!(detector_id, "sample findings created");
        Ok(())
    }

    async fn list_findings(&self, detector_id: &str) -> Result<FindingPage, VerifyError> {
        validate_detector_id(detector_id)?;
        // --no-paginate so the raw first page (ids + NextToken) is
        // observed instead of the CLI's auto-merged result.
        let stdout = self
            .run_guardduty(
                "list-findings",
                &[
                    "--detector-id",
                    detector_id,
                    "--max-results",
                    "50",
                    "--no-paginate",
                ],
            )
            .await?;
        let page: FindingPage =
            serde_json::from_str(&stdout).map_err(|e| VerifyError::ResponseParse {
                operation: "list-findings".to_owned(),
                reason: e.to_string(),
            })?;
        debug!(
            detector_id,
            findings = page.finding_ids.len(),
            has_token = page.next_token.is_some(),
            "findings listed"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_detector_ids_pass() {
        validate_detector_id("d0123456789abcdef0123456789abcde").unwrap();
        validate_detector_id("abc123").unwrap();
        validate_detector_id("ABCDEF01").unwrap();
    }

    #[test]
    fn empty_detector_id_is_rejected() {
        let err = validate_detector_id("").unwrap_err();
        assert!(matches!(err, VerifyError::InvalidDetectorId { .. }));
    }

    #[test]
    fn overlong_detector_id_is_rejected() {
        let id = "a".repeat(65);
        let err = validate_detector_id(&id).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidDetectorId { .. }));
    }

    #[test]
    fn injection_characters_are_rejected() {
        for id in ["abc; rm -rf /", "abc 123", "--detector-id", "abc$HOME"] {
            let err = validate_detector_id(id).unwrap_err();
            assert!(matches!(err, VerifyError::InvalidDetectorId { .. }), "{id}");
        }
    }

    #[tokio::test]
    async fn invalid_id_short_circuits_before_spawn() {
        // 존재하지 않는 바이너리라도 검증이 먼저 실패해야 함
        let api = AwsCliDetectorApi::new("/nonexistent/aws", "us-east-1");
        let err = api.get_detector("not hex!").await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidDetectorId { .. }));
    }
}
