//! Provisioning abstraction and the terraform implementation.
//!
//! The [`Provisioner`] trait is the seam between the validation
//! orchestrator and the infrastructure-as-code tool, allowing tests to
//! substitute a mock while production uses [`TerraformModule`].
//!
//! # Lifecycle
//!
//! ```text
//! TerraformModule::new        -- write {vars} to *.tfvars.json
//!         |
//! apply()                     -- terraform init; terraform apply;
//!         |                      terraform output -json -> OutputSet
//! destroy()                   -- terraform destroy (same var file)
//! ```
//!
//! The generated var file is owned by the module handle and kept alive
//! until the handle is dropped, because `destroy` needs the same
//! variables that `apply` used.

use std::collections::BTreeMap;
use std::future::Future;
use std::io::Write;

use tempfile::NamedTempFile;
use tracing::{info, warn};

use guardpost_core::error::ProvisionError;
use guardpost_core::types::OutputSet;

use crate::command::{CommandOutput, run_command};
use crate::options::TerraformOptions;
use crate::retry::RetryPolicy;

/// Provisioning collaborator interface consumed by the orchestrator.
///
/// `apply` covers the whole "initialize and apply, then read outputs
/// once" operation; `destroy` tears the resource set down. Retry on
/// transient errors is an implementation concern of this trait, never
/// the caller's.
pub trait Provisioner: Send + Sync {
    /// Initialize and apply the module, then read its named outputs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] if any terraform command fails after
    /// exhausting the retry policy, or if outputs cannot be parsed.
    fn apply(&self) -> impl Future<Output = Result<OutputSet, ProvisionError>> + Send;

    /// Destroy the applied resource set.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] if the destroy command fails.
    fn destroy(&self) -> impl Future<Output = Result<(), ProvisionError>> + Send;
}

/// One terraform root module instance, exclusively owning its applied
/// resource set for the duration of a validation run.
pub struct TerraformModule {
    opts: TerraformOptions,
    policy: RetryPolicy,
    var_file: NamedTempFile,
}

impl TerraformModule {
    /// Create the module handle and materialize its var file.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::VarFile`] if the `*.tfvars.json` file
    /// cannot be created or written.
    pub fn new(opts: TerraformOptions) -> Result<Self, ProvisionError> {
        let var_file = write_var_file(&opts.vars)?;
        let policy = RetryPolicy::new(opts.max_retries, opts.retry_backoff);
        Ok(Self {
            opts,
            policy,
            var_file,
        })
    }

    fn var_file_arg(&self) -> String {
        format!("-var-file={}", self.var_file.path().display())
    }

    async fn init(&self) -> Result<CommandOutput, ProvisionError> {
        info!(module_dir = %self.opts.module_dir.display(), "terraform init");
        self.run_retrying(vec![
            "init".to_owned(),
            "-input=false".to_owned(),
            "-no-color".to_owned(),
        ])
        .await
    }

    async fn apply_module(&self) -> Result<CommandOutput, ProvisionError> {
        info!(module_dir = %self.opts.module_dir.display(), "terraform apply");
        self.run_retrying(vec![
            "apply".to_owned(),
            "-input=false".to_owned(),
            "-auto-approve".to_owned(),
            "-no-color".to_owned(),
            self.var_file_arg(),
        ])
        .await
    }

    /// Read all named outputs once, after apply has succeeded.
    async fn read_outputs(&self) -> Result<OutputSet, ProvisionError> {
        let output = self
            .run_retrying(vec![
                "output".to_owned(),
                "-json".to_owned(),
                "-no-color".to_owned(),
            ])
            .await?;
        parse_outputs(&output.stdout)
    }

    /// Run one terraform command, retrying on transient failures.
    async fn run_retrying(&self, args: Vec<String>) -> Result<CommandOutput, ProvisionError> {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let backoff = self.policy.backoff_for(attempt);
                warn!(
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "retrying terraform command after transient error"
                );
                tokio::time::sleep(backoff).await;
            }

            let result = run_command(
                &self.opts.binary,
                &args,
                &self.opts.module_dir,
                &self.opts.env,
                self.opts.command_timeout,
            )
            .await;

            match result {
                Ok(output) => return Ok(output),
                Err(e) => {
                    let transient = matches!(
                        &e,
                        ProvisionError::CommandFailed { stderr, .. }
                            if self.policy.is_retryable(stderr)
                    );
                    if transient && attempt < self.policy.max_retries {
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Provisioner for TerraformModule {
    async fn apply(&self) -> Result<OutputSet, ProvisionError> {
        self.init().await?;
        self.apply_module().await?;
        let outputs = self.read_outputs().await?;
        info!(outputs = outputs.len(), "terraform apply complete");
        Ok(outputs)
    }

    async fn destroy(&self) -> Result<(), ProvisionError> {
        info!(module_dir = %self.opts.module_dir.display(), "terraform destroy");
        self.run_retrying(vec![
            "destroy".to_owned(),
            "-input=false".to_owned(),
            "-auto-approve".to_owned(),
            "-no-color".to_owned(),
            self.var_file_arg(),
        ])
        .await?;
        info!("terraform destroy complete");
        Ok(())
    }
}

/// Serialize the variable bundle to a `*.tfvars.json` temp file.
fn write_var_file(
    vars: &BTreeMap<String, serde_json::Value>,
) -> Result<NamedTempFile, ProvisionError> {
    let mut file = tempfile::Builder::new()
        .prefix("guardpost-")
        .suffix(".tfvars.json")
        .tempfile()
        .map_err(|e| ProvisionError::VarFile {
            reason: e.to_string(),
        })?;

    let json =
        serde_json::to_string_pretty(vars).map_err(|e| ProvisionError::VarFile {
            reason: e.to_string(),
        })?;
    file.write_all(json.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| ProvisionError::VarFile {
            reason: e.to_string(),
        })?;
    Ok(file)
}

/// Parse `terraform output -json` into an [`OutputSet`].
///
/// Only string-valued outputs are retained; the validation workflow
/// consumes identifiers, not structured values.
fn parse_outputs(stdout: &str) -> Result<OutputSet, ProvisionError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| ProvisionError::OutputParse {
            reason: e.to_string(),
        })?;
    let object = value.as_object().ok_or_else(|| ProvisionError::OutputParse {
        reason: "top-level output value is not an object".to_owned(),
    })?;

    let mut map = BTreeMap::new();
    for (name, entry) in object {
        match entry.get("value") {
            Some(serde_json::Value::String(s)) => {
                map.insert(name.clone(), s.clone());
            }
            Some(_) => {
                warn!(output = name.as_str(), "skipping non-string terraform output");
            }
            None => {
                return Err(ProvisionError::OutputParse {
                    reason: format!("output '{name}' has no value field"),
                });
            }
        }
    }
    Ok(OutputSet::from_map(map))
}
