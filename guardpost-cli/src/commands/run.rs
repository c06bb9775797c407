//! `guardpost run` command handler

use tracing::info;

use guardpost_core::config::GuardpostConfig;
use guardpost_core::error::GuardpostError;
use guardpost_core::types::{AWS_REGION_ENV, RunContext};
use guardpost_guardduty::AwsCliDetectorApi;
use guardpost_terraform::{TerraformModule, TerraformOptions};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::OutputWriter;
use crate::runner::ValidationRun;

/// Execute the `run` command.
///
/// Builds the run context from the environment, wires the terraform and
/// aws CLI collaborators, and drives the full workflow. CLI arguments
/// take precedence over the configuration file.
///
/// # Errors
///
/// Returns `CliError::Verification` with exit code 4 when live checks
/// fail, `CliError::Config` for missing environment input, and a general
/// error for provisioning failures.
pub async fn execute(
    args: RunArgs,
    mut config: GuardpostConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    if let Some(module_dir) = args.module_dir {
        config.run.module_dir = module_dir;
    }
    if args.skip_destroy {
        config.run.skip_destroy = true;
    }
    if let Some(min_findings) = args.min_findings {
        config.run.min_findings = min_findings;
    }
    config.validate().map_err(CliError::from)?;

    let ctx = RunContext::from_env(&config.run).map_err(GuardpostError::from)?;
    info!(
        test_name = ctx.test_name.as_str(),
        region = ctx.region.as_str(),
        module_dir = config.run.module_dir.as_str(),
        "run context established"
    );

    let opts = TerraformOptions::from_config(&config.terraform, &config.run.module_dir)
        .with_var("test_name", ctx.test_name.clone())
        .with_var("tags", serde_json::to_value(&ctx.tags)?)
        .with_env(AWS_REGION_ENV, ctx.region.clone());
    let module = TerraformModule::new(opts).map_err(GuardpostError::from)?;

    let api = AwsCliDetectorApi::new(config.aws.binary.clone(), ctx.region.clone());

    let run = ValidationRun::new(ctx, module, api, config.run.min_findings);
    let report = run.run().await?;

    writer.render(&report)?;
    Ok(())
}
