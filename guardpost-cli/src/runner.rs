//! Validation run orchestrator.
//!
//! [`ValidationRun`] drives the whole workflow against its two
//! collaborators, the provisioner and the detector API:
//!
//! ```text
//! apply                      -- provision the module, read outputs
//!   |
//! get-detector               -- detector + all four log sources ENABLED
//!   |
//! create-sample-findings     -- exercise the detector
//!   |
//! list-findings              -- count >= threshold, token present
//!   |
//! destroy                    -- teardown, on EVERY exit path
//! ```
//!
//! # Teardown guarantee
//!
//! Every failure in this crate is an `Err` value, never a panic, so the
//! teardown guarantee is structural: `run` captures the workflow outcome
//! first, then runs teardown unconditionally, and only then combines the
//! two results. When both fail, the workflow error is reported and the
//! teardown error is logged; leaked resources carry the unique `TestRun`
//! tag for manual cleanup.

use serde::Serialize;
use std::io::Write;
use tracing::{error, info, warn};

use guardpost_core::error::{GuardpostError, ProvisionError};
use guardpost_core::types::{RunContext, SKIP_DESTROY_ENV};
use guardpost_guardduty::{DetectorApi, detector_checks, finding_checks};
use guardpost_terraform::Provisioner;

use crate::output::Render;

/// Terraform output holding the detector id.
pub const DETECTOR_ID_OUTPUT: &str = "aws_guardduty_detector_id";

/// Terraform output holding the event rule name.
pub const EVENT_RULE_OUTPUT: &str = "aws_cloudwatch_event_rule_name";

/// Final report of a successful validation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique test name used for resource naming and tagging.
    pub test_name: String,
    /// Target region.
    pub region: String,
    /// Verified detector id.
    pub detector_id: String,
    /// Provisioned event rule name.
    pub event_rule_name: String,
    /// Number of findings observed on the first page.
    pub finding_count: usize,
    /// Whether teardown ran (false when suppressed by the operator).
    pub destroyed: bool,
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Validation run: {}", self.test_name)?;
        writeln!(w, "  Region:      {}", self.region)?;
        writeln!(w, "  Detector:    {}", self.detector_id)?;
        writeln!(w, "  Event rule:  {}", self.event_rule_name)?;
        writeln!(w, "  Findings:    {}", self.finding_count)?;
        writeln!(
            w,
            "  Teardown:    {}",
            if self.destroyed {
                "destroyed"
            } else {
                "skipped (resources left in place)"
            }
        )?;
        Ok(())
    }
}

/// One validation run over a provisioner / detector API pair.
pub struct ValidationRun<P: Provisioner, D: DetectorApi> {
    ctx: RunContext,
    provisioner: P,
    detector: D,
    min_findings: usize,
}

impl<P: Provisioner, D: DetectorApi> ValidationRun<P, D> {
    /// Create a run over the given collaborators.
    pub fn new(ctx: RunContext, provisioner: P, detector: D, min_findings: usize) -> Self {
        Self {
            ctx,
            provisioner,
            detector,
            min_findings,
        }
    }

    /// Execute the full workflow, tearing down on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the first workflow error, or the teardown error if the
    /// workflow itself succeeded. A teardown failure after a workflow
    /// failure is logged but does not mask the original error.
    pub async fn run(&self) -> Result<RunReport, GuardpostError> {
        info!(
            test_name = self.ctx.test_name.as_str(),
            region = self.ctx.region.as_str(),
            "starting validation run"
        );

        let outcome = self.provision_and_verify().await;
        let teardown = self.teardown().await;

        match (outcome, teardown) {
            (Ok(mut report), Ok(destroyed)) => {
                report.destroyed = destroyed;
                info!(
                    test_name = self.ctx.test_name.as_str(),
                    findings = report.finding_count,
                    destroyed,
                    "validation run succeeded"
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(teardown_err)) => {
                error!(
                    test_name = self.ctx.test_name.as_str(),
                    error = %teardown_err,
                    "teardown failed after run failure; resources may be leaked"
                );
                Err(e)
            }
        }
    }

    async fn provision_and_verify(&self) -> Result<RunReport, GuardpostError> {
        let outputs = self.provisioner.apply().await?;
        let detector_id = outputs.require(DETECTOR_ID_OUTPUT)?;
        let event_rule_name = outputs.require(EVENT_RULE_OUTPUT)?;
        info!(detector_id, event_rule_name, "module outputs extracted");

        let state = self.detector.get_detector(detector_id).await?;
        detector_checks(&state).finish()?;
        info!(detector_id, "detector and log sources verified");

        self.detector.create_sample_findings(detector_id).await?;

        let page = self.detector.list_findings(detector_id).await?;
        finding_checks(&page, self.min_findings).finish()?;
        info!(
            detector_id,
            findings = page.finding_ids.len(),
            "sample findings verified"
        );

        Ok(RunReport {
            test_name: self.ctx.test_name.clone(),
            region: self.ctx.region.clone(),
            detector_id: detector_id.to_owned(),
            event_rule_name: event_rule_name.to_owned(),
            finding_count: page.finding_ids.len(),
            destroyed: false,
        })
    }

    /// Tear down the provisioned resources unless suppressed.
    ///
    /// Returns whether destroy actually ran.
    async fn teardown(&self) -> Result<bool, ProvisionError> {
        if self.ctx.skip_destroy {
            warn!(
                test_name = self.ctx.test_name.as_str(),
                override_var = SKIP_DESTROY_ENV,
                "teardown suppressed; remote resources left in place"
            );
            return Ok(false);
        }

        info!(test_name = self.ctx.test_name.as_str(), "tearing down");
        self.provisioner.destroy().await?;
        Ok(true)
    }
}
