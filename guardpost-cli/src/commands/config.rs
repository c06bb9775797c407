//! `guardpost config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use guardpost_core::config::GuardpostConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show => execute_show(config_path, writer).await,
    }
}

/// Execute the config validate subcommand.
///
/// Attempts to load and validate the configuration file, reporting any
/// errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (missing file, invalid
/// values, parse errors).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let result = GuardpostConfig::load(config_path).await;

    let report = match result {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Loads and displays the effective configuration (file + env overrides
/// + defaults). A missing file is not an error here; the defaults are
/// shown instead.
async fn execute_show(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = GuardpostConfig::load_or_default(config_path).await?;

    let report = ConfigReport {
        source: config_path.display().to_string(),
        config_toml: toml::to_string_pretty(&config)
            .unwrap_or_else(|e| format!("(serialization error: {})", e)),
    };

    writer.render(&report)?;
    Ok(())
}

/// Effective configuration rendered as TOML.
#[derive(Debug, Serialize)]
struct ConfigReport {
    source: String,
    config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "# source: {}", self.source)?;
        writeln!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Validation result for a configuration file.
#[derive(Debug, Serialize)]
struct ConfigValidationReport {
    source: String,
    valid: bool,
    errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.valid {
            writeln!(w, "{}: OK", self.source)?;
        } else {
            writeln!(w, "{}: INVALID", self.source)?;
            for error in &self.errors {
                writeln!(w, "  - {}", error)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_report_text_lists_errors() {
        let report = ConfigValidationReport {
            source: "guardpost.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'run.min_findings'".to_owned()],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("INVALID"));
        assert!(text.contains("run.min_findings"));
    }

    #[test]
    fn validation_report_text_ok() {
        let report = ConfigValidationReport {
            source: "guardpost.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        assert!(String::from_utf8(buffer).unwrap().contains("OK"));
    }

    #[test]
    fn config_report_text_includes_source_and_toml() {
        let config = GuardpostConfig::default();
        let report = ConfigReport {
            source: "guardpost.toml".to_owned(),
            config_toml: toml::to_string_pretty(&config).unwrap(),
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("# source: guardpost.toml"));
        assert!(text.contains("name_prefix"));
    }
}
