//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Guardpost -- end-to-end validation runner for the GuardDuty terraform module.
///
/// Use `guardpost <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "guardpost", version, about, long_about = None)]
pub struct Cli {
    /// Path to the guardpost.toml configuration file.
    #[arg(short, long, default_value = "guardpost.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full validation workflow (apply, verify, destroy).
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run the validation workflow against one terraform module.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the terraform module directory from the config file.
    #[arg(long)]
    pub module_dir: Option<String>,

    /// Leave the provisioned resources in place after the run.
    #[arg(long)]
    pub skip_destroy: bool,

    /// Override the minimum sample finding count.
    #[arg(long)]
    pub min_findings: Option<usize>,
}

// ---- config ----

/// Manage guardpost configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::try_parse_from(["guardpost", "run"]).expect("should parse 'run'");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.module_dir.is_none(), "module_dir should be None");
                assert!(!args.skip_destroy, "skip_destroy should default to false");
                assert!(args.min_findings.is_none(), "min_findings should be None");
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_module_dir() {
        let cli = Cli::try_parse_from(["guardpost", "run", "--module-dir", "modules/custom"])
            .expect("should parse run with module-dir");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.module_dir.as_deref(), Some("modules/custom"));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_skip_destroy() {
        let cli = Cli::try_parse_from(["guardpost", "run", "--skip-destroy"])
            .expect("should parse run with skip-destroy");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.skip_destroy, "skip_destroy should be true");
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_min_findings() {
        let cli = Cli::try_parse_from(["guardpost", "run", "--min-findings", "10"])
            .expect("should parse run with min-findings");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.min_findings, Some(10));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let cli = Cli::try_parse_from(["guardpost", "config", "validate"])
            .expect("should parse 'config validate'");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Validate => {}
                _ => panic!("expected Validate action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show() {
        let cli = Cli::try_parse_from(["guardpost", "config", "show"])
            .expect("should parse 'config show'");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show => {}
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_custom_config_path() {
        let cli = Cli::try_parse_from(["guardpost", "-c", "/custom/guardpost.toml", "run"])
            .expect("should parse with custom config path");
        assert_eq!(cli.config, PathBuf::from("/custom/guardpost.toml"));
    }

    #[test]
    fn test_cli_parse_log_level() {
        let cli = Cli::try_parse_from(["guardpost", "--log-level", "debug", "run"])
            .expect("should parse with custom log level");
        assert_eq!(cli.log_level, Some("debug".to_owned()));
    }

    #[test]
    fn test_cli_parse_output_format_json() {
        let cli = Cli::try_parse_from(["guardpost", "--output", "json", "run"])
            .expect("should parse with json output format");
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_invalid_command_fails() {
        assert!(Cli::try_parse_from(["guardpost", "deploy"]).is_err());
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        assert!(Cli::try_parse_from(["guardpost"]).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "guardpost");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(subcommands.contains(&"run"), "should have 'run' subcommand");
        assert!(
            subcommands.contains(&"config"),
            "should have 'config' subcommand"
        );
    }
}
