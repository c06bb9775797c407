//! guardpost 바이너리 엔트리포인트
//!
//! 설정 로딩, 로깅 초기화, 서브커맨드 디스패치를 담당합니다.
//! 실패는 [`CliError::exit_code`] 매핑에 따라 종료 코드로 변환됩니다.

use std::process::ExitCode;

use clap::Parser;

use guardpost_cli::cli::{Cli, Commands};
use guardpost_cli::commands;
use guardpost_cli::error::CliError;
use guardpost_cli::logging;
use guardpost_cli::output::OutputWriter;

use guardpost_core::config::GuardpostConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 로깅 초기화 전에 실패했을 수 있으므로 stderr에도 출력
            eprintln!("error: {e}");
            tracing::error!(error = %e, "guardpost failed");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = GuardpostConfig::load_or_default(&cli.config).await?;
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }

    logging::init_tracing(&config.general)?;

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
