//! 설정 관리 — guardpost.toml 파싱 및 런타임 설정
//!
//! [`GuardpostConfig`]는 검증 실행의 모든 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`GUARDPOST_RUN_MODULE_DIR=modules/simple` 형식)
//! 3. 설정 파일 (`guardpost.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! 대상 리전(`AWS_DEFAULT_REGION`)과 teardown 억제 센티넬
//! (`GUARDPOST_SKIP_DESTROY=1`)은 설정 파일이 아니라 환경변수에서만
//! 읽습니다. [`crate::types::RunContext::from_env`]를 참조하세요.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, GuardpostError};

/// Guardpost 통합 설정
///
/// `guardpost.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardpostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 검증 실행 설정
    #[serde(default)]
    pub run: RunConfig,
    /// Terraform collaborator 설정
    #[serde(default)]
    pub terraform: TerraformConfig,
    /// AWS CLI collaborator 설정
    #[serde(default)]
    pub aws: AwsConfig,
}

impl GuardpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GuardpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 존재하면 로드하고, 없으면 기본값에 환경변수 오버라이드만
    /// 적용합니다. 원본 워크플로에는 설정 파일이 필수가 아니므로
    /// 기본 경로가 없을 때를 에러로 취급하지 않습니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, GuardpostError> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            debug!(path = %path.display(), "config file absent, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GuardpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GuardpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GuardpostError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, GuardpostError> {
        toml::from_str(toml_str).map_err(|e| {
            GuardpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `GUARDPOST_{SECTION}_{FIELD}`
    /// 예: `GUARDPOST_TERRAFORM_MAX_RETRIES=5`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "GUARDPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "GUARDPOST_GENERAL_LOG_FORMAT");

        // Run
        override_string(&mut self.run.name_prefix, "GUARDPOST_RUN_NAME_PREFIX");
        override_string(&mut self.run.module_dir, "GUARDPOST_RUN_MODULE_DIR");
        override_usize(&mut self.run.min_findings, "GUARDPOST_RUN_MIN_FINDINGS");
        override_bool(&mut self.run.skip_destroy, "GUARDPOST_RUN_SKIP_DESTROY");

        // Terraform
        override_string(&mut self.terraform.binary, "GUARDPOST_TERRAFORM_BINARY");
        override_u32(
            &mut self.terraform.max_retries,
            "GUARDPOST_TERRAFORM_MAX_RETRIES",
        );
        override_u64(
            &mut self.terraform.retry_backoff_secs,
            "GUARDPOST_TERRAFORM_RETRY_BACKOFF_SECS",
        );
        override_u64(
            &mut self.terraform.command_timeout_secs,
            "GUARDPOST_TERRAFORM_COMMAND_TIMEOUT_SECS",
        );

        // AWS
        override_string(&mut self.aws.binary, "GUARDPOST_AWS_BINARY");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), GuardpostError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // name_prefix는 클라우드 리소스 이름에 들어가므로 제약을 강제
        if self.run.name_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "run.name_prefix".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }
        if !self
            .run
            .name_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::InvalidValue {
                field: "run.name_prefix".to_owned(),
                reason: "must contain only lowercase letters, digits, and '-'".to_owned(),
            }
            .into());
        }

        if self.run.module_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "run.module_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.run.min_findings == 0 {
            return Err(ConfigError::InvalidValue {
                field: "run.min_findings".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        if self.terraform.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "terraform.command_timeout_secs".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 검증 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// 테스트 이름 접두사 (소문자, 숫자, '-'만 허용)
    pub name_prefix: String,
    /// 검증 대상 Terraform 모듈 경로
    pub module_dir: String,
    /// 리소스에 부착할 태그
    pub tags: BTreeMap<String, String>,
    /// finding 개수 최소 임계값
    pub min_findings: usize,
    /// teardown 억제 (환경변수 `GUARDPOST_SKIP_DESTROY=1`로도 설정 가능)
    pub skip_destroy: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("Automation".to_owned(), "Terraform".to_owned());
        tags.insert("Tool".to_owned(), "guardpost".to_owned());
        Self {
            name_prefix: "guardpost-simple".to_owned(),
            module_dir: "modules/simple".to_owned(),
            tags,
            min_findings: 5,
            skip_destroy: false,
        }
    }
}

/// Terraform collaborator 설정
///
/// 일시적 에러에 대한 재시도는 이 레이어의 책임입니다.
/// 오케스트레이터는 재시도하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// terraform 바이너리 경로 또는 이름
    pub binary: String,
    /// 일시적 에러 재시도 최대 횟수
    pub max_retries: u32,
    /// 재시도 백오프 기본 간격 (초)
    pub retry_backoff_secs: u64,
    /// 단일 명령 타임아웃 (초)
    pub command_timeout_secs: u64,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_owned(),
            max_retries: 3,
            retry_backoff_secs: 5,
            command_timeout_secs: 1800,
        }
    }
}

/// AWS CLI collaborator 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// aws 바이너리 경로 또는 이름
    pub binary: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            binary: "aws".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
