//! Terraform 호출 옵션 — 모듈 경로, 변수 번들, 환경 번들
//!
//! 원본 워크플로의 "initialize and apply" 호출 인자에 해당합니다:
//! 대상 모듈 경로, 변수(테스트 이름, 태그 맵), 전파할 환경변수(리전).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use guardpost_core::config::TerraformConfig;

/// 한 모듈 인스턴스에 대한 terraform 호출 옵션
#[derive(Debug, Clone)]
pub struct TerraformOptions {
    /// 대상 모듈 디렉토리
    pub module_dir: PathBuf,
    /// terraform 변수 (JSON 값으로 `*.tfvars.json`에 직렬화됨)
    pub vars: BTreeMap<String, serde_json::Value>,
    /// 자식 프로세스에 병합할 환경변수
    pub env: BTreeMap<String, String>,
    /// terraform 바이너리 경로 또는 이름
    pub binary: String,
    /// 일시적 에러 재시도 횟수
    pub max_retries: u32,
    /// 재시도 백오프 기본 간격
    pub retry_backoff: Duration,
    /// 단일 명령 타임아웃
    pub command_timeout: Duration,
}

impl TerraformOptions {
    /// 기본 설정으로 옵션을 생성합니다.
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&TerraformConfig::default(), module_dir)
    }

    /// 설정 섹션과 모듈 경로로부터 옵션을 생성합니다.
    pub fn from_config(config: &TerraformConfig, module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            vars: BTreeMap::new(),
            env: BTreeMap::new(),
            binary: config.binary.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }

    /// terraform 변수를 추가합니다.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// 자식 프로세스 환경변수를 추가합니다.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// 바이너리를 교체합니다 (테스트에서 가짜 스크립트를 지정할 때 사용).
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// 재시도 횟수를 설정합니다.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 재시도 백오프 간격을 설정합니다.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// 명령 타임아웃을 설정합니다.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_config_defaults() {
        let opts = TerraformOptions::new("modules/simple");
        assert_eq!(opts.binary, "terraform");
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.command_timeout, Duration::from_secs(1800));
        assert!(opts.vars.is_empty());
        assert!(opts.env.is_empty());
    }

    #[test]
    fn builder_accumulates_vars_and_env() {
        let opts = TerraformOptions::new("modules/simple")
            .with_var("test_name", "guardpost-simple-abc")
            .with_var("tags", serde_json::json!({"Automation": "Terraform"}))
            .with_env("AWS_DEFAULT_REGION", "us-east-1");

        assert_eq!(
            opts.vars.get("test_name"),
            Some(&serde_json::json!("guardpost-simple-abc"))
        );
        assert_eq!(
            opts.env.get("AWS_DEFAULT_REGION").map(String::as_str),
            Some("us-east-1")
        );
    }

    #[test]
    fn from_config_copies_retry_knobs() {
        let config = TerraformConfig {
            binary: "/opt/terraform".to_owned(),
            max_retries: 7,
            retry_backoff_secs: 2,
            command_timeout_secs: 60,
        };
        let opts = TerraformOptions::from_config(&config, "m");
        assert_eq!(opts.binary, "/opt/terraform");
        assert_eq!(opts.max_retries, 7);
        assert_eq!(opts.retry_backoff, Duration::from_secs(2));
        assert_eq!(opts.command_timeout, Duration::from_secs(60));
    }
}
