//! 에러 타입 — 도메인별 에러 정의

use crate::types::CheckFailure;

/// Guardpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum GuardpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 프로비저닝 (terraform) 에러
    #[error("provision error: {0}")]
    Provision(#[from] ProvisionError),

    /// 검증 (cloud API) 에러
    #[error("verify error: {0}")]
    Verify(#[from] VerifyError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 환경변수 입력 누락을 포함합니다. `MissingEnv`는 원격 호출 이전에
/// 실행을 중단시키는 치명적 에러입니다 (재시도 없음).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 필수 환경변수가 없거나 비어 있음
    #[error("missing required environment variable: {var}")]
    MissingEnv { var: String },

    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 프로비저닝 collaborator (terraform CLI) 에러
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// 프로세스 실행 실패 (바이너리 없음 등)
    #[error("failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// 명령이 0이 아닌 종료 코드로 끝남
    #[error("'{command}' failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// 기대한 출력 키가 출력 집합에 없음
    #[error("missing terraform output: {key}")]
    MissingOutput { key: String },

    /// `terraform output -json` 파싱 실패
    #[error("failed to parse terraform output: {reason}")]
    OutputParse { reason: String },

    /// 변수 파일 생성/직렬화 실패
    #[error("failed to write var file: {reason}")]
    VarFile { reason: String },
}

/// 검증 collaborator (cloud API) 에러
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// API 호출 실패 — 진행 중인 단계에 치명적, 재시도하지 않음
    #[error("guardduty {operation} failed: {reason}")]
    Api { operation: String, reason: String },

    /// API 응답 파싱 실패
    #[error("failed to parse {operation} response: {reason}")]
    ResponseParse { operation: String, reason: String },

    /// 잘못된 입력 식별자 (CLI 호출 전에 거부)
    #[error("invalid detector id: {reason}")]
    InvalidDetectorId { reason: String },

    /// 하나 이상의 검증 체크 실패 — 모든 실패를 수집하여 보고
    #[error("verification checks failed: {}", join_failures(failures))]
    ChecksFailed { failures: Vec<CheckFailure> },
}

fn join_failures(failures: &[CheckFailure]) -> String {
    failures
        .iter()
        .map(CheckFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_display_names_variable() {
        let err = ConfigError::MissingEnv {
            var: "AWS_DEFAULT_REGION".to_owned(),
        };
        assert!(err.to_string().contains("AWS_DEFAULT_REGION"));
    }

    #[test]
    fn command_failed_display_includes_stderr() {
        let err = ProvisionError::CommandFailed {
            command: "terraform apply".to_owned(),
            status: "exit status: 1".to_owned(),
            stderr: "Error: creating GuardDuty Detector".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("terraform apply"));
        assert!(msg.contains("creating GuardDuty Detector"));
    }

    #[test]
    fn missing_output_display_names_key() {
        let err = ProvisionError::MissingOutput {
            key: "aws_guardduty_detector_id".to_owned(),
        };
        assert!(err.to_string().contains("aws_guardduty_detector_id"));
    }

    #[test]
    fn checks_failed_display_lists_every_field() {
        let err = VerifyError::ChecksFailed {
            failures: vec![
                CheckFailure::new("detector status", "ENABLED", "DISABLED"),
                CheckFailure::new("dns logs status", "ENABLED", "DISABLED"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("detector status"));
        assert!(msg.contains("dns logs status"));
        assert!(msg.contains("DISABLED"));
    }

    #[test]
    fn api_error_display_names_operation() {
        let err = VerifyError::Api {
            operation: "create-sample-findings".to_owned(),
            reason: "AccessDeniedException".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("create-sample-findings"));
        assert!(msg.contains("AccessDeniedException"));
    }

    #[test]
    fn domain_errors_convert_to_guardpost_error() {
        let err: GuardpostError = ConfigError::MissingEnv {
            var: "AWS_DEFAULT_REGION".to_owned(),
        }
        .into();
        assert!(matches!(err, GuardpostError::Config(_)));

        let err: GuardpostError = ProvisionError::MissingOutput {
            key: "k".to_owned(),
        }
        .into();
        assert!(matches!(err, GuardpostError::Provision(_)));

        let err: GuardpostError = VerifyError::ChecksFailed {
            failures: Vec::new(),
        }
        .into();
        assert!(matches!(err, GuardpostError::Verify(_)));
    }
}
