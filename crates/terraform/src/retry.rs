//! 일시적 에러 재시도 정책
//!
//! 프로비저닝 도구는 네트워크 단절이나 API 쓰로틀링 같은 일시적 에러로
//! 실패할 수 있습니다. 이 모듈은 stderr 부분 문자열 매칭으로 재시도
//! 가능 여부를 판단하고 선형 백오프 간격을 계산합니다.
//!
//! 재시도는 프로비저닝 레이어의 책임입니다. 검증 오케스트레이터는
//! 어떤 단계도 재시도하지 않습니다.

use std::time::Duration;

/// 기본으로 재시도 대상으로 간주하는 stderr 부분 문자열
///
/// 프로바이더 플러그인과 AWS API에서 관찰되는 일시적 실패들입니다.
pub const DEFAULT_RETRYABLE_ERRORS: &[&str] = &[
    "RequestError: send request failed",
    "connection reset by peer",
    "TLS handshake timeout",
    "unexpected EOF",
    "Throttling",
    "ThrottlingException",
    "timeout while waiting for plugin to start",
    "could not query provider registry",
    "Error installing provider",
];

/// 재시도 정책 — 최대 횟수, 백오프 간격, 재시도 가능 패턴
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 최초 시도 이후 추가로 허용하는 재시도 횟수
    pub max_retries: u32,
    /// 선형 백오프 기본 간격 (n번째 재시도 전에 `base * n` 대기)
    pub backoff_base: Duration,
    patterns: Vec<String>,
}

impl RetryPolicy {
    /// 기본 패턴 집합으로 정책을 생성합니다.
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
            patterns: DEFAULT_RETRYABLE_ERRORS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }

    /// 재시도하지 않는 정책
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base: Duration::ZERO,
            patterns: Vec::new(),
        }
    }

    /// 패턴을 추가합니다.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// stderr가 재시도 가능한 실패인지 판단합니다.
    pub fn is_retryable(&self, stderr: &str) -> bool {
        self.patterns.iter().any(|p| stderr.contains(p.as_str()))
    }

    /// n번째 재시도 전 대기 시간 (attempt는 1부터 시작)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_match_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert!(policy.is_retryable(
            "Error: error creating GuardDuty Detector: RequestError: send request failed"
        ));
        assert!(policy.is_retryable("read tcp 10.0.0.1:443: connection reset by peer"));
        assert!(policy.is_retryable("ThrottlingException: Rate exceeded"));
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert!(!policy.is_retryable("Error: Unsupported argument on main.tf line 4"));
        assert!(!policy.is_retryable("AccessDeniedException: not authorized"));
        assert!(!policy.is_retryable(""));
    }

    #[test]
    fn none_policy_retries_nothing() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert!(!policy.is_retryable("connection reset by peer"));
    }

    #[test]
    fn custom_pattern_extends_defaults() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1))
            .with_pattern("state lock could not be acquired");
        assert!(policy.is_retryable("Error: state lock could not be acquired"));
        assert!(policy.is_retryable("Throttling"));
    }

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(15));
    }
}
