//! 검증 체크 평가 — 모든 실패를 수집하여 한 번에 보고
//!
//! 첫 실패에서 멈추지 않고 독립적인 체크를 전부 평가한 뒤,
//! 실패한 필드 각각에 대해 기대값/실제값을 담아 보고합니다.
//! 어떤 필드가 왜 틀렸는지 한 번의 실행으로 모두 드러나야
//! 원격 리소스를 다시 만들지 않고 디버깅할 수 있습니다.

use tracing::debug;

use guardpost_core::error::VerifyError;
use guardpost_core::types::{CheckFailure, DetectorState, FindingPage};

/// 탐지기와 로그 소스가 가져야 하는 상태 값
pub const ENABLED: &str = "ENABLED";

/// 독립 체크의 결과 수집기
#[derive(Debug, Default)]
pub struct CheckSet {
    failures: Vec<CheckFailure>,
}

impl CheckSet {
    /// 빈 체크 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 값이 기대값과 같은지 체크하고, 다르면 실패를 기록합니다.
    pub fn check_eq(&mut self, field: &str, expected: &str, actual: &str) {
        if actual == expected {
            debug!(field, "check passed");
        } else {
            self.failures
                .push(CheckFailure::new(field, expected, actual));
        }
    }

    /// 조건 체크 — 실패 시 설명적인 기대값/실제값을 기록합니다.
    pub fn check(&mut self, field: &str, ok: bool, expected: &str, actual: &str) {
        if ok {
            debug!(field, "check passed");
        } else {
            self.failures
                .push(CheckFailure::new(field, expected, actual));
        }
    }

    /// 지금까지 기록된 실패 개수
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// 모든 체크가 통과했는지 여부
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// 체크 집합을 결과로 변환합니다. 실패가 하나라도 있으면
    /// [`VerifyError::ChecksFailed`]로 전부 보고됩니다.
    pub fn finish(self) -> Result<(), VerifyError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(VerifyError::ChecksFailed {
                failures: self.failures,
            })
        }
    }
}

/// 탐지기 상태 체크: 전체 상태와 네 가지 로그 소스가 모두 ENABLED여야 합니다.
pub fn detector_checks(state: &DetectorState) -> CheckSet {
    let mut checks = CheckSet::new();
    checks.check_eq("detector status", ENABLED, &state.status);
    checks.check_eq(
        "cloudtrail logs status",
        ENABLED,
        &state.data_sources.cloud_trail.status,
    );
    checks.check_eq("dns logs status", ENABLED, &state.data_sources.dns_logs.status);
    checks.check_eq(
        "flow logs status",
        ENABLED,
        &state.data_sources.flow_logs.status,
    );
    checks.check_eq("s3 logs status", ENABLED, &state.data_sources.s3_logs.status);
    checks
}

/// finding 페이지 체크: 개수가 임계값 이상이고 continuation 토큰이
/// 비어 있지 않아야 합니다 (결과가 한 페이지를 넘었음을 증명).
pub fn finding_checks(page: &FindingPage, min_findings: usize) -> CheckSet {
    let mut checks = CheckSet::new();
    let count = page.finding_ids.len();
    checks.check(
        "finding count",
        count >= min_findings,
        &format!(">= {min_findings}"),
        &count.to_string(),
    );

    let token_state = match page.next_token.as_deref() {
        None => "absent",
        Some("") => "empty",
        Some(_) => "present",
    };
    checks.check(
        "findings continuation token",
        token_state == "present",
        "non-empty token",
        token_state,
    );
    checks
}
