//! 도메인 타입 — 검증 실행 전역에서 공유되는 데이터 구조
//!
//! 실행 컨텍스트([`RunContext`]), Terraform 출력 집합([`OutputSet`]),
//! GuardDuty API 응답([`DetectorState`], [`FindingPage`]),
//! 체크 실패 레코드([`CheckFailure`])를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::{ConfigError, ProvisionError};

/// 대상 리전을 지정하는 필수 환경변수
pub const AWS_REGION_ENV: &str = "AWS_DEFAULT_REGION";

/// teardown 억제용 오퍼레이터 오버라이드 환경변수
pub const SKIP_DESTROY_ENV: &str = "GUARDPOST_SKIP_DESTROY";

/// teardown을 억제하는 센티넬 값 (`GUARDPOST_SKIP_DESTROY=1`)
pub const SKIP_DESTROY_SENTINEL: &str = "1";

/// 한 번의 검증 실행에 대한 불변 컨텍스트
///
/// 실행 시작 시 한 번 생성되며, 실행이 끝날 때까지 변경되지 않습니다.
/// `test_name`은 동시에 실행되는 다른 인스턴스와 충돌하지 않도록
/// uuid v4 기반으로 생성됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    /// 대상 리전 (AWS_DEFAULT_REGION)
    pub region: String,
    /// 고유 테스트 이름 (`{prefix}-{uuid}` 소문자)
    pub test_name: String,
    /// 리소스에 부착할 태그
    pub tags: BTreeMap<String, String>,
    /// teardown 억제 여부
    pub skip_destroy: bool,
}

impl RunContext {
    /// 환경변수와 실행 설정으로부터 컨텍스트를 생성합니다.
    ///
    /// `AWS_DEFAULT_REGION`이 없거나 비어 있으면 원격 호출 이전에
    /// [`ConfigError::MissingEnv`]로 즉시 실패합니다.
    pub fn from_env(run: &RunConfig) -> Result<Self, ConfigError> {
        let region = std::env::var(AWS_REGION_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv {
                var: AWS_REGION_ENV.to_owned(),
            })?;

        let skip_destroy = run.skip_destroy
            || std::env::var(SKIP_DESTROY_ENV).is_ok_and(|v| v == SKIP_DESTROY_SENTINEL);

        let test_name = unique_test_name(&run.name_prefix);

        let mut tags = run.tags.clone();
        tags.insert("TestRun".to_owned(), test_name.clone());

        Ok(Self {
            region,
            test_name,
            tags,
            skip_destroy,
        })
    }
}

/// 접두사 + 소문자 uuid v4로 고유 테스트 이름을 생성합니다.
///
/// 동시 실행 간 리소스 이름 충돌 방지는 이 난수 식별자에 위임됩니다.
pub fn unique_test_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// `terraform output -json`에서 한 번 읽어들인 출력 이름 → 값 매핑
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSet(BTreeMap<String, String>);

impl OutputSet {
    /// 매핑으로부터 출력 집합을 생성합니다.
    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    /// 출력 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// 필수 출력 값을 조회합니다. 키가 없으면 치명적 에러입니다.
    pub fn require(&self, key: &str) -> Result<&str, ProvisionError> {
        self.get(key).ok_or_else(|| ProvisionError::MissingOutput {
            key: key.to_owned(),
        })
    }

    /// 출력 개수
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 출력이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `aws guardduty get-detector` 응답에서 검증 대상이 되는 부분
///
/// 필드명은 AWS CLI JSON 출력 키를 그대로 따릅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorState {
    /// 탐지기 전체 상태 ("ENABLED" / "DISABLED")
    #[serde(rename = "Status")]
    pub status: String,
    /// 로그 소스별 상태
    #[serde(rename = "DataSources")]
    pub data_sources: DataSourceStatuses,
}

/// 네 가지 로그 소스 카테고리별 상태
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceStatuses {
    /// 감사 추적 로그 (CloudTrail)
    #[serde(rename = "CloudTrail")]
    pub cloud_trail: SourceStatus,
    /// DNS 로그
    #[serde(rename = "DNSLogs")]
    pub dns_logs: SourceStatus,
    /// 네트워크 플로우 로그
    #[serde(rename = "FlowLogs")]
    pub flow_logs: SourceStatus,
    /// 스토리지 접근 로그 (S3)
    #[serde(rename = "S3Logs")]
    pub s3_logs: SourceStatus,
}

/// 단일 로그 소스의 상태
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    /// "ENABLED" / "DISABLED"
    #[serde(rename = "Status")]
    pub status: String,
}

/// `aws guardduty list-findings` 응답의 첫 페이지
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingPage {
    /// finding 식별자 목록
    #[serde(rename = "FindingIds", default)]
    pub finding_ids: Vec<String>,
    /// 페이지네이션 continuation 토큰 — 존재하면 결과가 한 페이지를 넘음
    #[serde(rename = "NextToken", default)]
    pub next_token: Option<String>,
}

/// 단일 검증 체크 실패 — 어떤 필드가 왜 실패했는지 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    /// 실패한 필드 이름 (예: "detector status")
    pub field: String,
    /// 기대값
    pub expected: String,
    /// 실제값
    pub actual: String,
}

impl CheckFailure {
    /// 체크 실패 레코드를 생성합니다.
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}
