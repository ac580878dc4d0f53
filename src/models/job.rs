use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// FAILED レコードにエラーメッセージが残っていない場合の既定文言
pub const GENERIC_FAILURE_MESSAGE: &str = "サーバー側で予期せぬエラーが発生しました。";

/// ジョブの状態
///
/// ストアには文字列で保存される。既知の 3 状態以外は
/// `Other` として保存値をそのまま保持する（ポーリング応答で素通しするため）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s {
            "PROCESSING" => JobStatus::Processing,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(JobStatus::from(s.as_str()))
    }
}

/// 非同期ジョブの永続レコード
///
/// `request_id` が唯一のキー。submit 時に PROCESSING で作成され、
/// 後段のコンシューマが一度だけ終端状態へ遷移させる。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub status: JobStatus,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// 処理予約レコードを作成する
    pub fn reservation(request_id: String, created_at: i64) -> Self {
        Self {
            request_id,
            status: JobStatus::Processing,
            created_at,
            results: None,
            error: None,
        }
    }
}

/// キューに渡す作業メッセージ
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnqueuedWork {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub rows: Vec<Value>,
}

/// ポーリング応答
///
/// `{status}` / `{status, results}` / `{status, errorMessage}` のいずれかの
/// JSON 形状になる。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PollReport {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PollReport {
    pub fn processing() -> Self {
        Self::with_status(JobStatus::Processing)
    }

    pub fn completed(results: Vec<Value>) -> Self {
        Self {
            status: JobStatus::Completed,
            results: Some(results),
            error_message: None,
        }
    }

    pub fn failed(error_message: String) -> Self {
        Self {
            status: JobStatus::Failed,
            results: None,
            error_message: Some(error_message),
        }
    }

    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            results: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_round_trip() {
        assert_eq!(JobStatus::from("PROCESSING"), JobStatus::Processing);
        assert_eq!(JobStatus::from("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::from("FAILED"), JobStatus::Failed);
        assert_eq!(JobStatus::Processing.as_str(), "PROCESSING");
    }

    #[test]
    fn unknown_status_passes_through_verbatim() {
        let status = JobStatus::from("CANCELLED");
        assert_eq!(status, JobStatus::Other("CANCELLED".to_string()));
        assert_eq!(status.as_str(), "CANCELLED");
    }

    #[test]
    fn poll_report_json_shapes() {
        let processing = serde_json::to_value(PollReport::processing()).unwrap();
        assert_eq!(processing, json!({ "status": "PROCESSING" }));

        let completed =
            serde_json::to_value(PollReport::completed(vec![json!({"day": "20250101"})])).unwrap();
        assert_eq!(
            completed,
            json!({ "status": "COMPLETED", "results": [{"day": "20250101"}] })
        );

        let failed = serde_json::to_value(PollReport::failed("経路が不正です".to_string())).unwrap();
        assert_eq!(
            failed,
            json!({ "status": "FAILED", "errorMessage": "経路が不正です" })
        );
    }

    #[test]
    fn enqueued_work_body_shape() {
        let work = EnqueuedWork {
            request_id: "abc".to_string(),
            rows: vec![json!({"from": "東京", "to": "品川"})],
        };
        let body = serde_json::to_string(&work).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["requestId"], "abc");
        assert_eq!(value["rows"][0]["from"], "東京");
    }
}
