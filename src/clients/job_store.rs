//! ジョブ状態の永続ストア
//!
//! キーは requestId。属性は status / createdAt / results / error。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Number, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult, StoreError};
use crate::models::{Job, JobStatus};

/// ジョブレコードの読み書き
#[async_trait]
pub trait JobStore: Send + Sync {
    /// レコードを書き込む（同一キーは上書き）
    async fn put(&self, job: &Job) -> AppResult<()>;
    /// キーでレコードを取得する
    async fn get(&self, request_id: &str) -> AppResult<Option<Job>>;
}

/// DynamoDB 実装
pub struct DynamoJobStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoJobStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl JobStore for DynamoJobStore {
    async fn put(&self, job: &Job) -> AppResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table)
            .item("requestId", AttributeValue::S(job.request_id.clone()))
            .item(
                "status",
                AttributeValue::S(job.status.as_str().to_string()),
            )
            .item("createdAt", AttributeValue::N(job.created_at.to_string()));
        if let Some(results) = &job.results {
            request = request.item(
                "results",
                AttributeValue::L(results.iter().map(json_to_attr).collect()),
            );
        }
        if let Some(error) = &job.error {
            request = request.item("error", AttributeValue::S(error.clone()));
        }

        request
            .send()
            .await
            .map_err(AppError::store_put_failed)?;
        debug!("レコードを書き込みました: requestId={}", job.request_id);
        Ok(())
    }

    async fn get(&self, request_id: &str) -> AppResult<Option<Job>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("requestId", AttributeValue::S(request_id.to_string()))
            .send()
            .await
            .map_err(AppError::store_get_failed)?;

        match output.item {
            None => Ok(None),
            Some(item) => Ok(Some(job_from_item(request_id, &item)?)),
        }
    }
}

/// DynamoDB のレコードを Job へ復元する
fn job_from_item(
    request_id: &str,
    item: &HashMap<String, AttributeValue>,
) -> AppResult<Job> {
    let status = match item.get("status") {
        Some(AttributeValue::S(s)) => JobStatus::from(s.as_str()),
        _ => {
            return Err(AppError::Store(StoreError::MalformedRecord {
                request_id: request_id.to_string(),
                detail: "status 属性がありません".to_string(),
            }))
        }
    };
    let created_at = match item.get("createdAt") {
        Some(AttributeValue::N(n)) => n.parse().unwrap_or(0),
        _ => 0,
    };
    let results = match item.get("results") {
        Some(AttributeValue::L(list)) => Some(list.iter().map(attr_to_json).collect()),
        _ => None,
    };
    let error = match item.get("error") {
        Some(AttributeValue::S(s)) => Some(s.clone()),
        _ => None,
    };
    Ok(Job {
        request_id: request_id.to_string(),
        status,
        created_at,
        results,
        error,
    })
}

/// JSON 値を DynamoDB の属性値へ変換する
fn json_to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attr(v)))
                .collect(),
        ),
    }
}

/// DynamoDB の属性値を JSON 値へ変換する
fn attr_to_json(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .ok()
            .map(|i| Value::Number(i.into()))
            .or_else(|| {
                n.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or(Value::Null),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(items) => Value::Array(items.iter().map(attr_to_json).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), attr_to_json(v)))
                .collect(),
        ),
        // 本システムが書き込まない型
        _ => Value::Null,
    }
}

/// インメモリ実装（テスト・ローカル実行用）
#[derive(Default)]
pub struct MemoryJobStore {
    items: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保持しているレコード数
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// テスト確認用にレコードを複製して返す
    pub async fn get_cloned(&self, request_id: &str) -> Option<Job> {
        self.items.read().await.get(request_id).cloned()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: &Job) -> AppResult<()> {
        self.items
            .write()
            .await
            .insert(job.request_id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, request_id: &str) -> AppResult<Option<Job>> {
        Ok(self.items.read().await.get(request_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_attr_round_trip() {
        let value = json!({
            "date": "2026/08/01",
            "amount": 540,
            "transfer": false,
            "legs": ["東京", "品川"],
        });
        let attr = json_to_attr(&value);
        assert_eq!(attr_to_json(&attr), value);
    }

    #[test]
    fn float_numbers_survive_conversion() {
        let value = json!(12.5);
        assert_eq!(attr_to_json(&json_to_attr(&value)), value);
    }

    #[test]
    fn item_without_status_is_malformed() {
        let mut item = HashMap::new();
        item.insert(
            "requestId".to_string(),
            AttributeValue::S("abc".to_string()),
        );
        let result = job_from_item("abc", &item);
        assert!(matches!(
            result,
            Err(AppError::Store(StoreError::MalformedRecord { .. }))
        ));
    }

    #[test]
    fn item_with_unknown_status_passes_through() {
        let mut item = HashMap::new();
        item.insert(
            "status".to_string(),
            AttributeValue::S("RETRYING".to_string()),
        );
        item.insert(
            "createdAt".to_string(),
            AttributeValue::N("1754000000".to_string()),
        );
        let job = job_from_item("abc", &item).unwrap();
        assert_eq!(job.status, JobStatus::Other("RETRYING".to_string()));
        assert_eq!(job.created_at, 1_754_000_000);
    }
}
