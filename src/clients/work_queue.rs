//! 作業キュー
//!
//! メッセージ本文は `{"requestId": ..., "rows": [...]}` の JSON テキスト。

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::EnqueuedWork;

/// 作業メッセージの投入先
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn send(&self, work: &EnqueuedWork) -> AppResult<()>;
}

/// SQS 実装
pub struct SqsWorkQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsWorkQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl WorkQueue for SqsWorkQueue {
    async fn send(&self, work: &EnqueuedWork) -> AppResult<()> {
        let body = serde_json::to_string(work)?;
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(AppError::queue_send_failed)?;
        debug!(
            "メッセージを投入しました: requestId={} rows={}",
            work.request_id,
            work.rows.len()
        );
        Ok(())
    }
}

/// インメモリ実装（テスト用）
#[derive(Default)]
pub struct MemoryWorkQueue {
    messages: Mutex<Vec<EnqueuedWork>>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに送信されたメッセージの複製
    pub async fn sent(&self) -> Vec<EnqueuedWork> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn send(&self, work: &EnqueuedWork) -> AppResult<()> {
        self.messages.lock().await.push(work.clone());
        Ok(())
    }
}
