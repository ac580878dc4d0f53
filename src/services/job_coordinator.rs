//! ジョブ調停サービス - 業務能力層
//!
//! 行データの一括投入を「予約 → キュー投入」の順で受け付け、
//! ポーリングに対して現在の状態を報告する。実際のポータル操作は
//! キューの先にいるコンシューマが行う（本リポジトリの対象外）。

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::clients::{JobStore, WorkQueue};
use crate::error::{AppError, AppResult, ValidationError};
use crate::models::{EnqueuedWork, Job, JobStatus, PollReport, GENERIC_FAILURE_MESSAGE};

/// ジョブ調停サービス
pub struct JobCoordinator {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// 行データの一括投入を受け付け、相関 ID を返す
    ///
    /// 予約レコードを先に書き、その後でキューへ投入する。
    /// この順序により、受付直後のポーリングでも必ず PROCESSING が見える。
    pub async fn submit(&self, rows: Vec<Value>) -> AppResult<String> {
        if rows.is_empty() {
            return Err(AppError::Validation(ValidationError::EmptyRows));
        }

        let request_id = Uuid::new_v4().to_string();
        let job = Job::reservation(request_id.clone(), Utc::now().timestamp());
        self.store.put(&job).await?;

        if let Err(e) = self
            .queue
            .send(&EnqueuedWork {
                request_id: request_id.clone(),
                rows,
            })
            .await
        {
            // 予約済みレコードは PROCESSING のまま残る。補償削除は行わない。
            error!(
                "キュー投入に失敗しました (requestId: {}): {}",
                request_id, e
            );
            return Err(e);
        }

        info!("ジョブを受け付けました: requestId={}", request_id);
        Ok(request_id)
    }

    /// ジョブの現在状態を報告する
    ///
    /// レコード未着は「処理中」と同一視する（整合遅延を呼び出し側に
    /// 有利に倒す取り決め）。
    pub async fn poll(&self, request_id: &str) -> AppResult<PollReport> {
        if request_id.is_empty() {
            return Err(AppError::Validation(ValidationError::MissingRequestId));
        }

        let report = match self.store.get(request_id).await? {
            None => PollReport::processing(),
            Some(job) => match job.status {
                JobStatus::Completed => PollReport::completed(job.results.unwrap_or_default()),
                JobStatus::Failed => PollReport::failed(
                    job.error
                        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
                ),
                other => PollReport::with_status(other),
            },
        };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MemoryJobStore, MemoryWorkQueue};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio_test::assert_ok;

    /// 常に送信に失敗するキュー
    struct FailingQueue;

    #[async_trait]
    impl WorkQueue for FailingQueue {
        async fn send(&self, _work: &EnqueuedWork) -> AppResult<()> {
            Err(AppError::queue_send_failed(std::io::Error::other(
                "接続できません",
            )))
        }
    }

    fn coordinator() -> (JobCoordinator, Arc<MemoryJobStore>, Arc<MemoryWorkQueue>) {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryWorkQueue::new());
        (
            JobCoordinator::new(store.clone(), queue.clone()),
            store,
            queue,
        )
    }

    fn sample_rows() -> Vec<Value> {
        vec![
            json!({"date": "2026/08/01", "patternId": "101"}),
            json!({"date": "2026/08/04", "patternId": "102"}),
        ]
    }

    #[tokio::test]
    async fn submit_rejects_empty_rows_without_side_effects() {
        let (coordinator, store, queue) = coordinator();

        let result = coordinator.submit(Vec::new()).await;
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::EmptyRows))
        ));
        assert_eq!(store.len().await, 0);
        assert!(queue.sent().await.is_empty());
    }

    #[tokio::test]
    async fn submit_reserves_before_enqueue_and_immediate_poll_sees_processing() {
        let (coordinator, store, queue) = coordinator();

        let request_id = assert_ok!(coordinator.submit(sample_rows()).await);
        assert_ok!(Uuid::parse_str(&request_id));

        // 予約レコードとキューの両方に同じ相関 ID がある
        let job = store.get_cloned(&request_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        let sent = queue.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].request_id, request_id);
        assert_eq!(sent[0].rows, sample_rows());

        // 受付直後のポーリングは PROCESSING
        let report = assert_ok!(coordinator.poll(&request_id).await);
        assert_eq!(report, PollReport::processing());
    }

    #[tokio::test]
    async fn submit_generates_fresh_ids() {
        let (coordinator, _store, _queue) = coordinator();
        let first = assert_ok!(coordinator.submit(sample_rows()).await);
        let second = assert_ok!(coordinator.submit(sample_rows()).await);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn enqueue_failure_leaves_reservation_in_place() {
        let store = Arc::new(MemoryJobStore::new());
        let coordinator = JobCoordinator::new(store.clone(), Arc::new(FailingQueue));

        let result = coordinator.submit(sample_rows()).await;
        assert!(matches!(result, Err(AppError::Queue(_))));

        // 予約は残ったまま（補償削除しない取り決め）
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn poll_rejects_missing_request_id() {
        let (coordinator, _store, _queue) = coordinator();
        let result = coordinator.poll("").await;
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::MissingRequestId))
        ));
    }

    #[tokio::test]
    async fn poll_unknown_id_reports_processing() {
        let (coordinator, _store, _queue) = coordinator();
        let report = assert_ok!(coordinator.poll("763d79a8-0000-0000-0000-000000000000").await);
        assert_eq!(report, PollReport::processing());
    }

    #[tokio::test]
    async fn poll_completed_returns_stored_results_verbatim() {
        let (coordinator, store, _queue) = coordinator();
        let results = vec![json!({"day": "20260801", "ok": true}), json!("済")];
        store
            .put(&Job {
                request_id: "done-1".to_string(),
                status: JobStatus::Completed,
                created_at: 1_754_000_000,
                results: Some(results.clone()),
                error: None,
            })
            .await
            .unwrap();

        let report = assert_ok!(coordinator.poll("done-1").await);
        assert_eq!(report, PollReport::completed(results));
    }

    #[tokio::test]
    async fn poll_failed_without_message_uses_generic_fallback() {
        let (coordinator, store, _queue) = coordinator();
        store
            .put(&Job {
                request_id: "failed-1".to_string(),
                status: JobStatus::Failed,
                created_at: 1_754_000_000,
                results: None,
                error: None,
            })
            .await
            .unwrap();

        let report = assert_ok!(coordinator.poll("failed-1").await);
        assert_eq!(
            report.error_message.as_deref(),
            Some(GENERIC_FAILURE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn poll_failed_with_message_returns_it_verbatim() {
        let (coordinator, store, _queue) = coordinator();
        store
            .put(&Job {
                request_id: "failed-2".to_string(),
                status: JobStatus::Failed,
                created_at: 1_754_000_000,
                results: None,
                error: Some("経路が見つかりませんでした".to_string()),
            })
            .await
            .unwrap();

        let report = assert_ok!(coordinator.poll("failed-2").await);
        assert_eq!(
            report.error_message.as_deref(),
            Some("経路が見つかりませんでした")
        );
    }

    #[tokio::test]
    async fn poll_passes_other_status_through_verbatim() {
        let (coordinator, store, _queue) = coordinator();
        store
            .put(&Job {
                request_id: "odd-1".to_string(),
                status: JobStatus::Other("RETRYING".to_string()),
                created_at: 1_754_000_000,
                results: None,
                error: None,
            })
            .await
            .unwrap();

        let report = assert_ok!(coordinator.poll("odd-1").await);
        assert_eq!(report.status, JobStatus::Other("RETRYING".to_string()));
        assert!(report.results.is_none());
        assert!(report.error_message.is_none());
    }
}
