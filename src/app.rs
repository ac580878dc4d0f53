//! アプリケーション編成
//!
//! 外部資源クライアントを束ねて文脈（AppState）を組み立て、
//! HTTP サーバを起動する。

use std::sync::Arc;

use aws_config::BehaviorVersion;
use tracing::info;

use crate::clients::{DynamoJobStore, SqsWorkQueue};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::server::{self, AppState};

/// アプリケーション本体
pub struct App {
    state: AppState,
}

impl App {
    /// 外部資源クライアントを初期化して文脈を組み立てる
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let store = Arc::new(DynamoJobStore::new(
            aws_sdk_dynamodb::Client::new(&aws_config),
            config.result_table.clone(),
        ));
        let queue = Arc::new(SqsWorkQueue::new(
            aws_sdk_sqs::Client::new(&aws_config),
            config.queue_url.clone(),
        ));

        Ok(Self {
            state: AppState {
                config: Arc::new(config),
                store,
                queue,
            },
        })
    }

    /// HTTP サーバを起動する
    pub async fn run(self) -> AppResult<()> {
        let addr = self.state.config.bind_addr.clone();
        let router = server::router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Other(format!("{} で待受できません: {}", addr, e)))?;
        info!("🚀 待受を開始します: {}", addr);
        axum::serve(listener, router)
            .await
            .map_err(|e| AppError::Other(format!("サーバが停止しました: {}", e)))?;
        Ok(())
    }
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 起動 - 楽楽精算 通勤費サービス");
    info!("📄 ジョブテーブル: {}", config.result_table);
    info!("📨 キュー: {}", config.queue_url);
    info!("{}", "=".repeat(60));
}
