//! リクエストディスパッチャ
//!
//! 単一の POST エンドポイントで JSON ボディを受け、`action` タグで
//! 各サービスへ振り分ける薄い層。CORS ヘッダは成功・失敗を問わず
//! すべての応答に付与する。

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::clients::{JobStore, WorkQueue};
use crate::config::Config;
use crate::error::{AppError, AppResult, ValidationError};
use crate::infrastructure::Session;
use crate::services::{Authenticator, JobCoordinator, PatternDiscovery};

/// 全ハンドラで共有する依存一式
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn WorkQueue>,
}

/// 受信リクエスト
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action: String,
    pub password: Option<String>,
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(rename = "requestId")]
    pub request_id: Option<String>,
}

/// ルータを構築する
///
/// OPTIONS プリフライトは CORS レイヤが空ボディの 200 で応答する。
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/", post(dispatch))
        .layer(cors)
        .with_state(state)
}

async fn dispatch(State(state): State<AppState>, body: String) -> Response {
    let parsed: Result<ActionRequest, _> = if body.is_empty() {
        Ok(ActionRequest::default())
    } else {
        serde_json::from_str(&body)
    };
    let request = match parsed {
        Ok(request) => request,
        Err(e) => return AppError::from(e).into_response(),
    };

    info!("受信アクション: {}", request.action);
    match run_action(&state, request).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// action タグに応じて各サービスを呼び出す
pub async fn run_action(state: &AppState, request: ActionRequest) -> AppResult<Value> {
    match request.action.as_str() {
        "login" => handle_login(state, request.password.as_deref()),
        "getRakuPtn" => handle_get_patterns(state).await,
        "submitRows" => handle_submit_rows(state, request.rows).await,
        "pollResults" => {
            handle_poll_results(state, request.request_id.unwrap_or_default()).await
        }
        other => {
            warn!("不明なアクション: {}", other);
            Err(AppError::Validation(ValidationError::UnknownAction))
        }
    }
}

/// 画面側ゲートのパスワード照合
fn handle_login(state: &AppState, password: Option<&str>) -> AppResult<Value> {
    let ok = password == Some(state.config.reco_password.as_str());
    info!("ログイン{}", ok);
    Ok(json!({ "login": ok }))
}

/// 同期経路：ログインしてパターン一覧を取得する
///
/// セッションは本リクエスト専用に獲得し、成否にかかわらず必ず解放する。
async fn handle_get_patterns(state: &AppState) -> AppResult<Value> {
    let mut session = Session::acquire(&state.config).await?;
    let authenticator = Authenticator::new(&state.config);
    let discovery = PatternDiscovery::new(&state.config);

    let outcome = async {
        authenticator.login(&mut session).await?;
        discovery.discover(&mut session).await
    }
    .await;
    session.quit().await;

    let patterns = outcome?;
    Ok(json!({ "patterns": patterns }))
}

/// 非同期経路：行データを受け付けて相関 ID を返す
async fn handle_submit_rows(state: &AppState, rows: Vec<Value>) -> AppResult<Value> {
    let coordinator = JobCoordinator::new(state.store.clone(), state.queue.clone());
    let request_id = coordinator.submit(rows).await?;
    Ok(json!({ "requestId": request_id }))
}

/// 非同期経路：ジョブ状態を報告する
async fn handle_poll_results(state: &AppState, request_id: String) -> AppResult<Value> {
    let coordinator = JobCoordinator::new(state.store.clone(), state.queue.clone());
    let report = coordinator.poll(&request_id).await?;
    Ok(serde_json::to_value(report)?)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("ハンドラエラー: {}", self);
        } else {
            warn!("不正なリクエスト: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let response =
            AppError::Validation(ValidationError::EmptyRows).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_errors_map_to_500() {
        let response = AppError::Other("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn request_parses_camel_case_request_id() {
        let request: ActionRequest =
            serde_json::from_str(r#"{"action":"pollResults","requestId":"abc"}"#).unwrap();
        assert_eq!(request.action, "pollResults");
        assert_eq!(request.request_id.as_deref(), Some("abc"));
        assert!(request.rows.is_empty());
    }
}
