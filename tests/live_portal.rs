//! 実環境向けの手動テスト
//!
//! 実ポータル・実ブラウザが必要なため既定では無効。
//! 実行方法: cargo test -- --ignored

use raku_commute_submit::services::{Authenticator, PatternDiscovery};
use raku_commute_submit::utils::logging;
use raku_commute_submit::{Config, Session};

#[tokio::test]
#[ignore]
async fn test_browser_session_acquire() {
    logging::init();

    let config = Config::load().expect("設定の読み込みに失敗");
    let session = Session::acquire(&config).await.expect("ブラウザを起動できること");
    session.quit().await;
}

#[tokio::test]
#[ignore]
async fn test_fetch_patterns_live() {
    logging::init();

    let config = Config::load().expect("設定の読み込みに失敗");
    let mut session = Session::acquire(&config).await.expect("ブラウザ起動に失敗");
    let authenticator = Authenticator::new(&config);
    let discovery = PatternDiscovery::new(&config);

    let result = async {
        authenticator.login(&mut session).await?;
        discovery.discover(&mut session).await
    }
    .await;
    session.quit().await;

    let patterns = result.expect("パターン取得に失敗");
    println!("取得したパターン: {} 件", patterns.len());
    for pattern in &patterns {
        println!("  id: {}, label: {}", pattern.id, pattern.label);
    }
    assert!(!patterns.is_empty(), "パターンが 1 件以上あること");
}

#[tokio::test]
#[ignore]
async fn test_login_action_against_running_server() {
    let client = reqwest::Client::new();
    let response = client
        .post("http://localhost:8080/")
        .json(&serde_json::json!({"action": "login", "password": "dummy"}))
        .send()
        .await
        .expect("サーバに接続できること");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("JSON 応答であること");
    assert!(body.get("login").is_some());
}
