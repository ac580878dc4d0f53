use std::fs;

use serde::Deserialize;

use crate::error::AppResult;

/// 設定ファイルのデフォルトパス
const CONFIG_FILE: &str = "config.toml";

/// プログラム設定
///
/// `config.toml`（任意）を読み込んだ後、環境変数で上書きする。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 待受アドレス
    pub bind_addr: String,
    /// 楽楽精算ログイン画面の URL
    pub raku_url: String,
    /// 楽楽精算のログイン ID（企業 ID）
    pub raku_login_id: String,
    /// 楽楽精算のパスワード
    pub raku_password: String,
    /// 画面側ゲートのパスワード
    pub reco_password: String,
    /// ジョブ状態を保持する DynamoDB テーブル名
    pub result_table: String,
    /// 行データ投入先の SQS キュー URL
    pub queue_url: String,
    /// Chrome 実行ファイルのパス（未指定なら自動検出）
    pub chrome_executable: Option<String>,
    /// 要素待機の上限秒数
    pub wait_timeout_secs: u64,
    /// 要素待機のポーリング間隔（ミリ秒）
    pub poll_interval_ms: u64,
    /// ページ遷移後の読み込み待ち上限（ミリ秒）
    pub settle_wait_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            raku_url: String::new(),
            raku_login_id: String::new(),
            raku_password: String::new(),
            reco_password: String::new(),
            result_table: String::new(),
            queue_url: String::new(),
            chrome_executable: None,
            wait_timeout_secs: 20,
            poll_interval_ms: 250,
            settle_wait_ms: 2000,
        }
    }
}

impl Config {
    /// 設定を読み込む
    ///
    /// `config.toml` が存在すればそれを起点にし、環境変数で上書きする。
    pub fn load() -> AppResult<Self> {
        let mut config = match fs::read_to_string(CONFIG_FILE) {
            Ok(text) => toml::from_str(&text)?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("RAKU_URL") {
            self.raku_url = v;
        }
        if let Ok(v) = std::env::var("RAKU_LOGIN_ID") {
            self.raku_login_id = v;
        }
        if let Ok(v) = std::env::var("RAKU_PASSWORD") {
            self.raku_password = v;
        }
        if let Ok(v) = std::env::var("RECO_PASSWORD") {
            self.reco_password = v;
        }
        if let Ok(v) = std::env::var("TABLE") {
            self.result_table = v;
        }
        if let Ok(v) = std::env::var("QUEUE_URL") {
            self.queue_url = v;
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = env_parse("WAIT_TIMEOUT_SECS") {
            self.wait_timeout_secs = v;
        }
        if let Some(v) = env_parse("POLL_INTERVAL_MS") {
            self.poll_interval_ms = v;
        }
        if let Some(v) = env_parse("SETTLE_WAIT_MS") {
            self.settle_wait_ms = v;
        }
    }
}

fn env_parse(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
