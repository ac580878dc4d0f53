use std::fmt;
use std::time::Duration;

/// アプリケーションエラー型
#[derive(Debug)]
pub enum AppError {
    /// 呼び出し側の入力不備（HTTP 400 に対応）
    Validation(ValidationError),
    /// ブラウザプロセス関連のエラー
    Browser(BrowserError),
    /// ポータル操作（ナビゲーション・要素探索）のエラー
    Automation(AutomationError),
    /// 永続ストアのエラー
    Store(StoreError),
    /// キュー投入のエラー
    Queue(QueueError),
    /// 設定読み込みのエラー
    Config(ConfigError),
    /// その他（サードパーティエラーの包袋用）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Validation はそのままレスポンスの error 文字列になるため接頭辞を付けない
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Browser(e) => write!(f, "ブラウザエラー: {}", e),
            AppError::Automation(e) => write!(f, "ポータル操作エラー: {}", e),
            AppError::Store(e) => write!(f, "ストアエラー: {}", e),
            AppError::Queue(e) => write!(f, "キューエラー: {}", e),
            AppError::Config(e) => write!(f, "設定エラー: {}", e),
            AppError::Other(msg) => write!(f, "エラー: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Validation(e) => Some(e),
            AppError::Browser(e) => Some(e),
            AppError::Automation(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::Queue(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 入力検証エラー
#[derive(Debug)]
pub enum ValidationError {
    /// rows が空
    EmptyRows,
    /// requestId が未指定
    MissingRequestId,
    /// 未知の action タグ
    UnknownAction,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // これらの文字列はレスポンスボディにそのまま載る
        match self {
            ValidationError::EmptyRows => write!(f, "rows is empty"),
            ValidationError::MissingRequestId => write!(f, "requestId is required"),
            ValidationError::UnknownAction => write!(f, "unknown action"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// ブラウザプロセス関連エラー
#[derive(Debug)]
pub enum BrowserError {
    /// 無頭ブラウザの起動設定に失敗
    LaunchConfigFailed { message: String },
    /// ブラウザプロセスの起動に失敗
    SessionInitFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// ページ作成に失敗
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 指定 URL への遷移に失敗
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// ページ上での JS 実行に失敗
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchConfigFailed { message } => {
                write!(f, "無頭ブラウザの設定に失敗: {}", message)
            }
            BrowserError::SessionInitFailed { source } => {
                write!(f, "ブラウザの起動に失敗: {}", source)
            }
            BrowserError::PageCreationFailed { source } => {
                write!(f, "ページ作成に失敗: {}", source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "{} への遷移に失敗: {}", url, source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "スクリプト実行に失敗: {}", source)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchConfigFailed { .. } => None,
            BrowserError::SessionInitFailed { source }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// ポータル操作エラー
#[derive(Debug)]
pub enum AutomationError {
    /// ログイン画面の入力欄が見つからない
    AuthNavigationFailed { field: String },
    /// 待機時間内に要素が現れなかった
    WaitTimeout { what: String, timeout: Duration },
    /// 要素が存在しない
    ElementNotFound { what: String },
    /// 修正画面への遷移に全戦略で失敗
    EditNavigationFailed,
    /// 指定フレームが見つからない
    FrameNotFound { name: String },
    /// 切り替え先のウィンドウが存在しない
    WindowUnavailable,
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationError::AuthNavigationFailed { field } => {
                write!(f, "ログイン画面の {} 入力欄が見つかりませんでした", field)
            }
            AutomationError::WaitTimeout { what, timeout } => {
                write!(f, "{} が {:?} 以内に見つかりませんでした", what, timeout)
            }
            AutomationError::ElementNotFound { what } => {
                write!(f, "要素が見つかりません: {}", what)
            }
            AutomationError::EditNavigationFailed => {
                write!(f, "『修正』も『.w_denpyo_l』も見つかりませんでした")
            }
            AutomationError::FrameNotFound { name } => {
                write!(f, "フレーム {} が見つかりませんでした", name)
            }
            AutomationError::WindowUnavailable => {
                write!(f, "切り替え先のウィンドウがありません")
            }
        }
    }
}

impl std::error::Error for AutomationError {}

/// 永続ストアエラー
#[derive(Debug)]
pub enum StoreError {
    /// レコード書き込みに失敗
    PutFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// レコード読み込みに失敗
    GetFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// レコードが想定スキーマを満たしていない
    MalformedRecord { request_id: String, detail: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::PutFailed { source } => write!(f, "書き込みに失敗: {}", source),
            StoreError::GetFailed { source } => write!(f, "読み込みに失敗: {}", source),
            StoreError::MalformedRecord { request_id, detail } => {
                write!(f, "不正なレコード (requestId: {}): {}", request_id, detail)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::PutFailed { source } | StoreError::GetFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            StoreError::MalformedRecord { .. } => None,
        }
    }
}

/// キュー投入エラー
#[derive(Debug)]
pub enum QueueError {
    /// メッセージ送信に失敗
    SendFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::SendFailed { source } => write!(f, "メッセージ送信に失敗: {}", source),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::SendFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 設定エラー
#[derive(Debug)]
pub enum ConfigError {
    /// 設定ファイルの読み込みに失敗
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML の解析に失敗
    TomlParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed { path, source } => {
                write!(f, "設定ファイル読み込みに失敗 ({}): {}", path, source)
            }
            ConfigError::TomlParseFailed { source } => {
                write!(f, "TOML解析に失敗: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed { source, .. } | ConfigError::TomlParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

// ========== 一般的なエラー型からの変換 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析に失敗: {}", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便宜コンストラクタ ==========

impl AppError {
    /// ブラウザ起動失敗エラーを作成
    pub fn session_init_failed(
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::SessionInitFailed {
            source: Box::new(source),
        })
    }

    /// 遷移失敗エラーを作成
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 要素待機タイムアウトエラーを作成
    pub fn wait_timeout(what: impl Into<String>, timeout: Duration) -> Self {
        AppError::Automation(AutomationError::WaitTimeout {
            what: what.into(),
            timeout,
        })
    }

    /// 要素不在エラーを作成
    pub fn element_not_found(what: impl Into<String>) -> Self {
        AppError::Automation(AutomationError::ElementNotFound { what: what.into() })
    }

    /// ストア書き込み失敗エラーを作成
    pub fn store_put_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Store(StoreError::PutFailed {
            source: Box::new(source),
        })
    }

    /// ストア読み込み失敗エラーを作成
    pub fn store_get_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Store(StoreError::GetFailed {
            source: Box::new(source),
        })
    }

    /// キュー送信失敗エラーを作成
    pub fn queue_send_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Queue(QueueError::SendFailed {
            source: Box::new(source),
        })
    }

    /// 待機タイムアウト系のエラーかどうか
    pub fn is_wait_timeout(&self) -> bool {
        matches!(
            self,
            AppError::Automation(AutomationError::WaitTimeout { .. })
        )
    }
}

// ========== Result 型エイリアス ==========

/// アプリケーション結果型
pub type AppResult<T> = std::result::Result<T, AppError>;
