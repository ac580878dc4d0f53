//! # Raku Commute Submit
//!
//! 楽楽精算ポータルを無頭ブラウザで操作し、保存済みの通勤費パターンを
//! 読み出すサービス。行データの一括投入は非同期ジョブとして受け付け、
//! 永続ストアとキューに引き渡す。
//!
//! ## 構成
//!
//! ### ① 基盤層（Infrastructure）
//! - `browser/` - 無頭ブラウザのプロセス起動
//! - `infrastructure/` - 希少資源（Page）を持つ `Session` と探索戦略 `Locator`
//!
//! ### ② 業務能力層（Services）
//! - `Authenticator` - 楽楽精算へのログイン能力
//! - `PatternDiscovery` - 画面遷移とパターン抽出の能力
//! - `JobCoordinator` - 予約 → キュー投入と状態報告の能力
//!
//! ### ③ 外部資源層（Clients）
//! - `JobStore` / `WorkQueue` - DynamoDB / SQS とそのインメモリ代替
//!
//! ### ④ 編成層（Server / App）
//! - `server` - action タグで振り分ける単一エンドポイント
//! - `app` - 文脈の組み立てとサーバ起動

pub mod app;
pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

// 再エクスポート
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{Locator, RankedLocator, Session, WaitPolicy};
pub use models::{EnqueuedWork, Job, JobStatus, Pattern, PollReport};
