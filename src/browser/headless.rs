use std::path::Path;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

/// 無頭ブラウザを起動し、空白ページと CDP ハンドラタスクを返す
///
/// 失敗時はブラウザ起動エラー。起動したプロセスの解放は
/// 呼び出し側（Session）の責務。
pub async fn launch_headless(
    chrome_executable: Option<&str>,
) -> AppResult<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 無頭ブラウザを起動します...");

    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--remote-debugging-port=0",
    ]);
    if let Some(path) = chrome_executable {
        debug!("Chrome 実行ファイル: {}", path);
        builder = builder.chrome_executable(Path::new(path));
    }
    let config = builder
        .build()
        .map_err(|message| AppError::Browser(BrowserError::LaunchConfigFailed { message }))?;

    let (mut browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("無頭ブラウザの起動に失敗しました: {}", e);
        AppError::session_init_failed(e)
    })?;
    debug!("無頭ブラウザ起動成功");

    // CDP イベントはバックグラウンドで流し続ける
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // ブラウザ状態の同期を待つ
    sleep(Duration::from_millis(300)).await;

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("ページ作成に失敗しました: {}", e);
            // 起動済みプロセスを残さない
            let _ = browser.close().await;
            handler_task.abort();
            return Err(AppError::Browser(BrowserError::PageCreationFailed {
                source: Box::new(e),
            }));
        }
    };

    Ok((browser, page, handler_task))
}
