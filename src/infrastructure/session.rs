//! ブラウザセッション - 基盤層
//!
//! 希少資源である Browser / Page を唯一保持し、
//! 「JS 評価」「時間制限付きの要素待機」「ウィンドウ・フレーム切替」の
//! 能力だけを公開する。業務の流れは知らない。

use std::time::{Duration, Instant};

use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::launch_headless;
use crate::config::Config;
use crate::error::{AppError, AppResult, AutomationError};
use crate::infrastructure::locator::{Locator, RankedLocator};

/// 要素待機の方針
///
/// `timeout` は要素待機の全体予算、`poll_interval` は再確認の間隔、
/// `settle` はページ遷移後の読み込み待ちの上限。
#[derive(Clone, Copy, Debug)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub settle: Duration,
}

/// 1 リクエスト分のブラウザセッション
///
/// 同期リクエストごとに作成し、終了時に必ず `quit()` で解放する。
/// リクエスト間で共有してはならない。
pub struct Session {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// 現在のナビゲーション文脈となるフレーム名（None なら最上位）
    frame: Option<String>,
    wait: WaitPolicy,
}

impl Session {
    /// 無頭ブラウザを起動してセッションを獲得する
    ///
    /// 失敗時はブラウザ起動エラー。内部でのリトライは行わない。
    pub async fn acquire(config: &Config) -> AppResult<Self> {
        let (browser, page, handler_task) =
            launch_headless(config.chrome_executable.as_deref()).await?;
        Ok(Self {
            browser,
            page,
            handler_task,
            frame: None,
            wait: WaitPolicy {
                timeout: Duration::from_secs(config.wait_timeout_secs),
                poll_interval: Duration::from_millis(config.poll_interval_ms),
                settle: Duration::from_millis(config.settle_wait_ms),
            },
        })
    }

    pub fn wait(&self) -> &WaitPolicy {
        &self.wait
    }

    /// 指定 URL へ遷移する
    pub async fn goto(&self, url: &str) -> AppResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    pub async fn current_url(&self) -> AppResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    pub async fn title(&self) -> AppResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    /// JS を評価して JSON 値を返す
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<Value> {
        let result = self.page.evaluate(js_code.into()).await?;
        let value = result.into_value()?;
        Ok(value)
    }

    /// JS を評価して指定の型に復元する
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let value = self.eval(js_code).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 現在のナビゲーション文脈のルート（document 相当）の JS 式
    pub fn root_expr(&self) -> String {
        match &self.frame {
            None => "document".to_string(),
            Some(name) => format!(
                r#"document.querySelector('frame[name="{name}"], iframe[name="{name}"]').contentDocument"#
            ),
        }
    }

    /// ページ遷移後の読み込み完了を settle 予算の範囲で待つ
    ///
    /// 時間切れは失敗として扱わない。
    pub async fn settle(&self) {
        let deadline = Instant::now() + self.wait.settle;
        loop {
            sleep(self.wait.poll_interval).await;
            if Instant::now() >= deadline {
                break;
            }
            match self.eval("document.readyState").await {
                Ok(state) if state.as_str() == Some("complete") => break,
                _ => {}
            }
        }
    }

    /// 一致する要素数を返す（待機なし）
    pub async fn count(&self, locator: &Locator) -> AppResult<usize> {
        let expr = format!("({}).length", locator.array_expr(&self.root_expr()));
        self.eval_as(expr).await
    }

    /// 要素が存在するかどうか（待機なし）
    pub async fn exists(&self, locator: &Locator) -> AppResult<bool> {
        Ok(self.count(locator).await? > 0)
    }

    /// 要素が 1 つ以上現れるまで待つ
    ///
    /// 待機中の評価エラーは「まだ現れていない」と同一視し、
    /// タイムアウトで打ち切る。
    pub async fn wait_for_any(&self, locator: &Locator, timeout: Duration) -> AppResult<usize> {
        let start = Instant::now();
        loop {
            match self.count(locator).await {
                Ok(n) if n > 0 => return Ok(n),
                Ok(_) => {}
                Err(e) => debug!("待機中の評価エラーを無視: {}", e),
            }
            if start.elapsed() >= timeout {
                return Err(AppError::wait_timeout(locator.describe(), timeout));
            }
            sleep(self.wait.poll_interval).await;
        }
    }

    /// index 番目の一致要素をクリックする
    pub async fn click(&self, locator: &Locator, index: usize) -> AppResult<()> {
        let expr = format!(
            "(() => {{ const els = {}; if (els.length <= {index}) return false; els[{index}].click(); return true; }})()",
            locator.array_expr(&self.root_expr())
        );
        let clicked: bool = self.eval_as(expr).await?;
        if clicked {
            Ok(())
        } else {
            Err(AppError::element_not_found(format!(
                "{} [{}]",
                locator.describe(),
                index
            )))
        }
    }

    /// 一致要素すべての表示文字列を返す
    pub async fn texts(&self, locator: &Locator) -> AppResult<Vec<String>> {
        let expr = format!(
            "({}).map((el) => (el.innerText || el.textContent || '').trim())",
            locator.array_expr(&self.root_expr())
        );
        self.eval_as(expr).await
    }

    /// index 番目の一致要素の属性値を返す
    pub async fn attribute(
        &self,
        locator: &Locator,
        index: usize,
        name: &str,
    ) -> AppResult<Option<String>> {
        let expr = format!(
            "(() => {{ const els = {}; if (els.length <= {index}) return null; return els[{index}].getAttribute({}); }})()",
            locator.array_expr(&self.root_expr()),
            Value::String(name.to_string()),
        );
        self.eval_as(expr).await
    }

    /// 先頭の一致要素に値を入力する
    pub async fn set_value(&self, locator: &Locator, value: &str) -> AppResult<()> {
        let expr = format!(
            "(() => {{ const els = {}; if (els.length === 0) return false; \
             const el = els[0]; el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            locator.array_expr(&self.root_expr()),
            Value::String(value.to_string()),
        );
        let done: bool = self.eval_as(expr).await?;
        if done {
            Ok(())
        } else {
            Err(AppError::element_not_found(locator.describe()))
        }
    }

    /// 先頭の一致要素が属するフォームを送信する
    pub async fn submit_form_of(&self, locator: &Locator) -> AppResult<()> {
        let expr = format!(
            "(() => {{ const els = {}; if (els.length === 0) return false; \
             const el = els[0]; \
             if (el.form) {{ el.form.submit(); return true; }} \
             el.dispatchEvent(new KeyboardEvent('keydown', {{ key: 'Enter', bubbles: true }})); \
             return true; }})()",
            locator.array_expr(&self.root_expr()),
        );
        let done: bool = self.eval_as(expr).await?;
        if done {
            Ok(())
        } else {
            Err(AppError::element_not_found(locator.describe()))
        }
    }

    /// 戦略リストを順に評価し、最初に一致した要素をクリックする
    ///
    /// 戻り値は一致した戦略のインデックス。どの戦略でも見つからなければ
    /// 要素不在エラー。
    pub async fn click_first_match(&self, strategies: &[RankedLocator]) -> AppResult<usize> {
        for (index, ranked) in strategies.iter().enumerate() {
            let found = if ranked.timeout.is_zero() {
                self.count(&ranked.locator).await.unwrap_or(0) > 0
            } else {
                self.wait_for_any(&ranked.locator, ranked.timeout).await.is_ok()
            };
            if found {
                self.click(&ranked.locator, 0).await?;
                return Ok(index);
            }
            debug!("戦略 {} は不一致: {}", index + 1, ranked.locator.describe());
        }
        Err(AppError::element_not_found(
            "いずれの戦略でも要素が見つかりませんでした",
        ))
    }

    /// 名前付きフレームへナビゲーション文脈を切り替える
    pub async fn switch_to_frame(&mut self, name: &str) -> AppResult<()> {
        let probe = format!(
            r#"(() => {{ const fr = document.querySelector('frame[name="{name}"], iframe[name="{name}"]'); return !!(fr && fr.contentDocument); }})()"#
        );
        let start = Instant::now();
        loop {
            if let Ok(true) = self.eval_as::<bool>(probe.clone()).await {
                self.frame = Some(name.to_string());
                return Ok(());
            }
            if start.elapsed() >= self.wait.timeout {
                return Err(AppError::Automation(AutomationError::FrameNotFound {
                    name: name.to_string(),
                }));
            }
            sleep(self.wait.poll_interval).await;
        }
    }

    /// 最後に開いたウィンドウへ切り替える
    ///
    /// 自動操作下のブラウザは新しいウィンドウを開くことがあり、
    /// 「最後に開いたものが最新＝操作対象」の取り決めに従う。
    /// フレーム文脈は最上位に戻る。
    pub async fn focus_latest_window(&mut self) -> AppResult<()> {
        let pages = self.browser.pages().await?;
        info!("ウィンドウ数: {}", pages.len());
        let latest = pages
            .last()
            .cloned()
            .ok_or(AppError::Automation(AutomationError::WindowUnavailable))?;
        self.page = latest;
        self.frame = None;
        Ok(())
    }

    /// セッションを解放する
    ///
    /// 獲得した呼び出し側が成功・失敗どちらの経路でも必ず呼ぶこと。
    pub async fn quit(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("ブラウザの終了に失敗しました: {}", e);
        }
        self.handler_task.abort();
    }
}
