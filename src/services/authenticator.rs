//! ポータル認証サービス - 業務能力層
//!
//! 楽楽精算へのログインだけを担当する。1 回きりの試行で、リトライしない。

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult, AutomationError};
use crate::infrastructure::{Locator, Session};

/// ログイン後に操作対象となるコンテンツフレーム名
const MAIN_FRAME: &str = "main";

/// ポータル認証サービス
pub struct Authenticator {
    login_url: String,
    login_id: String,
    password: String,
}

impl Authenticator {
    pub fn new(config: &Config) -> Self {
        Self {
            login_url: config.raku_url.clone(),
            login_id: config.raku_login_id.clone(),
            password: config.raku_password.clone(),
        }
    }

    /// 楽楽精算にログインし、セッションの文脈を main フレームへ切り替える
    ///
    /// ログイン ID・パスワード欄が待機時間内に見つからなければ
    /// 認証ナビゲーションエラー。
    pub async fn login(&self, session: &mut Session) -> AppResult<()> {
        session.goto(&self.login_url).await?;
        session.settle().await;
        info!(
            "url:{}title:{}",
            session.current_url().await?,
            session.title().await?
        );

        // 企業IDを入力
        let login_field = Locator::css(r#"[name="loginId"]"#);
        self.wait_for_login_field(session, &login_field, "loginId")
            .await?;
        session.set_value(&login_field, &self.login_id).await?;

        let password_field = Locator::css(r#"[name="password"]"#);
        self.wait_for_login_field(session, &password_field, "password")
            .await?;
        session.set_value(&password_field, &self.password).await?;
        session.submit_form_of(&password_field).await?;

        // ページ遷移待ち
        session.settle().await;
        info!("ログイン成功");

        session.switch_to_frame(MAIN_FRAME).await?;
        Ok(())
    }

    async fn wait_for_login_field(
        &self,
        session: &Session,
        locator: &Locator,
        field: &str,
    ) -> AppResult<()> {
        match session.wait_for_any(locator, session.wait().timeout).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_wait_timeout() => Err(AppError::Automation(
                AutomationError::AuthNavigationFailed {
                    field: field.to_string(),
                },
            )),
            Err(e) => Err(e),
        }
    }
}
