//! パターン探索エンジン - 業務能力層
//!
//! 楽楽精算の画面を複数経路でたどり、保存済みの通勤費パターン一覧を
//! 抽出する。各段の内部では次の戦略へフォールバックするが、
//! 段として失敗した場合はリトライせずそのまま呼び出し側へ返す。
//!
//! 流れ：
//! 1. 入口確認（交通費精算の有無） → badge または リンクをクリック
//! 2. 最新ウィンドウへ切替
//! 3. 修正画面への遷移（修正リンク → .w_denpyo_l → 絶対 XPath）
//! 4. 既存日付の取得（ベストエフォート）
//! 5. マイパターンボタンのクリック
//! 6. 最新ウィンドウへ切替
//! 7. 一覧テーブルからのパターン抽出

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, AutomationError};
use crate::infrastructure::{Locator, RankedLocator, Session};
use crate::models::Pattern;

/// 「交通費精算が既に存在する」ことを示すマーカー要素
const KOUTSUHI_MARKER: &str = "span[title='交通費精算']";
/// 入口ショートカットとなる badge（2 種類の表記ゆれがある）
const BADGE_SELECTOR: &str = ".ui-c-badge, .szb-badge";
/// badge が無い場合にクリックするリンクの表示文字列
const KOUTSUHI_LINK_TEXT: &str = "交通費精算";
/// 修正画面へのリンクの表示文字列
const EDIT_LINK_TEXT: &str = "修正";
/// 修正リンクが無い場合の代替クラス
const DENPYO_SELECTOR: &str = ".w_denpyo_l";
/// 最終手段の絶対 XPath
const EDIT_FALLBACK_XPATH: &str = "/html/body/form/div[1]/div[2]/div/div/table/tbody/tr[2]/td[2]/a";
/// 通勤費画面に到達済みであることを示す URL の断片
const EDIT_VIEW_URL_MARK: &str = "initializeView";
/// 既存明細の日付ラベル
const DAY_LABEL_SELECTOR: &str = ".labelColorDefault";
/// 明細挿入ボタン群
const INSERT_BUTTON_SELECTOR: &str = ".meisai-insert-button";
/// 挿入ボタンのうちクリック対象の表示文字列
const MY_PATTERN_TEXT: &str = "マイパターン";
/// パターン一覧テーブルの行
const PATTERN_ROW_SELECTOR: &str = ".d_hover";

/// 抽出 JS が返す行データ
#[derive(Debug, Deserialize)]
struct RawPatternRow {
    id: Option<String>,
    label: Option<String>,
}

/// パターン探索エンジン
pub struct PatternDiscovery {
    /// フォールバック戦略用の短い待機時間
    short_wait: Duration,
}

impl PatternDiscovery {
    pub fn new(config: &Config) -> Self {
        Self {
            short_wait: Duration::from_millis(config.settle_wait_ms),
        }
    }

    /// 保存済みパターンの一覧を抽出する
    ///
    /// 途中で発生したタイムアウト・要素不在はログに残した上で
    /// そのまま呼び出し側へ返す。
    pub async fn discover(&self, session: &mut Session) -> AppResult<Vec<Pattern>> {
        match self.run(session).await {
            Ok(patterns) => {
                info!("✓ パターンを {} 件取得しました", patterns.len());
                Ok(patterns)
            }
            Err(e) => {
                error!("パターン取得に失敗しました: {}", e);
                Err(e)
            }
        }
    }

    async fn run(&self, session: &mut Session) -> AppResult<Vec<Pattern>> {
        // 1. 入口：badge またはリンクから交通費精算画面を開く
        self.open_commute_view(session).await?;
        session.settle().await;

        // 2. ウィンドウ切り替え
        session.focus_latest_window().await?;
        info!("楽楽清算-一時保存-{}", session.current_url().await?);

        // 3. 修正画面へ移動
        self.enter_edit_view(session).await?;
        info!("楽楽清算-通勤費画面");

        // 4. 既存日付の取得（無くても異常ではない）
        let existing_days = self.existing_day_labels(session).await;
        info!("既存明細の日付: {} 件 {:?}", existing_days.len(), existing_days);

        // 5. マイパターンボタンをクリック
        self.trigger_my_pattern(session).await?;
        session.settle().await;

        // 6. ウィンドウ切り替え
        session.focus_latest_window().await?;
        info!("現在のURL: {}", session.current_url().await?);
        info!("タイトル: {}", session.title().await?);

        // 7. 一覧からパターンを抽出
        self.extract_patterns(session).await
    }

    /// badge（2 変種）またはリンク文字列から交通費精算画面を開く
    ///
    /// マーカー要素が既に存在する場合、badge のショートカットは
    /// 画面仕様上存在しないため、リンク経路に直行する。
    async fn open_commute_view(&self, session: &Session) -> AppResult<()> {
        let marker = Locator::css(KOUTSUHI_MARKER);
        let badge = Locator::css(BADGE_SELECTOR);

        let use_link_path = if session.exists(&marker).await? {
            info!("交通費精算が存在する為 badge 処理をスキップします");
            true
        } else {
            match session.wait_for_any(&badge, session.wait().timeout).await {
                Ok(_) => {
                    // どちらの変種に当たったかは診断用に残す（分岐には使わない）
                    let class = session
                        .attribute(&badge, 0, "class")
                        .await?
                        .unwrap_or_default();
                    if class.contains("ui-c-badge") {
                        info!("ui-c-badge を取得しました");
                    } else if class.contains("szb-badge") {
                        info!("szb-badge を取得しました");
                    } else {
                        info!("想定外のbadgeを取得: {}", class);
                    }
                    session.click(&badge, 0).await?;
                    false
                }
                Err(e) if e.is_wait_timeout() => true,
                Err(e) => return Err(e),
            }
        };

        if use_link_path {
            info!("badgeが見つからなかったため、交通費精算をクリックします");
            let link = Locator::link_text(KOUTSUHI_LINK_TEXT);
            session.wait_for_any(&link, session.wait().timeout).await?;
            session.click(&link, 0).await?;
        }
        Ok(())
    }

    /// 修正画面へ遷移する
    ///
    /// URL が既に通勤費画面を指していれば何もしない。
    /// 3 つの戦略を順位どおりに試し、全滅なら修正画面遷移エラー。
    async fn enter_edit_view(&self, session: &mut Session) -> AppResult<()> {
        let url = session.current_url().await?;
        if url.contains(EDIT_VIEW_URL_MARK) {
            info!("すでに通勤費画面です");
            return Ok(());
        }

        let strategies = [
            RankedLocator::immediate(Locator::link_text(EDIT_LINK_TEXT)),
            RankedLocator::new(Locator::css(DENPYO_SELECTOR), self.short_wait),
            RankedLocator::new(Locator::xpath(EDIT_FALLBACK_XPATH), self.short_wait),
        ];
        match session.click_first_match(&strategies).await {
            Ok(0) => info!("『修正』リンクをクリックしました"),
            Ok(1) => info!("『修正』リンクが無いので .w_denpyo_l をクリックしました"),
            Ok(_) => info!("『修正』『.w_denpyo_l』が無いため XPath の要素をクリックしました"),
            Err(AppError::Automation(AutomationError::ElementNotFound { .. }))
            | Err(AppError::Automation(AutomationError::WaitTimeout { .. })) => {
                return Err(AppError::Automation(AutomationError::EditNavigationFailed));
            }
            Err(e) => return Err(e),
        }

        session.settle().await;
        session.focus_latest_window().await?;
        Ok(())
    }

    /// 既に記帳されている日付ラベルを収集する（ベストエフォート）
    async fn existing_day_labels(&self, session: &Session) -> Vec<String> {
        let labels = Locator::css(DAY_LABEL_SELECTOR);
        match session.wait_for_any(&labels, session.wait().timeout).await {
            Ok(_) => session.texts(&labels).await.unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// 挿入ボタン群から「マイパターン」を探してクリックする
    ///
    /// 該当ボタンが見つからない場合もログだけ残して続行する。
    /// 後続の抽出段は画面側の要素を前提とするため、ここは既知の
    /// ソフト失敗点。
    async fn trigger_my_pattern(&self, session: &Session) -> AppResult<()> {
        let buttons = Locator::css(INSERT_BUTTON_SELECTOR);
        session
            .wait_for_any(&buttons, session.wait().timeout)
            .await?;
        let texts = session.texts(&buttons).await?;
        info!("取得したmeisai-insert-buttonの数:{}", texts.len());

        match find_my_pattern_index(&texts) {
            Some(index) => {
                info!("→ マイパターンボタンをクリックします: index {}", index);
                session.click(&buttons, index).await?;
            }
            None => info!("マイパターンボタンが見つかりませんでした。"),
        }
        Ok(())
    }

    /// 一覧テーブルの各行から id / label を読み取る
    async fn extract_patterns(&self, session: &Session) -> AppResult<Vec<Pattern>> {
        let rows = Locator::css(PATTERN_ROW_SELECTOR);
        session.wait_for_any(&rows, session.wait().timeout).await?;

        let collect_js = format!(
            "({}).map((tr) => {{ \
               const checkbox = tr.querySelector('[name=\"kakutei\"]'); \
               const tds = tr.querySelectorAll('td'); \
               return {{ \
                 id: checkbox ? checkbox.getAttribute('value') : null, \
                 label: tds.length > 1 ? (tds[1].innerText || tds[1].textContent || '').trim() : null, \
               }}; \
             }})",
            rows.array_expr(&session.root_expr())
        );
        let raw_rows: Vec<RawPatternRow> = session.eval_as(collect_js).await?;
        patterns_from_rows(raw_rows)
    }
}

/// 表示文字列に「マイパターン」を含む最初のボタンの位置
fn find_my_pattern_index(texts: &[String]) -> Option<usize> {
    texts.iter().position(|t| t.contains(MY_PATTERN_TEXT))
}

/// 行データを Pattern へ変換する
///
/// チェックボックスの無い行は要素不在エラー。ラベルセルの無い行は
/// 空文字列のラベルとして残す。
fn patterns_from_rows(rows: Vec<RawPatternRow>) -> AppResult<Vec<Pattern>> {
    rows.into_iter()
        .map(|row| {
            let id = row
                .id
                .ok_or_else(|| AppError::element_not_found("チェックボックス kakutei"))?;
            Ok(Pattern {
                id,
                label: row.label.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: Option<&str>, label: Option<&str>) -> RawPatternRow {
        RawPatternRow {
            id: id.map(|s| s.to_string()),
            label: label.map(|s| s.to_string()),
        }
    }

    #[test]
    fn my_pattern_button_is_found_by_partial_text() {
        let texts = vec![
            "行追加".to_string(),
            "マイパターンから追加".to_string(),
            "コピー追加".to_string(),
        ];
        assert_eq!(find_my_pattern_index(&texts), Some(1));
    }

    #[test]
    fn my_pattern_button_missing_is_none() {
        let texts = vec!["行追加".to_string(), "コピー追加".to_string()];
        assert_eq!(find_my_pattern_index(&texts), None);
    }

    #[test]
    fn rows_convert_in_order_with_exact_text() {
        let rows = vec![
            raw(Some("101"), Some("自宅→本社")),
            raw(Some("102"), Some("本社→自宅")),
            raw(Some("103"), Some("自宅→支社")),
        ];
        let patterns = patterns_from_rows(rows).unwrap();
        assert_eq!(patterns.len(), 3);
        assert_eq!(
            patterns[0],
            Pattern {
                id: "101".to_string(),
                label: "自宅→本社".to_string()
            }
        );
        assert_eq!(patterns[1].id, "102");
        assert_eq!(patterns[2].label, "自宅→支社");
    }

    #[test]
    fn row_without_label_cell_keeps_empty_label() {
        let patterns = patterns_from_rows(vec![raw(Some("201"), None)]).unwrap();
        assert_eq!(patterns[0].id, "201");
        assert_eq!(patterns[0].label, "");
    }

    #[test]
    fn row_without_checkbox_is_an_error() {
        let result = patterns_from_rows(vec![raw(None, Some("孤立行"))]);
        assert!(matches!(
            result,
            Err(AppError::Automation(AutomationError::ElementNotFound { .. }))
        ));
    }
}
