//! 要素ロケータ - 基盤層
//!
//! ナビゲーションの各段を「順位付きの探索戦略の列」として表現する。
//! 戦略ごとに独立したタイムアウトを持ち、制御フローを変えずに
//! 追加・削除・並べ替えができる。

use std::time::Duration;

use serde_json::Value;

/// 要素の探索戦略
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    /// CSS セレクタで探す
    Css(String),
    /// リンクの表示文字列に完全一致する `<a>` を探す
    LinkText(String),
    /// 絶対 XPath で探す（最終手段。現行レイアウトに密結合する）
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Locator::LinkText(text.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    /// ROOT（document 相当の JS 式）に対する一致要素配列の JS 式を生成する
    pub fn array_expr(&self, root: &str) -> String {
        match self {
            Locator::Css(selector) => format!(
                "Array.from(({root}).querySelectorAll({}))",
                js_string(selector)
            ),
            Locator::LinkText(text) => format!(
                "Array.from(({root}).querySelectorAll('a')).filter((a) => a.textContent.trim() === {})",
                js_string(text)
            ),
            Locator::XPath(path) => format!(
                "(() => {{ const doc = ({root}); \
                 const snap = doc.evaluate({}, doc, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const nodes = []; \
                 for (let i = 0; i < snap.snapshotLength; i++) nodes.push(snap.snapshotItem(i)); \
                 return nodes; }})()",
                js_string(path)
            ),
        }
    }

    /// ログ・エラーメッセージ用の表記
    pub fn describe(&self) -> String {
        match self {
            Locator::Css(selector) => format!("css: {}", selector),
            Locator::LinkText(text) => format!("link: {}", text),
            Locator::XPath(path) => format!("xpath: {}", path),
        }
    }
}

/// タイムアウト付きの探索戦略
#[derive(Clone, Debug)]
pub struct RankedLocator {
    pub locator: Locator,
    pub timeout: Duration,
}

impl RankedLocator {
    pub fn new(locator: Locator, timeout: Duration) -> Self {
        Self { locator, timeout }
    }

    /// 待機なしの一回限りの探索
    pub fn immediate(locator: Locator) -> Self {
        Self {
            locator,
            timeout: Duration::ZERO,
        }
    }
}

/// JS 文字列リテラルとしてエスケープする
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_expr_escapes_selector() {
        let locator = Locator::css("span[title='交通費精算']");
        let expr = locator.array_expr("document");
        assert!(expr.contains(r#"querySelectorAll("span[title='交通費精算']")"#));
    }

    #[test]
    fn link_text_expr_matches_exact_text() {
        let locator = Locator::link_text("修正");
        let expr = locator.array_expr("document");
        assert!(expr.contains(r#"a.textContent.trim() === "修正""#));
    }

    #[test]
    fn xpath_expr_uses_snapshot_iteration() {
        let locator = Locator::xpath("/html/body/form/div[1]");
        let expr = locator.array_expr("document");
        assert!(expr.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(expr.contains(r#""/html/body/form/div[1]""#));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
