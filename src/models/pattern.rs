use serde::{Deserialize, Serialize};

/// 楽楽精算に保存されている通勤費パターン
///
/// パターン一覧テーブルの 1 行から抽出される。
/// `id` はチェックボックスの value 属性、`label` は 2 列目のセル文字列。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub label: String,
}
