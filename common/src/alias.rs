//! 列名エイリアスモジュール
//!
//! ヘッダー行から化学式列・CAS列を特定する。
//! 別名リストの順序が優先順位で、同じ別名に複数列が一致した場合は左の列を採用する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 化学式列の別名（優先順）
const FORMULA_ALIASES: &[&str] = &[
    "化学式",
    "formula",
    "chemical formula",
    "chemicalformula",
    "分子式",
    "化学公式",
    "结构式",
    "chemical",
    "formula name",
    "化学结构",
    "分子结构",
];

/// CAS列の別名（優先順）
const CAS_ALIASES: &[&str] = &[
    "cas",
    "cas号",
    "cas number",
    "cas no",
    "casno",
    "cas编号",
    "cas号码",
    "cas registry",
    "cas id",
    "卡斯",
    "卡斯号",
    "cas代码",
];

/// 列特定に使う別名リスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases {
    pub formula: Vec<String>,
    pub cas: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            formula: FORMULA_ALIASES.iter().map(|s| s.to_string()).collect(),
            cas: CAS_ALIASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ColumnAliases {
    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let aliases: Self = serde_json::from_str(json)?;
        if aliases.formula.is_empty() {
            return Err(Error::Alias("化学式の別名リストが空です".into()));
        }
        Ok(aliases)
    }

    /// 組み込みリストの後ろに追加の別名を足す（重複は無視）
    pub fn extend(&mut self, formula: &[String], cas: &[String]) {
        push_unique(&mut self.formula, formula);
        push_unique(&mut self.cas, cas);
    }
}

fn push_unique(list: &mut Vec<String>, extra: &[String]) {
    for alias in extra {
        let alias = alias.trim().to_lowercase();
        if !alias.is_empty() && !list.contains(&alias) {
            list.push(alias);
        }
    }
}

/// ヘッダーセルを比較用に正規化（前後空白除去 + 小文字化）
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// ヘッダー行から列番号（0始まり）を特定
///
/// 別名リストを先頭から順に試し、正規化済みヘッダーに部分一致する最初の列を返す。
pub fn resolve_column<S: AsRef<str>>(header: &[S], aliases: &[String]) -> Option<usize> {
    let normalized: Vec<String> = header.iter().map(|h| normalize_header(h.as_ref())).collect();

    for alias in aliases {
        let alias = alias.to_lowercase();
        if alias.is_empty() {
            continue;
        }
        if let Some(index) = normalized.iter().position(|h| h.contains(&alias)) {
            return Some(index);
        }
    }
    None
}
