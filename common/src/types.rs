//! 補完処理の型定義
//!
//! - Record: 台帳の1行（シートから都度生成し、単独では保存しない）
//! - EnrichmentTask: 解決器へ渡す作業単位（行番号 + CAS番号）
//! - ChemicalInfo: 参照サイトから抽出した化学情報
//! - RunStatistics: 1回の実行の集計

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 台帳の1行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// 1始まりの行番号（ヘッダー行が1）
    pub row_number: u32,
    pub cas: String,
    pub formula: String,
    pub needs_enrichment: bool,
}

/// 解決器へ渡す作業単位
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnrichmentTask {
    pub sheet: String,
    pub row: u32,
    pub cas: String,
}

/// 参照サイトから抽出した化学情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChemicalInfo {
    pub cas: String,
    pub chinese_name: String,     // 中文名
    pub english_name: String,     // 英文名
    pub structure_image: String,  // 構造式画像URL
    pub formula: String,          // 分子式
}

/// 行単位の失敗理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    NotFound,
    FetchError,
    DecodeError,
    ExtractionMiss,
    WriteError,
    /// 取得タスクの異常終了（パニックなど）
    TaskAborted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "NotFound",
            FailureKind::FetchError => "FetchError",
            FailureKind::DecodeError => "DecodeError",
            FailureKind::ExtractionMiss => "ExtractionMiss",
            FailureKind::WriteError => "WriteError",
            FailureKind::TaskAborted => "TaskAborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1回の実行の集計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatistics {
    /// 走査したデータ行数（ヘッダー除く）
    pub rows_scanned: usize,
    /// 化学式が空と判定された行数
    pub rows_flagged: usize,
    pub rows_enriched: usize,
    pub rows_failed: usize,
    /// キャンセルにより未処理のまま残った行数
    pub rows_skipped: usize,
    pub failures: BTreeMap<FailureKind, usize>,
}

impl RunStatistics {
    pub fn record_success(&mut self) {
        self.rows_enriched += 1;
    }

    pub fn record_failure(&mut self, kind: FailureKind) {
        self.rows_failed += 1;
        *self.failures.entry(kind).or_insert(0) += 1;
    }

    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// 別シートの集計を合算
    pub fn merge(&mut self, other: &RunStatistics) {
        self.rows_scanned += other.rows_scanned;
        self.rows_flagged += other.rows_flagged;
        self.rows_enriched += other.rows_enriched;
        self.rows_failed += other.rows_failed;
        self.rows_skipped += other.rows_skipped;
        for (kind, count) in &other.failures {
            *self.failures.entry(*kind).or_insert(0) += count;
        }
    }
}
