//! 空欄レポートと集計表示

use crate::error::{EnrichError, Result};
use crate::scanner::SheetScan;
use chrono::{DateTime, Local};
use reagent_enrich_common::{FailureKind, RunStatistics};
use std::fmt::Write as _;
use std::path::Path;

/// 1行あたりの行番号数
const ROWS_PER_LINE: usize = 10;

/// 行番号を10個ずつ、幅6の左寄せで並べる
pub fn group_rows(rows: &[u32]) -> Vec<String> {
    rows.chunks(ROWS_PER_LINE)
        .map(|chunk| chunk.iter().map(|row| format!("{:<6}", row)).collect())
        .collect()
}

/// コンソール用の空欄サマリー（件数・行番号・範囲・割合）
pub fn summary_lines(rows: &[u32]) -> Vec<String> {
    let mut lines = vec![format!("化学式が空の行: {} 件", rows.len())];
    lines.extend(group_rows(rows));

    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        lines.push(format!("行番号の範囲: {} - {}", first, last));
        lines.push(format!(
            "空欄の割合: {:.2}%",
            rows.len() as f64 / f64::from(*last) * 100.0
        ));
    }
    lines
}

/// 実行結果の集計表示
pub fn statistics_lines(stats: &RunStatistics) -> Vec<String> {
    let mut lines = vec![
        format!("走査行数: {}", stats.rows_scanned),
        format!("空欄行数: {}", stats.rows_flagged),
        format!("補完成功: {}", stats.rows_enriched),
        format!("補完失敗: {}", stats.rows_failed),
    ];
    if stats.rows_skipped > 0 {
        lines.push(format!("未処理（キャンセル）: {}", stats.rows_skipped));
    }
    for kind in [
        FailureKind::NotFound,
        FailureKind::FetchError,
        FailureKind::DecodeError,
        FailureKind::ExtractionMiss,
        FailureKind::WriteError,
        FailureKind::TaskAborted,
    ] {
        let count = stats.failures_of(kind);
        if count > 0 {
            lines.push(format!("  {}: {}", kind, count));
        }
    }
    lines
}

/// レポート本文
pub fn render_empty_row_report(source: &Path, scans: &[SheetScan], generated_at: DateTime<Local>) -> String {
    let total: usize = scans.iter().map(|s| s.empty_rows.len()).sum();

    let mut out = String::new();
    out.push_str("化学式が空の行の一覧\n");
    out.push_str("====================\n\n");
    let _ = writeln!(out, "作成日時: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "対象ファイル: {}", source.display());
    let _ = writeln!(out, "合計: {} 件\n", total);

    for scan in scans {
        let _ = writeln!(out, "[{}] {} 件", scan.sheet, scan.empty_rows.len());
        out.push_str("----------------\n");
        for line in group_rows(&scan.empty_rows) {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("====================\n");
    out.push_str("以上\n");
    out
}

/// レポートファイルを書き出す（既存ファイルは上書き）
pub fn write_empty_row_report(path: &Path, source: &Path, scans: &[SheetScan]) -> Result<()> {
    let content = render_empty_row_report(source, scans, Local::now());
    std::fs::write(path, content)
        .map_err(|e| EnrichError::Report(format!("{}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "空欄レポートを出力");
    Ok(())
}
