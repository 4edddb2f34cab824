//! 空欄走査モジュール
//!
//! シートの各データ行について化学式セルが空かを判定し、
//! 補完対象の行番号とそのCAS番号を対応付ける。

use crate::error::{EnrichError, Result};
use crate::store::{StoreError, TabularStore};
use reagent_enrich_common::{is_formula_empty, ColumnAliases, EnrichmentTask, Record};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("化学式列が見つかりません: {0}")]
    FormulaColumnNotFound(String),

    #[error("ワークシートが空です: {0}")]
    EmptySheet(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// CAS番号が読めなかった理由
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasMissing {
    #[error("行番号が範囲外")]
    RowOutOfRange,

    #[error("列数不足")]
    ColumnMissing,

    #[error("CAS番号が空")]
    Blank,

    #[error("CAS列なし")]
    NoCasColumn,
}

pub type CasLookup = std::result::Result<String, CasMissing>;

/// 1シートの走査結果
#[derive(Debug, Clone)]
pub struct SheetScan {
    pub sheet: String,
    /// 化学式列（0始まり）
    pub formula_col: usize,
    /// CAS列（0始まり）。見つからなければ補完はできないが空行一覧は有効
    pub cas_col: Option<usize>,
    /// データ行数（ヘッダー除く）
    pub rows_scanned: usize,
    /// 化学式が空の行番号（1始まり、昇順）
    pub empty_rows: Vec<u32>,
    pub cas_by_row: BTreeMap<u32, CasLookup>,
}

impl SheetScan {
    /// CAS番号が読めた行の作業単位
    pub fn tasks(&self) -> Vec<EnrichmentTask> {
        self.cas_by_row
            .iter()
            .filter_map(|(row, cas)| {
                cas.as_ref().ok().map(|cas| EnrichmentTask {
                    sheet: self.sheet.clone(),
                    row: *row,
                    cas: cas.clone(),
                })
            })
            .collect()
    }

    /// CAS番号が読めなかった行
    pub fn missing_cas(&self) -> Vec<(u32, CasMissing)> {
        self.cas_by_row
            .iter()
            .filter_map(|(row, cas)| cas.as_ref().err().map(|reason| (*row, *reason)))
            .collect()
    }
}

fn cell(row: &[String], col: usize) -> Option<&str> {
    row.get(col).map(String::as_str)
}

/// データ行（ヘッダー除く）を Record に変換
pub fn records(rows: &[Vec<String>], formula_col: usize, cas_col: Option<usize>) -> Vec<Record> {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(index, row)| {
            // 列数が足りない行は化学式なし
            let formula = cell(row, formula_col).unwrap_or_default();
            let cas = cas_col.and_then(|c| cell(row, c)).unwrap_or_default();
            Record {
                row_number: index as u32 + 1,
                cas: cas.trim().to_string(),
                formula: formula.to_string(),
                needs_enrichment: is_formula_empty(formula),
            }
        })
        .collect()
}

/// 化学式が空の行番号（1始まり）
pub fn find_empty_rows(rows: &[Vec<String>], formula_col: usize) -> Vec<u32> {
    let mut empty_rows = Vec::new();
    for record in records(rows, formula_col, None) {
        if record.needs_enrichment {
            empty_rows.push(record.row_number);
            if empty_rows.len() % 500 == 0 {
                tracing::debug!(found = empty_rows.len(), "空の化学式を検出中");
            }
        }
    }
    empty_rows
}

/// 指定行のCAS番号を読む
///
/// 読めない行は理由付きで返し、他の行の処理は続ける。
pub fn lookup_cas(
    rows: &[Vec<String>],
    cas_col: usize,
    row_numbers: &[u32],
) -> BTreeMap<u32, CasLookup> {
    row_numbers
        .iter()
        .map(|&row_number| {
            let lookup = if row_number < 1 || row_number as usize > rows.len() {
                Err(CasMissing::RowOutOfRange)
            } else {
                match cell(&rows[row_number as usize - 1], cas_col) {
                    None => Err(CasMissing::ColumnMissing),
                    Some(cas) if cas.trim().is_empty() => Err(CasMissing::Blank),
                    Some(cas) => Ok(cas.trim().to_string()),
                }
            };
            (row_number, lookup)
        })
        .collect()
}

/// シートを走査
pub fn scan_sheet<S: TabularStore + ?Sized>(
    store: &S,
    sheet: &str,
    aliases: &ColumnAliases,
) -> std::result::Result<SheetScan, ScanError> {
    let rows = store.read_rows(sheet)?;
    let Some(header) = rows.first() else {
        return Err(ScanError::EmptySheet(sheet.to_string()));
    };

    let formula_col = store
        .resolve_column(header, &aliases.formula)
        .ok_or_else(|| ScanError::FormulaColumnNotFound(sheet.to_string()))?;
    tracing::info!(sheet, column = formula_col + 1, header = %header[formula_col], "化学式列を検出");

    let cas_col = store.resolve_column(header, &aliases.cas);
    match cas_col {
        Some(col) => tracing::info!(sheet, column = col + 1, header = %header[col], "CAS列を検出"),
        None => tracing::warn!(sheet, "CAS列が見つかりません。空行の一覧のみ出力します"),
    }

    let empty_rows = find_empty_rows(&rows, formula_col);

    let cas_by_row = match cas_col {
        Some(col) => lookup_cas(&rows, col, &empty_rows),
        None => empty_rows
            .iter()
            .map(|&row| (row, Err(CasMissing::NoCasColumn)))
            .collect(),
    };

    tracing::info!(sheet, empty = empty_rows.len(), "化学式が空の行を検出");

    Ok(SheetScan {
        sheet: sheet.to_string(),
        formula_col,
        cas_col,
        rows_scanned: rows.len() - 1,
        empty_rows,
        cas_by_row,
    })
}

/// 全シートを走査
///
/// 化学式列が無いシートや空のシートは警告して飛ばす。
/// どのシートにも化学式列が無ければエラー。
pub fn scan_workbook<S: TabularStore + ?Sized>(store: &S, aliases: &ColumnAliases) -> Result<Vec<SheetScan>> {
    let sheets = store.list_sheets()?;
    let mut scans = Vec::with_capacity(sheets.len());

    for sheet in &sheets {
        match scan_sheet(store, sheet, aliases) {
            Ok(scan) => scans.push(scan),
            Err(ScanError::Store(e)) => return Err(e.into()),
            Err(e) => tracing::warn!(sheet = %sheet, error = %e, "シートをスキップ"),
        }
    }

    if scans.is_empty() {
        return Err(EnrichError::FormulaColumnNotFound(sheets.join(", ")));
    }
    Ok(scans)
}
