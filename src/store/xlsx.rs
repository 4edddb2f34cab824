//! Excel台帳ストア
//!
//! 値の読み込みは calamine、書き戻しは umya-spreadsheet で読み込んだブックへのセル単位の編集。
//! 書き込んだセル以外（書式・結合セル・列幅・数式・エラー値など）は元のまま残る。
//! 保存は同じディレクトリの一時ファイルに書いてから置き換えるため、
//! 途中で中断しても元のファイルか新しいファイルのどちらかが残る。

use super::{trim_trailing_empty, StoreError, StoreResult, TabularStore};
use calamine::{open_workbook_auto, Data, Reader};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use umya_spreadsheet::Spreadsheet;

/// xlsx の上限（行は1始まり、列は0始まり）
const MAX_ROW: u32 = 1_048_576;
const MAX_COL: usize = 16_383;

/// セル値の文字列表現
fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "TRUE".into(),
        Data::Bool(false) => "FALSE".into(),
        // Excelシリアル値
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => e.to_string(),
    }
}

/// 0始まりの絶対位置のセル（必要なら行・列を広げる）
fn grid_cell(rows: &mut Vec<Vec<String>>, row: usize, col: usize) -> &mut String {
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize_with(col + 1, String::new);
    }
    &mut cells[col]
}

#[derive(Debug, Clone)]
struct SheetText {
    name: String,
    rows: Vec<Vec<String>>,
}

pub struct XlsxStore {
    path: PathBuf,
    sheets: Vec<SheetText>,
    book: Spreadsheet,
    pending: usize,
}

impl XlsxStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let writable = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false);
        if !writable {
            return Err(StoreError::UnsupportedFormat(display));
        }

        let mut workbook = open_workbook_auto(path).map_err(|e| StoreError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(StoreError::NoSheets(display));
        }

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name).map_err(|e| StoreError::Open {
                path: display.clone(),
                message: format!("{}: {}", name, e),
            })?;

            let mut rows = Vec::new();
            if let Some((r0, c0)) = range.start() {
                for (i, row) in range.rows().enumerate() {
                    for (j, data) in row.iter().enumerate() {
                        let text = cell_text(data);
                        if !text.is_empty() {
                            *grid_cell(&mut rows, r0 as usize + i, c0 as usize + j) = text;
                        }
                    }
                }
            }

            tracing::debug!(sheet = %name, rows = rows.len(), "シート読み込み");
            sheets.push(SheetText { name, rows });
        }

        // 書き戻し用に書式ごと読み込む
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| StoreError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
            book,
            pending: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularStore for XlsxStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        if self.sheets.is_empty() {
            return Err(StoreError::NoSheets(self.path.display().to_string()));
        }
        Ok(self.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn read_rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>> {
        self.sheets
            .iter()
            .find(|s| s.name == sheet)
            .map(|s| s.rows.iter().cloned().map(trim_trailing_empty).collect())
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))
    }

    fn set_cell(&mut self, sheet: &str, row: u32, col: usize, value: &str) -> StoreResult<()> {
        if row == 0 || row > MAX_ROW || col > MAX_COL {
            return Err(StoreError::InvalidCell { row, col });
        }

        let text = self
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet)
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))?;
        let worksheet = self
            .book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))?;

        // umya は (列, 行) の1始まり
        worksheet
            .get_cell_mut((col as u32 + 1, row))
            .set_value_string(value);
        *grid_cell(&mut text.rows, row as usize - 1, col) = value.to_string();

        self.pending += 1;
        Ok(())
    }

    fn persist(&mut self) -> StoreResult<()> {
        let mut buffer = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut buffer)
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(buffer.get_ref())?;
        // 一時ファイルは 0600 で作られるため元の権限を引き継ぐ
        if let Ok(metadata) = std::fs::metadata(&self.path) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist(e.error))?;

        tracing::debug!(path = %self.path.display(), writes = self.pending, "台帳を保存");
        self.pending = 0;
        Ok(())
    }

    fn has_pending_writes(&self) -> bool {
        self.pending > 0
    }
}
