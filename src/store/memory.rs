//! メモリ上の台帳ストア（テスト・試行用）

use super::{trim_trailing_empty, StoreError, StoreResult, TabularStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: Vec<(String, Vec<Vec<String>>)>,
    /// 保存済みの内容
    committed: Vec<(String, Vec<Vec<String>>)>,
    pending: usize,
    persist_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// シートを追加（内容は保存済みとして扱う）
    pub fn with_sheet(mut self, name: &str, rows: Vec<Vec<&str>>) -> Self {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect();
        self.sheets.push((name.to_string(), rows.clone()));
        self.committed.push((name.to_string(), rows));
        self
    }

    /// 保存済みの内容（未保存の書き込みを含まない）
    pub fn committed_rows(&self, sheet: &str) -> Option<&Vec<Vec<String>>> {
        self.committed
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, rows)| rows)
    }

    pub fn persist_count(&self) -> usize {
        self.persist_count
    }

    fn sheet_mut(&mut self, sheet: &str) -> StoreResult<&mut Vec<Vec<String>>> {
        self.sheets
            .iter_mut()
            .find(|(name, _)| name == sheet)
            .map(|(_, rows)| rows)
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))
    }
}

impl TabularStore for MemoryStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        if self.sheets.is_empty() {
            return Err(StoreError::NoSheets("<memory>".into()));
        }
        Ok(self.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, rows)| rows.iter().cloned().map(trim_trailing_empty).collect())
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))
    }

    fn set_cell(&mut self, sheet: &str, row: u32, col: usize, value: &str) -> StoreResult<()> {
        if row == 0 {
            return Err(StoreError::InvalidCell { row, col });
        }
        let rows = self.sheet_mut(sheet)?;
        let r = row as usize - 1;
        if rows.len() <= r {
            rows.resize(r + 1, Vec::new());
        }
        let cells = &mut rows[r];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        self.pending += 1;
        Ok(())
    }

    fn persist(&mut self) -> StoreResult<()> {
        self.committed = self.sheets.clone();
        self.pending = 0;
        self.persist_count += 1;
        Ok(())
    }

    fn has_pending_writes(&self) -> bool {
        self.pending > 0
    }
}
