//! 台帳ストア
//!
//! スプレッドシートを「シート一覧・全行読み込み・セル書き込み・保存」の操作に抽象化する。
//! 書き込みはメモリ上にバッファされ、`persist` で初めてファイルに反映される。

mod memory;
mod xlsx;

pub use memory::MemoryStore;
pub use xlsx::XlsxStore;

use reagent_enrich_common::alias;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("ファイルを開けません: {path}: {message}")]
    Open { path: String, message: String },

    #[error("対応していない形式です（.xlsx のみ書き戻し可能）: {0}")]
    UnsupportedFormat(String),

    #[error("ワークシートがありません: {0}")]
    NoSheets(String),

    #[error("ワークシートが見つかりません: {0}")]
    UnknownSheet(String),

    #[error("セル位置が不正です: 行 {row}, 列 {col}")]
    InvalidCell { row: u32, col: usize },

    #[error("書き込みエラー: {0}")]
    Write(String),

    #[error("保存エラー: {0}")]
    Persist(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 台帳ストアの操作
///
/// 行番号は1始まり（ヘッダー行が1）、列番号は0始まり。
pub trait TabularStore {
    /// シート名一覧（ファイル内の順序）
    fn list_sheets(&self) -> StoreResult<Vec<String>>;

    /// シートの全行。先頭行はヘッダーとして扱われる。
    /// 各行の末尾の空セルは含まない。
    fn read_rows(&self, sheet: &str) -> StoreResult<Vec<Vec<String>>>;

    /// セルへ文字列を書き込む（メモリ上のみ）
    fn set_cell(&mut self, sheet: &str, row: u32, col: usize, value: &str) -> StoreResult<()>;

    /// 前回の保存以降の書き込みをすべて反映
    fn persist(&mut self) -> StoreResult<()>;

    /// 未保存の書き込みがあるか
    fn has_pending_writes(&self) -> bool;

    /// ヘッダー行から列を特定
    fn resolve_column(&self, header: &[String], aliases: &[String]) -> Option<usize> {
        alias::resolve_column(header, aliases)
    }
}

/// 末尾の空セルを落とす
pub(crate) fn trim_trailing_empty(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}
