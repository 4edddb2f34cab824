use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("化学式列が見つかりません（対象シート: {0}）")]
    FormulaColumnNotFound(String),

    #[error("台帳エラー: {0}")]
    Store(#[from] StoreError),

    #[error("HTTPクライアント初期化エラー: {0}")]
    HttpClient(String),

    #[error("レポート出力エラー: {0}")]
    Report(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] reagent_enrich_common::Error),
}

pub type Result<T> = std::result::Result<T, EnrichError>;
