//! 取得エラーログ
//!
//! HTTPステータス付きの取得失敗を `時刻 | ステータス | URL` の形式で追記する。
//! ファイルが無ければ作成し、切り詰めやローテーションはしない。

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Local>,
    pub status: u16,
    pub url: String,
}

impl ErrorLogEntry {
    pub fn now(status: u16, url: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            status,
            url: url.into(),
        }
    }
}

impl fmt::Display for ErrorLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status,
            self.url
        )
    }
}

/// エラーログの追記先
pub trait ErrorLogSink {
    fn append(&mut self, entry: &ErrorLogEntry) -> io::Result<()>;
}

/// メモリ上に溜める（テスト用）
impl ErrorLogSink for Vec<ErrorLogEntry> {
    fn append(&mut self, entry: &ErrorLogEntry) -> io::Result<()> {
        self.push(entry.clone());
        Ok(())
    }
}

/// ファイルへ追記
#[derive(Debug, Clone)]
pub struct FileErrorLog {
    path: PathBuf,
}

impl FileErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ErrorLogSink for FileErrorLog {
    fn append(&mut self, entry: &ErrorLogEntry) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry)?;
        file.flush()
    }
}
