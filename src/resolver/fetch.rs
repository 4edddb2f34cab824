//! ページ取得と文字コード変換
//!
//! 参照サイトは GBK で返すため、Content-Type の charset が無ければ既定の文字コードで変換する。

use crate::config::Config;
use crate::error::{EnrichError, Result};
use encoding_rs::Encoding;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("HTTPステータス {0}")]
    Status(u16),

    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("タイムアウト")]
    Timeout,

    #[error("文字コード変換エラー（{0}）")]
    Decode(String),
}

/// URLからページを取得し、デコード済みテキストを返す
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = std::result::Result<String, FetchFailure>> + Send;
}

/// reqwest による取得
pub struct HttpFetcher {
    client: reqwest::Client,
    default_encoding: &'static Encoding,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let default_encoding = Encoding::for_label(config.default_encoding.as_bytes()).ok_or_else(|| {
            EnrichError::Config(format!("不明な文字コード: {}", config.default_encoding))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        let language = HeaderValue::from_str(&config.accept_language)
            .map_err(|e| EnrichError::HttpClient(e.to_string()))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EnrichError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            default_encoding,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .unwrap_or(self.default_encoding);

        let bytes = response.bytes().await.map_err(transport_failure)?;
        decode(&bytes, encoding)
    }
}

fn transport_failure(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Transport(e.to_string())
    }
}

/// `text/html; charset=gbk` から文字コードを取り出す
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

/// 不正なバイト列を含む場合は失敗
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> std::result::Result<String, FetchFailure> {
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchFailure::Decode(actual.name().to_string()));
    }
    Ok(text.into_owned())
}
