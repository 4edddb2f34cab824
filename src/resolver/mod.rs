//! 分子式解決モジュール
//!
//! CAS番号から参照ページのURLを組み立て、取得・デコード・抽出を行う。
//! 失敗は行単位の値として返し、呼び出し側はそのまま次の行へ進む。
//! 再試行は行わない。

mod fetch;

pub use fetch::{charset_from_content_type, decode, FetchFailure, HttpFetcher, PageFetcher};

use crate::cas;
use reagent_enrich_common::{ChemicalInfo, Extractor, FailureKind};
use std::time::Duration;
use thiserror::Error;

/// 行単位の解決失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    #[error("CAS番号が無効です: {cas:?}")]
    NotFound { cas: String },

    #[error("取得失敗: {url} ({reason})")]
    Fetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("文字コード変換失敗: {url} ({encoding})")]
    Decode { url: String, encoding: String },

    #[error("分子式が見つかりません: {url}")]
    ExtractionMiss { url: String },
}

impl ResolveFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveFailure::NotFound { .. } => FailureKind::NotFound,
            ResolveFailure::Fetch { .. } => FailureKind::FetchError,
            ResolveFailure::Decode { .. } => FailureKind::DecodeError,
            ResolveFailure::ExtractionMiss { .. } => FailureKind::ExtractionMiss,
        }
    }

    /// HTTPステータス付きの取得失敗なら (ステータス, URL)
    pub fn http_status(&self) -> Option<(u16, &str)> {
        match self {
            ResolveFailure::Fetch {
                url,
                status: Some(code),
                ..
            } => Some((*code, url.as_str())),
            _ => None,
        }
    }
}

pub type Resolution = std::result::Result<ChemicalInfo, ResolveFailure>;

/// 既定の参照URL
pub const DEFAULT_URL_TEMPLATE: &str = "http://www.ichemistry.cn/chemistry/{cas}.htm";

pub struct FormulaResolver<F> {
    fetcher: F,
    url_template: String,
    timeout: Duration,
    extractor: Extractor,
}

impl<F: PageFetcher> FormulaResolver<F> {
    pub fn new(fetcher: F, url_template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            url_template: url_template.into(),
            timeout,
            extractor: Extractor::default(),
        }
    }

    /// `{cas}` をCAS番号で置き換えたURL
    pub fn lookup_url(&self, cas: &str) -> String {
        self.url_template.replace("{cas}", cas)
    }

    pub async fn resolve(&self, cas: &str) -> Resolution {
        let cas = cas::normalize(cas);
        if !cas::is_valid(&cas) {
            return Err(ResolveFailure::NotFound { cas });
        }

        let url = self.lookup_url(&cas);
        let page = match tokio::time::timeout(self.timeout, self.fetcher.fetch(&url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(FetchFailure::Decode(encoding))) => {
                return Err(ResolveFailure::Decode { url, encoding });
            }
            Ok(Err(FetchFailure::Status(code))) => {
                return Err(ResolveFailure::Fetch {
                    url,
                    status: Some(code),
                    reason: format!("HTTPステータス {}", code),
                });
            }
            Ok(Err(failure)) => {
                return Err(ResolveFailure::Fetch {
                    url,
                    status: None,
                    reason: failure.to_string(),
                });
            }
            Err(_) => {
                return Err(ResolveFailure::Fetch {
                    url,
                    status: None,
                    reason: FetchFailure::Timeout.to_string(),
                });
            }
        };

        match self.extractor.extract(&page, &cas) {
            Some(extraction) => {
                tracing::debug!(
                    cas = %cas,
                    strategy = extraction.strategy,
                    formula = %extraction.info.formula,
                    "分子式を抽出"
                );
                Ok(extraction.info)
            }
            None => Err(ResolveFailure::ExtractionMiss { url }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticFetcher {
        pages: HashMap<String, std::result::Result<String, FetchFailure>>,
        calls: Arc<AtomicUsize>,
    }

    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<String, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchFailure::Status(404)))
        }
    }

    struct SlowFetcher;

    impl PageFetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> std::result::Result<String, FetchFailure> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    fn resolver(pages: Vec<(&str, std::result::Result<String, FetchFailure>)>) -> (FormulaResolver<StaticFetcher>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = StaticFetcher {
            pages: pages.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            calls: Arc::clone(&calls),
        };
        (
            FormulaResolver::new(fetcher, "http://example.test/{cas}.htm", Duration::from_secs(5)),
            calls,
        )
    }

    const FORMALDEHYDE: &str =
        r#"<table class="ChemicalInfo"><tr><td>分子式</td><td>HCHO</td></tr></table>"#;

    #[test]
    fn test_lookup_url() {
        let (resolver, _) = resolver(vec![]);
        assert_eq!(resolver.lookup_url("50-00-0"), "http://example.test/50-00-0.htm");
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let (resolver, _) = resolver(vec![("http://example.test/50-00-0.htm", Ok(FORMALDEHYDE.into()))]);
        let info = resolver.resolve(" 50-00-0 ").await.unwrap();
        assert_eq!(info.formula, "HCHO");
        assert_eq!(info.cas, "50-00-0");
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (resolver, _) = resolver(vec![("http://example.test/50-00-0.htm", Ok(FORMALDEHYDE.into()))]);
        assert_eq!(resolver.resolve("50-00-0").await, resolver.resolve("50-00-0").await);
        assert_eq!(resolver.resolve("64-17-5").await, resolver.resolve("64-17-5").await);
    }

    #[tokio::test]
    async fn test_http_status_failure() {
        let (resolver, _) = resolver(vec![]);
        let failure = resolver.resolve("50-00-0").await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::FetchError);
        assert_eq!(failure.http_status(), Some((404, "http://example.test/50-00-0.htm")));
    }

    #[tokio::test]
    async fn test_transport_failure_has_no_status() {
        let (resolver, _) = resolver(vec![(
            "http://example.test/50-00-0.htm",
            Err(FetchFailure::Transport("connection refused".into())),
        )]);
        let failure = resolver.resolve("50-00-0").await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::FetchError);
        assert_eq!(failure.http_status(), None);
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let (resolver, _) = resolver(vec![(
            "http://example.test/50-00-0.htm",
            Err(FetchFailure::Decode("GBK".into())),
        )]);
        let failure = resolver.resolve("50-00-0").await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::DecodeError);
    }

    #[tokio::test]
    async fn test_extraction_miss() {
        let (resolver, _) = resolver(vec![("http://example.test/50-00-0.htm", Ok("<html></html>".into()))]);
        let failure = resolver.resolve("50-00-0").await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::ExtractionMiss);
    }

    #[tokio::test]
    async fn test_invalid_cas_is_not_fetched() {
        let (resolver, calls) = resolver(vec![]);
        let failure = resolver.resolve("50-00-1").await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_fetch_error() {
        let resolver = FormulaResolver::new(SlowFetcher, "http://example.test/{cas}.htm", Duration::from_millis(20));
        let failure = resolver.resolve("50-00-0").await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::FetchError);
        assert_eq!(failure.http_status(), None);
    }
}
