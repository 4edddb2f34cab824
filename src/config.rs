use crate::error::{EnrichError, Result};
use crate::resolver::DEFAULT_URL_TEMPLATE;
use reagent_enrich_common::ColumnAliases;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `{cas}` を含む参照URL
    pub url_template: String,
    pub timeout_seconds: u64,
    /// 同時取得数
    pub concurrency: usize,
    /// 何件書き込むごとに保存するか
    pub persist_every: usize,
    pub user_agent: String,
    pub accept_language: String,
    /// Content-Type に charset が無い場合の文字コード
    pub default_encoding: String,
    pub error_log: PathBuf,
    pub report_path: Option<PathBuf>,
    /// 別名リストを丸ごと差し替えるJSONファイル
    pub alias_file: Option<PathBuf>,
    pub extra_formula_aliases: Vec<String>,
    pub extra_cas_aliases: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.into(),
            timeout_seconds: 15,
            concurrency: 4,
            persist_every: 1,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            accept_language: "zh-CN,zh;q=0.8,en-US;q=0.5,en;q=0.3".into(),
            default_encoding: "gbk".into(),
            error_log: PathBuf::from("error_log.txt"),
            report_path: None,
            alias_file: None,
            extra_formula_aliases: Vec::new(),
            extra_cas_aliases: Vec::new(),
        }
    }
}

impl Config {
    /// 既定の場所から読み込み（無ければ既定値）
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "設定ファイルなし、既定値を使用");
            return Ok(Self::default());
        }
        let config: Config = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `<設定ディレクトリ>/reagent-enrich/config.json`
    pub fn config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("reagent-enrich").join("config.json"))
            .ok_or_else(|| EnrichError::Config("設定ディレクトリが見つかりません".into()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.url_template.contains("{cas}") {
            return Err(EnrichError::Config(format!(
                "url_template に {{cas}} が含まれていません: {}",
                self.url_template
            )));
        }
        if self.concurrency == 0 {
            return Err(EnrichError::Config("concurrency は1以上にしてください".into()));
        }
        if self.persist_every == 0 {
            return Err(EnrichError::Config("persist_every は1以上にしてください".into()));
        }
        Ok(())
    }

    /// 列特定に使う別名
    ///
    /// `alias_file` があればその内容、無ければ組み込みの別名に、設定の追加分を足したもの
    pub fn column_aliases(&self) -> Result<ColumnAliases> {
        let mut aliases = match &self.alias_file {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|_| {
                    EnrichError::FileNotFound(path.display().to_string())
                })?;
                ColumnAliases::from_json(&content)?
            }
            None => ColumnAliases::default(),
        };
        aliases.extend(&self.extra_formula_aliases, &self.extra_cas_aliases);
        Ok(aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_template_without_placeholder() {
        let config = Config {
            url_template: "http://example.test/lookup".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EnrichError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"concurrency": 8}"#).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout_seconds, 15);
        assert_eq!(config.url_template, DEFAULT_URL_TEMPLATE);
    }

    #[test]
    fn test_column_aliases_include_extras() {
        let config = Config {
            extra_formula_aliases: vec!["Summenformel".into()],
            ..Default::default()
        };
        let aliases = config.column_aliases().unwrap();
        assert!(aliases.formula.contains(&"summenformel".to_string()));
    }

    #[test]
    fn test_alias_file_replaces_builtin() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, r#"{"formula": ["组成"], "cas": ["登记号"]}"#).unwrap();

        let config = Config {
            alias_file: Some(path),
            extra_cas_aliases: vec!["CAS RN".into()],
            ..Default::default()
        };
        let aliases = config.column_aliases().unwrap();
        assert_eq!(aliases.formula, vec!["组成".to_string()]);
        assert_eq!(aliases.cas, vec!["登记号".to_string(), "cas rn".to_string()]);
    }

    #[test]
    fn test_alias_file_with_empty_formula_list() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, r#"{"formula": [], "cas": ["cas"]}"#).unwrap();

        let config = Config {
            alias_file: Some(path),
            ..Default::default()
        };
        assert!(matches!(config.column_aliases(), Err(EnrichError::Common(_))));
    }

    #[test]
    fn test_missing_alias_file() {
        let config = Config {
            alias_file: Some(PathBuf::from("/nonexistent/aliases.json")),
            ..Default::default()
        };
        assert!(matches!(config.column_aliases(), Err(EnrichError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.concurrency, 4);
        assert!(config.alias_file.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            concurrency: 2,
            url_template: "http://example.test/{cas}".into(),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.concurrency, 2);
        assert_eq!(loaded.url_template, "http://example.test/{cas}");
        assert_eq!(loaded.timeout_seconds, 15);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"persist_every": 0}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(EnrichError::Config(_))));
    }
}
