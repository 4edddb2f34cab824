//! HTMLからの分子式抽出
//!
//! 参照サイトのマークアップは物質ごとに揺れがあるため、抽出方法を優先順に並べて
//! 最初に分子式が取れたものを採用する。
//!
//! 1. ResultsTable: `table#container-right` の検索結果表からCAS番号の行を探す
//! 2. LabelledRow: `table.ChemicalInfo` 内の「分子式」ラベル行の隣のセル
//! 3. LabelledRow: class `ltd` のラベルセルを持つ任意の行の隣のセル

use crate::types::ChemicalInfo;
use scraper::{ElementRef, Html, Selector};

/// 分子式ラベル（英字は大文字小文字を区別しない）
const FORMULA_LABELS: &[&str] = &["分子式", "molecular formula"];

/// 抽出方法
pub trait ExtractionStrategy: Send + Sync {
    /// ログ用の名前
    fn name(&self) -> &'static str;

    /// 分子式が空でない場合のみ `Some` を返す
    fn extract(&self, document: &Html, cas: &str) -> Option<ChemicalInfo>;
}

/// 抽出結果と、それを得た抽出方法の名前
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub info: ChemicalInfo,
    pub strategy: &'static str,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("組み込みセレクタが不正")
}

/// 要素のテキストを連結し、空白を畳んで前後を除去
fn element_text(element: &ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    normalize_ws(&raw)
}

/// 連続する空白を1つにまとめて前後を除去
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// 検索結果表の走査
///
/// 列位置は表の慣例で固定: 1=中文名, 2=英文名, 3=構造式画像, 4=分子式
pub struct ResultsTable {
    rows: Selector,
    cells: Selector,
    image: Selector,
}

impl Default for ResultsTable {
    fn default() -> Self {
        Self {
            rows: selector("table#container-right tr"),
            cells: selector("td"),
            image: selector("img"),
        }
    }
}

impl ExtractionStrategy for ResultsTable {
    fn name(&self) -> &'static str {
        "results-table"
    }

    fn extract(&self, document: &Html, cas: &str) -> Option<ChemicalInfo> {
        document
            .select(&self.rows)
            .skip(1) // 表頭
            .filter(|row| row.text().collect::<String>().contains(cas))
            .find_map(|row| {
                let cells: Vec<ElementRef<'_>> = row.select(&self.cells).collect();
                let text_at = |i: usize| cells.get(i).map(element_text).unwrap_or_default();

                let formula = text_at(4);
                if formula.is_empty() {
                    return None;
                }

                let structure_image = cells
                    .get(3)
                    .and_then(|td| td.select(&self.image).next())
                    .and_then(|img| img.value().attr("src"))
                    .map(|src| src.trim().to_string())
                    .unwrap_or_default();

                Some(ChemicalInfo {
                    cas: cas.to_string(),
                    chinese_name: text_at(1),
                    english_name: text_at(2),
                    structure_image,
                    formula,
                })
            })
    }
}

/// 「分子式」ラベル行の隣のセルを読む
pub struct LabelledRow {
    name: &'static str,
    rows: Selector,
    cells: Selector,
    label_class: Option<&'static str>,
}

impl LabelledRow {
    /// `table.ChemicalInfo` の行に限定
    pub fn chemical_info_table() -> Self {
        Self {
            name: "chemical-info-table",
            rows: selector("table.ChemicalInfo tr"),
            cells: selector("td"),
            label_class: None,
        }
    }

    /// 任意の行で、ラベルセルに class `ltd` があるもの
    pub fn label_cell() -> Self {
        Self {
            name: "label-cell",
            rows: selector("tr"),
            cells: selector("td"),
            label_class: Some("ltd"),
        }
    }

    fn is_label(&self, cell: &ElementRef<'_>) -> bool {
        if let Some(class) = self.label_class {
            if !cell.value().classes().any(|c| c == class) {
                return false;
            }
        }
        let text = element_text(cell).to_lowercase();
        FORMULA_LABELS.iter().any(|label| text.contains(label))
    }
}

impl ExtractionStrategy for LabelledRow {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, document: &Html, cas: &str) -> Option<ChemicalInfo> {
        document.select(&self.rows).find_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cells).collect();
            let label = cells.iter().position(|cell| self.is_label(cell))?;
            let formula = cells.get(label + 1).map(element_text)?;
            if formula.is_empty() {
                return None;
            }
            Some(ChemicalInfo {
                cas: cas.to_string(),
                formula,
                ..Default::default()
            })
        })
    }
}

/// 抽出方法を優先順に試す
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ResultsTable::default()),
            Box::new(LabelledRow::chemical_info_table()),
            Box::new(LabelledRow::label_cell()),
        ])
    }
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// HTMLを解析し、最初に成功した抽出結果を返す
    pub fn extract(&self, html: &str, cas: &str) -> Option<Extraction> {
        let document = Html::parse_document(html);
        let cas = cas.trim();

        self.strategies.iter().find_map(|strategy| {
            strategy.extract(&document, cas).map(|info| Extraction {
                info,
                strategy: strategy.name(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
        <table id="container-right">
          <tr><th>CAS</th><th>中文名</th><th>英文名</th><th>结构式</th><th>分子式</th></tr>
          <tr>
            <td>64-17-5</td><td>乙醇</td><td>Ethanol</td>
            <td><img src="/img/64-17-5.gif"></td><td> C2H6O </td>
          </tr>
          <tr>
            <td>50-00-0</td><td>甲醛</td><td>Formaldehyde</td>
            <td><img src=" /img/50-00-0.gif "></td><td>HCHO</td>
          </tr>
        </table>
        </body></html>
    "#;

    const INFO_PAGE: &str = r#"
        <html><body>
        <table class="ChemicalInfo">
          <tr><td>中文名称</td><td>甲醛</td></tr>
          <tr><td>分子式：</td><td>
              CH2O
          </td></tr>
        </table>
        </body></html>
    "#;

    const LABEL_CELL_PAGE: &str = r#"
        <html><body>
        <table class="Other">
          <tr><td class="ltd">CAS号</td><td>7732-18-5</td></tr>
          <tr><td class="ltd">分子式</td><td>H2O</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_results_table_reads_fixed_columns() {
        let extraction = Extractor::default().extract(RESULTS_PAGE, "50-00-0").unwrap();
        assert_eq!(extraction.strategy, "results-table");
        assert_eq!(extraction.info.chinese_name, "甲醛");
        assert_eq!(extraction.info.english_name, "Formaldehyde");
        assert_eq!(extraction.info.structure_image, "/img/50-00-0.gif");
        assert_eq!(extraction.info.formula, "HCHO");
    }

    #[test]
    fn test_results_table_trims_formula() {
        let extraction = Extractor::default().extract(RESULTS_PAGE, "64-17-5").unwrap();
        assert_eq!(extraction.info.formula, "C2H6O");
    }

    #[test]
    fn test_falls_back_to_chemical_info_table() {
        let extraction = Extractor::default().extract(INFO_PAGE, "50-00-0").unwrap();
        assert_eq!(extraction.strategy, "chemical-info-table");
        assert_eq!(extraction.info.formula, "CH2O");
        assert_eq!(extraction.info.cas, "50-00-0");
    }

    #[test]
    fn test_falls_back_to_label_cell() {
        let extraction = Extractor::default().extract(LABEL_CELL_PAGE, "7732-18-5").unwrap();
        assert_eq!(extraction.strategy, "label-cell");
        assert_eq!(extraction.info.formula, "H2O");
    }

    #[test]
    fn test_results_table_without_matching_row_falls_through() {
        // 検索結果表に該当CASが無く、ラベル行も無い
        assert!(Extractor::default().extract(RESULTS_PAGE, "7440-44-0").is_none());
    }

    #[test]
    fn test_empty_formula_cell_is_a_miss() {
        let html = r#"<table class="ChemicalInfo"><tr><td>分子式</td><td>  </td></tr></table>"#;
        assert!(Extractor::default().extract(html, "50-00-0").is_none());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = Extractor::default();
        let first = extractor.extract(RESULTS_PAGE, "50-00-0");
        let second = extractor.extract(RESULTS_PAGE, "50-00-0");
        assert_eq!(first, second);
    }

    #[test]
    fn test_results_table_takes_precedence() {
        let html = format!(
            "{}{}",
            RESULTS_PAGE,
            r#"<table class="ChemicalInfo"><tr><td>分子式</td><td>CH2O</td></tr></table>"#
        );
        let extraction = Extractor::default().extract(&html, "50-00-0").unwrap();
        assert_eq!(extraction.strategy, "results-table");
        assert_eq!(extraction.info.formula, "HCHO");
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  C6H12O6 \n\t "), "C6H12O6");
        assert_eq!(normalize_ws("a  b\u{a0}c"), "a b c");
    }
}
