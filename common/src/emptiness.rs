//! 化学式セルの空判定
//!
//! 空文字のほか「-」「N/A」「暂无」などの空値表記や、記号だけのセルも空とみなす。

/// 空値として扱う表記（前後空白除去後の完全一致）
pub const NULLISH_TOKENS: &[&str] = &[
    "-", "--", "---", "----", "—", "——", "–", "－",
    "N/A", "NA", "n/a", "na", "N.A.",
    "NULL", "null", "nil",
    "未知", "不详", "无", "暂无", "未提供",
    "unknown", "none", "not available", "not provided",
    "待补充", "待定", "空缺", "缺",
    "TBD", "TBA", "待确认",
    "#N/A", "#REF!", "#VALUE!", "#NAME?", "#DIV/0!", "#NULL!", "#NUM!",
];

/// これらの文字だけで構成されたセルは空
const SYMBOL_CUTSET: &[char] = &[
    '.', '-', '_', '/', '*', '\\', '|', '(', ')', '[', ']', '{', '}', '<', '>', '~', '!', '@',
    '#', '$', '%', '^', '&', ' ', '\t', '\n', '\r',
];

/// 化学式セルが空（補完対象）かを判定
pub fn is_formula_empty(value: &str) -> bool {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return true;
    }

    if NULLISH_TOKENS.contains(&trimmed) {
        return true;
    }

    trimmed.chars().all(|c| SYMBOL_CUTSET.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_empty() {
        assert!(is_formula_empty(""));
        assert!(is_formula_empty("   "));
        assert!(is_formula_empty("\u{3000}"));
    }

    #[test]
    fn test_nullish_tokens_are_empty() {
        for token in ["-", "N/A", "暂无", "#N/A", "未知", "NULL", "TBD", " -- "] {
            assert!(is_formula_empty(token), "{:?} は空と判定されるべき", token);
        }
    }

    #[test]
    fn test_symbol_only_is_empty() {
        assert!(is_formula_empty("/ /"));
        assert!(is_formula_empty("***"));
        assert!(is_formula_empty("(-)"));
    }

    #[test]
    fn test_formulas_are_present() {
        for formula in ["H2O", "C6H12O6", "HCHO", "NaCl", "C2H6O", "CuSO4·5H2O"] {
            assert!(!is_formula_empty(formula), "{:?} は値ありと判定されるべき", formula);
        }
    }

    #[test]
    fn test_tokens_are_exact_match() {
        // 部分一致では空にならない
        assert!(!is_formula_empty("NaN3"));
        assert!(!is_formula_empty("none-C2"));
    }
}
