//! CAS登録番号の正規化と検査
//!
//! 形式は `NNNNNNN-NN-N`（先頭2〜7桁）。末尾はチェックディジットで、
//! チェックディジット以外の桁を右から 1, 2, 3... 倍して合計した値の10の剰余。

use regex::Regex;

/// 全角数字・全角ハイフン類を半角に揃え、前後の空白を除去
pub fn normalize(cas: &str) -> String {
    cas.trim()
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '－' | '‐' | '‑' | '–' | '—' | 'ー' => '-',
            _ => c,
        })
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// 形式とチェックディジットが正しいか
pub fn is_valid(cas: &str) -> bool {
    lazy_static::lazy_static! {
        static ref CAS_RE: Regex = Regex::new(r"^(\d{2,7})-(\d{2})-(\d)$").unwrap();
    }

    let Some(caps) = CAS_RE.captures(cas) else {
        return false;
    };

    let body = format!("{}{}", &caps[1], &caps[2]);
    let check = caps[3].parse::<u32>().unwrap_or(10);

    let sum: u32 = body
        .chars()
        .rev()
        .enumerate()
        .filter_map(|(i, c)| c.to_digit(10).map(|d| d * (i as u32 + 1)))
        .sum();

    sum % 10 == check
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        for cas in ["50-00-0", "64-17-5", "7732-18-5", "7647-14-5", "67-64-1", "50-99-7"] {
            assert!(is_valid(cas), "{} は有効", cas);
        }
    }

    #[test]
    fn test_wrong_check_digit() {
        assert!(!is_valid("50-00-1"));
        assert!(!is_valid("64-17-4"));
    }

    #[test]
    fn test_malformed() {
        assert!(!is_valid(""));
        assert!(!is_valid("5-00-0"));
        assert!(!is_valid("50000"));
        assert!(!is_valid("错误: 行号超出范围"));
    }

    #[test]
    fn test_normalize_full_width() {
        assert_eq!(normalize(" ５０－００－０ "), "50-00-0");
        assert_eq!(normalize("64 - 17 - 5"), "64-17-5");
    }
}
