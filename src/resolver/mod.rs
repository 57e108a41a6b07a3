//! Market detection and symbol normalization.
//!
//! Each market spells symbols differently: Hong Kong listings carry a
//! `.HK` suffix, mainland China listings a `.SS`/`.SZ` suffix (with bare
//! six-digit codes common in user input), and US listings are plain
//! tickers. These functions classify a raw symbol into a [`Market`] and
//! rewrite it into the canonical spelling the vendor adapters expect.
//!
//! Both functions are pure and total: unknown formats classify as US
//! rather than failing, and normalization is idempotent.

use crate::models::Market;

/// Detect the market a symbol belongs to.
///
/// Rules, applied in order, first match wins:
/// 1. Suffix `.HK` → [`Market::Hk`]
/// 2. Suffix `.SS`, `.SZ`, or `.SH` → [`Market::Cn`]
/// 3. Six-digit code starting `60`/`68` (Shanghai) or `00`/`30`
///    (Shenzhen) → [`Market::Cn`]
/// 4. Anything else → [`Market::Us`]
pub fn detect(symbol: &str) -> Market {
    let s = canonical(symbol);

    if s.ends_with(".HK") {
        return Market::Hk;
    }
    if s.ends_with(".SS") || s.ends_with(".SZ") || s.ends_with(".SH") {
        return Market::Cn;
    }
    if is_cn_numeric(&s) {
        return Market::Cn;
    }
    Market::Us
}

/// Normalize a symbol into the canonical spelling for its market.
///
/// Bare six-digit mainland codes gain their exchange suffix (`.SS` for
/// Shanghai boards 60/68, `.SZ` for Shenzhen boards 00/30); the legacy
/// `.SH` Shanghai spelling is rewritten to `.SS`. All symbols are
/// trimmed and upper-cased. Idempotent: normalizing twice equals
/// normalizing once.
pub fn normalize(symbol: &str, market: Market) -> String {
    let s = canonical(symbol);

    match market {
        Market::Cn => {
            if is_cn_numeric(&s) {
                if s.starts_with("60") || s.starts_with("68") {
                    return format!("{}.SS", s);
                }
                // 00 / 30
                return format!("{}.SZ", s);
            }
            if let Some(base) = s.strip_suffix(".SH") {
                return format!("{}.SS", base);
            }
            s
        }
        Market::Us | Market::Hk => s,
    }
}

/// Detect and normalize in one step.
pub fn detect_and_normalize(symbol: &str) -> (Market, String) {
    let market = detect(symbol);
    (market, normalize(symbol, market))
}

fn canonical(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Six-digit numeric code on a board this crate recognizes.
fn is_cn_numeric(s: &str) -> bool {
    s.len() == 6
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s.starts_with("60") || s.starts_with("68") || s.starts_with("00") || s.starts_with("30"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hk_suffix() {
        assert_eq!(detect("0700.HK"), Market::Hk);
        assert_eq!(detect("9988.hk"), Market::Hk);
        assert_eq!(normalize("0700.hk", Market::Hk), "0700.HK");
    }

    #[test]
    fn test_cn_suffixes() {
        assert_eq!(detect("600519.SS"), Market::Cn);
        assert_eq!(detect("000001.SZ"), Market::Cn);
        assert_eq!(detect("600519.SH"), Market::Cn);
    }

    #[test]
    fn test_bare_shanghai_codes() {
        assert_eq!(detect("600519"), Market::Cn);
        assert_eq!(detect("688981"), Market::Cn);
        assert_eq!(normalize("600519", Market::Cn), "600519.SS");
        assert_eq!(normalize("688981", Market::Cn), "688981.SS");
    }

    #[test]
    fn test_bare_shenzhen_codes() {
        assert_eq!(detect("000001"), Market::Cn);
        assert_eq!(detect("300750"), Market::Cn);
        assert_eq!(normalize("000001", Market::Cn), "000001.SZ");
        assert_eq!(normalize("300750", Market::Cn), "300750.SZ");
    }

    #[test]
    fn test_legacy_sh_suffix_rewritten() {
        assert_eq!(normalize("600519.SH", Market::Cn), "600519.SS");
    }

    #[test]
    fn test_us_default() {
        assert_eq!(detect("AAPL"), Market::Us);
        assert_eq!(detect("BRK.B"), Market::Us);
        assert_eq!(detect("SPY"), Market::Us);
        assert_eq!(normalize("aapl", Market::Us), "AAPL");
    }

    #[test]
    fn test_unrecognized_six_digit_defaults_to_us() {
        // Six digits but not a recognized mainland board prefix.
        assert_eq!(detect("123456"), Market::Us);
        assert_eq!(detect("990001"), Market::Us);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for symbol in ["600519", "000001", "600519.SH", "0700.hk", "AAPL", " tsla "] {
            let (market, once) = detect_and_normalize(symbol);
            assert_eq!(normalize(&once, market), once, "symbol {}", symbol);
        }
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(detect("  600519  "), Market::Cn);
        assert_eq!(normalize("  600519  ", Market::Cn), "600519.SS");
    }
}
