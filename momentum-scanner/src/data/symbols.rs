//! Screener symbol to history ticker mapping.

/// Instrument-class suffixes the history source does not carry
/// (rights, partly paid, ETFs, SME board, bonds).
pub const UNSUPPORTED_SUFFIXES: &[&str] = &[".RR", ".PP", ".E1", ".E2", ".SM", ".B1", ".B2"];

/// Map a screener `(exchange, symbol)` pair to a history ticker.
///
/// Returns `None` for instruments the history source cannot serve:
/// unsupported suffixes and symbols starting with a digit.
pub fn history_ticker(exchange: &str, symbol: &str) -> Option<String> {
    if symbol.is_empty() {
        return None;
    }
    if UNSUPPORTED_SUFFIXES.iter().any(|s| symbol.ends_with(s)) {
        return None;
    }
    if symbol.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }

    let base = symbol.replace('_', "-");
    let suffix = if exchange.eq_ignore_ascii_case("NSE") {
        ".NS"
    } else {
        ".BO"
    };

    Some(format!("{}{}", base, suffix))
}
