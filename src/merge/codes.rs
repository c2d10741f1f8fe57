/// Width every department and region code is padded to before a join.
pub const CODE_WIDTH: usize = 2;

/// Character the referendum file uses for DOM-TOM-COM and French abroad.
pub const OVERSEAS_MARKER: char = 'Z';

/// Left-pad `code` with zeros to `CODE_WIDTH`; longer codes are left alone.
///
/// `"1"` → `"01"`, `"2A"` → `"2A"`, `"971"` → `"971"`. A blank code is a
/// missing key, not `"00"`.
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    Some(format!("{:0>width$}", code, width = CODE_WIDTH))
}

/// Same as [`normalize_code`] for a cell that may already be missing.
pub fn normalize_opt(code: Option<&str>) -> Option<String> {
    code.and_then(normalize_code)
}

/// True for codes that are outside metropolitan France.
///
/// The referendum file spells these with the `Z` marker (`ZA`..`ZZ`); the
/// INSEE numbering uses three digits starting with 97 or 98.
pub fn is_overseas(code: &str) -> bool {
    if code.contains(OVERSEAS_MARKER) {
        return true;
    }
    code.len() == 3 && code.chars().all(|c| c.is_ascii_digit()) && {
        let prefix = &code[..2];
        prefix == "97" || prefix == "98"
    }
}
