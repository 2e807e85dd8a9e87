//! Entity matching heuristics.
//!
//! Pure comparison functions used by the inference engine. None of them fail:
//! an empty or missing field on either side simply means "no match".

use std::sync::OnceLock;

use regex::Regex;

/// Phones with fewer digits than this are ignored.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Normalized addresses shorter than this are ignored.
pub const MIN_ADDRESS_LEN: usize = 10;

fn unit_token() -> &'static Regex {
    static UNIT_TOKEN: OnceLock<Regex> = OnceLock::new();
    UNIT_TOKEN.get_or_init(|| {
        Regex::new(r"\b(?:apartamento|apto|ap|sala|suite|unit)\.?\s*\d+\w*")
            .unwrap_or_else(|e| panic!("invalid unit token regex: {e}"))
    })
}

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| {
        Regex::new(r"\s+").unwrap_or_else(|e| panic!("invalid whitespace regex: {e}"))
    })
}

/// Case-insensitive containment in either direction.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Keep only the ASCII digits of a value.
pub fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Tax ids compare equal after stripping punctuation.
pub fn tax_ids_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.map(digits), b.map(digits)) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

/// Digits-only phone, or `None` when too short to be meaningful.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let d = digits(phone);
    (d.len() >= MIN_PHONE_DIGITS).then_some(d)
}

/// Lowercased address with unit tokens stripped and whitespace collapsed.
pub fn normalize_address(address: &str) -> Option<String> {
    let lower = address.to_lowercase();
    let stripped = unit_token().replace_all(&lower, " ");
    let collapsed = whitespace().replace_all(&stripped, " ");
    let normalized = collapsed.trim().trim_end_matches(',').trim().to_string();
    (normalized.chars().count() >= MIN_ADDRESS_LEN).then_some(normalized)
}

pub fn phones_match(a: &str, b: &str) -> bool {
    matches!((normalize_phone(a), normalize_phone(b)), (Some(a), Some(b)) if a == b)
}

/// One normalized address contains the other, e.g. a person's full street
/// address inside a company's shorter one.
pub fn addresses_overlap(a: &str, b: &str) -> bool {
    match (normalize_address(a), normalize_address(b)) {
        (Some(a), Some(b)) => a.contains(&b) || b.contains(&a),
        _ => false,
    }
}

/// Lowercased last name token of a multi-word name, if it has at least
/// `min_len` characters. A single-word name has no surname.
pub fn surname(name: &str, min_len: usize) -> Option<String> {
    let mut tokens = name.split_whitespace();
    tokens.next()?;
    let last = tokens.last()?.to_lowercase();
    (last.chars().count() >= min_len).then_some(last)
}

/// True when `name`'s surname appears inside `other`. Both must be
/// multi-word names.
pub fn surname_match(name: &str, other: &str, min_len: usize) -> bool {
    if other.split_whitespace().nth(1).is_none() {
        return false;
    }
    match surname(name, min_len) {
        Some(s) => other.to_lowercase().contains(&s),
        None => false,
    }
}
