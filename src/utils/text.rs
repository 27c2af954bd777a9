//! Text helpers for Vietnamese names and money formatting.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Strip diacritics, including the stroke on `đ` which has no decomposition.
pub fn unaccent(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

/// Lowercase ASCII slug with runs of other characters collapsed to `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in unaccent(input).to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

const ADMIN_PREFIXES: &[&str] = &[
    "thanh pho ",
    "tinh ",
    "quan ",
    "huyen ",
    "thi xa ",
    "thi tran ",
    "phuong ",
    "xa ",
];

/// Slug of a unit name without its administrative prefix, used to match
/// carrier master data ("Thành phố Hà Nội" and "Hà Nội" compare equal).
pub fn normalize_unit_name(input: &str) -> String {
    let lowered = unaccent(input).to_lowercase();
    let trimmed = lowered.trim();
    let stripped = ADMIN_PREFIXES
        .iter()
        .find_map(|p| trimmed.strip_prefix(p))
        .unwrap_or(trimmed);
    slugify(stripped)
}

/// `1500000` -> `1,500,000`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
