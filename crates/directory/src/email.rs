/// `local@domain.tld` with no whitespace anywhere and non-empty parts.
pub fn is_valid_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Needs at least one dot with text on both sides somewhere in the domain.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Emails are compared case-insensitively.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
