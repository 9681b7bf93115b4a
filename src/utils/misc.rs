/// Drops the scheme, a leading `www.` and a trailing slash for display
pub fn strip_url(url: &str) -> String {
    let url = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let url = url.strip_prefix("www.").unwrap_or(url);

    url.trim_end_matches('/').to_string()
}

/// Formats an integer with comma thousands separators, e.g. `12,345`
pub fn thousands<T: Into<i128>>(value: T) -> String {
    let value: i128 = value.into();
    let digits = value.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Truncates to at most `max` characters without splitting a code point
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
