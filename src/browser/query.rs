//! Selector construction helpers
//!
//! Plan text comes from the reasoning service and is embedded into CSS and
//! XPath expressions, so it must be quoted rather than spliced.

/// Escape text for use inside a single-quoted CSS string
pub fn css_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\A "),
            _ => out.push(c),
        }
    }
    out
}

/// Quote text as an XPath 1.0 string literal
///
/// XPath 1.0 has no escape sequences, so text containing both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Collapse runs of whitespace the way XPath `normalize-space()` does
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// XPath matching the innermost descendants whose visible text equals `text`
///
/// Ancestors whose full text happens to equal the target (a wrapping `<li>`
/// around a lone `<a>`) are excluded so one visible entry yields one match.
pub fn exact_text_xpath(text: &str) -> String {
    let literal = xpath_literal(&normalize_text(text));
    format!(
        ".//*[normalize-space(.)={lit} and not(.//*[normalize-space(.)={lit}])]",
        lit = literal
    )
}
