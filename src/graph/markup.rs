//! Mermaid text helpers

/// Escape text for use inside Mermaid labels.
///
/// Mermaid treats `#` as the start of an entity code and `;` as a statement
/// separator, so both are written as entity codes, along with quotes and
/// angle brackets. Line breaks collapse to spaces.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '#' => out.push_str("#35;"),
            ';' => out.push_str("#59;"),
            '"' => out.push_str("#quot;"),
            '<' => out.push_str("#lt;"),
            '>' => out.push_str("#gt;"),
            '\r' => {}
            '\n' | '\t' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Truncate to at most `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

/// Truncate, then escape
pub fn label(text: &str, max: usize) -> String {
    escape(&truncate(text.trim(), max))
}
