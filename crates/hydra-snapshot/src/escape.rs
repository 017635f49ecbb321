//! Script-safe JSON.

/// Escape JSON for embedding in a `<script>` element.
///
/// `<`, `>` and `&` become `\u003c`, `\u003e` and `\u0026`, so no string
/// value can close the element or open a comment. U+2028 and U+2029 are
/// escaped as well. These characters only occur inside JSON strings, where
/// the `\u` forms decode to the same value.
pub fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_close_is_escaped() {
        let json = serde_json::to_string(&"</script><script>alert(1)</script>").unwrap();
        let escaped = escape_script_json(&json);

        assert!(!escaped.contains("</script"));
        assert!(!escaped.contains('<'));
        let back: String = serde_json::from_str(&escaped).unwrap();
        assert_eq!(back, "</script><script>alert(1)</script>");
    }

    #[test]
    fn test_line_separators_and_comments() {
        let raw = "a\u{2028}b\u{2029}c <!-- d & e";
        let escaped = escape_script_json(&serde_json::to_string(raw).unwrap());

        assert!(!escaped.contains('\u{2028}'));
        assert!(!escaped.contains("<!--"));
        let back: String = serde_json::from_str(&escaped).unwrap();
        assert_eq!(back, raw);
    }
}
