//! Utility functions and helpers

/// Escape text for placement inside an HTML text node
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for placement inside a double-quoted HTML attribute value
pub fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

/// Assemble a query string from ordered key/value pairs.
///
/// Values must already be percent-encoded by the caller; this helper only
/// joins pairs, preserving their order.
pub fn join_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr(r#"say "hi" & bye"#), "say &quot;hi&quot; &amp; bye");
    }

    #[test]
    fn test_join_query() {
        let pairs = vec![
            ("time".to_string(), "30".to_string()),
            ("page".to_string(), "1".to_string()),
        ];
        assert_eq!(join_query(&pairs), "time=30&page=1");
        assert_eq!(join_query(&[]), "");
    }
}
