//! String utilities
//!
//! Helpers for trimming upstream error bodies.

/// Truncate at a character boundary, keeping at most `max_chars` characters
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate and append `suffix` only when something was cut
pub fn truncate_with_suffix(s: &str, max_chars: usize, suffix: &str) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}{}", truncate_str(s, max_chars), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("SZ000002", 2), "SZ");
        assert_eq!(truncate_str("SZ000002", 100), "SZ000002");
        assert_eq!(truncate_str("", 3), "");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        let text = "万科A股份";
        assert_eq!(truncate_str(text, 2), "万科");
        assert_eq!(truncate_str(text, 3), "万科A");
    }

    #[test]
    fn test_truncate_with_suffix() {
        assert_eq!(truncate_with_suffix("upstream error body", 8, "..."), "upstream...");
        assert_eq!(truncate_with_suffix("short", 8, "..."), "short");
    }
}
