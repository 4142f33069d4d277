/// `"Yes"` in any case is true; everything else (including blanks) is false.
pub fn yes_no(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("yes")
}

/// Blank optional strings become absent rather than empty.
pub fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_is_case_insensitive() {
        assert!(yes_no("Yes"));
        assert!(yes_no(" YES "));
        assert!(yes_no("yes"));
        assert!(!yes_no("No"));
        assert!(!yes_no(""));
        assert!(!yes_no("y"));
    }

    #[test]
    fn blank_is_absent() {
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(" red "), Some("red".to_string()));
    }
}
