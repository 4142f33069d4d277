/// Width of one hierarchy level inside a category code.
pub const LEVEL_WIDTH: usize = 2;

/// A code is at least one level deep, all ASCII digits, and a whole number of levels.
pub fn is_valid_code(code: &str) -> bool {
    code.len() >= LEVEL_WIDTH
        && code.len() % LEVEL_WIDTH == 0
        && code.bytes().all(|b| b.is_ascii_digit())
}

/// The code one level up, or `None` for a top-level code.
pub fn parent_code(code: &str) -> Option<&str> {
    if code.len() > LEVEL_WIDTH {
        code.get(..code.len() - LEVEL_WIDTH)
    } else {
        None
    }
}

/// Number of levels encoded in `code` (1 for top-level codes).
pub fn depth(code: &str) -> usize {
    code.len() / LEVEL_WIDTH
}

/// Strip leading zeros from an identifier; an all-zero id collapses to `"0"`.
pub fn strip_leading_zeros(id: &str) -> &str {
    let stripped = id.trim_start_matches('0');
    if stripped.is_empty() && !id.is_empty() {
        &id[id.len() - 1..]
    } else {
        stripped
    }
}
