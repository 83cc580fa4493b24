use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Citation shown for reference codes missing from the table.
pub const FALLBACK_CITATION: &str = "FDA Guidance";

static REFERENCE_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("4:0", "Page 3, Section 1"),
        ("4:1", "Page 5, Section 1.2"),
        ("4:2", "Page 7, Section 2.1"),
        ("4:4", "Page 9, Section 3"),
        ("4:6", "Page 10, Section 3.4"),
        ("4:8", "Page 12, Section 4.8"),
        ("4:10", "Page 14, Section 5.1"),
        ("4:12", "Page 16, Section 5.3"),
        ("4:14", "Page 18, Section 2"),
        ("4:16", "Page 21, Section 6.2"),
    ])
});

/// Resolve a raw reference code (e.g. "4:8") to its human-readable citation.
pub fn resolve(code: &str) -> &'static str {
    REFERENCE_TABLE
        .get(code.trim())
        .copied()
        .unwrap_or(FALLBACK_CITATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_code() {
        assert_eq!(resolve("4:8"), "Page 12, Section 4.8");
        assert_eq!(resolve("4:14"), "Page 18, Section 2");
    }

    #[test]
    fn test_resolve_unknown_code_falls_back() {
        assert_eq!(resolve("9:9"), FALLBACK_CITATION);
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(resolve(" 4:8 "), "Page 12, Section 4.8");
    }
}
