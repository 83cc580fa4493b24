use once_cell::sync::Lazy;
use regex::Regex;

use crate::references;

/// One annotated assistant response. `citations` is in first-seen order; a
/// citation's position plus one is the footnote number used in the fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotated {
    pub html: String,
    pub citations: Vec<String>,
}

static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#+\s?").expect("heading pattern is valid")
});

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\]").expect("bracket pattern is valid")
});

static HEADER_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Question Asked|Extracted Insight|Document Section/Page|Confidence Score|Additional Notes)\b")
        .expect("header phrase pattern is valid")
});

static REF_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:【[^†】]*†[^】]*】)+").expect("reference run pattern is valid")
});

static REF_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"【([^†】]*)†[^】]*】").expect("reference code pattern is valid")
});

static PAGE_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Refer to|See|For)[^.]*? - Page \d+(?:, Section [\d.]+)?")
        .expect("page phrase pattern is valid")
});

static TAG_STRIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"</?(?:em|sup)>|<a href="[^"]*" target="_blank">|</a>"#)
        .expect("tag strip pattern is valid")
});

/// Turn a raw assistant response into a citation-annotated HTML fragment.
///
/// Passes, in order: markdown marker stripping, bracket removal, section
/// header emphasis, reference-run unification into `<sup>` footnotes, and
/// page-phrase linking against `document_url`.
pub fn annotate(raw: &str, document_url: &str) -> Annotated {
    let text = HEADING_RE.replace_all(raw, "").into_owned();
    let text = text.replace("**", "");
    let text = BRACKET_RE.replace_all(&text, "").into_owned();
    let text = HEADER_PHRASE_RE.replace_all(&text, "<em>$1</em>").into_owned();

    let mut citations: Vec<String> = Vec::new();
    let mut unified = String::with_capacity(text.len());
    let mut last_end = 0;

    // Each maximal run of adjacent markers collapses to one footnote tag.
    for run in REF_RUN_RE.find_iter(&text) {
        unified.push_str(&text[last_end..run.start()]);

        let mut indices: Vec<usize> = Vec::new();
        for cap in REF_CODE_RE.captures_iter(run.as_str()) {
            let resolved = references::resolve(&cap[1]);
            let index = match citations.iter().position(|c| c == resolved) {
                Some(pos) => pos + 1,
                None => {
                    citations.push(resolved.to_string());
                    citations.len()
                }
            };
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        indices.sort_unstable();

        if !indices.is_empty() {
            let list = indices
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(",");
            unified.push_str(&format!("<sup>[{}]</sup>", list));
        }
        last_end = run.end();
    }
    unified.push_str(&text[last_end..]);

    let linked = PAGE_PHRASE_RE
        .replace_all(&unified, |caps: &regex::Captures| {
            format!(
                "<a href=\"{}\" target=\"_blank\">{}</a>",
                document_url, &caps[0]
            )
        })
        .into_owned();

    Annotated {
        html: linked.trim().to_string(),
        citations,
    }
}

/// Plain-text projection of an annotated fragment for the widget's text view:
/// footnote markers stay inline as `[1,2]`, markup tags are dropped.
pub fn display_text(html: &str) -> String {
    TAG_STRIP_RE.replace_all(html, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_URL: &str = "https://example.test/guidance.pdf";

    #[test]
    fn test_plain_text_passes_through() {
        let result = annotate("The sponsor must submit the protocol first.", DOC_URL);
        assert_eq!(result.html, "The sponsor must submit the protocol first.");
        assert!(result.citations.is_empty());
    }

    #[test]
    fn test_adjacent_markers_collapse_to_one_footnote() {
        let result = annotate(
            "Submissions are covered here【4:8†source】【4:14†source】 in detail.",
            DOC_URL,
        );
        assert_eq!(
            result.html,
            "Submissions are covered here<sup>[1,2]</sup> in detail."
        );
        assert_eq!(
            result.citations,
            vec![
                "Page 12, Section 4.8".to_string(),
                "Page 18, Section 2".to_string()
            ]
        );
    }

    #[test]
    fn test_repeated_code_reuses_footnote_index() {
        let result = annotate(
            "First claim【4:8†source】 and a later restatement【4:8†source】.",
            DOC_URL,
        );
        assert_eq!(
            result.html,
            "First claim<sup>[1]</sup> and a later restatement<sup>[1]</sup>."
        );
        assert_eq!(result.citations, vec!["Page 12, Section 4.8".to_string()]);
    }

    #[test]
    fn test_unknown_code_uses_fallback_label() {
        let result = annotate("An unmapped citation【9:9†source】 appears.", DOC_URL);
        assert_eq!(result.html, "An unmapped citation<sup>[1]</sup> appears.");
        assert_eq!(result.citations, vec![references::FALLBACK_CITATION.to_string()]);
    }

    #[test]
    fn test_distinct_unknown_codes_share_fallback_slot() {
        // Equality is by resolved string, so every unknown code lands on the
        // same footnote number.
        let result = annotate("One【9:9†source】 and two【8:8†source】.", DOC_URL);
        assert_eq!(result.html, "One<sup>[1]</sup> and two<sup>[1]</sup>.");
        assert_eq!(result.citations.len(), 1);
    }

    #[test]
    fn test_duplicate_codes_within_run_dedupe() {
        let result = annotate(
            "Stacked【4:8†source】【4:8†source】【4:14†source】 markers.",
            DOC_URL,
        );
        assert_eq!(result.html, "Stacked<sup>[1,2]</sup> markers.");
        assert_eq!(result.citations.len(), 2);
    }

    #[test]
    fn test_markdown_markers_stripped() {
        let result = annotate("## Labeling\n**Required** elements follow.", DOC_URL);
        assert_eq!(result.html, "Labeling\nRequired elements follow.");
    }

    #[test]
    fn test_bracketed_segments_removed() {
        let result = annotate("Details in the appendix [link here] apply.", DOC_URL);
        assert_eq!(result.html, "Details in the appendix  apply.");
    }

    #[test]
    fn test_section_headers_emphasized_case_insensitively() {
        let result = annotate("question asked: what does 510(k) require?", DOC_URL);
        assert_eq!(
            result.html,
            "<em>question asked</em>: what does 510(k) require?"
        );

        let result = annotate("Confidence Score: high", DOC_URL);
        assert_eq!(result.html, "<em>Confidence Score</em>: high");
    }

    #[test]
    fn test_page_phrase_becomes_link() {
        let result = annotate("See the labeling discussion - Page 12, Section 4.8 for details.", DOC_URL);
        assert_eq!(
            result.html,
            format!(
                "<a href=\"{}\" target=\"_blank\">See the labeling discussion - Page 12, Section 4.8</a> for details.",
                DOC_URL
            )
        );
    }

    #[test]
    fn test_page_phrase_without_section_still_links() {
        let result = annotate("Refer to the overview - Page 3. Done.", DOC_URL);
        assert!(result.html.starts_with("<a href="));
        assert!(result.html.contains("Refer to the overview - Page 3</a>"));
    }

    #[test]
    fn test_whitespace_trimmed() {
        let result = annotate("  spaced out  \n", DOC_URL);
        assert_eq!(result.html, "spaced out");
    }

    #[test]
    fn test_idempotent_on_unannotated_text() {
        let input = "A sentence with no markers and no template phrases.";
        let once = annotate(input, DOC_URL);
        let twice = annotate(&once.html, DOC_URL);
        assert_eq!(once.html, twice.html);
        assert!(twice.citations.is_empty());
    }

    #[test]
    fn test_display_text_strips_markup() {
        let annotated = annotate(
            "Extracted Insight: devices need clearance【4:8†source】. See more - Page 12",
            DOC_URL,
        );
        let plain = display_text(&annotated.html);
        assert_eq!(
            plain,
            "Extracted Insight: devices need clearance[1]. See more - Page 12"
        );
    }
}
