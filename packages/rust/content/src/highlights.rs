//! Extraction of the `## Highlights` section from a page body.
//!
//! The section runs from its heading to the next `##`-level (or deeper)
//! heading, or to the end of the document. It is cut from the body and its
//! `- ` bullets are rendered separately as key points.

use std::sync::LazyLock;

use regex::Regex;

/// Matches the `## Highlights` heading line.
static HIGHLIGHTS_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^##[ \t]+Highlights[ \t]*\r?$").expect("highlights heading regex")
});

/// Matches the start of any `##` heading line.
static NEXT_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##").expect("heading regex"));

/// A page body with its highlights section separated out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitBody {
    /// Body without the highlights section, trimmed.
    pub main: String,
    /// Bullet texts from the highlights section, in order.
    pub points: Vec<String>,
}

/// Separate the highlights section from the rest of `body`.
pub fn extract(body: &str) -> SplitBody {
    let Some(heading) = HIGHLIGHTS_HEADING_RE.find(body) else {
        return SplitBody {
            main: body.trim().to_string(),
            points: Vec::new(),
        };
    };

    let content_start = heading.end();
    let end = NEXT_HEADING_RE
        .find_at(body, content_start)
        .map(|m| m.start())
        .unwrap_or(body.len());

    let section = &body[heading.start()..end];
    let main = format!("{}{}", &body[..heading.start()], &body[end..]);

    SplitBody {
        main: main.trim().to_string(),
        points: bullet_points(section),
    }
}

/// Collect `- item` lines, trimmed, without the marker.
pub fn bullet_points(markdown: &str) -> Vec<String> {
    markdown
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- "))
        .map(|point| point.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_in_the_middle() {
        let body = "# Ownership\n\nIntro text.\n\n## Highlights\n\n- Each value has one owner\n- Moves transfer ownership\n\n## Details\n\nMore.\n";
        let split = extract(body);
        assert_eq!(
            split.points,
            vec!["Each value has one owner", "Moves transfer ownership"]
        );
        assert!(split.main.contains("Intro text."));
        assert!(split.main.contains("## Details"));
        assert!(!split.main.contains("Highlights"));
    }

    #[test]
    fn highlights_at_the_end() {
        let body = "Text\n\n## Highlights\n- one\n  - two\n";
        let split = extract(body);
        assert_eq!(split.main, "Text");
        assert_eq!(split.points, vec!["one", "two"]);
    }

    #[test]
    fn no_highlights() {
        let body = "\n# Page\n\n## Summary\n- not a highlight\n";
        let split = extract(body);
        assert!(split.points.is_empty());
        assert_eq!(split.main, body.trim());
    }

    #[test]
    fn heading_must_be_its_own_line() {
        let body = "## Highlights of the week are elsewhere\n- x\n";
        let split = extract(body);
        assert!(split.points.is_empty());
        assert_eq!(split.main, body.trim());
    }

    #[test]
    fn non_bullet_lines_are_ignored() {
        let points = bullet_points("## Highlights\nplain line\n-not a bullet\n- real\n* star\n");
        assert_eq!(points, vec!["real"]);
    }
}
