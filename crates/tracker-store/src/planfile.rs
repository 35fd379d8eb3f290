//! Plan markdown parsing (spec §4.2).
//!
//! The only structure extracted from a plan file is its title, from the
//! first `# Heading` line. The body is passed opaquely to the agent.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#\s+(.+)$").expect("static regex is valid"))
}

/// Parse the first-level heading out of a plan file. Returns `None` if the
/// file is missing or has no matching heading.
pub fn parse_title(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_title_from_str(&content)
}

pub fn parse_title_from_str(content: &str) -> Option<String> {
    for line in content.lines() {
        if let Some(captures) = heading_re().captures(line) {
            let title = captures.get(1)?.as_str().trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extracts_first_heading() {
        let content = "# Add feature X\n\nSome body text.\n## Sub-heading\n";
        assert_eq!(parse_title_from_str(content), Some("Add feature X".to_string()));
    }

    #[test]
    fn trims_whitespace_around_title() {
        assert_eq!(
            parse_title_from_str("#    Spaced title   \n"),
            Some("Spaced title".to_string())
        );
    }

    #[test]
    fn returns_none_without_heading() {
        assert_eq!(parse_title_from_str("Just text\nmore text\n"), None);
    }

    #[test]
    fn ignores_non_h1_headings_before_h1() {
        let content = "## Not a title\n# Real title\n";
        assert_eq!(parse_title_from_str(content), Some("Real title".to_string()));
    }

    #[test]
    fn missing_file_returns_none() {
        assert_eq!(parse_title(Path::new("/nonexistent/plan.md")), None);
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# From disk").unwrap();
        assert_eq!(parse_title(file.path()), Some("From disk".to_string()));
    }
}
