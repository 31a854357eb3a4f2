use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SECTION_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());
static LINE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/{2,} ?").unwrap());
static BLOCK_GUTTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\*+ ?").unwrap());

const ARGS_MARKER: &str = "Args:";

/// A comment split into its title, body and argument descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedComment {
    pub title: String,
    pub body: String,
    /// Argument name -> description, in the order they were written.
    pub args: IndexMap<String, String>,
}

impl ParsedComment {
    /// Parses comment text that has already had its markers removed.
    ///
    /// The first blank-line separated section is the title. A later section
    /// containing `Args:` lists one `name description` pair per line; every
    /// other section becomes part of the body.
    pub fn parse(text: &str) -> Self {
        let mut sections = SECTION_SPLIT.split(text);
        let title = sections.next().unwrap_or_default().to_string();

        let mut body_sections = Vec::new();
        let mut args = IndexMap::new();
        for section in sections {
            if section.contains(ARGS_MARKER) {
                parse_args(section, &mut args);
            } else {
                body_sections.push(section);
            }
        }

        Self {
            title,
            body: body_sections.join("\n\n"),
            args,
        }
    }

    /// Strips comment markers from a raw comment, then parses it.
    pub fn from_raw(raw: &str) -> Self {
        Self::parse(&strip_comment_markers(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty() && self.args.is_empty()
    }
}

fn parse_args(section: &str, args: &mut IndexMap<String, String>) {
    let lines = section
        .lines()
        .skip_while(|line| !line.contains(ARGS_MARKER))
        .skip(1);

    for line in lines {
        let Some((name, description)) = line.trim_start().split_once(char::is_whitespace) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        args.insert(name.to_string(), description.trim().to_string());
    }
}

/// Removes `//` prefixes and `/* */` delimiters (with their ` * ` gutters)
/// from raw comment text, line by line.
pub fn strip_comment_markers(raw: &str) -> String {
    let mut lines = Vec::new();
    let mut in_block = false;

    for line in raw.split('\n') {
        let mut text = line;
        let mut opened = false;

        if !in_block {
            match line.trim_start().strip_prefix("/*") {
                Some(rest) => {
                    in_block = true;
                    opened = true;
                    let rest = rest.trim_start_matches('*');
                    text = rest.strip_prefix(' ').unwrap_or(rest);
                }
                None => {
                    lines.push(LINE_MARKER.replace(line, "").into_owned());
                    continue;
                }
            }
        }

        let mut closed = false;
        if let Some(end) = text.find("*/") {
            text = text[..end].trim_end();
            in_block = false;
            closed = true;
        }

        let stripped = if opened {
            text.to_string()
        } else {
            BLOCK_GUTTER.replace(text, "").into_owned()
        };

        // Delimiter-only lines such as `/**` and ` */`.
        if stripped.trim().is_empty() && (opened || closed) {
            continue;
        }
        lines.push(stripped);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let mut args = IndexMap::new();
        parse_args("Args:\n a descA\n b descB\n c descC\n", &mut args);

        let expected: Vec<(&str, &str)> = vec![("a", "descA"), ("b", "descB"), ("c", "descC")];
        let actual: Vec<(&str, &str)> = args.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_parse_title_args_body() {
        let comment = ParsedComment::parse("Title\n\nArgs:\n a descA\n b descB\n\nBody text\n");
        assert_eq!(comment.title, "Title");
        assert_eq!(comment.body, "Body text\n");
        assert_eq!(comment.args.get("a").map(String::as_str), Some("descA"));
        assert_eq!(comment.args.get("b").map(String::as_str), Some("descB"));
        assert_eq!(comment.args.len(), 2);
    }

    #[test]
    fn test_parse_comment() {
        let text = "Sets the test priority.\n\
                    \n\
                    Args:\n \
                    t         Test to operate on.\n \
                    priority  Priority of the test.\n\
                    \n\
                    Sets the priority of <t> to <priority>.\n";
        let comment = ParsedComment::parse(text);

        assert_eq!(comment.title, "Sets the test priority.");
        assert_eq!(comment.body, "Sets the priority of <t> to <priority>.\n");
        assert_eq!(
            comment.args.keys().cloned().collect::<Vec<_>>(),
            vec!["t".to_string(), "priority".to_string()]
        );
        assert_eq!(comment.args["priority"], "Priority of the test.");
    }

    #[test]
    fn test_malformed_arg_lines_are_skipped() {
        let comment = ParsedComment::parse("T\n\nArgs:\n lonely\n x  fine\n");
        assert_eq!(comment.args.len(), 1);
        assert_eq!(comment.args["x"], "fine");
    }

    #[test]
    fn test_multiple_body_sections() {
        let comment = ParsedComment::parse("T\n\nOne.\n\n\nTwo.");
        assert_eq!(comment.body, "One.\n\nTwo.");
        assert!(comment.args.is_empty());
    }

    #[test]
    fn test_title_only() {
        let comment = ParsedComment::parse("Priority.");
        assert_eq!(comment.title, "Priority.");
        assert!(comment.body.is_empty());
        assert!(ParsedComment::parse("").is_empty());
    }

    #[test]
    fn test_strip_line_comments() {
        assert_eq!(
            strip_comment_markers("// Title\n//\n// Body line.\n///  indented"),
            "Title\n\nBody line.\n indented"
        );
    }

    #[test]
    fn test_strip_block_comments() {
        assert_eq!(strip_comment_markers("/* Upper bound. */"), "Upper bound.");
        assert_eq!(
            strip_comment_markers("/**\n * Title\n *\n * Body.\n */"),
            "Title\n\nBody."
        );
    }

    #[test]
    fn test_from_raw() {
        let comment = ParsedComment::from_raw("// A test structure\n//\n// Represents a test.");
        assert_eq!(comment.title, "A test structure");
        assert_eq!(comment.body, "Represents a test.");
    }
}
