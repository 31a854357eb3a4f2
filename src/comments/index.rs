use std::collections::HashMap;

use tracing::trace;

use crate::frontend::{CursorId, Token, TokenKind, TranslationUnit};

/// Raw comments keyed by the canonical USR of the declaration they document,
/// plus the banner comment at the top of the file.
#[derive(Debug, Default, Clone)]
pub struct CommentIndex {
    comments: HashMap<String, String>,
    top_comment: String,
}

#[derive(Clone, Copy)]
enum Direction {
    Backward,
    Forward,
}

impl CommentIndex {
    /// Single pass over the token stream. Each comment (collapsed with the
    /// comment lines directly above it) goes to an interesting declaration
    /// on its own line, or failing that to one on the next line.
    pub fn build(unit: &TranslationUnit) -> Self {
        let tokens = unit.tokens();
        let mut comments = HashMap::new();
        let mut top_comments = Vec::new();

        for (index, token) in tokens.iter().enumerate() {
            let line = unit.token_location(token).line;
            trace!("{} {} {}", token.kind.spelling(), index, line);

            if token.kind != TokenKind::Comment {
                continue;
            }

            // Comments that make up the first lines of the file.
            if line as usize == index + 1 {
                top_comments.push(token.spelling.clone());
            }

            let target = find_interesting_cursor(unit, index, Direction::Backward, line)
                .or_else(|| find_interesting_cursor(unit, index, Direction::Forward, line + 1));

            if let Some(id) = target {
                let usr = &unit.cursor(unit.canonical(id)).usr;
                if !usr.is_empty() {
                    comments.insert(usr.clone(), collapse_comments(unit, tokens, index));
                }
            }
        }

        Self {
            comments,
            top_comment: top_comments.join("\n"),
        }
    }

    pub fn find(&self, usr: &str) -> &str {
        self.comments.get(usr).map(String::as_str).unwrap_or("")
    }

    pub fn top_comment(&self) -> &str {
        &self.top_comment
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

/// Nearest token, scanning away from `index`, that is the defining token of
/// an interesting declaration, provided that token is on `line`. The scan
/// stops once it has left `line` behind.
fn find_interesting_cursor(
    unit: &TranslationUnit,
    index: usize,
    direction: Direction,
    line: u32,
) -> Option<CursorId> {
    let tokens = unit.tokens();
    let mut index = index;

    loop {
        index = match direction {
            Direction::Backward => index.checked_sub(1)?,
            Direction::Forward => index + 1,
        };
        let token = tokens.get(index)?;
        let location = unit.token_location(token);
        let past = match direction {
            Direction::Backward => location.line < line,
            Direction::Forward => location.line > line,
        };
        if past {
            return None;
        }
        let id = unit.cursor_at(location);
        let cursor = unit.cursor(id);

        // Tokens that are only part of a larger declaration.
        if &cursor.location != location {
            continue;
        }
        if cursor.kind.is_interesting() {
            return (cursor.location.line == line).then_some(id);
        }
    }
}

/// Joins the comment at `index` with the comment tokens on the lines directly
/// above it.
fn collapse_comments(unit: &TranslationUnit, tokens: &[Token], index: usize) -> String {
    let mut last_line = unit.token_location(&tokens[index]).line;
    let mut block = vec![tokens[index].spelling.as_str()];

    for token in tokens[..index].iter().rev() {
        let line = unit.token_location(token).line;
        if token.kind != TokenKind::Comment || line + 1 != last_line {
            break;
        }
        block.push(token.spelling.as_str());
        last_line = line;
    }

    block.reverse();
    block.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::frontend::{CppFrontEnd, FrontEnd};

    fn index(source: &str) -> (TranslationUnit, CommentIndex) {
        let unit = CppFrontEnd::new()
            .parse_source(Path::new("doc.h"), source, &[])
            .unwrap();
        let comments = CommentIndex::build(&unit);
        (unit, comments)
    }

    #[test]
    fn test_trailing_comment_wins() {
        let (_, comments) = index("int x; // doc\n\nint y;\n");
        assert_eq!(comments.find("c:@x"), "// doc");
        assert_eq!(comments.find("c:@y"), "");
    }

    #[test]
    fn test_leading_comment_attaches_to_next_line_only() {
        let (_, comments) = index("// attached\nint a;\n\n// dropped\n\nint b;\n");
        assert_eq!(comments.find("c:@a"), "// attached");
        assert_eq!(comments.find("c:@b"), "");
        assert_eq!(comments.len(), 1);
    }

    #[test]
    fn test_multi_line_comment_collapses() {
        let (_, comments) = index("int pad;\n\n// one\n// two\n// three\nvoid f(void);\n");
        assert_eq!(comments.find("c:@F@f"), "// one\n// two\n// three");
    }

    #[test]
    fn test_large_header_attachments() {
        let count = 3000;
        let mut source = String::new();
        for i in 0..count {
            source.push_str(&format!(
                "// Record {i}.\nstruct r{i} {{\n  int a;  // Field {i}.\n\n  // Second {i}.\n  int b;\n}};\n\n"
            ));
        }

        let (_, comments) = index(&source);
        assert_eq!(comments.len(), count * 3);
        for i in (0..count).step_by(97) {
            assert_eq!(comments.find(&format!("c:@S@r{i}")), format!("// Record {i}."));
            assert_eq!(comments.find(&format!("c:@S@r{i}@FI@a")), format!("// Field {i}."));
            assert_eq!(comments.find(&format!("c:@S@r{i}@FI@b")), format!("// Second {i}."));
        }
    }

    #[test]
    fn test_last_write_wins() {
        let (_, comments) = index("int pad;\n// leading\nint x; // trailing\n");
        assert_eq!(comments.find("c:@x"), "// trailing");
    }

    #[test]
    fn test_top_comment() {
        let (_, comments) = index("// Title\n//\n// Body.\n\n// Not top.\nint x;\n");
        assert_eq!(comments.top_comment(), "// Title\n//\n// Body.");
        assert_eq!(comments.find("c:@x"), "// Not top.");
    }

    #[test]
    fn test_comment_inside_enum_and_struct() {
        let (_, comments) = index(
            "enum e {\n  // First.\n  A,\n  B,  // Second.\n};\nstruct s {\n  int f;  // Field.\n};\n",
        );
        assert_eq!(comments.find("c:@E@e@A"), "// First.");
        assert_eq!(comments.find("c:@E@e@B"), "// Second.");
        assert_eq!(comments.find("c:@S@s@FI@f"), "// Field.");
    }

    #[test]
    fn test_comment_on_redeclaration_lands_on_canonical() {
        let (_, comments) = index("int f(void);\n\n// Defined here.\nint f(void) { return 0; }\n");
        assert_eq!(comments.find("c:@F@f"), "// Defined here.");
    }

    #[test]
    fn test_macro_comments() {
        let (_, comments) = index("// Leading.\n#define A 1\n#define B 2 // Trailing.\n");
        assert_eq!(comments.find("c:doc.h@20@macro@A"), "// Leading.");
        assert_eq!(comments.find("c:doc.h@32@macro@B"), "// Trailing.");
    }
}
