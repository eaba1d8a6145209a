//! Tree-sitter parsing of Go source files.

use tree_sitter::{Language, Node, Parser, Tree};

/// A syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct SyntaxError {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column (1-indexed byte offset within the line).
    pub column: usize,
    /// Parser message.
    pub message: String,
}

/// A parsed Go file together with its source bytes.
pub struct ParsedFile {
    tree: Tree,
    source: String,
}

impl ParsedFile {
    /// Root `source_file` node.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source bytes the tree was built from.
    #[must_use]
    pub fn src(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Package clause name, if present.
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        let root = self.root();
        let mut cursor = root.walk();
        let clause = root
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_clause")?;
        let mut inner = clause.walk();
        let ident = clause
            .named_children(&mut inner)
            .find(|n| n.kind() == "package_identifier")?;
        Some(text(ident, self.src()))
    }

    /// First syntax error in the file, in document order.
    ///
    /// Besides parser errors this rejects files the grammar accepts but Go
    /// does not: a missing or repeated package clause, and statements at
    /// the top level.
    #[must_use]
    pub fn syntax_error(&self) -> Option<SyntaxError> {
        let errors = [self.parser_error(), self.structure_error()];
        errors
            .into_iter()
            .flatten()
            .min_by_key(|e| (e.line, e.column))
    }

    fn structure_error(&self) -> Option<SyntaxError> {
        let root = self.root();
        let mut cursor = root.walk();
        let mut decls = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment" && !n.is_error() && !n.is_missing());

        let Some(first) = decls.next() else {
            let (line, column) = position_of_end(root);
            return Some(SyntaxError {
                line,
                column,
                message: "syntax error: expected 'package', found EOF".to_owned(),
            });
        };
        if first.kind() != "package_clause" {
            let (line, column) = position(first);
            let found = text(first, self.src()).split_whitespace().next().unwrap_or_default();
            return Some(SyntaxError {
                line,
                column,
                message: format!("syntax error: expected 'package', found {found:?}"),
            });
        }

        let stray = decls.find(|n| !TOP_LEVEL_KINDS.contains(&n.kind()))?;
        let (line, column) = position(stray);
        let message = if stray.kind() == "package_clause" {
            "syntax error: repeated package clause".to_owned()
        } else {
            "syntax error: non-declaration statement outside function body".to_owned()
        };
        Some(SyntaxError {
            line,
            column,
            message,
        })
    }

    fn parser_error(&self) -> Option<SyntaxError> {
        let root = self.root();
        if !root.has_error() {
            return None;
        }
        let node = first_error(root)?;
        let (line, column) = position(node);
        let message = if node.is_missing() {
            format!("syntax error: missing {}", node.kind())
        } else {
            let snippet = text(node, self.src())
                .lines()
                .next()
                .unwrap_or_default()
                .trim();
            let snippet: String = snippet.chars().take(24).collect();
            if snippet.is_empty() {
                "syntax error: unexpected end of input".to_owned()
            } else {
                format!("syntax error: unexpected {snippet:?}")
            }
        };
        Some(SyntaxError {
            line,
            column,
            message,
        })
    }
}

/// Node kinds allowed after the package clause.
const TOP_LEVEL_KINDS: &[&str] = &[
    "import_declaration",
    "function_declaration",
    "method_declaration",
    "type_declaration",
    "var_declaration",
    "const_declaration",
];

fn position_of_end(node: Node<'_>) -> (usize, usize) {
    let p = node.end_position();
    (p.row + 1, p.column + 1)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Go parser backed by `tree-sitter-go`.
pub struct GoParser {
    language: Language,
}

impl GoParser {
    /// Creates a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Parses `source`.
    ///
    /// A tree is produced even for malformed input; check
    /// [`ParsedFile::syntax_error`] before trusting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar cannot be loaded or parsing is
    /// cancelled.
    pub fn parse(&self, source: String) -> Result<ParsedFile, SyntaxError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).map_err(|e| SyntaxError {
            line: 1,
            column: 1,
            message: format!("failed to load Go grammar: {e}"),
        })?;
        let tree = parser.parse(source.as_bytes(), None).ok_or_else(|| SyntaxError {
            line: 1,
            column: 1,
            message: "parser returned no tree".to_owned(),
        })?;
        Ok(ParsedFile { tree, source })
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    std::str::from_utf8(&src[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// 1-indexed (line, column) of the node start, columns in bytes.
pub(crate) fn position(node: Node<'_>) -> (usize, usize) {
    let p = node.start_position();
    (p.row + 1, p.column + 1)
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Strips the quotes of an interpreted or raw string literal.
pub(crate) fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(literal)
}
