//! Java parsing front-end.
//!
//! Thin wrapper around tree-sitter with the `tree-sitter-java` grammar.
//! The translation stage consumes only read-only [`Node`]s and byte
//! intervals from here; the source text itself is touched exclusively
//! through the token rewriter.

use tree_sitter::{Node, Parser, Tree};

use crate::error::{JpError, Result};

/// Create a parser configured for Java.
pub fn parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| JpError::internal(format!("failed to load Java grammar: {e}")))?;
    Ok(parser)
}

/// Parse one compilation unit.
///
/// A unit that tree-sitter cannot parse cleanly is rejected: translating a
/// partially recovered tree would silently drop or mangle region tokens.
pub fn parse_unit(source: &str) -> Result<Tree> {
    let mut parser = parser()?;
    let tree = parser.parse(source, None).ok_or_else(|| JpError::Parse {
        line: 0,
        message: "tree-sitter produced no tree".to_string(),
    })?;

    if tree.root_node().has_error() {
        let line = first_error_line(tree.root_node());
        return Err(JpError::parse_at(line, "syntax error in compilation unit"));
    }

    Ok(tree)
}

/// 1-based line of a node's first byte.
#[inline]
pub fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Source text spanned by a node.
#[inline]
pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

/// Locate the first ERROR or MISSING node for the diagnostic.
fn first_error_line(root: Node) -> usize {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return line_of(node);
        }
        if node.has_error() {
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }
    line_of(root)
}
