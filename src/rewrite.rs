//! Scoped token-range edits over an immutable source text.
//!
//! The rewriter accumulates non-overlapping edits keyed by byte intervals
//! and materializes the rewritten unit once, at [`TokenRewriter::render`].
//! Unedited bytes, comments and whitespace included, appear verbatim and
//! in original order in the output.
//!
//! Overlap policy: a replacement of an identical range overwrites the
//! earlier one (last writer wins — nested directives legitimately re-issue
//! the same rewrite for a re-captured token); any other overlap between
//! replacements is an internal inconsistency. Zero-width insertions at one
//! position compose: `insert_before` renders in call order and
//! `insert_after` in reverse call order, so wrappings emitted
//! parent-before-child nest correctly around a shared boundary.

use tree_sitter::Node;

use crate::error::{JpError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditKind {
    InsertAfter,
    InsertBefore,
    Replace,
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    kind: EditKind,
    seq: usize,
    text: String,
}

/// Edit accumulator over one compilation unit's source text.
#[derive(Debug)]
pub struct TokenRewriter<'s> {
    source: &'s str,
    edits: Vec<Edit>,
    next_seq: usize,
}

impl<'s> TokenRewriter<'s> {
    pub fn new(source: &'s str) -> Self {
        TokenRewriter {
            source,
            edits: Vec::new(),
            next_seq: 0,
        }
    }

    #[inline]
    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Substitute the token range covered by `node`.
    pub fn replace(&mut self, node: Node, text: impl Into<String>) -> Result<()> {
        self.replace_span(node.start_byte(), node.end_byte(), text)
    }

    /// Substitute an inclusive-exclusive byte range.
    pub fn replace_span(&mut self, start: usize, end: usize, text: impl Into<String>) -> Result<()> {
        self.check_bounds(start, end)?;
        let text = text.into();

        // Identical range: last writer wins.
        if let Some(existing) = self
            .edits
            .iter_mut()
            .find(|e| e.kind == EditKind::Replace && e.start == start && e.end == end)
        {
            existing.text = text;
            return Ok(());
        }

        for e in &self.edits {
            let conflict = match e.kind {
                EditKind::Replace => e.start < end && start < e.end,
                // A zero-width edit strictly inside the replaced range
                // would be swallowed by it.
                EditKind::InsertBefore | EditKind::InsertAfter => {
                    e.start > start && e.start < end
                }
            };
            if conflict {
                return Err(JpError::internal(format!(
                    "overlapping edits: [{start}, {end}) vs [{}, {})",
                    e.start, e.end
                )));
            }
        }

        self.push(start, end, EditKind::Replace, text);
        Ok(())
    }

    /// Remove the token range covered by `node`.
    pub fn delete(&mut self, node: Node) -> Result<()> {
        self.replace(node, "")
    }

    /// Insert text attaching to the content that starts at `pos`.
    /// Repeated insertions at one position render in call order.
    pub fn insert_before(&mut self, pos: usize, text: impl Into<String>) -> Result<()> {
        self.insert(pos, EditKind::InsertBefore, text.into())
    }

    /// Insert text attaching to the content that ends at `pos`.
    /// Repeated insertions at one position render in reverse call order.
    pub fn insert_after(&mut self, pos: usize, text: impl Into<String>) -> Result<()> {
        self.insert(pos, EditKind::InsertAfter, text.into())
    }

    fn insert(&mut self, pos: usize, kind: EditKind, text: String) -> Result<()> {
        self.check_bounds(pos, pos)?;
        if let Some(e) = self
            .edits
            .iter()
            .find(|e| e.kind == EditKind::Replace && pos > e.start && pos < e.end)
        {
            return Err(JpError::internal(format!(
                "insertion at {pos} lands inside replaced range [{}, {})",
                e.start, e.end
            )));
        }
        self.push(pos, pos, kind, text);
        Ok(())
    }

    fn push(&mut self, start: usize, end: usize, kind: EditKind, text: String) {
        self.edits.push(Edit {
            start,
            end,
            kind,
            seq: self.next_seq,
            text,
        });
        self.next_seq += 1;
    }

    fn check_bounds(&self, start: usize, end: usize) -> Result<()> {
        if start > end || end > self.source.len() {
            return Err(JpError::internal(format!(
                "edit range [{start}, {end}) outside source of {} bytes",
                self.source.len()
            )));
        }
        if !self.source.is_char_boundary(start) || !self.source.is_char_boundary(end) {
            return Err(JpError::internal(format!(
                "edit range [{start}, {end}) splits a UTF-8 sequence"
            )));
        }
        Ok(())
    }

    /// Materialize the rewritten text.
    pub fn render(&self) -> String {
        let mut order: Vec<&Edit> = self.edits.iter().collect();
        order.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| edit_rank(a.kind).cmp(&edit_rank(b.kind)))
                .then_with(|| match a.kind {
                    // After-insertions stack: the latest lands closest to
                    // the content it follows.
                    EditKind::InsertAfter => b.seq.cmp(&a.seq),
                    _ => a.seq.cmp(&b.seq),
                })
        });

        let extra: usize = order.iter().map(|e| e.text.len()).sum();
        let mut out = String::with_capacity(self.source.len() + extra);
        let mut cursor = 0usize;
        for e in order {
            if e.start > cursor {
                out.push_str(&self.source[cursor..e.start]);
            }
            out.push_str(&e.text);
            cursor = cursor.max(e.end);
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

#[inline]
fn edit_rank(kind: EditKind) -> u8 {
    match kind {
        EditKind::InsertAfter => 0,
        EditKind::InsertBefore => 1,
        EditKind::Replace => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_edits_is_identity() {
        let source = "int x = 0; // keep me\n";
        let rw = TokenRewriter::new(source);
        assert_eq!(rw.render(), source);
    }

    #[test]
    fn test_replace_span() {
        let source = "a + b";
        let mut rw = TokenRewriter::new(source);
        rw.replace_span(0, 1, "ctx.L_0_a").unwrap();
        rw.replace_span(4, 5, "ctx.L_0_b").unwrap();
        assert_eq!(rw.render(), "ctx.L_0_a + ctx.L_0_b");
    }

    #[test]
    fn test_delete_span() {
        let mut rw = TokenRewriter::new("this.run()");
        rw.replace_span(0, 5, "").unwrap();
        assert_eq!(rw.render(), "run()");
    }

    #[test]
    fn test_identical_range_last_writer_wins() {
        let mut rw = TokenRewriter::new("x = 1;");
        rw.replace_span(0, 1, "first").unwrap();
        rw.replace_span(0, 1, "second").unwrap();
        assert_eq!(rw.render(), "second = 1;");
    }

    #[test]
    fn test_partial_overlap_is_inconsistency() {
        let mut rw = TokenRewriter::new("abcdef");
        rw.replace_span(0, 4, "x").unwrap();
        let err = rw.replace_span(2, 6, "y").unwrap_err();
        assert!(matches!(err, JpError::InternalInconsistency(_)));
    }

    #[test]
    fn test_insert_before_is_fifo() {
        let mut rw = TokenRewriter::new("stmt;");
        rw.insert_before(0, "outer{").unwrap();
        rw.insert_before(0, "inner{").unwrap();
        assert_eq!(rw.render(), "outer{inner{stmt;");
    }

    #[test]
    fn test_insert_after_is_lifo() {
        let mut rw = TokenRewriter::new("stmt;");
        rw.insert_after(5, "}inner").unwrap();
        rw.insert_after(5, "}outer").unwrap();
        assert_eq!(rw.render(), "stmt;}inner}outer");
    }

    #[test]
    fn test_nested_wrapping_nests() {
        let source = "body;";
        let mut rw = TokenRewriter::new(source);
        // Emitted parent first, child second, both around the same range.
        rw.insert_before(0, "O{ ").unwrap();
        rw.insert_after(5, " }O").unwrap();
        rw.insert_before(0, "I{ ").unwrap();
        rw.insert_after(5, " }I").unwrap();
        assert_eq!(rw.render(), "O{ I{ body; }I }O");
    }

    #[test]
    fn test_insert_inside_replacement_is_inconsistency() {
        let mut rw = TokenRewriter::new("abcdef");
        rw.replace_span(1, 5, "x").unwrap();
        assert!(rw.insert_before(3, "boom").is_err());
        // Boundaries are fine.
        assert!(rw.insert_before(1, "ok").is_ok());
        assert!(rw.insert_after(5, "ok").is_ok());
    }

    #[test]
    fn test_replacement_and_inserts_at_same_point() {
        let mut rw = TokenRewriter::new("x y");
        rw.insert_before(0, "<").unwrap();
        rw.replace_span(0, 1, "X").unwrap();
        rw.insert_after(3, ">").unwrap();
        assert_eq!(rw.render(), "<X y>");
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut rw = TokenRewriter::new("ab");
        assert!(rw.replace_span(1, 9, "x").is_err());
        assert!(rw.replace_span(2, 1, "x").is_err());
    }
}
