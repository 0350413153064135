//! Pragma comment scanning.
//!
//! Walks the unit's `line_comment` tokens, recognizes `// omp ...`
//! pragmas, parses kind and clauses, binds each pragma to the statement
//! that follows it, and links lexical parent directives by region
//! containment.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::error::{JpError, Result};
use crate::model::array_less;
use crate::parse::{line_of, node_text};
use crate::pragma::types::{Clauses, Directive, DirectiveKind};

/// `// omp <rest>` — the marker that makes a comment a pragma.
static PRAGMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^//\s*omp\b(.*)$").unwrap());

/// One `name(args)` clause at the head of the remaining pragma text.
static CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]\w*)\s*\(\s*([^)]*)\)").unwrap());

/// Scan a unit for pragmas, in document order.
pub fn scan<'t>(tree: &'t Tree, source: &str) -> Result<Vec<Directive<'t>>> {
    let mut comments = Vec::new();
    collect_line_comments(tree.root_node(), &mut comments);
    comments.sort_by_key(|c| c.start_byte());

    let mut directives = Vec::new();
    for comment in comments {
        let text = node_text(comment, source);
        let Some(caps) = PRAGMA_RE.captures(text) else {
            continue;
        };
        let body = caps.get(1).map_or("", |m| m.as_str()).trim();
        let line = line_of(comment);

        let (kind, rest) = parse_kind(body, line)?;
        let clauses = parse_clauses(rest, line)?;
        let region = region_of(comment, line)?;

        let ordinal = directives.len();
        debug!(kind = %kind, line, ordinal, "recognized pragma");
        directives.push(Directive::new(kind, clauses, comment, region, ordinal));
    }

    link_parents(&mut directives);
    Ok(directives)
}

fn collect_line_comments<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if node.kind() == "line_comment" {
        out.push(node);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_line_comments(child, out);
    }
}

/// Split the directive kind off the pragma body.
fn parse_kind<'a>(body: &'a str, line: usize) -> Result<(DirectiveKind, &'a str)> {
    let body = body.trim_start();
    let word_end = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let (word, rest) = body.split_at(word_end);

    let kind = match word {
        "parallel" => {
            let rest = rest.trim_start();
            if let Some(tail) = rest.strip_prefix("for") {
                if tail.chars().next().map_or(true, |c| !c.is_ascii_alphanumeric()) {
                    return Ok((DirectiveKind::ParallelFor, tail));
                }
            }
            return Ok((DirectiveKind::Parallel, rest));
        }
        "for" => DirectiveKind::For,
        "sections" => DirectiveKind::Sections,
        "section" => DirectiveKind::Section,
        "single" => DirectiveKind::Single,
        "master" => DirectiveKind::Master,
        "barrier" => DirectiveKind::Barrier,
        "critical" => DirectiveKind::Critical,
        "atomic" => DirectiveKind::Atomic,
        other => {
            return Err(JpError::directive_at(
                line,
                format!("unknown directive kind `{other}`"),
            ))
        }
    };
    Ok((kind, rest))
}

/// Parse the clause list that follows the kind.
fn parse_clauses(mut rest: &str, line: usize) -> Result<Clauses> {
    let mut clauses = Clauses::default();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(clauses);
        }
        let Some(caps) = CLAUSE_RE.captures(rest) else {
            return Err(JpError::directive_at(
                line,
                format!("malformed clause near `{rest}`"),
            ));
        };
        let name = caps.get(1).unwrap().as_str().to_ascii_lowercase();
        let args = caps.get(2).unwrap().as_str();
        match name.as_str() {
            "private" => push_names(args, &mut clauses.private_vars),
            "firstprivate" => push_names(args, &mut clauses.firstprivate_vars),
            "public" => push_names(args, &mut clauses.public_vars),
            "threadnum" => {
                let arg = args.trim();
                if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(JpError::directive_at(
                        line,
                        format!("threadNum expects an integer literal, got `{arg}`"),
                    ));
                }
                clauses.thread_num = Some(arg.to_string());
            }
            other => {
                return Err(JpError::directive_at(
                    line,
                    format!("unknown clause `{other}`"),
                ));
            }
        }
        rest = &rest[caps.get(0).unwrap().end()..];
    }
}

fn push_names(args: &str, out: &mut Vec<String>) {
    for raw in args.split(',') {
        let name = array_less(raw.trim());
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
}

/// The statement a pragma governs: the next named non-comment sibling.
fn region_of<'t>(comment: Node<'t>, line: usize) -> Result<Node<'t>> {
    let mut sibling = comment.next_named_sibling();
    while let Some(node) = sibling {
        if !matches!(node.kind(), "line_comment" | "block_comment") {
            if is_statement(node.kind()) {
                return Ok(node);
            }
            return Err(JpError::directive_at(
                line,
                format!("pragma must precede a statement, found `{}`", node.kind()),
            ));
        }
        sibling = node.next_named_sibling();
    }
    Err(JpError::directive_at(line, "pragma is not followed by a statement"))
}

fn is_statement(kind: &str) -> bool {
    matches!(
        kind,
        "block"
            | "expression_statement"
            | "local_variable_declaration"
            | "if_statement"
            | "while_statement"
            | "do_statement"
            | "for_statement"
            | "enhanced_for_statement"
            | "try_statement"
            | "try_with_resources_statement"
            | "switch_expression"
            | "switch_statement"
            | "synchronized_statement"
            | "return_statement"
            | "throw_statement"
            | "labeled_statement"
            | "assert_statement"
            | "break_statement"
            | "continue_statement"
    )
}

/// Link each directive to its innermost enclosing directive. Directives
/// sharing a region (stacked pragmas on one statement) parent to the
/// pragma written first.
fn link_parents(directives: &mut [Directive]) {
    for i in 0..directives.len() {
        let (ri_start, ri_end) = region_span(&directives[i]);
        let mut best: Option<usize> = None;
        for j in 0..directives.len() {
            if i == j {
                continue;
            }
            let (rj_start, rj_end) = region_span(&directives[j]);
            let contains = rj_start <= ri_start && ri_end <= rj_end;
            let same_region = rj_start == ri_start && rj_end == ri_end;
            if !contains || (same_region && directives[j].ordinal >= directives[i].ordinal) {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let (rb_start, rb_end) = region_span(&directives[b]);
                    // Innermost candidate wins; same-region stacks settle
                    // on the nearest preceding pragma.
                    (rj_start, std::cmp::Reverse(rj_end), directives[j].ordinal)
                        > (rb_start, std::cmp::Reverse(rb_end), directives[b].ordinal)
                }
            };
            if better {
                best = Some(j);
            }
        }
        directives[i].parent = best;
    }
}

fn region_span(d: &Directive) -> (usize, usize) {
    (d.region.start_byte(), d.region.end_byte())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_unit;

    fn scan_source(source: &str) -> Result<Vec<(DirectiveKind, Clauses)>> {
        let tree = parse_unit(source).unwrap();
        let directives = scan(&tree, source)?;
        Ok(directives.into_iter().map(|d| (d.kind, d.clauses)).collect())
    }

    #[test]
    fn test_plain_comment_is_not_a_pragma() {
        let found = scan_source(
            r#"
class A {
    void m() {
        // just a note about omp things
        int x = 0; // ompless
    }
}
"#,
        )
        .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_kinds_and_clauses() {
        let source = r#"
class A {
    void m(int[] data) {
        int sum = 0;
        // omp parallel private(sum) threadNum(4)
        {
            sum += 1;
            // omp barrier
            sum += 2;
        }
        // omp parallel for firstprivate(sum) public(data)
        for (int i = 0; i < 10; i++) {
            sum += data[i];
        }
    }
}
"#;
        let found = scan_source(source).unwrap();
        assert_eq!(found.len(), 3);

        assert_eq!(found[0].0, DirectiveKind::Parallel);
        assert_eq!(found[0].1.private_vars, vec!["sum"]);
        assert_eq!(found[0].1.thread_num.as_deref(), Some("4"));

        assert_eq!(found[1].0, DirectiveKind::Barrier);
        assert!(found[1].1.is_empty());

        assert_eq!(found[2].0, DirectiveKind::ParallelFor);
        assert_eq!(found[2].1.firstprivate_vars, vec!["sum"]);
        assert_eq!(found[2].1.public_vars, vec!["data"]);
    }

    #[test]
    fn test_clause_names_are_stored_array_less() {
        let found = scan_source(
            r#"
class A {
    void m() {
        int[] buf = null;
        // omp parallel private(buf[])
        buf = null;
    }
}
"#,
        )
        .unwrap();
        assert_eq!(found[0].1.private_vars, vec!["buf"]);
    }

    #[test]
    fn test_unknown_kind_and_clause_rejected() {
        let err = scan_source(
            "class A { void m() { \n// omp paralel\nint x = 0; } }",
        )
        .unwrap_err();
        assert!(matches!(err, JpError::InvalidDirective { line: 2, .. }));

        let err = scan_source(
            "class A { void m() { \n// omp parallel reduce(x)\nint x = 0; } }",
        )
        .unwrap_err();
        assert!(matches!(err, JpError::InvalidDirective { .. }));
    }

    #[test]
    fn test_thread_num_must_be_integer() {
        let err = scan_source(
            "class A { void m() { \n// omp parallel threadNum(n)\nint x = 0; } }",
        )
        .unwrap_err();
        assert!(matches!(err, JpError::InvalidDirective { .. }));
    }

    #[test]
    fn test_dangling_pragma_rejected() {
        let err = scan_source("class A { void m() { \n// omp parallel\n} }").unwrap_err();
        assert!(matches!(err, JpError::InvalidDirective { .. }));
    }

    #[test]
    fn test_parent_links_by_containment() {
        let source = r#"
class A {
    void m() {
        int x = 0;
        // omp parallel
        {
            // omp single
            x = 1;
        }
    }
}
"#;
        let tree = parse_unit(source).unwrap();
        let directives = scan(&tree, source).unwrap();
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].parent, None);
        assert_eq!(directives[1].parent, Some(0));
    }

    #[test]
    fn test_stacked_pragmas_share_region_and_parent_in_order() {
        let source = r#"
class A {
    void m() {
        int x = 0;
        // omp parallel
        // omp single
        x = 1;
    }
}
"#;
        let tree = parse_unit(source).unwrap();
        let directives = scan(&tree, source).unwrap();
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].region.id(), directives[1].region.id());
        assert_eq!(directives[1].parent, Some(0));
        assert_eq!(directives[0].parent, None);
    }

    #[test]
    fn test_generated_names_are_deterministic() {
        let source = r#"
class A {
    void m() {
        int x = 0;
        // omp parallel
        x = 1;
    }
}
"#;
        let tree = parse_unit(source).unwrap();
        let directives = scan(&tree, source).unwrap();
        assert_eq!(directives[0].context_var, "ompContext_0");
        assert_eq!(directives[0].context_class, "OMPContext_0");
        assert_eq!(directives[0].executor_var, "ompExecutor_0");
    }
}
