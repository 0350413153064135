//! Scope inheritance: what is visible at a tree node.
//!
//! Pure functions over the syntax tree. The visitor computes its baseline
//! (locals and parameters visible at the region, enclosing classes) once
//! per directive, and asks [`directive_locals`] per identifier occurrence
//! to tell region-local declarations apart from free variables.
//!
//! Scope rules implemented here:
//! - locals are visible from their declaration to the end of the enclosing
//!   block, innermost declaration winning on a name collision;
//! - `for` header variables count as declared from the loop's opening
//!   brace, enhanced-`for` variables, `catch` parameters and
//!   try-with-resources resources likewise belong to their statement;
//! - neither locals nor parameters cross a class boundary. A local or
//!   anonymous class sees outer state only through its enclosing-class
//!   chain, which is the class map's business, not this module's.

use rustc_hash::FxHashSet;
use tree_sitter::Node;

use crate::model::{ClassId, UnitModel, Var, VarKind};
use crate::parse::node_text;

/// Enclosing classes of `node`, innermost first.
pub fn parent_classes(node: Node, model: &UnitModel) -> Vec<ClassId> {
    let mut out = Vec::new();
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if let Some(id) = model.class_for_node(parent.id()) {
            out.push(id);
        }
        cur = parent;
    }
    out
}

/// Locals visible at `node`: declarations textually preceding it in every
/// enclosing block, up to but not crossing a class boundary.
pub fn inherited_locals(node: Node, source: &str) -> Vec<Var> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let before = node.start_byte();
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if collect_scope_decls(parent, Some(before), source, &mut out, &mut seen) {
            break;
        }
        cur = parent;
    }
    out
}

/// Parameters of the enclosing method or constructor, stopping at the
/// first class boundary.
pub fn inherited_params(node: Node, source: &str) -> Vec<Var> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        match parent.kind() {
            "method_declaration" | "constructor_declaration" => {
                if let Some(params) = parent.child_by_field_name("parameters") {
                    collect_params(params, source, &mut out, &mut seen);
                }
            }
            "class_body" | "interface_body" | "enum_body" => break,
            _ => {}
        }
        cur = parent;
    }
    out
}

/// Locals declared inside `region` and in scope at `node`.
///
/// Declaration order within the region is deliberately ignored: a name
/// that matches a declaration later in the same block is still a local of
/// the region, never a free variable.
pub fn directive_locals(node: Node, region: Node, source: &str) -> Vec<Var> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let (start, end) = (region.start_byte(), region.end_byte());
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if parent.start_byte() < start || parent.end_byte() > end {
            break;
        }
        if collect_scope_decls(parent, None, source, &mut out, &mut seen) {
            break;
        }
        cur = parent;
    }
    out
}

/// Collect the declarations one scope-bearing ancestor contributes.
/// Returns true when the ancestor is a class boundary and the walk must
/// stop.
fn collect_scope_decls(
    parent: Node,
    before: Option<usize>,
    source: &str,
    out: &mut Vec<Var>,
    seen: &mut FxHashSet<String>,
) -> bool {
    match parent.kind() {
        "block" | "constructor_body" | "switch_block_statement_group" => {
            let mut cursor = parent.walk();
            for child in parent.named_children(&mut cursor) {
                if child.kind() == "local_variable_declaration"
                    && before.map_or(true, |b| child.start_byte() < b)
                {
                    collect_declarators(child, source, out, seen);
                }
            }
        }
        "for_statement" => {
            if let Some(init) = parent.child_by_field_name("init") {
                if init.kind() == "local_variable_declaration" {
                    collect_declarators(init, source, out, seen);
                }
            }
        }
        "enhanced_for_statement" => {
            if let (Some(name), Some(ty)) = (
                parent.child_by_field_name("name"),
                parent.child_by_field_name("type"),
            ) {
                push_local(node_text(name, source), node_text(ty, source), out, seen);
            }
        }
        "catch_clause" => {
            let mut cursor = parent.walk();
            let found_param = parent
                .children(&mut cursor)
                .find(|c| c.kind() == "catch_formal_parameter");
            if let Some(param) = found_param {
                let ty = param
                    .children(&mut param.walk())
                    .find(|c| c.kind() == "catch_type")
                    .map(|c| node_text(c, source).to_string())
                    .unwrap_or_default();
                if let Some(name) = param
                    .children(&mut param.walk())
                    .find(|c| c.kind() == "identifier")
                {
                    push_local(node_text(name, source), &ty, out, seen);
                }
            }
        }
        "try_with_resources_statement" => {
            if let Some(resources) = parent.child_by_field_name("resources") {
                let mut cursor = resources.walk();
                for resource in resources.named_children(&mut cursor) {
                    if resource.kind() != "resource" {
                        continue;
                    }
                    if let (Some(name), Some(ty)) = (
                        resource.child_by_field_name("name"),
                        resource.child_by_field_name("type"),
                    ) {
                        push_local(node_text(name, source), node_text(ty, source), out, seen);
                    }
                }
            }
        }
        "class_body" | "interface_body" | "enum_body" => return true,
        _ => {}
    }
    false
}

fn collect_declarators(
    decl: Node,
    source: &str,
    out: &mut Vec<Var>,
    seen: &mut FxHashSet<String>,
) {
    let base_type = decl
        .child_by_field_name("type")
        .map(|t| node_text(t, source))
        .unwrap_or_default();

    let mut cursor = decl.walk();
    for child in decl.children(&mut cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = child.child_by_field_name("name") else {
            continue;
        };
        let dims: String = child
            .children(&mut child.walk())
            .filter(|c| c.kind() == "dimensions")
            .map(|c| node_text(c, source))
            .collect();
        push_local(
            node_text(name, source),
            &format!("{base_type}{dims}"),
            out,
            seen,
        );
    }
}

fn collect_params(
    params: Node,
    source: &str,
    out: &mut Vec<Var>,
    seen: &mut FxHashSet<String>,
) {
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                if let (Some(name), Some(ty)) = (
                    param.child_by_field_name("name"),
                    param.child_by_field_name("type"),
                ) {
                    let name = node_text(name, source);
                    if seen.insert(name.to_string()) {
                        out.push(Var::new(name, VarKind::Param, node_text(ty, source)));
                    }
                }
            }
            "spread_parameter" => {
                // Varargs arrive as `type... declarator`.
                let ty = param
                    .children(&mut param.walk())
                    .next()
                    .map(|c| node_text(c, source).to_string())
                    .unwrap_or_default();
                if let Some(declarator) = param
                    .children(&mut param.walk())
                    .find(|c| c.kind() == "variable_declarator")
                {
                    if let Some(name) = declarator.child_by_field_name("name") {
                        let name = node_text(name, source);
                        if seen.insert(name.to_string()) {
                            out.push(Var::new(name, VarKind::Param, format!("{ty}[]")));
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_local(name: &str, type_text: &str, out: &mut Vec<Var>, seen: &mut FxHashSet<String>) {
    if seen.insert(name.to_string()) {
        out.push(Var::new(name, VarKind::Local, type_text));
    }
}
