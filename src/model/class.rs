//! Class arena and class map for one compilation unit.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tree_sitter::{Node, Tree};

use crate::error::Result;
use crate::parse::node_text;

/// Arena index of a class discovered in the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

/// How a class is nested in the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Declared directly in the compilation unit.
    Top,
    /// Declared in another class body.
    Inner,
    /// Declared inside a method or block.
    Local,
    /// The class body of an instance-creation expression.
    Anonymous,
}

/// One declared field: simple name plus the declared type text, kept for
/// typing the synthesized context fields.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub type_text: String,
}

/// One class discovered in the unit.
#[derive(Debug)]
pub struct ClassEntry {
    /// Identity of the keyed syntax node (declaration node, or the class
    /// body for anonymous classes).
    pub node_id: usize,
    /// Simple name; `None` for anonymous classes.
    pub name: Option<String>,
    pub kind: ClassKind,
    /// Lexically enclosing class, if any.
    pub enclosing: Option<ClassId>,
    /// Superclass resolved to another class of this unit, if the simple
    /// name matches one. External superclasses stay unresolved and their
    /// inherited fields are simply never found.
    pub superclass: Option<ClassId>,
    /// Textual superclass simple name, resolved or not.
    pub super_name: Option<String>,
    pub fields: Vec<FieldDecl>,
}

/// Class arena + class map for one unit. Frozen after [`UnitModel::build`].
#[derive(Debug, Default)]
pub struct UnitModel {
    classes: Vec<ClassEntry>,
    by_node: FxHashMap<usize, ClassId>,
}

impl UnitModel {
    /// Discover every class of the unit: top-level, inner, local, and
    /// anonymous. Superclass links are resolved by simple name within the
    /// unit after the walk.
    pub fn build(tree: &Tree, source: &str) -> Result<Self> {
        let mut model = UnitModel::default();
        model.collect(tree.root_node(), source, None);
        model.link_superclasses();
        Ok(model)
    }

    fn collect(&mut self, node: Node, source: &str, enclosing: Option<ClassId>) {
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration" => {
                let id = self.register_named(node, source, enclosing);
                if let Some(body) = node.child_by_field_name("body") {
                    self.collect_children(body, source, Some(id));
                }
            }
            "object_creation_expression" => {
                // Arguments belong to the enclosing class; only the body
                // (if present) opens a new anonymous class.
                for child in node.children(&mut node.walk()) {
                    if child.kind() == "class_body" {
                        let id = self.register_anonymous(node, child, source, enclosing);
                        self.collect_children(child, source, Some(id));
                    } else {
                        self.collect(child, source, enclosing);
                    }
                }
            }
            _ => self.collect_children(node, source, enclosing),
        }
    }

    fn collect_children(&mut self, node: Node, source: &str, enclosing: Option<ClassId>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect(child, source, enclosing);
        }
    }

    fn register_named(&mut self, node: Node, source: &str, enclosing: Option<ClassId>) -> ClassId {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string());

        let kind = if enclosing.is_none() {
            ClassKind::Top
        } else if node
            .parent()
            .is_some_and(|p| matches!(p.kind(), "class_body" | "interface_body" | "enum_body"))
        {
            ClassKind::Inner
        } else {
            ClassKind::Local
        };

        // Interfaces and enums contribute their constant fields but no
        // superclass chain.
        let super_name = if node.kind() == "class_declaration" {
            extract_superclass_name(node, source)
        } else {
            None
        };

        let fields = node
            .child_by_field_name("body")
            .map(|body| extract_fields(body, source))
            .unwrap_or_default();

        self.push_entry(ClassEntry {
            node_id: node.id(),
            name,
            kind,
            enclosing,
            superclass: None,
            super_name,
            fields,
        })
    }

    fn register_anonymous(
        &mut self,
        creation: Node,
        body: Node,
        source: &str,
        enclosing: Option<ClassId>,
    ) -> ClassId {
        let super_name = creation
            .child_by_field_name("type")
            .map(|t| simple_type_name(node_text(t, source)).to_string());

        self.push_entry(ClassEntry {
            node_id: body.id(),
            name: None,
            kind: ClassKind::Anonymous,
            enclosing,
            superclass: None,
            super_name,
            fields: extract_fields(body, source),
        })
    }

    fn push_entry(&mut self, entry: ClassEntry) -> ClassId {
        let id = ClassId(self.classes.len());
        self.by_node.insert(entry.node_id, id);
        self.classes.push(entry);
        id
    }

    /// Resolve superclass simple names against the unit's own classes.
    /// First match in discovery order wins; misses stay unresolved.
    fn link_superclasses(&mut self) {
        let mut links: Vec<(usize, ClassId)> = Vec::new();
        for (i, entry) in self.classes.iter().enumerate() {
            let Some(super_name) = &entry.super_name else {
                continue;
            };
            let found = self
                .classes
                .iter()
                .enumerate()
                .find(|(j, c)| *j != i && c.name.as_deref() == Some(super_name.as_str()));
            if let Some((j, _)) = found {
                links.push((i, ClassId(j)));
            }
        }
        for (i, super_id) in links {
            self.classes[i].superclass = Some(super_id);
        }
    }

    /// Class registered for a tree node, by node identity.
    #[inline]
    pub fn class_for_node(&self, node_id: usize) -> Option<ClassId> {
        self.by_node.get(&node_id).copied()
    }

    #[inline]
    pub fn entry(&self, id: ClassId) -> &ClassEntry {
        &self.classes[id.0]
    }

    /// Walk the inheritance chain of `class` looking for a declared field.
    /// Cycle-guarded: malformed superclass links terminate instead of
    /// spinning.
    pub fn find_field(&self, name: &str, class: ClassId) -> Option<(ClassId, &FieldDecl)> {
        let mut visited: FxHashSet<ClassId> = FxHashSet::default();
        let mut cur = Some(class);
        while let Some(id) = cur {
            if !visited.insert(id) {
                break;
            }
            let entry = self.entry(id);
            if let Some(field) = entry.fields.iter().find(|f| f.name == name) {
                return Some((id, field));
            }
            cur = entry.superclass;
        }
        None
    }

    /// Stable identifier used in mangled context-field names: the simple
    /// name, or a deterministic arena-derived tag for anonymous classes.
    pub fn stable_tag(&self, id: ClassId) -> String {
        match &self.entry(id).name {
            Some(name) => name.clone(),
            None => format!("Anon{}", id.0),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &ClassEntry)> {
        self.classes.iter().enumerate().map(|(i, e)| (ClassId(i), e))
    }
}

/// Superclass simple name from a class declaration, if any.
fn extract_superclass_name(node: Node, source: &str) -> Option<String> {
    let superclass_node = node.child_by_field_name("superclass")?;
    for child in superclass_node.children(&mut superclass_node.walk()) {
        match child.kind() {
            "type_identifier" | "generic_type" | "scoped_type_identifier" => {
                return Some(simple_type_name(node_text(child, source)).to_string());
            }
            _ => {}
        }
    }
    None
}

/// Reduce a type's text to its simple name: drop type arguments and any
/// qualifying package/outer segments.
fn simple_type_name(text: &str) -> &str {
    let base = text.split('<').next().unwrap_or(text).trim();
    base.rsplit('.').next().unwrap_or(base)
}

/// Collect declared fields from a class/interface/enum body. Enum bodies
/// keep their member declarations one level down.
fn extract_fields(body: Node, source: &str) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        match child.kind() {
            "field_declaration" => collect_field_declarators(child, source, &mut fields),
            "enum_body_declarations" => {
                let mut inner = child.walk();
                for member in child.children(&mut inner) {
                    if member.kind() == "field_declaration" {
                        collect_field_declarators(member, source, &mut fields);
                    }
                }
            }
            _ => {}
        }
    }
    fields
}

fn collect_field_declarators(decl: Node, source: &str, out: &mut Vec<FieldDecl>) {
    let base_type = decl
        .child_by_field_name("type")
        .map(|t| node_text(t, source).to_string())
        .unwrap_or_default();

    let mut cursor = decl.walk();
    for child in decl.children(&mut cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        // C-style trailing dimensions move onto the type.
        let dims: String = child
            .children(&mut child.walk())
            .filter(|c| c.kind() == "dimensions")
            .map(|c| node_text(c, source))
            .collect();
        out.push(FieldDecl {
            name: node_text(name_node, source).to_string(),
            type_text: format!("{base_type}{dims}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_unit;

    fn build(source: &str) -> UnitModel {
        let tree = parse_unit(source).unwrap();
        UnitModel::build(&tree, source).unwrap()
    }

    #[test]
    fn test_top_and_inner_classes() {
        let model = build(
            r#"
class Outer {
    int shared;
    class Nested { }
}
class Other { }
"#,
        );
        assert_eq!(model.len(), 3);
        let kinds: Vec<ClassKind> = model.iter().map(|(_, e)| e.kind).collect();
        assert_eq!(kinds, vec![ClassKind::Top, ClassKind::Inner, ClassKind::Top]);
        let outer = model.iter().next().unwrap().1;
        assert_eq!(outer.fields.len(), 1);
        assert_eq!(outer.fields[0].name, "shared");
        assert_eq!(outer.fields[0].type_text, "int");
    }

    #[test]
    fn test_anonymous_class_keyed_by_body() {
        let source = r#"
class Main {
    void go() {
        Runnable r = new Runnable() { public void run() { } };
    }
}
"#;
        let model = build(source);
        assert_eq!(model.len(), 2);
        let anon = model.iter().find(|(_, e)| e.kind == ClassKind::Anonymous).unwrap();
        assert_eq!(anon.1.name, None);
        assert_eq!(anon.1.super_name.as_deref(), Some("Runnable"));
        assert!(model.class_for_node(anon.1.node_id).is_some());
    }

    #[test]
    fn test_local_class_kind() {
        let model = build(
            r#"
class Main {
    void go() {
        class Helper { int h; }
    }
}
"#,
        );
        let helper = model.iter().find(|(_, e)| e.name.as_deref() == Some("Helper"));
        assert_eq!(helper.unwrap().1.kind, ClassKind::Local);
    }

    #[test]
    fn test_field_lookup_walks_superclass_chain() {
        let model = build(
            r#"
class Base { protected int depth; }
class Mid extends Base { }
class Leaf extends Mid { int own; }
"#,
        );
        let leaf = model
            .iter()
            .find(|(_, e)| e.name.as_deref() == Some("Leaf"))
            .unwrap()
            .0;
        let (owner, field) = model.find_field("depth", leaf).unwrap();
        assert_eq!(model.entry(owner).name.as_deref(), Some("Base"));
        assert_eq!(field.type_text, "int");
        assert!(model.find_field("missing", leaf).is_none());
    }

    #[test]
    fn test_external_superclass_stays_unresolved() {
        let model = build("class App extends Thread { }");
        let app = model.iter().next().unwrap().1;
        assert_eq!(app.super_name.as_deref(), Some("Thread"));
        assert!(app.superclass.is_none());
    }

    #[test]
    fn test_c_style_array_field() {
        let model = build("class A { int data[]; }");
        let a = model.iter().next().unwrap().1;
        assert_eq!(a.fields[0].name, "data");
        assert_eq!(a.fields[0].type_text, "int[]");
    }

    #[test]
    fn test_stable_tag() {
        let model = build(
            r#"
class Named {
    void go() {
        Object o = new Object() { };
    }
}
"#,
        );
        let named = model.iter().next().unwrap().0;
        assert_eq!(model.stable_tag(named), "Named");
        let anon = model.iter().find(|(_, e)| e.kind == ClassKind::Anonymous).unwrap().0;
        assert!(model.stable_tag(anon).starts_with("Anon"));
    }
}
