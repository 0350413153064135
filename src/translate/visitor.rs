//! The translation visitor: one walk over one directive's region.
//!
//! The visitor classifies every name-bearing construct of the region
//! against the scopes visible at the region and issues token rewrites:
//!
//! - a bare identifier (or the leftmost identifier of a dotted name) that
//!   resolves to an enclosing local, parameter or field becomes a field
//!   access on the context object, indexed per thread when privatized;
//! - `this` of the directive's own class becomes the context's `THAT`
//!   back-reference, and `this.field` collapses onto the context field;
//! - names declared inside the region, type and package names, and
//!   symbols inherited from classes outside the unit stay untouched;
//! - entering a nested class body switches `this` handling off until the
//!   body is left again, while identifier capture keeps going.
//!
//! Resolution is parent-first: a variable the enclosing directive already
//! captured is re-captured through the enclosing context, reproducing the
//! enclosing rewrite byte for byte, so a nested region never references
//! outer locals directly and contributes no duplicate capture of its own.

use rustc_hash::FxHashSet;
use tracing::trace;
use tree_sitter::Node;

use crate::error::{JpError, Result};
use crate::model::{array_less, CaptureRecord, ClassId, UnitModel, Var, VarKind};
use crate::parse::{line_of, node_text};
use crate::pragma::Directive;
use crate::rewrite::TokenRewriter;
use crate::scope;

/// Capture context of the nearest enclosing context-owning directive.
#[derive(Debug, Clone, Default)]
pub struct ParentScope {
    pub context_var: Option<String>,
    pub captured: Vec<CaptureRecord>,
    pub captured_this: bool,
    pub directive_class: Option<ClassId>,
}

/// What one region walk produced.
#[derive(Debug)]
pub struct VisitOutcome {
    pub captured: Vec<CaptureRecord>,
    pub captured_this: bool,
    pub directive_class: Option<ClassId>,
}

pub struct TranslationVisitor<'t, 'u> {
    source: &'u str,
    model: &'u UnitModel,
    region: Node<'t>,
    context_var: String,
    executor_var: String,
    private_vars: FxHashSet<String>,
    parent: ParentScope,

    class_stack: Vec<ClassId>,
    directive_class: Option<ClassId>,
    locals: Vec<Var>,
    params: Vec<Var>,
    captured: Vec<CaptureRecord>,
    captured_this: bool,
}

impl<'t, 'u> TranslationVisitor<'t, 'u> {
    pub fn new(
        directive: &Directive<'t>,
        parent: ParentScope,
        model: &'u UnitModel,
        source: &'u str,
    ) -> Self {
        // parent_classes is innermost-first; the stack wants innermost on
        // top.
        let mut class_stack = scope::parent_classes(directive.region, model);
        class_stack.reverse();
        let directive_class = class_stack.last().copied();

        TranslationVisitor {
            source,
            model,
            region: directive.region,
            context_var: directive.context_var.clone(),
            executor_var: directive.executor_var.clone(),
            private_vars: directive.clauses.privatized_names().map(str::to_string).collect(),
            parent,
            class_stack,
            directive_class,
            locals: scope::inherited_locals(directive.region, source),
            params: scope::inherited_params(directive.region, source),
            captured: Vec::new(),
            captured_this: false,
        }
    }

    /// Walk the region and issue every rewrite.
    pub fn translate(mut self, rw: &mut TokenRewriter) -> Result<VisitOutcome> {
        self.visit(self.region, rw)?;
        Ok(VisitOutcome {
            captured: self.captured,
            captured_this: self.captured_this,
            directive_class: self.directive_class,
        })
    }

    fn visit(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        match node.kind() {
            "identifier" => self.handle_identifier(node, rw),
            "this" => self.handle_this(node, rw),
            "field_access" => self.handle_field_access(node, rw),
            "method_invocation" => self.handle_method_invocation(node, rw),
            "class_declaration" | "interface_declaration" | "enum_declaration" => {
                self.enter_class(node, rw)
            }
            "object_creation_expression" => self.handle_object_creation(node, rw),
            "lambda_expression" => Err(JpError::UnsupportedConstruct {
                line: line_of(node),
                what: "lambda expression inside a parallel region".to_string(),
            }),
            "method_reference" => Err(JpError::UnsupportedConstruct {
                line: line_of(node),
                what: "method reference inside a parallel region".to_string(),
            }),
            "line_comment" | "block_comment" => Ok(()),
            _ => self.visit_children(node, rw),
        }
    }

    fn visit_children(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, rw)?;
        }
        Ok(())
    }

    /// Simple expression name: rewrite the leftmost identifier of a
    /// dotted name, leave everything else alone.
    fn handle_identifier(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        if !self.is_expression_name(node) {
            return Ok(());
        }
        let name = node_text(node, self.source);

        // Names declared inside the region are not free variables.
        let region_locals = scope::directive_locals(node, self.region, self.source);
        if region_locals.iter().any(|v| v.name() == array_less(name)) {
            return Ok(());
        }

        let Some(record) = self.resolve_with_parent(name) else {
            return Ok(());
        };
        rw.replace(node, record.render(self.model))?;
        trace!(
            name = record.var.name(),
            context = %record.context_var,
            "captured identifier"
        );
        self.capture(record);
        Ok(())
    }

    /// Whether an identifier occurrence denotes an expression name (and
    /// is the leftmost segment when dotted). Declaration names, member
    /// suffixes, labels, and type/package segments are not rewritable.
    fn is_expression_name(&self, node: Node<'t>) -> bool {
        let Some(parent) = node.parent() else {
            return false;
        };
        match parent.kind() {
            "method_invocation" | "field_access" => {
                parent.child_by_field_name("object") == Some(node)
            }
            "variable_declarator" => parent.child_by_field_name("value") == Some(node),
            "enhanced_for_statement" | "resource" => {
                parent.child_by_field_name("value") == Some(node)
            }
            "formal_parameter"
            | "spread_parameter"
            | "catch_formal_parameter"
            | "inferred_parameters"
            | "labeled_statement"
            | "break_statement"
            | "continue_statement"
            | "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "annotation_type_declaration"
            | "record_declaration"
            | "method_declaration"
            | "constructor_declaration"
            | "enum_constant"
            | "type_parameter"
            | "scoped_identifier"
            | "scoped_type_identifier"
            | "annotation"
            | "marker_annotation"
            | "switch_label"
            | "method_reference" => false,
            _ => true,
        }
    }

    /// Parent-first resolution: an already-captured variable of the
    /// enclosing directive is re-captured verbatim from the enclosing
    /// context; otherwise classify against the region's own scopes.
    fn resolve_with_parent(&self, name: &str) -> Option<CaptureRecord> {
        if let Some(record) = find_value_record(name, &self.parent.captured) {
            return Some(record.clone());
        }
        let var = Var::resolve(
            name,
            &self.locals,
            &self.params,
            self.directive_class,
            self.model,
        )
        .ok()?;
        Some(self.own_record(var))
    }

    fn own_record(&self, var: Var) -> CaptureRecord {
        let extension = if self.private_vars.contains(var.name()) {
            format!("[{}.getThreadNum()]", self.executor_var)
        } else {
            String::new()
        };
        CaptureRecord {
            context_var: self.context_var.clone(),
            var,
            extension,
        }
    }

    fn capture(&mut self, record: CaptureRecord) {
        if !self.captured.iter().any(|r| r.var == record.var) {
            self.captured.push(record);
        }
    }

    /// Standalone `this` reached through generic recursion (argument,
    /// return value, monitor, ...).
    fn handle_this(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        if !self.at_directive_class() {
            return Ok(());
        }
        let (ctx, own) = self.that_reference();
        rw.replace(node, format!("{ctx}.THAT"))?;
        if own {
            self.captured_this = true;
        }
        Ok(())
    }

    /// `this` of the directive class routes through whichever context
    /// already carries the back-reference: the enclosing directive's when
    /// it captured `this` for the same class, else this directive's own.
    fn that_reference(&self) -> (&str, bool) {
        if self.parent.captured_this && self.parent.directive_class == self.directive_class {
            if let Some(parent_ctx) = self.parent.context_var.as_deref() {
                return (parent_ctx, false);
            }
        }
        (&self.context_var, true)
    }

    fn handle_field_access(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        let (Some(object), Some(field)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("field"),
        ) else {
            return Err(JpError::internal(format!(
                "field access without object/field at line {}",
                line_of(node)
            )));
        };

        if object.kind() != "this" {
            // `a.b.c`: only the leftmost segment can be a captured
            // variable; suffixes are member accesses on the rewritten
            // receiver. `super.x` stays untouched.
            if object.kind() == "super" {
                return Ok(());
            }
            return self.visit(object, rw);
        }

        // `this.field` — only for the directive's own class.
        if !self.at_directive_class() {
            return Ok(());
        }
        let field_name = node_text(field, self.source);

        if let Some(record) = find_field_record(field_name, &self.parent.captured) {
            let record = record.clone();
            rw.replace(object, record.context_var.clone())?;
            rw.replace(
                field,
                format!("{}{}", record.var.full_name(self.model), record.extension),
            )?;
            self.capture(record);
            return Ok(());
        }

        let Some(class) = self.directive_class else {
            return Ok(());
        };
        match self.model.find_field(field_name, class) {
            Some((owner, decl)) => {
                let record = self.own_record(Var::new(
                    field_name,
                    VarKind::Field(owner),
                    decl.type_text.clone(),
                ));
                rw.replace(object, record.context_var.clone())?;
                rw.replace(
                    field,
                    format!("{}{}", record.var.full_name(self.model), record.extension),
                )?;
                self.captured_this = true;
                self.capture(record);
            }
            // A field inherited from a class outside the unit; not ours
            // to rewrite.
            None => {}
        }
        Ok(())
    }

    fn handle_method_invocation(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        if let Some(object) = node.child_by_field_name("object") {
            match object.kind() {
                "this" => {
                    if self.at_directive_class() {
                        let (ctx, own) = self.that_reference();
                        rw.replace(object, format!("{ctx}.THAT"))?;
                        if own {
                            self.captured_this = true;
                        }
                    }
                }
                // `super.m()` binds to the enclosing instance's
                // superclass; the context cannot express it.
                "super" => {}
                _ => self.visit(object, rw)?,
            }
        }
        if let Some(args) = node.child_by_field_name("arguments") {
            self.visit_children(args, rw)?;
        }
        Ok(())
    }

    fn handle_object_creation(&mut self, node: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "class_body" {
                // Anonymous class: the body is keyed in the class map.
                self.enter_class_body(child, rw)?;
            } else {
                self.visit(child, rw)?;
            }
        }
        Ok(())
    }

    /// A named class declared inside the region.
    fn enter_class(&mut self, decl: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        self.push_class(decl)?;
        let result = self.visit_children(decl, rw);
        self.pop_class()?;
        result
    }

    /// An anonymous class body inside the region.
    fn enter_class_body(&mut self, body: Node<'t>, rw: &mut TokenRewriter) -> Result<()> {
        self.push_class(body)?;
        let result = self.visit_children(body, rw);
        self.pop_class()?;
        result
    }

    fn push_class(&mut self, keyed: Node<'t>) -> Result<()> {
        let id = self.model.class_for_node(keyed.id()).ok_or_else(|| {
            JpError::parse_at(
                line_of(keyed),
                "class body inside region is missing from the class map",
            )
        })?;
        self.class_stack.push(id);
        Ok(())
    }

    fn pop_class(&mut self) -> Result<()> {
        self.class_stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| JpError::internal("class stack underflow"))
    }

    /// `this` rewrites fire only while the innermost entered class is the
    /// class the directive was discovered in.
    fn at_directive_class(&self) -> bool {
        self.directive_class.is_some() && self.class_stack.last().copied() == self.directive_class
    }
}

/// Match an identifier occurrence against inherited captures, honoring
/// shadowing order: a captured local hides a captured parameter hides a
/// captured field of the same name.
fn find_value_record<'a>(name: &str, set: &'a [CaptureRecord]) -> Option<&'a CaptureRecord> {
    let wanted = array_less(name);
    let matching = || set.iter().filter(|r| r.var.name() == wanted);
    matching()
        .find(|r| r.var.kind() == VarKind::Local)
        .or_else(|| matching().find(|r| r.var.kind() == VarKind::Param))
        .or_else(|| matching().next())
}

/// Match a `this.field` occurrence: only field captures qualify.
fn find_field_record<'a>(name: &str, set: &'a [CaptureRecord]) -> Option<&'a CaptureRecord> {
    let wanted = array_less(name);
    set.iter()
        .find(|r| r.var.name() == wanted && matches!(r.var.kind(), VarKind::Field(_)))
}
