//! Variable resolution and context-field name mangling.

use std::hash::{Hash, Hasher};

use super::class::{ClassId, UnitModel};
use crate::error::{JpError, Result};

/// Where a resolved name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Local,
    Param,
    /// Declared on the given class (possibly an ancestor of the class the
    /// resolution started from).
    Field(ClassId),
}

impl VarKind {
    /// Short label used in reports and mangled names.
    pub fn label(self) -> &'static str {
        match self {
            VarKind::Local => "local",
            VarKind::Param => "param",
            VarKind::Field(_) => "field",
        }
    }
}

/// A named storage location resolved for one identifier occurrence.
///
/// Equality and hashing use the array-less name and the kind only; the
/// declared type rides along for synthesis but never distinguishes two
/// captures of the same variable.
#[derive(Debug, Clone)]
pub struct Var {
    name: String,
    kind: VarKind,
    type_text: String,
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
    }
}

impl Var {
    pub fn new(name: &str, kind: VarKind, type_text: impl Into<String>) -> Self {
        Var {
            name: array_less(name).to_string(),
            kind,
            type_text: type_text.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> VarKind {
        self.kind
    }

    /// Declared type text, e.g. `int[]` or `List<String>`.
    #[inline]
    pub fn type_text(&self) -> &str {
        &self.type_text
    }

    /// Find the variable in `set` whose array-less name matches `name`.
    pub fn find<'a>(name: &str, set: &'a [Var]) -> Result<&'a Var> {
        let wanted = array_less(name);
        set.iter()
            .find(|v| v.name == wanted)
            .ok_or_else(|| JpError::NameNotResolvable(wanted.to_string()))
    }

    /// Classify a name against the visible scopes, in order: locals,
    /// parameters, then the inheritance chain of `class`.
    pub fn resolve(
        name: &str,
        locals: &[Var],
        params: &[Var],
        class: Option<ClassId>,
        model: &UnitModel,
    ) -> Result<Var> {
        if let Ok(v) = Var::find(name, locals) {
            return Ok(v.clone());
        }
        if let Ok(v) = Var::find(name, params) {
            return Ok(v.clone());
        }
        if let Some(class) = class {
            if let Some((owner, field)) = model.find_field(array_less(name), class) {
                return Ok(Var::new(name, VarKind::Field(owner), field.type_text.clone()));
            }
        }
        Err(JpError::NameNotResolvable(array_less(name).to_string()))
    }

    /// Deterministic context-field name: kind tag, owning-class stable tag
    /// (0 for locals and parameters), and the variable name. Two equal
    /// Vars always mangle identically within one translation.
    pub fn full_name(&self, model: &UnitModel) -> String {
        match self.kind {
            VarKind::Local => format!("L_0_{}", self.name),
            VarKind::Param => format!("P_0_{}", self.name),
            VarKind::Field(owner) => format!("F_{}_{}", model.stable_tag(owner), self.name),
        }
    }
}

/// One capture made while translating a region: the variable, the context
/// variable whose field now carries it, and the privatization suffix (the
/// per-thread index expression, empty for shared captures).
///
/// Records are reused verbatim when a nested directive re-captures the
/// variable, so the nested rewrite reproduces the owning directive's text
/// exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub context_var: String,
    pub var: Var,
    pub extension: String,
}

impl CaptureRecord {
    /// Whether the capture is addressed per worker thread.
    #[inline]
    pub fn privatized(&self) -> bool {
        !self.extension.is_empty()
    }

    /// The rewritten text for an occurrence of this capture.
    pub fn render(&self, model: &UnitModel) -> String {
        format!(
            "{}.{}{}",
            self.context_var,
            self.var.full_name(model),
            self.extension
        )
    }
}

/// Strip a trailing subscript: `a[i]` and `a[]` both resolve as `a`.
#[inline]
pub fn array_less(name: &str) -> &str {
    match name.find('[') {
        Some(i) => &name[..i],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_unit;

    fn model_for(source: &str) -> UnitModel {
        let tree = parse_unit(source).unwrap();
        UnitModel::build(&tree, source).unwrap()
    }

    #[test]
    fn test_array_less() {
        assert_eq!(array_less("a"), "a");
        assert_eq!(array_less("a[i]"), "a");
        assert_eq!(array_less("buf[]"), "buf");
    }

    #[test]
    fn test_equality_ignores_type_text() {
        let a = Var::new("x", VarKind::Local, "int");
        let b = Var::new("x[i]", VarKind::Local, "long");
        assert_eq!(a, b);
        assert_ne!(a, Var::new("x", VarKind::Param, "int"));
    }

    #[test]
    fn test_resolution_order_prefers_locals() {
        let model = model_for("class C { int x; }");
        let class = model.iter().next().unwrap().0;
        let locals = vec![Var::new("x", VarKind::Local, "int")];
        let params = vec![Var::new("x", VarKind::Param, "int")];

        let v = Var::resolve("x", &locals, &params, Some(class), &model).unwrap();
        assert_eq!(v.kind(), VarKind::Local);

        let v = Var::resolve("x", &[], &params, Some(class), &model).unwrap();
        assert_eq!(v.kind(), VarKind::Param);

        let v = Var::resolve("x", &[], &[], Some(class), &model).unwrap();
        assert!(matches!(v.kind(), VarKind::Field(_)));
    }

    #[test]
    fn test_unresolvable_name() {
        let model = model_for("class C { }");
        let class = model.iter().next().unwrap().0;
        let err = Var::resolve("System", &[], &[], Some(class), &model).unwrap_err();
        assert!(matches!(err, JpError::NameNotResolvable(_)));
    }

    #[test]
    fn test_full_name_mangling() {
        let model = model_for("class Counter { int count; }");
        let class = model.iter().next().unwrap().0;

        assert_eq!(Var::new("x", VarKind::Local, "int").full_name(&model), "L_0_x");
        assert_eq!(Var::new("n", VarKind::Param, "int").full_name(&model), "P_0_n");

        let field = Var::resolve("count", &[], &[], Some(class), &model).unwrap();
        assert_eq!(field.full_name(&model), "F_Counter_count");
    }

    #[test]
    fn test_find_matches_array_less_names() {
        let set = vec![Var::new("sum", VarKind::Local, "int")];
        assert!(Var::find("sum[k]", &set).is_ok());
        assert!(Var::find("other", &set).is_err());
    }
}
