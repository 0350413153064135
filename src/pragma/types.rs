//! Directive records produced by pragma scanning.

use std::fmt;

use serde::Serialize;
use tree_sitter::Node;

use crate::config::TranslatorConfig;
use crate::model::{CaptureRecord, ClassId};
use crate::parse::line_of;

/// The recognized pragma kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Parallel,
    ParallelFor,
    For,
    Sections,
    Section,
    Single,
    Master,
    Barrier,
    Critical,
    Atomic,
}

impl DirectiveKind {
    /// Whether this directive synthesizes its own context class, executor
    /// and task-launch scaffold. All other kinds splice guard templates
    /// against the nearest such ancestor.
    pub fn owns_context(self) -> bool {
        matches!(self, DirectiveKind::Parallel | DirectiveKind::ParallelFor)
    }

    /// Worksharing and synchronization kinds bind to an enclosing parallel
    /// region and are invalid without one.
    pub fn requires_parallel_ancestor(self) -> bool {
        !self.owns_context()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Parallel => "parallel",
            DirectiveKind::ParallelFor => "parallel for",
            DirectiveKind::For => "for",
            DirectiveKind::Sections => "sections",
            DirectiveKind::Section => "section",
            DirectiveKind::Single => "single",
            DirectiveKind::Master => "master",
            DirectiveKind::Barrier => "barrier",
            DirectiveKind::Critical => "critical",
            DirectiveKind::Atomic => "atomic",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed attribute sets of one pragma. Names are stored array-less.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clauses {
    pub private_vars: Vec<String>,
    pub firstprivate_vars: Vec<String>,
    pub public_vars: Vec<String>,
    /// Worker-count literal from `threadNum(n)`.
    pub thread_num: Option<String>,
}

impl Clauses {
    /// Names addressed per worker thread: `private` plus `firstprivate`.
    pub fn privatized_names(&self) -> impl Iterator<Item = &str> {
        self.private_vars
            .iter()
            .chain(self.firstprivate_vars.iter())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.private_vars.is_empty()
            && self.firstprivate_vars.is_empty()
            && self.public_vars.is_empty()
            && self.thread_num.is_none()
    }
}

/// One pragma bound to one statement.
///
/// The capture set and directive class are filled in during the
/// directive's own translation pass and stay empty before it.
#[derive(Debug)]
pub struct Directive<'t> {
    pub kind: DirectiveKind,
    pub clauses: Clauses,
    /// The pragma comment token; removed from the output.
    pub comment: Node<'t>,
    /// The governed statement subtree.
    pub region: Node<'t>,
    /// Discovery index; generated names derive from it.
    pub ordinal: usize,
    /// Index of the lexical parent directive, linked by region
    /// containment (pragma order breaks same-region ties).
    pub parent: Option<usize>,

    pub context_var: String,
    pub context_class: String,
    pub executor_var: String,

    pub captured: Vec<CaptureRecord>,
    pub captured_this: bool,
    pub directive_class: Option<ClassId>,
}

impl<'t> Directive<'t> {
    pub fn new(
        kind: DirectiveKind,
        clauses: Clauses,
        comment: Node<'t>,
        region: Node<'t>,
        ordinal: usize,
    ) -> Self {
        Directive {
            kind,
            clauses,
            comment,
            region,
            ordinal,
            parent: None,
            context_var: format!("ompContext_{ordinal}"),
            context_class: format!("OMPContext_{ordinal}"),
            executor_var: format!("ompExecutor_{ordinal}"),
            captured: Vec::new(),
            captured_this: false,
            directive_class: None,
        }
    }

    /// 1-based line of the pragma comment.
    #[inline]
    pub fn line(&self) -> usize {
        line_of(self.comment)
    }

    /// Worker-count expression: the `threadNum` clause, or the configured
    /// default.
    pub fn thread_count_expr(&self, config: &TranslatorConfig) -> String {
        self.clauses
            .thread_num
            .clone()
            .unwrap_or_else(|| config.default_thread_count.clone())
    }

    /// Captures owned by this directive's own context (as opposed to ones
    /// re-captured from an enclosing directive).
    pub fn own_captures(&self) -> impl Iterator<Item = &CaptureRecord> {
        self.captured
            .iter()
            .filter(|r| r.context_var == self.context_var)
    }
}
