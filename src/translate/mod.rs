//! Translation stage: the region visitor, directive-kind synthesis, and
//! the orchestrator driving one compilation unit end to end.
//!
//! # Main API
//!
//! - [`Translator::translate_unit`] - rewrite one unit's source text
//! - [`Translator::translate_file`] - convenience wrapper reading a path
//! - [`Translator::translate_units`] - drive many units, skipping failed
//!   ones with a diagnostic
//!
//! # Example
//!
//! ```
//! use jpragma::Translator;
//!
//! let source = r#"
//! class Main {
//!     void work() {
//!         int x = 0;
//!         // omp parallel
//!         x = x + 1;
//!     }
//! }
//! "#;
//! let output = Translator::default().translate_unit(source)?;
//! assert!(output.text.contains("ompContext_0.L_0_x = ompContext_0.L_0_x + 1;"));
//! # Ok::<(), jpragma::JpError>(())
//! ```

pub mod orchestrator;
pub mod synthesis;
pub mod visitor;

pub use orchestrator::Translator;

use serde::Serialize;

use crate::error::{JpError, Result};
use crate::model::UnitModel;
use crate::pragma::{Directive, DirectiveKind};

/// One captured variable, as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedVarReport {
    pub name: String,
    pub kind: &'static str,
    pub full_name: String,
    pub privatized: bool,
}

/// Capture summary for one translated directive. Only captures owned by
/// the directive's own context appear; re-captures through an enclosing
/// context belong to the enclosing directive's report.
#[derive(Debug, Clone, Serialize)]
pub struct DirectiveReport {
    pub kind: DirectiveKind,
    pub line: usize,
    pub captured: Vec<CapturedVarReport>,
    pub captured_this: bool,
}

impl DirectiveReport {
    pub(crate) fn new(d: &Directive, model: &UnitModel) -> Self {
        DirectiveReport {
            kind: d.kind,
            line: d.line(),
            captured: d
                .own_captures()
                .map(|r| CapturedVarReport {
                    name: r.var.name().to_string(),
                    kind: r.var.kind().label(),
                    full_name: r.var.full_name(model),
                    privatized: r.privatized(),
                })
                .collect(),
            captured_this: d.captured_this,
        }
    }
}

/// The rewritten unit plus per-directive capture reports.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutput {
    pub text: String,
    pub reports: Vec<DirectiveReport>,
}

impl TranslationOutput {
    /// Serialize the reports (and text) for build tooling.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| JpError::internal(format!("report serialization: {e}")))
    }
}
