//! jpragma - OpenMP-style pragma comments for Java, translated away.
//!
//! This library rewrites Java sources annotated with `// omp ...` pragma
//! comments into standalone Java that runs each annotated region on
//! worker threads. No runtime beyond a small configurable executor class
//! is required by the emitted code; the translator itself only ever
//! reads syntax trees and splices tokens.
//!
//! # Architecture
//!
//! The crate is organized into thin layers, leaves first:
//!
//! - **Parse layer** ([`parse`]): tree-sitter-java parser acquisition and
//!   unit parsing
//! - **Pragma layer** ([`pragma`]): `// omp` comment scanning, clause
//!   parsing, directive records with parent links
//! - **Symbol layer** ([`model`]): class arena + class map per unit,
//!   variable resolution, deterministic context-field mangling
//! - **Scope layer** ([`scope`]): visible locals, parameters and
//!   enclosing classes at any tree node
//! - **Rewrite layer** ([`rewrite`]): non-overlapping token-range edits
//!   over the immutable source, rendered once per unit
//! - **Translation layer** ([`translate`]): the per-region capture
//!   visitor, directive-kind synthesis templates, and the orchestrator
//!
//! # Quick Start
//!
//! ```
//! use jpragma::{Translator, TranslatorConfig};
//!
//! let source = r#"
//! class Counter {
//!     int count;
//!     void tick() {
//!         // omp parallel threadNum(4)
//!         this.count++;
//!     }
//! }
//! "#;
//!
//! let translator = Translator::new(TranslatorConfig::default());
//! let output = translator.translate_unit(source)?;
//!
//! // The field access now goes through the shared context object.
//! assert!(output.text.contains("ompContext_0.F_Counter_count++;"));
//! assert!(output.reports[0].captured_this);
//! # Ok::<(), jpragma::JpError>(())
//! ```
//!
//! Units without pragmas pass through byte-identical, and translation is
//! deterministic: the same input always produces the same output,
//! generated names included.

pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod pragma;
pub mod rewrite;
pub mod scope;
pub mod translate;

pub use config::TranslatorConfig;
pub use error::{JpError, Result};
pub use translate::{CapturedVarReport, DirectiveReport, TranslationOutput, Translator};
