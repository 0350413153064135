//! Pragma front-end: directive records and comment scanning.
//!
//! A pragma is a single-line comment of the form `// omp <kind>
//! <clauses...>` attached to the statement that follows it. The scanner
//! turns each one into a [`Directive`] record carrying the parsed kind,
//! attribute sets, the region node, and the deterministic generated names
//! the translation stage will splice into the output.

pub mod scanner;
pub mod types;

pub use scanner::scan;
pub use types::{Clauses, Directive, DirectiveKind};
