//! Symbol model: class discovery and variable resolution.
//!
//! One [`UnitModel`] is built per compilation unit and frozen before any
//! translation starts. Classes live in an arena indexed by [`ClassId`];
//! superclass and enclosing-class links are arena indices, and a class map
//! from tree-node identity to arena index answers "which class does this
//! node belong to" during scope walks.
//!
//! [`Var`] values are ephemeral: one is created per resolved identifier
//! occurrence and compared by array-less name and kind only.

pub mod class;
pub mod var;

pub use class::{ClassEntry, ClassId, ClassKind, FieldDecl, UnitModel};
pub use var::{array_less, CaptureRecord, Var, VarKind};
