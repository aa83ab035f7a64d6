//! Declaration model for C++ translation units, as produced by a compiler
//! front end and consumed by the harness generator.

pub mod index;
pub mod parse;
pub mod types;

pub use index::{ClassContext, ClassVisitor, DeclIndex, ScopeEntry};
pub use parse::{parse_tu, ParseError};
pub use types::*;
