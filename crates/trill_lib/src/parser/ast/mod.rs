pub mod declaration;
pub mod expression;
pub mod statement;
pub mod type_name;

pub use declaration::*;
pub use expression::*;
pub use statement::*;
pub use type_name::TypeName;

use crate::source::SourceRange;

/// A whole parsed source file: a flat list of top-level declarations, in
/// source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub declarations: Vec<DeclNode>,
    pub range: SourceRange,
}
